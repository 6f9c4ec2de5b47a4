//! CSS Parser per [§ 5 Parsing](https://www.w3.org/TR/css-syntax-3/#parsing).
//!
//! "The input to the parsing stage is a stream of tokens from the tokenization stage."
//!
//! Beyond plain style rules this parser understands the two extensions the
//! style engine relies on: mixin definitions (`--name: { ... }`, which fall
//! out of the generic block grammar) and `@apply --name;` entries inside a
//! declaration block. Malformed input never fails; broken constructs are
//! dropped the way the CSS error-recovery rules describe.

use strum_macros::EnumString;
use umbra_common::warning::warn_once;

use super::ast::{AtRule, AtRuleBlock, BlockItem, ComponentValue, Declaration, Rule, StyleRule, Stylesheet};
use crate::serializer::component_values_to_string;
use crate::tokenizer::{CSSToken, CSSTokenizer};

/// At-rules whose block holds a list of rules rather than declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
enum GroupingRule {
    Media,
    Supports,
    Document,
    Layer,
    Container,
    Scope,
}

fn is_grouping_rule(name: &str) -> bool {
    name.parse::<GroupingRule>().is_ok() || name.ends_with("keyframes")
}

/// Parse CSS text into a [`Stylesheet`].
pub fn parse_stylesheet(css_text: &str) -> Stylesheet {
    CSSParser::new(CSSTokenizer::tokenize(css_text)).parse_stylesheet()
}

/// Parse the contents of a declaration block (an inline `style` attribute or
/// the body of a mixin).
pub fn parse_declaration_list(text: &str) -> Vec<BlockItem> {
    CSSParser::new(CSSTokenizer::tokenize(text)).parse_declaration_list()
}

/// Parse a property value into component values, trimmed of surrounding
/// whitespace.
pub fn parse_component_values(text: &str) -> Vec<ComponentValue> {
    let mut parser = CSSParser::new(CSSTokenizer::tokenize(text));
    let mut values = Vec::new();
    while !parser.at_eof() {
        values.push(parser.consume_component_value());
    }
    trim_whitespace(values)
}

/// CSS parser over a token list.
pub struct CSSParser {
    tokens: Vec<CSSToken>,
    position: usize,
}

impl CSSParser {
    /// Create a new parser from a list of tokens.
    pub fn new(tokens: Vec<CSSToken>) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    /// [§ 5.3.3 Parse a stylesheet](https://www.w3.org/TR/css-syntax-3/#parse-stylesheet)
    pub fn parse_stylesheet(&mut self) -> Stylesheet {
        Stylesheet {
            rules: self.consume_list_of_rules(false),
        }
    }

    /// [§ 5.3.8 Parse a list of declarations](https://www.w3.org/TR/css-syntax-3/#parse-list-of-declarations)
    pub fn parse_declaration_list(&mut self) -> Vec<BlockItem> {
        self.consume_declaration_list(false)
    }

    /// [§ 5.4.1 Consume a list of rules](https://www.w3.org/TR/css-syntax-3/#consume-list-of-rules)
    ///
    /// When `nested` is set the list ends at the `}` closing the enclosing
    /// block, which is left for the caller.
    fn consume_list_of_rules(&mut self, nested: bool) -> Vec<Rule> {
        let mut rules = Vec::new();
        loop {
            match self.peek() {
                CSSToken::EOF => return rules,
                CSSToken::RightBrace if nested => return rules,
                CSSToken::Whitespace | CSSToken::CDO | CSSToken::CDC | CSSToken::RightBrace => {
                    self.position += 1;
                }
                CSSToken::AtKeyword(_) => {
                    if let Some(rule) = self.consume_at_rule(nested) {
                        rules.push(Rule::At(rule));
                    }
                }
                _ => {
                    if let Some(rule) = self.consume_qualified_rule(nested) {
                        rules.push(Rule::Style(rule));
                    }
                }
            }
        }
    }

    /// [§ 5.4.2 Consume an at-rule](https://www.w3.org/TR/css-syntax-3/#consume-at-rule)
    fn consume_at_rule(&mut self, nested: bool) -> Option<AtRule> {
        let CSSToken::AtKeyword(name) = self.next_token() else {
            return None;
        };
        let name = name.to_ascii_lowercase();
        let mut prelude = Vec::new();
        loop {
            match self.peek() {
                CSSToken::Semicolon => {
                    self.position += 1;
                    break;
                }
                CSSToken::EOF => break,
                CSSToken::RightBrace if nested => break,
                CSSToken::LeftBrace => {
                    self.position += 1;
                    let block = if is_grouping_rule(&name) {
                        AtRuleBlock::Rules(self.consume_list_of_rules(true))
                    } else {
                        AtRuleBlock::Items(self.consume_declaration_list(true))
                    };
                    self.consume_closing_brace();
                    return Some(AtRule {
                        name,
                        prelude: component_values_to_string(&trim_whitespace(prelude)),
                        block: Some(block),
                    });
                }
                _ => prelude.push(self.consume_component_value()),
            }
        }
        if name == "apply" {
            let _ = warn_once("CSS", "@apply is only valid inside a declaration block");
            return None;
        }
        Some(AtRule {
            name,
            prelude: component_values_to_string(&trim_whitespace(prelude)),
            block: None,
        })
    }

    /// [§ 5.4.3 Consume a qualified rule](https://www.w3.org/TR/css-syntax-3/#consume-qualified-rule)
    fn consume_qualified_rule(&mut self, nested: bool) -> Option<StyleRule> {
        let mut prelude = Vec::new();
        loop {
            match self.peek() {
                // "This is a parse error. Return nothing."
                CSSToken::EOF => return None,
                CSSToken::RightBrace if nested => return None,
                CSSToken::LeftBrace => {
                    self.position += 1;
                    let items = self.consume_declaration_list(true);
                    self.consume_closing_brace();
                    let selectors = split_selector_list(&prelude);
                    if selectors.is_empty() {
                        return None;
                    }
                    return Some(StyleRule { selectors, items });
                }
                _ => prelude.push(self.consume_component_value()),
            }
        }
    }

    /// [§ 5.4.5 Consume a list of declarations](https://www.w3.org/TR/css-syntax-3/#consume-list-of-declarations)
    fn consume_declaration_list(&mut self, nested: bool) -> Vec<BlockItem> {
        let mut items = Vec::new();
        loop {
            match self.peek() {
                CSSToken::EOF => return items,
                CSSToken::RightBrace if nested => return items,
                CSSToken::Whitespace | CSSToken::Semicolon | CSSToken::RightBrace => {
                    self.position += 1;
                }
                CSSToken::AtKeyword(name) if name.eq_ignore_ascii_case("apply") => {
                    self.position += 1;
                    let values = self.consume_until_declaration_end();
                    match apply_target(&values) {
                        Some(mixin) => items.push(BlockItem::Apply(mixin)),
                        None => {
                            let _ = warn_once(
                                "CSS",
                                &format!(
                                    "ignoring @apply without a custom property name: '{}'",
                                    component_values_to_string(&values)
                                ),
                            );
                        }
                    }
                }
                CSSToken::AtKeyword(_) => {
                    // Nested at-rules in a declaration block are not supported.
                    let _ = self.consume_at_rule(true);
                }
                CSSToken::Ident(_) => {
                    let values = self.consume_until_declaration_end();
                    if let Some(declaration) = make_declaration(values) {
                        items.push(BlockItem::Declaration(declaration));
                    }
                }
                _ => {
                    // "This is a parse error." Skip to the end of the declaration.
                    let _ = self.consume_until_declaration_end();
                }
            }
        }
    }

    /// Collect component values up to, not including, the next top-level
    /// `;` or `}`. A `;` is consumed.
    fn consume_until_declaration_end(&mut self) -> Vec<ComponentValue> {
        let mut values = Vec::new();
        loop {
            match self.peek() {
                CSSToken::Semicolon => {
                    self.position += 1;
                    return values;
                }
                CSSToken::RightBrace | CSSToken::EOF => return values,
                _ => values.push(self.consume_component_value()),
            }
        }
    }

    /// [§ 5.4.7 Consume a component value](https://www.w3.org/TR/css-syntax-3/#consume-component-value)
    fn consume_component_value(&mut self) -> ComponentValue {
        match self.next_token() {
            CSSToken::LeftBrace => self.consume_simple_block('{', &CSSToken::RightBrace),
            CSSToken::LeftBracket => self.consume_simple_block('[', &CSSToken::RightBracket),
            CSSToken::LeftParen => self.consume_simple_block('(', &CSSToken::RightParen),
            CSSToken::Function(name) => ComponentValue::Function {
                name,
                value: self.consume_block_contents(&CSSToken::RightParen),
            },
            token => ComponentValue::Token(token),
        }
    }

    /// [§ 5.4.8 Consume a simple block](https://www.w3.org/TR/css-syntax-3/#consume-simple-block)
    fn consume_simple_block(&mut self, token: char, ending: &CSSToken) -> ComponentValue {
        ComponentValue::Block {
            token,
            value: self.consume_block_contents(ending),
        }
    }

    fn consume_block_contents(&mut self, ending: &CSSToken) -> Vec<ComponentValue> {
        let mut value = Vec::new();
        loop {
            let token = self.peek();
            if token == ending {
                self.position += 1;
                return value;
            }
            if token.is_eof() {
                return value;
            }
            value.push(self.consume_component_value());
        }
    }

    fn consume_closing_brace(&mut self) {
        if matches!(self.peek(), CSSToken::RightBrace) {
            self.position += 1;
        }
    }

    fn at_eof(&self) -> bool {
        self.peek().is_eof()
    }

    fn peek(&self) -> &CSSToken {
        self.tokens.get(self.position).unwrap_or(&CSSToken::EOF)
    }

    fn next_token(&mut self) -> CSSToken {
        let token = self.peek().clone();
        if !token.is_eof() {
            self.position += 1;
        }
        token
    }
}

/// Build a declaration from `name : value [!important]` component values.
fn make_declaration(values: Vec<ComponentValue>) -> Option<Declaration> {
    let mut iter = values.into_iter();
    let Some(ComponentValue::Token(CSSToken::Ident(name))) = iter.next() else {
        return None;
    };
    let mut rest = iter.skip_while(ComponentValue::is_whitespace);
    if !matches!(rest.next(), Some(ComponentValue::Token(CSSToken::Colon))) {
        let _ = warn_once("CSS", &format!("dropping declaration '{name}' without ':'"));
        return None;
    }
    let mut value = trim_whitespace(rest.collect());
    let important = strip_important(&mut value);
    let name = if name.starts_with("--") {
        name
    } else {
        name.to_ascii_lowercase()
    };
    Some(Declaration {
        name,
        value,
        important,
    })
}

/// Remove a trailing `!important` from `value`, returning whether it was present.
fn strip_important(value: &mut Vec<ComponentValue>) -> bool {
    let n = value.len();
    if n < 2 {
        return false;
    }
    let is_bang = matches!(&value[n - 2], ComponentValue::Token(CSSToken::Delim('!')));
    let is_important = matches!(
        &value[n - 1],
        ComponentValue::Token(CSSToken::Ident(word)) if word.eq_ignore_ascii_case("important")
    );
    if !(is_bang && is_important) {
        return false;
    }
    value.truncate(n - 2);
    let trimmed = trim_whitespace(std::mem::take(value));
    *value = trimmed;
    true
}

/// The mixin named by an `@apply` prelude: `--name` or the legacy `(--name)`.
fn apply_target(values: &[ComponentValue]) -> Option<String> {
    values.iter().find_map(|value| match value {
        ComponentValue::Token(CSSToken::Ident(name)) if name.starts_with("--") => Some(name.clone()),
        ComponentValue::Block { token: '(', value } => apply_target(value),
        _ => None,
    })
}

/// Split a qualified rule prelude at top-level commas into normalized
/// selector strings.
fn split_selector_list(prelude: &[ComponentValue]) -> Vec<String> {
    prelude
        .split(|value| matches!(value, ComponentValue::Token(CSSToken::Comma)))
        .map(|part| component_values_to_string(&trim_whitespace(part.to_vec())))
        .filter(|selector| !selector.is_empty())
        .collect()
}

/// Drop leading and trailing whitespace tokens.
pub(crate) fn trim_whitespace(mut values: Vec<ComponentValue>) -> Vec<ComponentValue> {
    while values.last().is_some_and(ComponentValue::is_whitespace) {
        let _ = values.pop();
    }
    let start = values
        .iter()
        .position(|v| !v.is_whitespace())
        .unwrap_or(values.len());
    let _ = values.drain(..start);
    values
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_list_is_split_and_trimmed() {
        let sheet = parse_stylesheet(":host ,  .a   > .b { color: red }");
        let Rule::Style(rule) = &sheet.rules[0] else {
            panic!("expected a style rule");
        };
        assert_eq!(rule.selectors, vec![":host", ".a > .b"]);
    }

    #[test]
    fn test_important_is_stripped() {
        let items = parse_declaration_list("color: red !important");
        let BlockItem::Declaration(d) = &items[0] else {
            panic!("expected a declaration");
        };
        assert!(d.important);
        assert_eq!(d.value_text(), "red");
    }

    #[test]
    fn test_custom_property_name_keeps_case() {
        let items = parse_declaration_list("--Brand-Color: Red; COLOR: blue");
        let names: Vec<&str> = items
            .iter()
            .filter_map(|i| match i {
                BlockItem::Declaration(d) => Some(d.name.as_str()),
                BlockItem::Apply(_) => None,
            })
            .collect();
        assert_eq!(names, vec!["--Brand-Color", "color"]);
    }

    #[test]
    fn test_legacy_apply_syntax() {
        let items = parse_declaration_list("@apply(--toolbar);");
        assert_eq!(items, vec![BlockItem::Apply("--toolbar".to_string())]);
    }

    #[test]
    fn test_unterminated_rule_is_dropped() {
        let sheet = parse_stylesheet("a { color: red } b");
        assert_eq!(sheet.rules.len(), 1);
    }
}
