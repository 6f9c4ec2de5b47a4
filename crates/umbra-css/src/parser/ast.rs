//! Parsed stylesheet representation.
//!
//! The tree is shared read-only between every instance of an element type
//! once it has been prepared, so everything here is plain owned data that is
//! cheap to `Clone` into an `Rc`.

use crate::serializer::component_values_to_string;
use crate::tokenizer::CSSToken;

/// [§ 5.3.7 Consume a component value](https://www.w3.org/TR/css-syntax-3/#consume-a-component-value)
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentValue {
    /// A preserved token.
    Token(CSSToken),
    /// A function with its contents.
    Function {
        /// The function name.
        name: String,
        /// The function arguments.
        value: Vec<ComponentValue>,
    },
    /// A simple block.
    Block {
        /// The opening token character: `{`, `[` or `(`.
        token: char,
        /// The block contents.
        value: Vec<ComponentValue>,
    },
}

impl ComponentValue {
    /// Returns true for a whitespace token.
    #[must_use]
    pub const fn is_whitespace(&self) -> bool {
        matches!(self, Self::Token(CSSToken::Whitespace))
    }
}

/// [§ 5.4.6 Consume a declaration](https://www.w3.org/TR/css-syntax-3/#consume-declaration)
///
/// A CSS declaration (e.g., `color: red` or `--accent: var(--brand)`).
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    /// The property name. Custom property names keep their case.
    pub name: String,
    /// The value, trimmed of leading and trailing whitespace.
    pub value: Vec<ComponentValue>,
    /// Whether the declaration has `!important`.
    pub important: bool,
}

impl Declaration {
    /// Build a declaration from a name and already-parsed value.
    pub fn new(name: impl Into<String>, value: Vec<ComponentValue>, important: bool) -> Self {
        Self {
            name: name.into(),
            value,
            important,
        }
    }

    /// [CSS Variables § 2](https://www.w3.org/TR/css-variables-1/#defining-variables)
    /// "A custom property is any property whose name starts with two dashes."
    #[must_use]
    pub fn is_custom_property(&self) -> bool {
        self.name.starts_with("--")
    }

    /// The value serialized back to text.
    #[must_use]
    pub fn value_text(&self) -> String {
        component_values_to_string(&self.value)
    }

    /// If the value is a single `{}` block (a mixin definition such as
    /// `--toolbar: { color: red; }`), return the block contents.
    #[must_use]
    pub fn mixin_body(&self) -> Option<&[ComponentValue]> {
        match self.value.as_slice() {
            [ComponentValue::Block { token: '{', value }] => Some(value),
            _ => None,
        }
    }
}

/// An entry inside a declaration block.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockItem {
    /// A plain declaration.
    Declaration(Declaration),
    /// `@apply --mixin-name;`
    Apply(String),
}

/// [§ 5.4.3 Consume a qualified rule](https://www.w3.org/TR/css-syntax-3/#consume-qualified-rule)
///
/// A style rule: a selector list and a declaration block.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleRule {
    /// The comma-separated selectors, each with whitespace collapsed.
    pub selectors: Vec<String>,
    /// The declarations and `@apply` entries of the block, in source order.
    pub items: Vec<BlockItem>,
}

impl StyleRule {
    /// The selector list joined back together.
    #[must_use]
    pub fn selector_text(&self) -> String {
        self.selectors.join(", ")
    }

    /// Iterate over the plain declarations of this rule.
    pub fn declarations(&self) -> impl Iterator<Item = &Declaration> {
        self.items.iter().filter_map(|item| match item {
            BlockItem::Declaration(d) => Some(d),
            BlockItem::Apply(_) => None,
        })
    }
}

/// Contents of an at-rule block.
#[derive(Debug, Clone, PartialEq)]
pub enum AtRuleBlock {
    /// Nested rules (`@media`, `@supports`, `@keyframes`, ...).
    Rules(Vec<Rule>),
    /// A declaration block (`@font-face`, `@page`, ...).
    Items(Vec<BlockItem>),
}

/// [§ 5.4.2 Consume an at-rule](https://www.w3.org/TR/css-syntax-3/#consume-at-rule)
#[derive(Debug, Clone, PartialEq)]
pub struct AtRule {
    /// The at-keyword name (without the `@`), lowercased.
    pub name: String,
    /// The prelude, serialized and trimmed.
    pub prelude: String,
    /// The optional block.
    pub block: Option<AtRuleBlock>,
}

impl AtRule {
    /// `@keyframes` and its vendor-prefixed spellings. Selectors inside are
    /// keyframe offsets and are never scoped or matched.
    #[must_use]
    pub fn is_keyframes(&self) -> bool {
        self.name.ends_with("keyframes")
    }
}

/// A CSS rule (either a style rule or an at-rule).
#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    /// A style rule (qualified rule).
    Style(StyleRule),
    /// An at-rule.
    At(AtRule),
}

/// [§ 5.3.3 Parse a stylesheet](https://www.w3.org/TR/css-syntax-3/#parse-stylesheet)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Stylesheet {
    /// The list of rules in the stylesheet.
    pub rules: Vec<Rule>,
}

impl Stylesheet {
    /// Every style rule, descending into grouping at-rules but not into
    /// `@keyframes`.
    #[must_use]
    pub fn style_rules(&self) -> Vec<&StyleRule> {
        fn walk<'a>(rules: &'a [Rule], out: &mut Vec<&'a StyleRule>) {
            for rule in rules {
                match rule {
                    Rule::Style(style) => out.push(style),
                    Rule::At(at) if !at.is_keyframes() => {
                        if let Some(AtRuleBlock::Rules(nested)) = &at.block {
                            walk(nested, out);
                        }
                    }
                    Rule::At(_) => {}
                }
            }
        }
        let mut out = Vec::new();
        walk(&self.rules, &mut out);
        out
    }

    /// Mutable counterpart of [`Stylesheet::style_rules`].
    pub fn style_rules_mut(&mut self) -> Vec<&mut StyleRule> {
        fn walk<'a>(rules: &'a mut [Rule], out: &mut Vec<&'a mut StyleRule>) {
            for rule in rules {
                match rule {
                    Rule::Style(style) => out.push(style),
                    Rule::At(at) if !at.is_keyframes() => {
                        if let Some(AtRuleBlock::Rules(nested)) = &mut at.block {
                            walk(nested, out);
                        }
                    }
                    Rule::At(_) => {}
                }
            }
        }
        let mut out = Vec::new();
        walk(&mut self.rules, &mut out);
        out
    }

    /// Returns true when the stylesheet has no rules at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
