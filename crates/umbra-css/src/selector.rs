//! Selector parsing, serialization and matching.
//!
//! [Selectors Level 4](https://www.w3.org/TR/selectors-4/) plus the
//! [shadow-tree selectors](https://drafts.csswg.org/css-scoping-1/#host-selector)
//! a component's own rule-set is written in.
//!
//! Matching works on real shadow trees: an element inside a shadow root can
//! only see ancestors up to that root, and the root's host is reachable only
//! as the featureless `:host`. Pseudo-classes other than `:root`, `:host` and
//! `:not()` never match; they are kept verbatim so selectors can be rewritten
//! and printed again without loss.

use core::fmt;
use std::iter::Peekable;
use std::str::Chars;

use umbra_dom::{DomTree, ElementData, NodeId};

/// Attribute selector operators per [§ 6.4](https://www.w3.org/TR/selectors-4/#attribute-selectors).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeOperator {
    /// `[att=val]`
    Equals,
    /// `[att~=val]`
    Includes,
    /// `[att|=val]`
    DashMatch,
    /// `[att^=val]`
    Prefix,
    /// `[att$=val]`
    Suffix,
    /// `[att*=val]`
    Substring,
}

impl AttributeOperator {
    const fn symbol(self) -> &'static str {
        match self {
            Self::Equals => "=",
            Self::Includes => "~=",
            Self::DashMatch => "|=",
            Self::Prefix => "^=",
            Self::Suffix => "$=",
            Self::Substring => "*=",
        }
    }

    fn test(self, actual: &str, expected: &str) -> bool {
        match self {
            Self::Equals => actual == expected,
            Self::Includes => actual.split_ascii_whitespace().any(|w| w == expected),
            Self::DashMatch => {
                actual == expected
                    || actual
                        .strip_prefix(expected)
                        .is_some_and(|rest| rest.starts_with('-'))
            }
            Self::Prefix => !expected.is_empty() && actual.starts_with(expected),
            Self::Suffix => !expected.is_empty() && actual.ends_with(expected),
            Self::Substring => !expected.is_empty() && actual.contains(expected),
        }
    }
}

/// `[name]` or `[name <op> value]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSelector {
    /// Attribute name.
    pub name: String,
    /// Operator and expected value; `None` for a presence test.
    pub matcher: Option<(AttributeOperator, String)>,
}

/// [§ 3.1 Simple selectors](https://www.w3.org/TR/selectors-4/#simple)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimpleSelector {
    /// `div`
    Type(String),
    /// `*`
    Universal,
    /// `.name`
    Class(String),
    /// `#name`
    Id(String),
    /// `[...]`
    Attribute(AttributeSelector),
    /// `:host` or `:host(<compound>)`
    Host(Option<CompoundSelector>),
    /// `:root`
    Root,
    /// `:not(<compound>)`
    Not(CompoundSelector),
    /// Any other pseudo-class, stored without the leading colon.
    PseudoClass(String),
    /// A pseudo-element, stored without the leading colons.
    PseudoElement(String),
}

impl SimpleSelector {
    /// Pseudo-classes and pseudo-elements, which scoping keeps at the end of a compound.
    #[must_use]
    pub const fn is_pseudo(&self) -> bool {
        matches!(
            self,
            Self::Host(_) | Self::Root | Self::Not(_) | Self::PseudoClass(_) | Self::PseudoElement(_)
        )
    }
}

/// [§ 4.2 Compound selectors](https://www.w3.org/TR/selectors-4/#compound)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompoundSelector {
    /// The simple selectors, in source order.
    pub simple_selectors: Vec<SimpleSelector>,
}

impl CompoundSelector {
    /// The `:host` simple selector of this compound, if any.
    #[must_use]
    pub fn host(&self) -> Option<&SimpleSelector> {
        self.simple_selectors
            .iter()
            .find(|s| matches!(s, SimpleSelector::Host(_)))
    }

    /// Insert `simple` after the last non-pseudo simple selector.
    pub fn insert_before_pseudos(&mut self, simple: SimpleSelector) {
        let at = self
            .simple_selectors
            .iter()
            .position(SimpleSelector::is_pseudo)
            .unwrap_or(self.simple_selectors.len());
        self.simple_selectors.insert(at, simple);
    }
}

/// [§ 16 Combinators](https://www.w3.org/TR/selectors-4/#combinators)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// `A B`
    Descendant,
    /// `A > B`
    Child,
    /// `A + B`
    NextSibling,
    /// `A ~ B`
    SubsequentSibling,
}

/// [§ 4.3 Complex selectors](https://www.w3.org/TR/selectors-4/#complex)
///
/// Stored left to right: `combinators[i]` sits between `compounds[i]` and
/// `compounds[i + 1]`. The last compound is the subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplexSelector {
    /// Compound selectors, left to right.
    pub compounds: Vec<CompoundSelector>,
    /// Combinators between consecutive compounds.
    pub combinators: Vec<Combinator>,
}

impl ComplexSelector {
    /// [§ 4.1 Selector Matching](https://www.w3.org/TR/selectors-4/#match-a-selector-against-an-element)
    ///
    /// Match against an element in tree context. The element is matched as a
    /// regular element of its own tree, never as a featureless host.
    #[must_use]
    pub fn matches(&self, tree: &DomTree, node: NodeId) -> bool {
        !self.compounds.is_empty() && self.matches_at(self.compounds.len() - 1, tree, node, false)
    }

    /// Whether this is a bare `:host` / `:host(<compound>)` selector that
    /// matches `host` from inside its own shadow tree.
    #[must_use]
    pub fn matches_host(&self, tree: &DomTree, host: NodeId) -> bool {
        match self.compounds.as_slice() {
            [compound] => compound.host().is_some() && compound_matches(compound, tree, host, true),
            _ => false,
        }
    }

    fn matches_at(&self, index: usize, tree: &DomTree, node: NodeId, as_host: bool) -> bool {
        if !compound_matches(&self.compounds[index], tree, node, as_host) {
            return false;
        }
        let Some(left) = index.checked_sub(1) else {
            return true;
        };
        match self.combinators[left] {
            Combinator::Child => parent_element(tree, node, as_host)
                .is_some_and(|(parent, host)| self.matches_at(left, tree, parent, host)),
            Combinator::Descendant => {
                let mut current = parent_element(tree, node, as_host);
                while let Some((ancestor, host)) = current {
                    if self.matches_at(left, tree, ancestor, host) {
                        return true;
                    }
                    current = parent_element(tree, ancestor, host);
                }
                false
            }
            // Siblings of the featureless host are outside the shadow tree.
            Combinator::NextSibling => {
                !as_host
                    && preceding_elements(tree, node)
                        .next()
                        .is_some_and(|sibling| self.matches_at(left, tree, sibling, false))
            }
            Combinator::SubsequentSibling => {
                !as_host
                    && preceding_elements(tree, node)
                        .any(|sibling| self.matches_at(left, tree, sibling, false))
            }
        }
    }
}

/// The next element up, crossing into the shadow host (as a featureless
/// `:host`) when leaving a shadow root. Nothing is reachable past a host.
fn parent_element(tree: &DomTree, node: NodeId, as_host: bool) -> Option<(NodeId, bool)> {
    if as_host {
        return None;
    }
    let parent = tree.parent(node)?;
    if let Some(host) = tree.host(parent) {
        return Some((host, true));
    }
    tree.as_element(parent).map(|_| (parent, false))
}

fn preceding_elements(tree: &DomTree, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
    std::iter::successors(tree.prev_sibling(node), |&id| tree.prev_sibling(id))
        .filter(|&id| tree.as_element(id).is_some())
}

fn compound_matches(compound: &CompoundSelector, tree: &DomTree, node: NodeId, as_host: bool) -> bool {
    let Some(element) = tree.as_element(node) else {
        return false;
    };
    if as_host {
        // [CSS Scoping § 3.1.1] "the shadow host is featureless": only :host applies.
        return compound.simple_selectors.iter().all(|simple| match simple {
            SimpleSelector::Host(None) => true,
            SimpleSelector::Host(Some(inner)) => compound_matches(inner, tree, node, false),
            _ => false,
        });
    }
    compound
        .simple_selectors
        .iter()
        .all(|simple| simple_matches(simple, tree, node, element))
}

fn simple_matches(simple: &SimpleSelector, tree: &DomTree, node: NodeId, element: &ElementData) -> bool {
    match simple {
        SimpleSelector::Type(name) => element.tag_name.eq_ignore_ascii_case(name),
        SimpleSelector::Universal => true,
        SimpleSelector::Class(class) => element.has_class(class),
        SimpleSelector::Id(id) => element.id().is_some_and(|v| v == id),
        SimpleSelector::Attribute(attr) => match (&attr.matcher, element.get_attribute(&attr.name)) {
            (None, value) => value.is_some(),
            (Some((op, expected)), Some(actual)) => op.test(actual, expected),
            (Some(_), None) => false,
        },
        SimpleSelector::Root => tree.document_element() == Some(node),
        SimpleSelector::Not(inner) => !compound_matches(inner, tree, node, false),
        SimpleSelector::Host(_) | SimpleSelector::PseudoClass(_) | SimpleSelector::PseudoElement(_) => false,
    }
}

/// Parse a single complex selector. Returns `None` for malformed input.
#[must_use]
pub fn parse_selector(raw: &str) -> Option<ComplexSelector> {
    let mut parser = SelectorParser {
        chars: raw.trim().chars().peekable(),
    };
    let selector = parser.parse_complex()?;
    if parser.chars.peek().is_some() {
        return None;
    }
    Some(selector)
}

/// Parse a compound selector such as the argument of `:host()`.
#[must_use]
pub fn parse_compound(raw: &str) -> Option<CompoundSelector> {
    let mut parser = SelectorParser {
        chars: raw.trim().chars().peekable(),
    };
    let compound = parser.parse_compound()?;
    if parser.chars.peek().is_some() {
        return None;
    }
    Some(compound)
}

struct SelectorParser<'a> {
    chars: Peekable<Chars<'a>>,
}

impl SelectorParser<'_> {
    fn parse_complex(&mut self) -> Option<ComplexSelector> {
        let mut compounds = Vec::new();
        let mut combinators = Vec::new();
        loop {
            let saw_whitespace = self.skip_whitespace();
            let explicit = match self.chars.peek() {
                None => break,
                Some('>') => Some(Combinator::Child),
                Some('+') => Some(Combinator::NextSibling),
                Some('~') => Some(Combinator::SubsequentSibling),
                Some(_) => None,
            };
            if let Some(combinator) = explicit {
                if compounds.is_empty() {
                    return None;
                }
                let _ = self.chars.next();
                let _ = self.skip_whitespace();
                combinators.push(combinator);
            } else if !compounds.is_empty() {
                if !saw_whitespace {
                    return None;
                }
                combinators.push(Combinator::Descendant);
            }
            compounds.push(self.parse_compound()?);
        }
        if compounds.is_empty() {
            return None;
        }
        Some(ComplexSelector {
            compounds,
            combinators,
        })
    }

    fn parse_compound(&mut self) -> Option<CompoundSelector> {
        let mut simple_selectors = Vec::new();
        while let Some(&c) = self.chars.peek() {
            let simple = match c {
                '*' => {
                    let _ = self.chars.next();
                    SimpleSelector::Universal
                }
                '.' => {
                    let _ = self.chars.next();
                    SimpleSelector::Class(self.ident()?)
                }
                '#' => {
                    let _ = self.chars.next();
                    SimpleSelector::Id(self.ident()?)
                }
                '[' => {
                    let _ = self.chars.next();
                    SimpleSelector::Attribute(self.attribute()?)
                }
                ':' => {
                    let _ = self.chars.next();
                    self.pseudo()?
                }
                c if simple_selectors.is_empty() && (is_ident_start(c) || c == '-') => {
                    SimpleSelector::Type(self.ident()?)
                }
                _ => break,
            };
            simple_selectors.push(simple);
        }
        if simple_selectors.is_empty() {
            return None;
        }
        Some(CompoundSelector { simple_selectors })
    }

    fn pseudo(&mut self) -> Option<SimpleSelector> {
        let element = self.chars.peek() == Some(&':');
        if element {
            let _ = self.chars.next();
        }
        let name = self.ident()?;
        let args = if self.chars.peek() == Some(&'(') {
            let _ = self.chars.next();
            Some(self.balanced_arguments()?)
        } else {
            None
        };
        if element {
            return Some(SimpleSelector::PseudoElement(raw_pseudo(&name, args.as_deref())));
        }
        let simple = match (name.to_ascii_lowercase().as_str(), args) {
            ("host", None) => SimpleSelector::Host(None),
            ("host", Some(arg)) => SimpleSelector::Host(Some(parse_compound(&arg)?)),
            ("root", None) => SimpleSelector::Root,
            ("not", Some(arg)) => SimpleSelector::Not(parse_compound(&arg)?),
            (_, args) => SimpleSelector::PseudoClass(raw_pseudo(&name, args.as_deref())),
        };
        Some(simple)
    }

    fn attribute(&mut self) -> Option<AttributeSelector> {
        let _ = self.skip_whitespace();
        let name = self.ident()?;
        let _ = self.skip_whitespace();
        let operator = match self.chars.next()? {
            ']' => return Some(AttributeSelector { name, matcher: None }),
            '=' => AttributeOperator::Equals,
            c => {
                if self.chars.next()? != '=' {
                    return None;
                }
                match c {
                    '~' => AttributeOperator::Includes,
                    '|' => AttributeOperator::DashMatch,
                    '^' => AttributeOperator::Prefix,
                    '$' => AttributeOperator::Suffix,
                    '*' => AttributeOperator::Substring,
                    _ => return None,
                }
            }
        };
        let _ = self.skip_whitespace();
        let value = match self.chars.peek() {
            Some(&quote @ ('"' | '\'')) => {
                let _ = self.chars.next();
                let mut value = String::new();
                loop {
                    match self.chars.next()? {
                        c if c == quote => break,
                        '\\' => value.push(self.chars.next()?),
                        c => value.push(c),
                    }
                }
                value
            }
            _ => self.ident()?,
        };
        let _ = self.skip_whitespace();
        if self.chars.next()? != ']' {
            return None;
        }
        Some(AttributeSelector {
            name,
            matcher: Some((operator, value)),
        })
    }

    /// Text up to the matching `)`, which is consumed.
    fn balanced_arguments(&mut self) -> Option<String> {
        let mut depth = 1u32;
        let mut text = String::new();
        loop {
            let c = self.chars.next()?;
            match c {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(text);
                    }
                }
                _ => {}
            }
            text.push(c);
        }
    }

    fn ident(&mut self) -> Option<String> {
        let mut ident = String::new();
        while let Some(&c) = self.chars.peek() {
            if c == '\\' {
                let _ = self.chars.next();
                ident.push('\\');
                ident.push(self.chars.next()?);
            } else if is_ident_char(c) {
                ident.push(c);
                let _ = self.chars.next();
            } else {
                break;
            }
        }
        if ident.is_empty() { None } else { Some(ident) }
    }

    fn skip_whitespace(&mut self) -> bool {
        let mut skipped = false;
        while self.chars.peek().is_some_and(|c| c.is_ascii_whitespace()) {
            let _ = self.chars.next();
            skipped = true;
        }
        skipped
    }
}

fn raw_pseudo(name: &str, args: Option<&str>) -> String {
    match args {
        Some(args) => format!("{name}({args})"),
        None => name.to_string(),
    }
}

/// [§ 4.3.10 ident-start code point](https://www.w3.org/TR/css-syntax-3/#ident-start-code-point)
const fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || !c.is_ascii()
}

/// [§ 4.3.9 ident code point](https://www.w3.org/TR/css-syntax-3/#ident-code-point)
const fn is_ident_char(c: char) -> bool {
    is_ident_start(c) || c.is_ascii_digit() || c == '-'
}

impl fmt::Display for SimpleSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Type(name) => f.write_str(name),
            Self::Universal => f.write_str("*"),
            Self::Class(name) => write!(f, ".{name}"),
            Self::Id(name) => write!(f, "#{name}"),
            Self::Attribute(attr) => match &attr.matcher {
                None => write!(f, "[{}]", attr.name),
                Some((op, value)) => {
                    let bare = value.chars().next().is_some_and(is_ident_start)
                        && value.chars().all(is_ident_char);
                    if bare {
                        write!(f, "[{}{}{value}]", attr.name, op.symbol())
                    } else {
                        write!(f, "[{}{}\"{}\"]", attr.name, op.symbol(), value.replace('"', "\\\""))
                    }
                }
            },
            Self::Host(None) => f.write_str(":host"),
            Self::Host(Some(inner)) => write!(f, ":host({inner})"),
            Self::Root => f.write_str(":root"),
            Self::Not(inner) => write!(f, ":not({inner})"),
            Self::PseudoClass(raw) => write!(f, ":{raw}"),
            Self::PseudoElement(raw) => write!(f, "::{raw}"),
        }
    }
}

impl fmt::Display for CompoundSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for simple in &self.simple_selectors {
            write!(f, "{simple}")?;
        }
        Ok(())
    }
}

impl fmt::Display for ComplexSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, compound) in self.compounds.iter().enumerate() {
            if let Some(combinator) = i.checked_sub(1).map(|c| self.combinators[c]) {
                f.write_str(match combinator {
                    Combinator::Descendant => " ",
                    Combinator::Child => " > ",
                    Combinator::NextSibling => " + ",
                    Combinator::SubsequentSibling => " ~ ",
                })?;
            }
            write!(f, "{compound}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_print_host_function() {
        let sel = parse_selector(":host(.wide)   >  .label::before").unwrap();
        assert_eq!(sel.to_string(), ":host(.wide) > .label::before");
        assert_eq!(sel.combinators, vec![Combinator::Child]);
    }

    #[test]
    fn test_attribute_value_quoting() {
        let sel = parse_selector("button[is=x-foo][title='a b']").unwrap();
        assert_eq!(sel.to_string(), "button[is=x-foo][title=\"a b\"]");
    }

    #[test]
    fn test_malformed_selectors() {
        assert!(parse_selector("> a").is_none());
        assert!(parse_selector("a[b").is_none());
        assert!(parse_selector(":host(").is_none());
    }

    #[test]
    fn test_insert_before_pseudos() {
        let mut compound = parse_compound("a.b:hover").unwrap();
        compound.insert_before_pseudos(SimpleSelector::Class("x-foo".to_string()));
        assert_eq!(compound.to_string(), "a.b.x-foo:hover");
    }
}
