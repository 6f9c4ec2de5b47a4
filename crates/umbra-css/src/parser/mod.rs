//! CSS parser module.

/// Parsed stylesheet types.
pub mod ast;
/// CSS parser implementation per [§ 5 Parsing](https://www.w3.org/TR/css-syntax-3/#parsing).
pub mod css_parser;

pub use ast::{AtRule, AtRuleBlock, BlockItem, ComponentValue, Declaration, Rule, StyleRule, Stylesheet};
pub use css_parser::{CSSParser, parse_component_values, parse_declaration_list, parse_stylesheet};
