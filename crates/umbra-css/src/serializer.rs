//! Stylesheet serialization.
//!
//! [CSSOM § 6.7.2 Serializing CSS Values](https://www.w3.org/TR/cssom-1/#serializing-css-values)
//!
//! The output is meant to be parsed again: re-parsing `to_css_text(sheet)`
//! yields a stylesheet equal to `sheet`.

use std::fmt::Write as _;

use crate::parser::{AtRule, AtRuleBlock, BlockItem, ComponentValue, Declaration, Rule, StyleRule, Stylesheet};

/// Serialize a whole stylesheet.
#[must_use]
pub fn to_css_text(sheet: &Stylesheet) -> String {
    let mut out = String::new();
    write_rules(&mut out, &sheet.rules, 0);
    out
}

/// `name: value` with an optional `!important`, no trailing semicolon.
#[must_use]
pub fn declaration_to_css(declaration: &Declaration) -> String {
    let mut out = format!("{}: {}", declaration.name, declaration.value_text());
    if declaration.important {
        out.push_str(" !important");
    }
    out
}

/// Serialize component values back into source text. Whitespace runs
/// collapse to a single space.
#[must_use]
pub fn component_values_to_string(values: &[ComponentValue]) -> String {
    let mut out = String::new();
    for value in values {
        write_component_value(&mut out, value);
    }
    out
}

fn write_component_value(out: &mut String, value: &ComponentValue) {
    match value {
        ComponentValue::Token(token) => {
            let _ = write!(out, "{token}");
        }
        ComponentValue::Function { name, value } => {
            out.push_str(name);
            out.push('(');
            for v in value {
                write_component_value(out, v);
            }
            out.push(')');
        }
        ComponentValue::Block { token, value } => {
            let close = match *token {
                '{' => '}',
                '[' => ']',
                _ => ')',
            };
            out.push(*token);
            for v in value {
                write_component_value(out, v);
            }
            out.push(close);
        }
    }
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}

fn write_rules(out: &mut String, rules: &[Rule], depth: usize) {
    for rule in rules {
        match rule {
            Rule::Style(style) => write_style_rule(out, style, depth),
            Rule::At(at) => write_at_rule(out, at, depth),
        }
    }
}

fn write_style_rule(out: &mut String, rule: &StyleRule, depth: usize) {
    indent(out, depth);
    out.push_str(&rule.selector_text());
    out.push_str(" {\n");
    write_items(out, &rule.items, depth + 1);
    indent(out, depth);
    out.push_str("}\n");
}

fn write_at_rule(out: &mut String, rule: &AtRule, depth: usize) {
    indent(out, depth);
    out.push('@');
    out.push_str(&rule.name);
    if !rule.prelude.is_empty() {
        out.push(' ');
        out.push_str(&rule.prelude);
    }
    match &rule.block {
        None => out.push_str(";\n"),
        Some(AtRuleBlock::Rules(rules)) => {
            out.push_str(" {\n");
            write_rules(out, rules, depth + 1);
            indent(out, depth);
            out.push_str("}\n");
        }
        Some(AtRuleBlock::Items(items)) => {
            out.push_str(" {\n");
            write_items(out, items, depth + 1);
            indent(out, depth);
            out.push_str("}\n");
        }
    }
}

fn write_items(out: &mut String, items: &[BlockItem], depth: usize) {
    for item in items {
        indent(out, depth);
        match item {
            BlockItem::Declaration(d) => out.push_str(&declaration_to_css(d)),
            BlockItem::Apply(name) => {
                out.push_str("@apply ");
                out.push_str(name);
            }
        }
        out.push_str(";\n");
    }
}
