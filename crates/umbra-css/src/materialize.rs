//! Rendering a rule-set against resolved custom properties.
//!
//! The output is plain CSS with no custom properties left in it: assignments
//! are dropped, `var()` is replaced by the resolved value and `@apply` is
//! expanded from the mixin's value.

use umbra_common::warning::warn_once;

use crate::parser::{
    AtRule, AtRuleBlock, BlockItem, ComponentValue, Declaration, Rule, StyleRule, Stylesheet,
    parse_component_values, parse_declaration_list,
};
use crate::properties::PropertyMap;
use crate::serializer::{component_values_to_string, to_css_text};
use crate::substitute::{contains_var, substitute_to_string};
use crate::transformer::scope_selector;

const MAX_APPLY_DEPTH: u32 = 16;

/// Narrows rendered selectors to one generated scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scoping {
    /// The element type's host selector, e.g. `x-foo`.
    pub host_selector: String,
    /// The scope token, e.g. `x-foo-3`.
    pub token: String,
}

/// Render `sheet` with `props` substituted, scoping selectors when asked.
///
/// Rules left without declarations are omitted.
#[must_use]
pub fn render_with_properties(sheet: &Stylesheet, props: &PropertyMap, scoping: Option<&Scoping>) -> String {
    let rendered = Stylesheet {
        rules: render_rules(&sheet.rules, props, scoping),
    };
    to_css_text(&rendered)
}

fn render_rules(rules: &[Rule], props: &PropertyMap, scoping: Option<&Scoping>) -> Vec<Rule> {
    let mut out = Vec::new();
    for rule in rules {
        match rule {
            Rule::Style(style) => {
                let items = render_items(&style.items, props, 0);
                if items.is_empty() {
                    continue;
                }
                let selectors = match scoping {
                    Some(scope) => style
                        .selectors
                        .iter()
                        .map(|s| scope_selector(s, &scope.host_selector, &scope.token))
                        .collect(),
                    None => style.selectors.clone(),
                };
                out.push(Rule::Style(StyleRule { selectors, items }));
            }
            Rule::At(at) => {
                let block = match &at.block {
                    None => None,
                    Some(AtRuleBlock::Rules(nested)) => {
                        // Keyframe selectors are offsets, not elements.
                        let nested_scoping = if at.is_keyframes() { None } else { scoping };
                        let nested = render_rules(nested, props, nested_scoping);
                        if nested.is_empty() {
                            continue;
                        }
                        Some(AtRuleBlock::Rules(nested))
                    }
                    Some(AtRuleBlock::Items(items)) => {
                        let items = render_items(items, props, 0);
                        if items.is_empty() {
                            continue;
                        }
                        Some(AtRuleBlock::Items(items))
                    }
                };
                out.push(Rule::At(AtRule {
                    name: at.name.clone(),
                    prelude: at.prelude.clone(),
                    block,
                }));
            }
        }
    }
    out
}

fn render_items(items: &[BlockItem], props: &PropertyMap, depth: u32) -> Vec<BlockItem> {
    let mut out = Vec::new();
    for item in items {
        match item {
            BlockItem::Declaration(d) if d.is_custom_property() => {}
            BlockItem::Declaration(d) if contains_var(&d.value) => {
                let substituted = substitute_to_string(&d.value, &mut |name: &str| props.get(name).cloned());
                match substituted {
                    Some(text) => out.push(BlockItem::Declaration(Declaration::new(
                        d.name.clone(),
                        parse_component_values(&text),
                        d.important,
                    ))),
                    None => tracing::trace!(property = %d.name, "declaration dropped, unresolved var()"),
                }
            }
            BlockItem::Declaration(d) => out.push(BlockItem::Declaration(d.clone())),
            BlockItem::Apply(name) => out.extend(expand_apply(name, props, depth)),
        }
    }
    out
}

fn expand_apply(name: &str, props: &PropertyMap, depth: u32) -> Vec<BlockItem> {
    if depth >= MAX_APPLY_DEPTH {
        let _ = warn_once("umbra-css", &format!("@apply {name} nests too deeply"));
        return Vec::new();
    }
    let Some(value) = props.get(name) else {
        let _ = warn_once("umbra-css", &format!("@apply of unknown mixin {name}"));
        return Vec::new();
    };
    match parse_component_values(value).as_slice() {
        [ComponentValue::Block { token: '{', value: body }] => {
            let body = parse_declaration_list(&component_values_to_string(body));
            render_items(&body, props, depth + 1)
        }
        _ => {
            let _ = warn_once("umbra-css", &format!("{name} is not a mixin and cannot be applied"));
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_stylesheet;

    fn props(pairs: &[(&str, &str)]) -> PropertyMap {
        pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()
    }

    #[test]
    fn test_substitutes_and_drops_assignments() {
        let sheet = parse_stylesheet(":host { --c: red; color: var(--c); } .empty { --only: 1; }");
        let css = render_with_properties(&sheet, &props(&[("--c", "blue")]), None);
        assert_eq!(css, ":host {\n  color: blue;\n}\n");
    }

    #[test]
    fn test_unresolved_declaration_dropped() {
        let sheet = parse_stylesheet("p { color: var(--nope); margin: 0; }");
        let css = render_with_properties(&sheet, &PropertyMap::new(), None);
        assert_eq!(css, "p {\n  margin: 0;\n}\n");
    }

    #[test]
    fn test_apply_expansion_and_scoping() {
        let sheet = parse_stylesheet("x-foo { @apply --m; } .in { border: 0; }");
        let scoping = Scoping {
            host_selector: "x-foo".to_string(),
            token: "x-foo-1".to_string(),
        };
        let css = render_with_properties(&sheet, &props(&[("--m", "{ padding: 2px; }")]), Some(&scoping));
        assert_eq!(css, ".x-foo-1 {\n  padding: 2px;\n}\n.x-foo-1 .in {\n  border: 0;\n}\n");
    }
}
