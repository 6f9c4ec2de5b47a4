//! Custom property collection and resolution.
//!
//! [CSS Custom Properties § 2](https://www.w3.org/TR/css-variables-1/#defining-variables)
//!
//! A rule-set contributes custom-property assignments to an element in three
//! ways: rules of its own rule-set that target the host from inside
//! (`:host`), rules that target its internal root (`:host > *`, `:root`,
//! `html`), and rules of the enclosing scope's rule-set whose selector
//! matches the element itself.

use std::collections::{HashMap, HashSet};

use umbra_common::warning::warn_once;
use umbra_dom::{DomTree, NodeId};

use crate::parser::{
    AtRuleBlock, BlockItem, ComponentValue, Rule, StyleRule, Stylesheet, parse_component_values,
    parse_declaration_list,
};
use crate::selector::{Combinator, ComplexSelector, SimpleSelector, parse_selector};
use crate::serializer::component_values_to_string;
use crate::substitute::{contains_var, substitute_to_string, var_references};

/// Custom property name to value text.
pub type PropertyMap = HashMap<String, String>;

/// Maximum `var()` nesting followed while resolving one property.
///
/// [§ 2.3 Resolving Dependency Cycles](https://www.w3.org/TR/css-variables-1/#cycles)
const MAX_SUBSTITUTION_DEPTH: u32 = 32;

/// Assignments from a component's own rule-set, split by position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostAndRootProps {
    /// From `:host` and matching `:host(<compound>)` rules.
    pub host_props: PropertyMap,
    /// From `:host > *`, `:root` and `html` rules.
    pub root_props: PropertyMap,
}

/// The custom property names a rule-set assigns or consumes, through
/// `--name:`, `var(--name)` or `@apply --name`, in first-appearance order.
#[must_use]
pub fn decorate_styles(sheet: &Stylesheet) -> Vec<String> {
    fn walk_items(items: &[BlockItem], names: &mut Vec<String>) {
        for item in items {
            match item {
                BlockItem::Declaration(d) => {
                    if d.is_custom_property() {
                        names.push(d.name.clone());
                    }
                    names.extend(var_references(&d.value));
                }
                BlockItem::Apply(name) => names.push(name.clone()),
            }
        }
    }
    fn walk_rules(rules: &[Rule], names: &mut Vec<String>) {
        for rule in rules {
            match rule {
                Rule::Style(style) => walk_items(&style.items, names),
                Rule::At(at) => match &at.block {
                    Some(AtRuleBlock::Rules(nested)) => walk_rules(nested, names),
                    Some(AtRuleBlock::Items(items)) => walk_items(items, names),
                    None => {}
                },
            }
        }
    }

    let mut names = Vec::new();
    walk_rules(&sheet.rules, &mut names);
    let mut seen = HashSet::new();
    names.retain(|name| seen.insert(name.clone()));
    names
}

/// Collect the host and root assignments of `sheet` for `host`.
#[must_use]
pub fn host_and_root_properties(sheet: &Stylesheet, tree: &DomTree, host: NodeId) -> HostAndRootProps {
    let mut props = HostAndRootProps::default();
    for rule in sheet.style_rules() {
        let selectors = parsed_selectors(rule);
        if selectors.iter().any(is_root_selector) {
            collect_assignments(rule, &mut props.root_props);
        } else if selectors.iter().any(|s| s.matches_host(tree, host)) {
            collect_assignments(rule, &mut props.host_props);
        }
    }
    props
}

/// Collect the assignments of every rule in `sheet` whose selector matches
/// `node` in tree context. Later rules win.
#[must_use]
pub fn property_data_from_styles(sheet: &Stylesheet, tree: &DomTree, node: NodeId) -> PropertyMap {
    let mut props = PropertyMap::new();
    for rule in sheet.style_rules() {
        if !rule.declarations().any(|d| d.is_custom_property()) {
            continue;
        }
        if parsed_selectors(rule).iter().any(|s| s.matches(tree, node)) {
            collect_assignments(rule, &mut props);
        }
    }
    props
}

/// `:root`, `html` and `:host > *`.
fn is_root_selector(selector: &ComplexSelector) -> bool {
    match (selector.compounds.as_slice(), selector.combinators.as_slice()) {
        ([only], []) => match only.simple_selectors.as_slice() {
            [SimpleSelector::Root] => true,
            [SimpleSelector::Type(name)] => name.eq_ignore_ascii_case("html"),
            _ => false,
        },
        ([host, any], [Combinator::Child]) => {
            host.simple_selectors == [SimpleSelector::Host(None)] && any.simple_selectors == [SimpleSelector::Universal]
        }
        _ => false,
    }
}

fn parsed_selectors(rule: &StyleRule) -> Vec<ComplexSelector> {
    rule.selectors
        .iter()
        .filter_map(|raw| {
            let parsed = parse_selector(raw);
            if parsed.is_none() {
                let _ = warn_once("umbra-css", &format!("unsupported selector `{raw}` ignored"));
            }
            parsed
        })
        .collect()
}

fn collect_assignments(rule: &StyleRule, into: &mut PropertyMap) {
    for declaration in rule.declarations().filter(|d| d.is_custom_property()) {
        let _ = into.insert(declaration.name.clone(), declaration.value_text());
    }
}

/// Resolve `var()` references between the properties of `props` in place.
///
/// Properties whose references cannot be resolved, directly or through a
/// dependency cycle, are removed. Mixin values (`{ a: b; ... }`) are resolved
/// per declaration and keep only the declarations that resolved.
pub fn reify(props: &mut PropertyMap) {
    let mut reifier = Reifier {
        source: props.clone(),
        resolved: HashMap::new(),
        in_progress: HashSet::new(),
    };
    let names: Vec<String> = props.keys().cloned().collect();
    for name in names {
        match reifier.resolve(&name, 0) {
            Some(value) => {
                let _ = props.insert(name, value);
            }
            None => {
                let _ = props.remove(&name);
            }
        }
    }
}

struct Reifier {
    source: PropertyMap,
    resolved: HashMap<String, Option<String>>,
    in_progress: HashSet<String>,
}

impl Reifier {
    fn resolve(&mut self, name: &str, depth: u32) -> Option<String> {
        if let Some(done) = self.resolved.get(name) {
            return done.clone();
        }
        let raw = self.source.get(name)?.clone();
        if depth > MAX_SUBSTITUTION_DEPTH || !self.in_progress.insert(name.to_string()) {
            return None;
        }
        let value = self.substitute(&raw, depth);
        let _ = self.in_progress.remove(name);
        let _ = self.resolved.insert(name.to_string(), value.clone());
        value
    }

    fn substitute(&mut self, raw: &str, depth: u32) -> Option<String> {
        let values = parse_component_values(raw);
        if !contains_var(&values) {
            return Some(raw.to_string());
        }
        let mut lookup = |referenced: &str| self.resolve(referenced, depth + 1);
        if let [ComponentValue::Block { token: '{', value }] = values.as_slice() {
            let body = parse_declaration_list(&component_values_to_string(value));
            let parts: Vec<String> = body
                .iter()
                .filter_map(|item| match item {
                    BlockItem::Declaration(d) => {
                        substitute_to_string(&d.value, &mut lookup).map(|v| format!("{}: {v}", d.name))
                    }
                    BlockItem::Apply(name) => Some(format!("@apply {name}")),
                })
                .collect();
            return Some(format!("{{ {} }}", parts.join("; ")));
        }
        substitute_to_string(&values, &mut lookup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_stylesheet;

    fn map(pairs: &[(&str, &str)]) -> PropertyMap {
        pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()
    }

    #[test]
    fn test_decorate_styles_order_and_dedup() {
        let sheet = parse_stylesheet(":host { --a: 1px; color: var(--b); } .x { margin: var(--a); @apply --m; }");
        assert_eq!(decorate_styles(&sheet), vec!["--a", "--b", "--m"]);
    }

    #[test]
    fn test_reify_chains_and_fallbacks() {
        let mut props = map(&[("--a", "var(--b)"), ("--b", "blue"), ("--c", "var(--zz, 3px)")]);
        reify(&mut props);
        assert_eq!(props, map(&[("--a", "blue"), ("--b", "blue"), ("--c", "3px")]));
    }

    #[test]
    fn test_reify_drops_cycles_and_unresolved() {
        let mut props = map(&[("--a", "var(--b)"), ("--b", "var(--a)"), ("--c", "var(--gone)"), ("--d", "ok")]);
        reify(&mut props);
        assert_eq!(props, map(&[("--d", "ok")]));
    }

    #[test]
    fn test_reify_mixin_body() {
        let mut props = map(&[("--m", "{ color: var(--c); margin: var(--gone) }"), ("--c", "red")]);
        reify(&mut props);
        assert_eq!(props["--m"], "{ color: red }");
    }
}
