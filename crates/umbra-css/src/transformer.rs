//! Selector rewriting for scoped styles.
//!
//! Without native shadow trees, a component's rules are made to apply only to
//! its own content by tagging every compound with the element name as a
//! class, and document rules are kept out of component content with
//! `:not(.style-scope)`. Generated per-instance stylesheets are further
//! narrowed to one scope token.

use strum_macros::{Display, EnumString};
use umbra_common::warning::warn_once;

use crate::parser::{StyleRule, Stylesheet};
use crate::selector::{ComplexSelector, CompoundSelector, SimpleSelector, parse_compound, parse_selector};
use crate::serializer::to_css_text;

/// Class marking content that belongs to some component scope.
pub const SCOPE_CLASS: &str = "style-scope";

/// How a component's styles were pre-built, from the `css-build` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum CssBuild {
    /// Selectors were already scoped ahead of time.
    Shady,
    /// Styles were built for native shadow trees.
    Shadow,
}

/// `x-foo`, or `button[is=x-foo]` for a type extension of `button`.
#[must_use]
pub fn host_selector(element_name: &str, type_extension: Option<&str>) -> String {
    match type_extension {
        Some(extends) => format!("{extends}[is={element_name}]"),
        None => element_name.to_string(),
    }
}

/// The static stylesheet text for an element type.
///
/// With native shadow trees, or when the styles were pre-built as
/// [`CssBuild::Shady`], the rules are emitted as written.
#[must_use]
pub fn element_styles(
    element_name: &str,
    type_extension: Option<&str>,
    css_build: Option<CssBuild>,
    sheet: &Stylesheet,
    native_shadow: bool,
) -> String {
    if native_shadow || css_build == Some(CssBuild::Shady) {
        return to_css_text(sheet);
    }
    let mut scoped = sheet.clone();
    transform_element_rules(&mut scoped, element_name, type_extension);
    to_css_text(&scoped)
}

/// Rewrite every selector of `sheet` outside `@keyframes` with
/// [`transform_element_selector`].
pub fn transform_element_rules(sheet: &mut Stylesheet, element_name: &str, type_extension: Option<&str>) {
    let host = host_selector(element_name, type_extension);
    for rule in sheet.style_rules_mut() {
        for selector in &mut rule.selectors {
            *selector = transform_element_selector(selector, element_name, &host);
        }
    }
}

/// Scope one selector to an element type's shadow content.
///
/// `:host` compounds become the host selector, `:host(<compound>)` the host
/// selector followed by the argument; every other compound gets the
/// `.element-name` class ahead of its pseudo-classes.
#[must_use]
pub fn transform_element_selector(raw: &str, element_name: &str, host: &str) -> String {
    let Some(mut selector) = parse_or_warn(raw) else {
        return raw.to_string();
    };
    for compound in &mut selector.compounds {
        if compound.host().is_some() {
            *compound = host_compound(compound, host);
        } else {
            compound.insert_before_pseudos(SimpleSelector::Class(element_name.to_string()));
        }
    }
    selector.to_string()
}

fn host_compound(compound: &CompoundSelector, host: &str) -> CompoundSelector {
    let mut out = parse_compound(host).unwrap_or_default();
    for simple in &compound.simple_selectors {
        match simple {
            SimpleSelector::Host(None) => {}
            SimpleSelector::Host(Some(argument)) => {
                out.simple_selectors.extend(argument.simple_selectors.iter().cloned());
            }
            other => out.simple_selectors.push(other.clone()),
        }
    }
    out
}

/// Keep a document-level rule out of component content: every compound
/// except `html` gets `:not(.style-scope)`. `:root` is normalized first.
pub fn document_rule(rule: &mut StyleRule) {
    for raw in &mut rule.selectors {
        let Some(mut selector) = parse_or_warn(raw) else {
            continue;
        };
        let _ = normalize_root(&mut selector);
        for compound in &mut selector.compounds {
            let is_html = compound
                .simple_selectors
                .iter()
                .any(|s| matches!(s, SimpleSelector::Type(name) if name.eq_ignore_ascii_case("html")));
            if !is_html {
                compound.insert_before_pseudos(SimpleSelector::Not(CompoundSelector {
                    simple_selectors: vec![SimpleSelector::Class(SCOPE_CLASS.to_string())],
                }));
            }
        }
        *raw = selector.to_string();
    }
}

/// Rewrite `:root` to `html` in every selector of `rule`.
pub fn normalize_root_selector(rule: &mut StyleRule) {
    for raw in &mut rule.selectors {
        if let Some(mut selector) = parse_selector(raw)
            && normalize_root(&mut selector)
        {
            *raw = selector.to_string();
        }
    }
}

fn normalize_root(selector: &mut ComplexSelector) -> bool {
    let mut changed = false;
    for compound in &mut selector.compounds {
        if let Some(at) = compound
            .simple_selectors
            .iter()
            .position(|s| *s == SimpleSelector::Root)
        {
            let _ = compound.simple_selectors.remove(at);
            compound.simple_selectors.insert(0, SimpleSelector::Type("html".to_string()));
            changed = true;
        }
    }
    changed
}

/// Narrow a selector to instances carrying `token`.
///
/// A selector starting with the host selector has that prefix replaced by
/// `.token`; any other selector is prefixed with `.token ` as a descendant.
#[must_use]
pub fn scope_selector(selector: &str, host: &str, token: &str) -> String {
    let selector = selector.trim();
    if let Some(rest) = selector.strip_prefix(host) {
        let boundary = rest
            .chars()
            .next()
            .is_none_or(|c| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        if boundary {
            return format!(".{token}{rest}");
        }
    }
    format!(".{token} {selector}")
}

fn parse_or_warn(raw: &str) -> Option<ComplexSelector> {
    let parsed = parse_selector(raw);
    if parsed.is_none() {
        let _ = warn_once("umbra-css", &format!("selector `{raw}` left unscoped"));
    }
    parsed
}
