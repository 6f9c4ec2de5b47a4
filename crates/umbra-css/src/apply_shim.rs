//! `@apply` mixin expansion for engines that resolve `var()` natively.
//!
//! A mixin definition is flattened into one custom property per declaration:
//!
//! ```css
//! :host { --toolbar: { color: red; padding: 2px; }; }
//! ```
//! becomes `--toolbar_-_color: red; --toolbar_-_padding: 2px;`, and
//! `@apply --toolbar;` becomes `color: var(--toolbar_-_color);
//! padding: var(--toolbar_-_padding);`.
//!
//! The table of mixins is shared by every rule-set that gets transformed, so
//! a later definition can add properties to a mixin that an earlier element
//! type already applied. Those element types are reported back as
//! invalidated and have to be transformed again from their source.

use std::collections::{BTreeSet, HashMap};

use crate::parser::{BlockItem, ComponentValue, Declaration, Stylesheet, parse_declaration_list};
use crate::serializer::component_values_to_string;
use crate::tokenizer::CSSToken;

/// Scope name used for document-level styles.
pub const DOCUMENT_SCOPE: &str = "custom-style";

const MIXIN_SEPARATOR: &str = "_-_";

#[derive(Debug, Default)]
struct MixinEntry {
    properties: Vec<String>,
    dependants: BTreeSet<String>,
}

/// The process-wide mixin table.
#[derive(Debug, Default)]
pub struct ApplyShim {
    mixins: HashMap<String, MixinEntry>,
}

impl ApplyShim {
    /// An empty mixin table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Expand definitions and `@apply` in every style rule of `sheet`.
    ///
    /// Returns the other scopes that applied a mixin which gained properties
    /// here, sorted and deduplicated.
    pub fn transform_rules(&mut self, sheet: &mut Stylesheet, scope: &str) -> Vec<String> {
        let mut invalidated = BTreeSet::new();
        for rule in sheet.style_rules_mut() {
            let items = std::mem::take(&mut rule.items);
            rule.items = self.transform_items(items, scope, &mut invalidated, 0);
        }
        tracing::trace!(scope, invalidated = invalidated.len(), "mixins expanded");
        invalidated.into_iter().collect()
    }

    fn transform_items(
        &mut self,
        items: Vec<BlockItem>,
        scope: &str,
        invalidated: &mut BTreeSet<String>,
        depth: u32,
    ) -> Vec<BlockItem> {
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            match item {
                BlockItem::Declaration(d) if d.mixin_body().is_some() => {
                    let body = d.mixin_body().map(component_values_to_string).unwrap_or_default();
                    out.extend(self.define(&d.name, &body, scope, invalidated, depth));
                }
                BlockItem::Apply(name) => out.extend(self.apply(&name, scope)),
                item => out.push(item),
            }
        }
        out
    }

    fn define(
        &mut self,
        mixin: &str,
        body: &str,
        scope: &str,
        invalidated: &mut BTreeSet<String>,
        depth: u32,
    ) -> Vec<BlockItem> {
        // Nested @apply inside a definition is expanded into the body first.
        let body = if depth < 8 {
            self.transform_items(parse_declaration_list(body), scope, invalidated, depth + 1)
        } else {
            parse_declaration_list(body)
        };
        let declarations: Vec<Declaration> = body
            .into_iter()
            .filter_map(|item| match item {
                BlockItem::Declaration(d) => Some(d),
                BlockItem::Apply(_) => None,
            })
            .collect();

        let entry = self.mixins.entry(mixin.to_string()).or_default();
        let mut grew = false;
        for d in &declarations {
            if !entry.properties.contains(&d.name) {
                entry.properties.push(d.name.clone());
                grew = true;
            }
        }
        if grew {
            invalidated.extend(entry.dependants.iter().filter(|s| *s != scope).cloned());
        }

        let mut out: Vec<BlockItem> = declarations
            .iter()
            .map(|d| {
                BlockItem::Declaration(Declaration::new(
                    flattened_name(mixin, &d.name),
                    d.value.clone(),
                    d.important,
                ))
            })
            .collect();
        for property in &entry.properties {
            if !declarations.iter().any(|d| &d.name == property) {
                out.push(BlockItem::Declaration(Declaration::new(
                    flattened_name(mixin, property),
                    vec![ComponentValue::Token(CSSToken::ident("initial"))],
                    false,
                )));
            }
        }
        out
    }

    fn apply(&mut self, mixin: &str, scope: &str) -> Vec<BlockItem> {
        let entry = self.mixins.entry(mixin.to_string()).or_default();
        let _ = entry.dependants.insert(scope.to_string());
        entry
            .properties
            .iter()
            .map(|property| {
                let reference = ComponentValue::Function {
                    name: "var".to_string(),
                    value: vec![ComponentValue::Token(CSSToken::ident(flattened_name(mixin, property)))],
                };
                BlockItem::Declaration(Declaration::new(property.clone(), vec![reference], false))
            })
            .collect()
    }
}

fn flattened_name(mixin: &str, property: &str) -> String {
    format!("{mixin}{MIXIN_SEPARATOR}{property}")
}
