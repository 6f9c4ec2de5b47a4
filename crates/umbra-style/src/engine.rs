//! The style engine: the single owner of every table, and the public entry
//! points embedding code calls.

use std::collections::HashMap;
use std::rc::Rc;

use umbra_css::{
    ApplyShim, CssBuild, DOCUMENT_SCOPE, PropertyMap, Scoping, Stylesheet, decorate_styles, document_rule,
    element_styles, host_selector, normalize_root_selector, parse_stylesheet, render_with_properties, to_css_text,
    transform_element_rules,
};
use umbra_common::warning::warn_once;
use umbra_dom::{DomTree, NodeId};

use crate::custom_style::{CustomStyleInterface, StyleProvider};
use crate::resolver::resolve;
use crate::rule_set::{ElementTypeEntry, RuleSetStore};
use crate::scope::ScopeAllocator;
use crate::settings::StyleSettings;
use crate::style_cache::{GeneratedStyle, StyleCache};
use crate::style_info::{OverrideMap, StyleInfo, StyleInfoTable};
use crate::tree::{
    attach_generated_stylesheet, computed_property_value, find_scoped_style, remove_inline_property,
    rendering_root_of, set_inline_property, set_scope_selector, structural_owner_of,
};

/// A document-level `<style>` after its one-time transform.
#[derive(Debug, Clone)]
struct DocumentStyle {
    node: NodeId,
    /// Rules after document scoping, before mixin expansion.
    source: Stylesheet,
    /// Rules rendered into the element on every validation pass.
    rules: Stylesheet,
}

/// Scoped-style and custom-property cascade engine for one document.
#[derive(Debug)]
pub struct StyleEngine {
    settings: StyleSettings,
    rule_sets: RuleSetStore,
    records: StyleInfoTable,
    scopes: ScopeAllocator,
    cache: StyleCache,
    apply_shim: ApplyShim,
    custom_styles: CustomStyleInterface,
    document_owner: NodeId,
    document_styles: Vec<DocumentStyle>,
    original_css: HashMap<NodeId, String>,
    document_styles_invalid: bool,
    elements_have_applied: bool,
}

impl StyleEngine {
    /// An engine for `tree`. Ensures the document has `<html>` and `<head>`
    /// and creates the document element's record, the top of every cascade.
    pub fn new(tree: &mut DomTree, settings: StyleSettings) -> Self {
        let html = tree.document_element().unwrap_or_else(|| {
            let html = tree.create_element("html");
            tree.append_child(tree.root(), html);
            html
        });
        if tree.head().is_none() {
            let head = tree.create_element("head");
            match tree.first_child(html) {
                Some(first) => tree.insert_before(html, head, first),
                None => tree.append_child(html, head),
            }
        }

        let mut records = StyleInfoTable::default();
        let mut owner = StyleInfo::new("html", None);
        owner.style_rules = Some(Rc::new(Stylesheet::default()));
        let _ = records.set(html, owner);

        let cache = settings
            .cache_type_max
            .map_or_else(StyleCache::new, StyleCache::with_type_max);
        tracing::debug!(?settings, "style engine created");
        Self {
            settings,
            rule_sets: RuleSetStore::new(),
            records,
            scopes: ScopeAllocator::new(),
            cache,
            apply_shim: ApplyShim::new(),
            custom_styles: CustomStyleInterface::new(),
            document_owner: html,
            document_styles: Vec::new(),
            original_css: HashMap::new(),
            document_styles_invalid: false,
            elements_have_applied: false,
        }
    }

    /// The active settings.
    #[must_use]
    pub const fn settings(&self) -> &StyleSettings {
        &self.settings
    }

    /// The document element, whose record tops every cascade.
    #[must_use]
    pub const fn document_owner(&self) -> NodeId {
        self.document_owner
    }

    /// The record of a styled instance.
    #[must_use]
    pub fn style_info(&self, node: NodeId) -> Option<&StyleInfo> {
        self.records.get(node)
    }

    /// The prepared entry of an element type.
    #[must_use]
    pub fn element_type(&self, element_name: &str) -> Option<&ElementTypeEntry> {
        self.rule_sets.get(element_name)
    }

    /// Every prepared element type and its live instances.
    #[must_use]
    pub const fn rule_sets(&self) -> &RuleSetStore {
        &self.rule_sets
    }

    /// The generated-style cache.
    #[must_use]
    pub const fn cache(&self) -> &StyleCache {
        &self.cache
    }

    /// Validation passes run over document-level styles so far.
    #[must_use]
    pub const fn validation_passes(&self) -> usize {
        self.custom_styles.validation_passes()
    }

    // ===== Element types =====

    /// Prepare an element type from its css text. Runs once per type; a
    /// repeat call is a no-op and returns `false`.
    pub fn prepare_template(
        &mut self,
        tree: &mut DomTree,
        element_name: &str,
        type_extension: Option<&str>,
        css_text: &str,
        css_build: Option<CssBuild>,
    ) -> bool {
        if self.rule_sets.contains(element_name) {
            tracing::trace!(element = element_name, "already prepared");
            return false;
        }
        let source = parse_stylesheet(css_text);
        let mut rule_set = source.clone();
        if self.settings.shims_apply() {
            let invalidated = self.apply_shim.transform_rules(&mut rule_set, element_name);
            self.invalidate_scopes(&invalidated);
        }
        let own_property_names = if self.settings.native_css {
            Vec::new()
        } else {
            decorate_styles(&rule_set)
        };

        let mut element_style = None;
        let mut style_node = None;
        if own_property_names.is_empty() || self.settings.native_css {
            let css = element_styles(
                element_name,
                type_extension,
                css_build,
                &rule_set,
                self.settings.native_shadow,
            );
            if !self.settings.native_shadow {
                style_node = rendering_root_of(tree, self.document_owner, false)
                    .and_then(|head| attach_generated_stylesheet(tree, head, element_name, &css));
            }
            element_style = Some(css);
        }

        tracing::debug!(
            element = element_name,
            own = own_property_names.len(),
            static_style = element_style.is_some(),
            "template prepared"
        );
        self.rule_sets.register(ElementTypeEntry {
            element_name: element_name.to_string(),
            type_extension: type_extension.map(str::to_string),
            css_build,
            source,
            rule_set: Rc::new(rule_set),
            own_property_names: own_property_names.into(),
            element_style,
            style_node,
            invalid: false,
        })
    }

    /// Create the record of `host` from its element type. A type that was
    /// never prepared yields a record with no rules. Returns `false` if
    /// `host` is not an element or already has a record.
    pub fn prepare_host(&mut self, tree: &mut DomTree, host: NodeId) -> bool {
        if self.records.contains(host) {
            return false;
        }
        let Some(element) = tree.as_element(host) else {
            return false;
        };
        let (element_name, type_extension) = element.element_names();
        let mut info = StyleInfo::new(element_name.clone(), type_extension);
        if let Some(entry) = self.rule_sets.get(&element_name) {
            info.style_rules = Some(Rc::clone(&entry.rule_set));
            info.own_property_names = Rc::clone(&entry.own_property_names);
            info.css_build = entry.css_build;
            if self.settings.native_shadow
                && let (Some(css), Some(shadow)) = (&entry.element_style, tree.shadow_root(host))
            {
                let _ = attach_generated_stylesheet(tree, shadow, &element_name, css);
            }
        } else {
            let _ = warn_once(
                "umbra-style",
                &format!("<{element_name}> styled before its template was prepared"),
            );
        }
        self.rule_sets.track_instance(&element_name, host);
        let _ = self.records.set(host, info);
        true
    }

    /// Drop the record of an instance that left the tree.
    pub fn forget_host(&mut self, host: NodeId) {
        if let Some(info) = self.records.remove(host) {
            self.rule_sets.forget_instance(&info.element_name, host);
        }
    }

    // ===== Styling =====

    /// Merge `overrides` into the record of `host`, restyle it and then every
    /// instance below it.
    pub fn apply_style(&mut self, tree: &mut DomTree, host: NodeId, overrides: Option<&OverrideMap>) {
        if self.custom_styles.is_enqueued() {
            self.flush_custom_styles(tree, true);
        }
        self.apply_style_inner(tree, host, overrides);
    }

    /// Restyle `host` with its current overrides.
    pub fn style_element(&mut self, tree: &mut DomTree, host: NodeId) {
        self.apply_style(tree, host, None);
    }

    /// Apply `overrides` at the document element, so they reach every
    /// instance in the document.
    pub fn update_styles(&mut self, tree: &mut DomTree, overrides: &OverrideMap) {
        self.custom_styles.enqueue_document_validation();
        self.flush_custom_styles(tree, false);
        self.apply_style_inner(tree, self.document_owner, Some(overrides));
    }

    /// The resolved value of `property` for `node` or its nearest styled
    /// owner, falling back to the inline styles the environment would see.
    /// Surrounding whitespace is trimmed; empty values read as `None`.
    #[must_use]
    pub fn get_computed_style_value(&self, tree: &DomTree, node: NodeId, property: &str) -> Option<String> {
        let resolved = if self.settings.native_css {
            None
        } else {
            self.records
                .get(node)
                .or_else(|| {
                    let owner = structural_owner_of(tree, &self.records, node, self.document_owner);
                    self.records.get(owner)
                })
                .and_then(|info| info.style_properties.as_ref()?.get(property).cloned())
        };
        resolved
            .filter(|value| !value.trim().is_empty())
            .or_else(|| computed_property_value(tree, node, property))
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn apply_style_inner(&mut self, tree: &mut DomTree, host: NodeId, overrides: Option<&OverrideMap>) {
        if tree.as_element(host).is_none() {
            return;
        }
        let _ = self.prepare_host(tree, host);
        if let (Some(overrides), Some(info)) = (overrides, self.records.get_mut(host)) {
            info.merge_overrides(overrides);
        }
        let is_document = host == self.document_owner;
        if !is_document {
            self.elements_have_applied = true;
        }

        if self.settings.native_css {
            self.apply_native_properties(tree, host);
        } else {
            self.update_properties(tree, host);
            if self.records.get(host).is_some_and(StyleInfo::has_own_properties) {
                let _ = self.apply_style_properties(tree, host);
            }
            if is_document {
                self.apply_custom_styles(tree);
            }
        }

        let root = if is_document { Some(host) } else { tree.shadow_root(host) };
        if let Some(root) = root {
            self.apply_to_descendants(tree, root);
        }
    }

    /// Restyle every shadow host below `root` in child order, top down.
    fn apply_to_descendants(&mut self, tree: &mut DomTree, root: NodeId) {
        for child in tree.element_children(root) {
            if tree.shadow_root(child).is_some() {
                tracing::trace!(host = child.0, "propagating");
                self.apply_style_inner(tree, child, None);
            }
            self.apply_to_descendants(tree, child);
        }
    }

    fn update_properties(&mut self, tree: &DomTree, host: NodeId) {
        let props = resolve(tree, &self.records, host, self.document_owner);
        if let Some(info) = self.records.get_mut(host) {
            info.style_properties = Some(props);
        }
    }

    /// Fetch or render the generated style for the resolved properties of
    /// `host`, attach it and point the host at its scope.
    fn apply_style_properties(&mut self, tree: &mut DomTree, host: NodeId) -> Option<Rc<GeneratedStyle>> {
        let info = self.records.get(host)?;
        let element_name = info.element_name.clone();
        let properties = info.style_properties.clone().unwrap_or_default();
        let previous = info.scope_selector.clone();

        let cached = self
            .cache
            .fetch(&element_name, &properties, &info.own_property_names)
            .map(|entry| Rc::clone(&entry.style));
        let hit = cached.is_some();
        let style = if let Some(style) = cached {
            tracing::debug!(element = %element_name, scope = %style.scope_selector, "cache hit");
            style
        } else {
            let token = self.scopes.generate(&element_name);
            let css_text = self.render_instance_style(info, &properties, &token);
            tracing::debug!(element = %element_name, scope = %token, "cache miss, style generated");
            Rc::new(GeneratedStyle {
                scope_selector: token,
                element_name: element_name.clone(),
                css_text,
            })
        };

        if let Some(root) = rendering_root_of(tree, host, self.settings.native_shadow) {
            let _ = attach_generated_stylesheet(tree, root, &style.scope_selector, &style.css_text);
        }
        if !self.settings.native_shadow {
            set_scope_selector(tree, host, &style.scope_selector, previous.as_deref());
        }
        if let Some(info) = self.records.get_mut(host) {
            info.scope_selector = Some(style.scope_selector.clone());
        }
        if !hit {
            self.cache.store(&element_name, properties, Rc::clone(&style));
        }
        Some(style)
    }

    fn render_instance_style(&self, info: &StyleInfo, properties: &PropertyMap, token: &str) -> String {
        let Some(rules) = info.style_rules.as_deref() else {
            return String::new();
        };
        if self.settings.native_shadow {
            return render_with_properties(rules, properties, None);
        }
        let type_extension = info.type_extension.as_deref();
        let scoping = Scoping {
            host_selector: host_selector(&info.element_name, type_extension),
            token: token.to_string(),
        };
        if info.css_build == Some(CssBuild::Shady) {
            return render_with_properties(rules, properties, Some(&scoping));
        }
        let mut scoped = rules.clone();
        transform_element_rules(&mut scoped, &info.element_name, type_extension);
        render_with_properties(&scoped, properties, Some(&scoping))
    }

    /// Native custom properties: re-expand an invalidated rule-set, then
    /// write the overrides as inline properties.
    fn apply_native_properties(&mut self, tree: &mut DomTree, host: NodeId) {
        let Some(info) = self.records.get(host) else {
            return;
        };
        let element_name = info.element_name.clone();
        let mut refresh_instance = self.rule_sets.take_stale(host);

        let needs_refresh = self
            .rule_sets
            .get(&element_name)
            .is_some_and(|entry| entry.invalid && entry.element_style.is_some());
        if needs_refresh {
            self.refresh_element_type(tree, &element_name);
            if let (Some(info), Some(entry)) = (self.records.get_mut(host), self.rule_sets.get(&element_name)) {
                info.style_rules = Some(Rc::clone(&entry.rule_set));
            }
            refresh_instance = true;
        }

        if refresh_instance && self.settings.native_shadow {
            let css = self
                .rule_sets
                .get(&element_name)
                .and_then(|entry| entry.element_style.clone())
                .unwrap_or_default();
            if let Some(shadow) = tree.shadow_root(host) {
                match find_scoped_style(tree, shadow, &element_name) {
                    Some(style) => tree.set_text_content(style, &css),
                    None => {
                        let _ = attach_generated_stylesheet(tree, shadow, &element_name, &css);
                    }
                }
            }
        }

        let overrides = self
            .records
            .get(host)
            .map(|info| info.override_properties.clone())
            .unwrap_or_default();
        for (name, value) in &overrides {
            match value.as_css_text() {
                Some(text) => set_inline_property(tree, host, name, &text),
                None => remove_inline_property(tree, host, name),
            }
        }
    }

    /// Re-run the mixin expander on an element type's source and regenerate
    /// its static stylesheet.
    fn refresh_element_type(&mut self, tree: &mut DomTree, element_name: &str) {
        let Some(entry) = self.rule_sets.get(element_name) else {
            return;
        };
        let mut rule_set = entry.source.clone();
        let (type_extension, css_build, style_node) =
            (entry.type_extension.clone(), entry.css_build, entry.style_node);

        let invalidated = self.apply_shim.transform_rules(&mut rule_set, element_name);
        let css = element_styles(
            element_name,
            type_extension.as_deref(),
            css_build,
            &rule_set,
            self.settings.native_shadow,
        );
        let mut new_node = style_node;
        match style_node {
            Some(node) => tree.set_text_content(node, &css),
            None if !self.settings.native_shadow => {
                new_node = rendering_root_of(tree, self.document_owner, false)
                    .and_then(|head| attach_generated_stylesheet(tree, head, element_name, &css));
            }
            None => {}
        }
        if let Some(entry) = self.rule_sets.get_mut(element_name) {
            entry.rule_set = Rc::new(rule_set);
            entry.element_style = Some(css);
            entry.style_node = new_node;
        }
        self.rule_sets.clear(element_name);
        self.invalidate_scopes(&invalidated);
        tracing::debug!(element = element_name, "mixins re-expanded");
    }

    fn invalidate_scopes(&mut self, scopes: &[String]) {
        for scope in scopes {
            if scope == DOCUMENT_SCOPE {
                self.document_styles_invalid = true;
                self.custom_styles.enqueue_document_validation();
            } else {
                self.rule_sets.invalidate(scope, self.settings.native_shadow);
            }
        }
    }

    // ===== Document-level styles =====

    /// Register a document-level style provider and request validation.
    /// Returns `false` for a provider seen before.
    pub fn add_custom_style(&mut self, provider: StyleProvider) -> bool {
        self.custom_styles.add_custom_style(provider)
    }

    /// Register every unscoped `<style>` of the document and keep watching
    /// the tree for new ones.
    pub fn watch_main_document_styles(&mut self, tree: &mut DomTree) {
        self.custom_styles.watch_main_document_styles(tree);
    }

    /// Transform every document-level style again from its original text on
    /// the next validation pass.
    pub fn reset_cached_styles(&mut self) {
        self.custom_styles.reset_cached_styles();
        self.document_styles.clear();
        if let Some(info) = self.records.get_mut(self.document_owner) {
            info.style_rules = Some(Rc::new(Stylesheet::default()));
        }
        self.custom_styles.enqueue_document_validation();
    }

    /// Pick up new document styles and run the pending validation pass, if
    /// any. Returns whether one ran.
    pub fn validate_document(&mut self, tree: &mut DomTree) -> bool {
        let before = self.custom_styles.validation_passes();
        self.flush_custom_styles(tree, true);
        self.custom_styles.validation_passes() != before
    }

    fn flush_custom_styles(&mut self, tree: &mut DomTree, cascade: bool) {
        let processed = self.custom_styles.process_styles(tree);
        for style in processed.fresh {
            self.transform_custom_style_for_document(tree, style);
        }
        if !self.custom_styles.is_enqueued() {
            return;
        }
        if !self.settings.native_css {
            self.update_properties(tree, self.document_owner);
            self.apply_custom_styles(tree);
        } else if self.settings.shims_apply() && self.document_styles_invalid {
            self.revalidate_apply_shim(tree);
        }
        self.custom_styles.finish_validation();
        tracing::debug!(
            styles = processed.styles.len(),
            pass = self.custom_styles.validation_passes(),
            "document styles validated"
        );
        if cascade && self.elements_have_applied && !self.settings.native_css {
            self.apply_style_inner(tree, self.document_owner, None);
        }
    }

    fn transform_custom_style_for_document(&mut self, tree: &mut DomTree, style: NodeId) {
        let css_text = self
            .original_css
            .entry(style)
            .or_insert_with(|| tree.text_content(style))
            .clone();
        let original = parse_stylesheet(&css_text);
        let mut source = original.clone();
        for rule in source.style_rules_mut() {
            if self.settings.native_shadow {
                normalize_root_selector(rule);
            } else {
                document_rule(rule);
            }
        }
        let mut rules = source.clone();
        if self.settings.shims_apply() {
            let invalidated = self.apply_shim.transform_rules(&mut rules, DOCUMENT_SCOPE);
            self.invalidate_scopes(&invalidated);
        }
        if self.settings.native_css {
            tree.set_text_content(style, &to_css_text(&rules));
        } else if let Some(info) = self.records.get_mut(self.document_owner) {
            let owner_rules = info.style_rules.get_or_insert_with(Rc::default);
            Rc::make_mut(owner_rules).rules.extend(original.rules);
        }
        self.document_styles.push(DocumentStyle {
            node: style,
            source,
            rules,
        });
    }

    fn apply_custom_styles(&self, tree: &mut DomTree) {
        let properties = self
            .records
            .get(self.document_owner)
            .and_then(|info| info.style_properties.clone())
            .unwrap_or_default();
        for style in &self.document_styles {
            tree.set_text_content(style.node, &render_with_properties(&style.rules, &properties, None));
        }
    }

    fn revalidate_apply_shim(&mut self, tree: &mut DomTree) {
        let mut invalidated = Vec::new();
        for style in &mut self.document_styles {
            let mut rules = style.source.clone();
            invalidated.extend(self.apply_shim.transform_rules(&mut rules, DOCUMENT_SCOPE));
            tree.set_text_content(style.node, &to_css_text(&rules));
            style.rules = rules;
        }
        self.document_styles_invalid = false;
        invalidated.retain(|scope| scope != DOCUMENT_SCOPE);
        self.invalidate_scopes(&invalidated);
    }
}
