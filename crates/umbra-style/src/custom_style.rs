//! Document-level stylesheets.
//!
//! Top-level `<style>` elements are not owned by any component but still
//! need the same treatment: their rules must stay out of emulated shadow
//! content and their custom properties feed the cascade of the document
//! element. Providers are registered here and validated in batches; the
//! engine owns the transform step and the cascade.

use std::collections::{HashMap, HashSet};

use umbra_dom::{DomTree, NodeId};

/// Something that yields a document-level `<style>` element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StyleProvider {
    /// The `<style>` element itself.
    Style(NodeId),
    /// A wrapper element whose first `<style>` descendant is the stylesheet.
    /// Resolved lazily, so the wrapper may be filled after registration.
    Wrapper(NodeId),
}

impl StyleProvider {
    const fn node(self) -> NodeId {
        match self {
            Self::Style(node) | Self::Wrapper(node) => node,
        }
    }
}

/// The result of [`CustomStyleInterface::process_styles`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessedStyles {
    /// Every resolved `<style>` element, in registration order.
    pub styles: Vec<NodeId>,
    /// The subset resolved during this call, which still needs transforming.
    pub fresh: Vec<NodeId>,
}

/// Registry of document-level style providers.
#[derive(Debug, Default)]
pub struct CustomStyleInterface {
    custom_styles: Vec<StyleProvider>,
    seen: HashSet<NodeId>,
    resolved: HashMap<StyleProvider, NodeId>,
    enqueued: bool,
    validation_passes: usize,
}

impl CustomStyleInterface {
    /// An empty registry with no validation pending.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `provider` unless it was seen before, and request a
    /// validation pass. Returns whether it was added.
    pub fn add_custom_style(&mut self, provider: StyleProvider) -> bool {
        if !self.seen.insert(provider.node()) {
            return false;
        }
        self.custom_styles.push(provider);
        self.enqueue_document_validation();
        true
    }

    /// Request a validation pass. A request while one is pending is absorbed.
    pub fn enqueue_document_validation(&mut self) {
        if !self.enqueued {
            self.enqueued = true;
            tracing::trace!("document validation enqueued");
        }
    }

    /// Whether a validation pass is pending.
    #[must_use]
    pub const fn is_enqueued(&self) -> bool {
        self.enqueued
    }

    /// Mark the pending pass as done.
    pub fn finish_validation(&mut self) {
        self.enqueued = false;
        self.validation_passes += 1;
    }

    /// Number of validation passes run so far.
    #[must_use]
    pub const fn validation_passes(&self) -> usize {
        self.validation_passes
    }

    /// Registered providers, in registration order.
    #[must_use]
    pub fn custom_styles(&self) -> &[StyleProvider] {
        &self.custom_styles
    }

    /// The `<style>` element a provider stands for, if it has one yet.
    #[must_use]
    pub fn style_for_custom_style(&self, tree: &DomTree, provider: StyleProvider) -> Option<NodeId> {
        if let Some(&cached) = self.resolved.get(&provider) {
            return Some(cached);
        }
        match provider {
            StyleProvider::Style(node) => Some(node),
            StyleProvider::Wrapper(wrapper) => tree.descendants(wrapper).find(|&id| is_style(tree, id)),
        }
    }

    /// Drain pending mutation records, then resolve every provider that has
    /// no cached style yet.
    pub fn process_styles(&mut self, tree: &mut DomTree) -> ProcessedStyles {
        if tree.is_observing() {
            for record in tree.take_records() {
                for added in record.added_nodes {
                    self.add_unscoped_styles(tree, added);
                }
            }
        }
        let mut processed = ProcessedStyles::default();
        let providers = self.custom_styles.clone();
        for provider in providers {
            if let Some(&style) = self.resolved.get(&provider) {
                processed.styles.push(style);
            } else if let Some(style) = self.style_for_custom_style(tree, provider) {
                let _ = self.resolved.insert(provider, style);
                processed.styles.push(style);
                processed.fresh.push(style);
            }
        }
        processed
    }

    /// Register every `<style>` in the document without a `scope` attribute.
    pub fn gather_main_document_styles(&mut self, tree: &DomTree) {
        self.add_unscoped_styles(tree, tree.root());
    }

    /// Gather the document's styles and keep picking up new ones from the
    /// tree's mutation records at the start of each [`Self::process_styles`].
    pub fn watch_main_document_styles(&mut self, tree: &mut DomTree) {
        if tree.is_observing() {
            return;
        }
        self.gather_main_document_styles(tree);
        tree.observe_mutations(true);
    }

    /// Forget every resolved style so the next pass transforms them again.
    pub fn reset_cached_styles(&mut self) {
        self.resolved.clear();
    }

    /// Styles inside shadow trees belong to their component and are skipped.
    fn add_unscoped_styles(&mut self, tree: &DomTree, node: NodeId) {
        if tree.containing_host(node).is_some() {
            return;
        }
        if is_unscoped_style(tree, node) {
            let _ = self.add_custom_style(StyleProvider::Style(node));
            return;
        }
        let found: Vec<NodeId> = tree
            .descendants(node)
            .filter(|&id| is_unscoped_style(tree, id))
            .collect();
        for style in found {
            let _ = self.add_custom_style(StyleProvider::Style(style));
        }
    }
}

fn is_style(tree: &DomTree, node: NodeId) -> bool {
    tree.as_element(node)
        .is_some_and(|e| e.tag_name.eq_ignore_ascii_case("style"))
}

/// `style:not([scope])`
fn is_unscoped_style(tree: &DomTree, node: NodeId) -> bool {
    is_style(tree, node) && tree.get_attribute(node, "scope").is_none()
}
