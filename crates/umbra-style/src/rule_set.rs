//! Prepared element types.
//!
//! Each element type is prepared once: its css text is parsed, optionally run
//! through the mixin expander, and the resulting rule-set is shared read-only
//! by every instance. The only later mutation is the mixin expander's
//! invalidation, which forces a re-expansion from the stored source.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::rc::Rc;

use umbra_css::{CssBuild, Stylesheet};
use umbra_dom::NodeId;

/// One prepared element type.
#[derive(Debug, Clone)]
pub struct ElementTypeEntry {
    /// The element type name, e.g. `x-foo`.
    pub element_name: String,
    /// The built-in element this type extends, if any.
    pub type_extension: Option<String>,
    /// How the styles were pre-built, from the `css-build` attribute.
    pub css_build: Option<CssBuild>,
    /// The rule-set exactly as parsed.
    pub source: Stylesheet,
    /// The rule-set instances use, after mixin expansion when enabled.
    pub rule_set: Rc<Stylesheet>,
    /// Custom property names the rule-set assigns or consumes.
    pub own_property_names: Rc<[String]>,
    /// The static element stylesheet, when one was generated.
    pub element_style: Option<String>,
    /// The document `<style>` holding [`Self::element_style`] when shadow
    /// trees are emulated.
    pub style_node: Option<NodeId>,
    /// Set when the mixin expander reported this type as out of date.
    pub invalid: bool,
}

/// Element type name to prepared entry, plus the live instances of each.
#[derive(Debug, Default)]
pub struct RuleSetStore {
    entries: HashMap<String, ElementTypeEntry>,
    instances: HashMap<String, BTreeSet<NodeId>>,
    stale_instances: HashSet<NodeId>,
}

impl RuleSetStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `entry` unless its element type is already prepared.
    ///
    /// Returns `false`, leaving the existing entry untouched, for a repeat.
    pub fn register(&mut self, entry: ElementTypeEntry) -> bool {
        if self.entries.contains_key(&entry.element_name) {
            return false;
        }
        let _ = self.entries.insert(entry.element_name.clone(), entry);
        true
    }

    /// The entry for `element_name`.
    #[must_use]
    pub fn get(&self, element_name: &str) -> Option<&ElementTypeEntry> {
        self.entries.get(element_name)
    }

    /// Mutable access to the entry for `element_name`.
    pub fn get_mut(&mut self, element_name: &str) -> Option<&mut ElementTypeEntry> {
        self.entries.get_mut(element_name)
    }

    /// Whether `element_name` has been prepared.
    #[must_use]
    pub fn contains(&self, element_name: &str) -> bool {
        self.entries.contains_key(element_name)
    }

    /// Mark `element_name` for re-expansion. With `propagate`, every live
    /// instance of the type is marked stale too.
    pub fn invalidate(&mut self, element_name: &str, propagate: bool) {
        let Some(entry) = self.entries.get_mut(element_name) else {
            return;
        };
        entry.invalid = true;
        if propagate && let Some(instances) = self.instances.get(element_name) {
            self.stale_instances.extend(instances.iter().copied());
        }
        tracing::debug!(element = element_name, propagate, "element type invalidated");
    }

    /// Reset the invalidation flag once the re-expansion has run.
    pub fn clear(&mut self, element_name: &str) {
        if let Some(entry) = self.entries.get_mut(element_name) {
            entry.invalid = false;
        }
    }

    /// Whether `element_name` is waiting for re-expansion.
    #[must_use]
    pub fn is_invalid(&self, element_name: &str) -> bool {
        self.entries.get(element_name).is_some_and(|e| e.invalid)
    }

    /// Record `node` as a live instance of `element_name`.
    pub fn track_instance(&mut self, element_name: &str, node: NodeId) {
        let _ = self
            .instances
            .entry(element_name.to_string())
            .or_default()
            .insert(node);
    }

    /// Forget `node` as an instance of `element_name`.
    pub fn forget_instance(&mut self, element_name: &str, node: NodeId) {
        if let Some(instances) = self.instances.get_mut(element_name) {
            let _ = instances.remove(&node);
        }
        let _ = self.stale_instances.remove(&node);
    }

    /// Live instances of `element_name`, in node order.
    pub fn instances_of(&self, element_name: &str) -> impl Iterator<Item = NodeId> + '_ {
        self.instances
            .get(element_name)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// Consume the stale mark of `node`, returning whether it was set.
    pub fn take_stale(&mut self, node: NodeId) -> bool {
        self.stale_instances.remove(&node)
    }
}
