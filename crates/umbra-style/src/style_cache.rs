//! Generated stylesheet cache.
//!
//! Entries are kept per element type, newest last. A lookup compares only the
//! element type's own property names, so an instance whose map differs from a
//! cached one only in properties it never uses still gets the cached style.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::rc::Rc;

use umbra_css::PropertyMap;

/// A stylesheet rendered for one element type and one set of property values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedStyle {
    /// The scope token the stylesheet is narrowed to.
    pub scope_selector: String,
    /// The element type it was rendered for.
    pub element_name: String,
    /// The rendered css text.
    pub css_text: String,
}

/// One cached rendering.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The full resolved map the style was rendered from.
    pub properties: PropertyMap,
    /// The rendered style, shared by every instance that hits this entry.
    pub style: Rc<GeneratedStyle>,
}

impl CacheEntry {
    fn agrees_with(&self, properties: &PropertyMap, own_property_names: &[String]) -> bool {
        own_property_names
            .iter()
            .all(|name| self.properties.get(name) == properties.get(name))
    }
}

/// Element type name to cached renderings.
#[derive(Debug, Default)]
pub struct StyleCache {
    cache: HashMap<String, Vec<CacheEntry>>,
    type_max: Option<NonZeroUsize>,
}

impl StyleCache {
    /// An unbounded cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache keeping at most `type_max` entries per element type; the
    /// oldest entry of a type is evicted first.
    #[must_use]
    pub fn with_type_max(type_max: NonZeroUsize) -> Self {
        Self {
            cache: HashMap::new(),
            type_max: Some(type_max),
        }
    }

    /// The newest entry of `element_name` whose properties agree with
    /// `properties` on every name in `own_property_names`.
    #[must_use]
    pub fn fetch(&self, element_name: &str, properties: &PropertyMap, own_property_names: &[String]) -> Option<&CacheEntry> {
        self.cache
            .get(element_name)?
            .iter()
            .rev()
            .find(|entry| entry.agrees_with(properties, own_property_names))
    }

    /// Remember `style` as rendered from `properties`.
    pub fn store(&mut self, element_name: &str, properties: PropertyMap, style: Rc<GeneratedStyle>) {
        let list = self.cache.entry(element_name.to_string()).or_default();
        list.push(CacheEntry { properties, style });
        if let Some(max) = self.type_max
            && list.len() > max.get()
        {
            let evicted = list.remove(0);
            tracing::debug!(
                element = element_name,
                scope = %evicted.style.scope_selector,
                "cache entry evicted"
            );
        }
    }

    /// Number of entries cached for `element_name`.
    #[must_use]
    pub fn entry_count(&self, element_name: &str) -> usize {
        self.cache.get(element_name).map_or(0, Vec::len)
    }

    /// Whether nothing at all is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.values().all(Vec::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style(token: &str) -> Rc<GeneratedStyle> {
        Rc::new(GeneratedStyle {
            scope_selector: token.to_string(),
            element_name: "x-foo".to_string(),
            css_text: String::new(),
        })
    }

    fn props(pairs: &[(&str, &str)]) -> PropertyMap {
        pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()
    }

    #[test]
    fn test_newest_match_wins() {
        let own = ["--a".to_string()];
        let mut cache = StyleCache::new();
        cache.store("x-foo", props(&[("--a", "1")]), style("x-foo-1"));
        cache.store("x-foo", props(&[("--a", "1"), ("--b", "2")]), style("x-foo-2"));
        let hit = cache.fetch("x-foo", &props(&[("--a", "1")]), &own).unwrap();
        assert_eq!(hit.style.scope_selector, "x-foo-2");
        assert!(cache.fetch("x-foo", &props(&[("--a", "9")]), &own).is_none());
        assert!(cache.fetch("x-bar", &props(&[]), &own).is_none());
    }

    #[test]
    fn test_missing_own_property_must_match_missing() {
        let own = ["--a".to_string()];
        let mut cache = StyleCache::new();
        cache.store("x-foo", props(&[]), style("x-foo-1"));
        assert!(cache.fetch("x-foo", &props(&[("--a", "")]), &own).is_none());
        assert!(cache.fetch("x-foo", &props(&[("--z", "1")]), &own).is_some());
    }
}
