//! Per-instance style records.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use umbra_css::{CssBuild, PropertyMap, Stylesheet};
use umbra_dom::NodeId;

/// A caller-supplied custom property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OverrideValue {
    /// Explicitly unset; the inherited value shows through.
    Null,
    /// A boolean; only `true` is applied.
    Bool(bool),
    /// A number; every number except NaN is applied, `0` included.
    Number(f64),
    /// Value text; the empty string is not applied.
    Text(String),
}

impl OverrideValue {
    /// The value as CSS text, or `None` when it does not take part in the
    /// cascade.
    #[must_use]
    pub fn as_css_text(&self) -> Option<String> {
        match self {
            Self::Null | Self::Bool(false) => None,
            Self::Bool(true) => Some("true".to_string()),
            Self::Number(n) if n.is_nan() => None,
            Self::Number(n) => Some(n.to_string()),
            Self::Text(text) if text.is_empty() => None,
            Self::Text(text) => Some(text.clone()),
        }
    }

    /// Whether the value is applied over the inherited one.
    #[must_use]
    pub fn is_present(&self) -> bool {
        self.as_css_text().is_some()
    }
}

impl From<&str> for OverrideValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for OverrideValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for OverrideValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for OverrideValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Custom property name to override value, in name order.
pub type OverrideMap = BTreeMap<String, OverrideValue>;

/// Layer the present overrides onto `props`.
pub fn mixin_override_styles(props: &mut PropertyMap, overrides: &OverrideMap) {
    for (name, value) in overrides {
        if let Some(text) = value.as_css_text() {
            let _ = props.insert(name.clone(), text);
        }
    }
}

/// Everything the engine remembers about one styled instance.
#[derive(Debug, Clone, Default)]
pub struct StyleInfo {
    /// The element type's rule-set, shared with every other instance.
    pub style_rules: Option<Rc<Stylesheet>>,
    /// Custom property names the rule-set assigns or consumes.
    pub own_property_names: Rc<[String]>,
    /// Overrides accumulated from update calls.
    pub override_properties: OverrideMap,
    /// The element type.
    pub element_name: String,
    /// The built-in element this type extends, if any.
    pub type_extension: Option<String>,
    /// How the element type's styles were pre-built.
    pub css_build: Option<CssBuild>,
    /// The last resolved property map; `None` until first resolved.
    pub style_properties: Option<PropertyMap>,
    /// The scope token of the generated stylesheet in use.
    pub scope_selector: Option<String>,
}

impl StyleInfo {
    /// A record for an instance of `element_name` with no rule-set yet.
    #[must_use]
    pub fn new(element_name: impl Into<String>, type_extension: Option<String>) -> Self {
        Self {
            element_name: element_name.into(),
            type_extension,
            ..Self::default()
        }
    }

    /// Merge `overrides` into the accumulated overrides. Later values
    /// replace earlier ones, `Null` included.
    pub fn merge_overrides(&mut self, overrides: &OverrideMap) {
        self.override_properties
            .extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    /// Whether the record's rule-set uses any custom property at all.
    #[must_use]
    pub fn has_own_properties(&self) -> bool {
        !self.own_property_names.is_empty()
    }
}

/// Side-table from instance to its record. The tree owns the instances; a
/// record lives as long as the engine is told nothing else.
#[derive(Debug, Default)]
pub struct StyleInfoTable {
    records: HashMap<NodeId, StyleInfo>,
}

impl StyleInfoTable {
    /// The record for `node`, if it has been styled.
    #[must_use]
    pub fn get(&self, node: NodeId) -> Option<&StyleInfo> {
        self.records.get(&node)
    }

    /// Mutable access to the record for `node`.
    pub fn get_mut(&mut self, node: NodeId) -> Option<&mut StyleInfo> {
        self.records.get_mut(&node)
    }

    /// Whether `node` has a record.
    #[must_use]
    pub fn contains(&self, node: NodeId) -> bool {
        self.records.contains_key(&node)
    }

    /// Attach `info` to `node`, replacing any previous record.
    pub fn set(&mut self, node: NodeId, info: StyleInfo) -> &mut StyleInfo {
        match self.records.entry(node) {
            Entry::Occupied(mut occupied) => {
                let _ = occupied.insert(info);
                occupied.into_mut()
            }
            Entry::Vacant(vacant) => vacant.insert(info),
        }
    }

    /// Drop the record of `node`, e.g. when the instance leaves the tree.
    pub fn remove(&mut self, node: NodeId) -> Option<StyleInfo> {
        self.records.remove(&node)
    }

    /// Number of styled instances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no instance has been styled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(OverrideValue::from(0.0).is_present());
        assert!(OverrideValue::from("red").is_present());
        assert!(OverrideValue::from(true).is_present());
        assert!(!OverrideValue::from("").is_present());
        assert!(!OverrideValue::from(false).is_present());
        assert!(!OverrideValue::from(f64::NAN).is_present());
        assert!(!OverrideValue::Null.is_present());
        assert_eq!(OverrideValue::from(0.0).as_css_text().as_deref(), Some("0"));
    }

    #[test]
    fn test_json_forms() {
        let map: OverrideMap = serde_json::from_str(r#"{"--a": 0, "--b": null, "--c": "red", "--d": false}"#).unwrap();
        assert_eq!(map["--a"], OverrideValue::Number(0.0));
        assert_eq!(map["--b"], OverrideValue::Null);
        assert_eq!(map["--c"], OverrideValue::Text("red".to_string()));
        assert_eq!(map["--d"], OverrideValue::Bool(false));
    }

    #[test]
    fn test_null_merge_unsets_earlier_override() {
        let mut info = StyleInfo::new("x-foo", None);
        info.merge_overrides(&OverrideMap::from([("--x".to_string(), OverrideValue::from("red"))]));
        info.merge_overrides(&OverrideMap::from([("--x".to_string(), OverrideValue::Null)]));
        let mut props = PropertyMap::from([("--x".to_string(), "blue".to_string())]);
        mixin_override_styles(&mut props, &info.override_properties);
        assert_eq!(props["--x"], "blue");
    }
}
