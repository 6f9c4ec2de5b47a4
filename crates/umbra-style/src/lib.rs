//! Custom-property cascade and scoped-style caching for shadow-tree components.
//!
//! [`StyleEngine`] owns every table: prepared element types, per-instance
//! records, the generated-style cache, the mixin expander and the registry of
//! document-level styles. The tree itself is passed in by the caller on every
//! call; the engine never holds on to it.
//!
//! Depending on [`StyleSettings`], styling an instance either resolves its
//! custom properties here and renders a scoped stylesheet for them, or writes
//! its overrides as inline custom properties for a native cascade.

/// Document-level style providers and their validation queue.
pub mod custom_style;
/// The style engine and its public entry points.
pub mod engine;
/// Custom-property resolution for one instance.
pub mod resolver;
/// Prepared element types.
pub mod rule_set;
/// Scope token allocation.
pub mod scope;
/// Environment capabilities.
pub mod settings;
/// Generated stylesheet cache.
pub mod style_cache;
/// Per-instance style records and override values.
pub mod style_info;
/// Tree helpers: owner lookup, style attachment, inline properties.
pub mod tree;

pub use custom_style::{CustomStyleInterface, StyleProvider};
pub use engine::StyleEngine;
pub use rule_set::{ElementTypeEntry, RuleSetStore};
pub use scope::ScopeAllocator;
pub use settings::{SettingsError, StyleSettings};
pub use style_cache::{GeneratedStyle, StyleCache};
pub use style_info::{OverrideMap, OverrideValue, StyleInfo};
