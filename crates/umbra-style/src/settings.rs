//! Environment capabilities the engine adapts to.

use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for loading [`StyleSettings`].
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings document is not valid JSON or has unknown fields.
    #[error("invalid style settings: {0}")]
    Parse(#[from] serde_json::Error),
}

/// What the rendering environment does natively.
///
/// Every field defaults to `false`/unbounded, which is the fully emulated
/// configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct StyleSettings {
    /// Shadow trees encapsulate styles natively. Generated styles go into
    /// each instance's shadow root and no scope class is written.
    pub native_shadow: bool,
    /// Custom properties are resolved natively. Overrides are written as
    /// inline custom properties instead of being resolved here.
    pub native_css: bool,
    /// `@apply` is expanded natively.
    pub native_css_apply: bool,
    /// Maximum generated styles kept per element type; `None` keeps all.
    /// Zero is rejected when parsing.
    pub cache_type_max: Option<NonZeroUsize>,
}

impl StyleSettings {
    /// Parse settings from a JSON object such as `{"native-shadow": true}`.
    ///
    /// # Errors
    /// Returns [`SettingsError::Parse`] for malformed JSON or unknown keys.
    pub fn from_json(text: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Whether rule-sets go through the mixin expander before use.
    #[must_use]
    pub const fn shims_apply(&self) -> bool {
        self.native_css && !self.native_css_apply
    }
}
