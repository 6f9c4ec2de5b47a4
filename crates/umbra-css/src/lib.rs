//! CSS tokenizer, parser, selector matching and scoping transforms for the umbra style engine.
//!
//! # Scope
//!
//! This crate implements:
//! - **CSS Tokenizer** ([§ 4 Tokenization](https://www.w3.org/TR/css-syntax-3/#tokenization))
//!   - All token types, numeric tokens keep their source spelling
//!   - Comment handling and escape sequences
//!
//! - **CSS Parser** ([§ 5 Parsing](https://www.w3.org/TR/css-syntax-3/#parsing))
//!   - Style rules, nested grouping at-rules and `@keyframes`
//!   - Declarations, `!important` and `@apply --mixin;` entries
//!
//! - **Serializer** ([CSSOM § 6.7](https://www.w3.org/TR/cssom-1/#serializing-css-values))
//!
//! - **CSS Selectors** ([Selectors Level 4](https://www.w3.org/TR/selectors-4/))
//!   - Type, class, ID, universal and attribute selectors
//!   - `:host`, `:host()`, `:root` and `:not()`
//!   - Matching across shadow-root boundaries
//!
//! - **Custom properties** ([CSS Variables Level 1](https://www.w3.org/TR/css-variables-1/))
//!   - `var()` substitution with fallbacks
//!   - Host, root and enclosing-scope property collection
//!   - Mixins: `@apply` expansion and flattening for native engines
//!
//! - **Scoping** ([CSS Scoping Level 1](https://drafts.csswg.org/css-scoping-1/))
//!   - Element-type and document selector rewriting
//!   - Per-instance scope tokens
//!
//! # Not Yet Implemented
//!
//! - `::slotted()` and `::part()` rewriting
//! - Structural pseudo-classes in matching
//! - Keyframe name scoping

/// `@apply` mixin flattening.
pub mod apply_shim;
/// Rendering rule-sets against resolved custom properties.
pub mod materialize;
/// CSS parser per [§ 5 Parsing](https://www.w3.org/TR/css-syntax-3/#parsing).
pub mod parser;
/// Custom property collection and `var()` resolution between properties.
pub mod properties;
/// CSS selector parsing and matching per [Selectors Level 4](https://www.w3.org/TR/selectors-4/).
pub mod selector;
/// Stylesheet serialization.
pub mod serializer;
/// `var()` substitution per [CSS Variables § 3](https://www.w3.org/TR/css-variables-1/#using-variables).
pub mod substitute;
/// CSS tokenizer per [§ 4 Tokenization](https://www.w3.org/TR/css-syntax-3/#tokenization).
pub mod tokenizer;
/// Selector rewriting for scoped styles.
pub mod transformer;

// Re-exports for convenience
pub use apply_shim::{ApplyShim, DOCUMENT_SCOPE};
pub use materialize::{Scoping, render_with_properties};
pub use parser::{BlockItem, ComponentValue, Declaration, Rule, StyleRule, Stylesheet, parse_stylesheet};
pub use properties::{
    HostAndRootProps, PropertyMap, decorate_styles, host_and_root_properties, property_data_from_styles, reify,
};
pub use selector::{ComplexSelector, parse_selector};
pub use serializer::to_css_text;
pub use tokenizer::{CSSToken, CSSTokenizer};
pub use transformer::{
    CssBuild, document_rule, element_styles, host_selector, normalize_root_selector, transform_element_rules,
};
