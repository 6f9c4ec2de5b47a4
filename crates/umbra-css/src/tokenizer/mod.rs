//! CSS tokenizer module.

/// The tokenizer state machine.
pub mod scanner;
/// CSS token types per [CSS Syntax Level 3 § 4](https://www.w3.org/TR/css-syntax-3/#tokenization).
pub mod token;

pub use scanner::CSSTokenizer;
pub use token::{CSSToken, HashType};
