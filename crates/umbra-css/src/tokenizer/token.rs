//! CSS Token types per [§ 4 Tokenization](https://www.w3.org/TR/css-syntax-3/#tokenization).
//!
//! Numeric tokens keep the source spelling of their number so that
//! serializing a token stream reproduces values like `1.50` or `+2` exactly;
//! custom property values are opaque strings and must survive a round trip.

use core::fmt;

/// [§ 4.2 Definitions](https://www.w3.org/TR/css-syntax-3/#token-diagrams)
///
/// "A `<hash-token>` with the type flag set to 'id'... or 'unrestricted'."
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashType {
    /// "id" - the hash token's value is a valid identifier
    Id,
    /// "unrestricted" - the hash token's value is not a valid identifier
    Unrestricted,
}

/// [§ 4.2 Definitions](https://www.w3.org/TR/css-syntax-3/#token-diagrams)
///
/// CSS tokens as defined by the CSS Syntax Module Level 3 specification.
#[derive(Debug, Clone, PartialEq)]
pub enum CSSToken {
    /// "`<ident-token>`"
    Ident(String),
    /// "`<function-token>`", the name without the opening parenthesis.
    Function(String),
    /// "`<at-keyword-token>`", the name without the `@`.
    AtKeyword(String),
    /// "`<hash-token>`"
    Hash {
        /// The name after `#`.
        value: String,
        /// "a type flag set to either 'id' or 'unrestricted'"
        hash_type: HashType,
    },
    /// "`<string-token>`", unquoted and unescaped.
    String(String),
    /// "`<bad-string-token>`"
    BadString,
    /// "`<url-token>`"
    Url(String),
    /// "`<bad-url-token>`"
    BadUrl,
    /// "`<delim-token>`"
    Delim(char),
    /// "`<number-token>`"
    Number {
        /// Numeric value.
        value: f64,
        /// Source spelling, sign included.
        repr: String,
    },
    /// "`<percentage-token>`"
    Percentage {
        /// Numeric value.
        value: f64,
        /// Source spelling of the number, without `%`.
        repr: String,
    },
    /// "`<dimension-token>`"
    Dimension {
        /// Numeric value.
        value: f64,
        /// Source spelling of the number.
        repr: String,
        /// "a unit"
        unit: String,
    },
    /// "`<whitespace-token>`"
    Whitespace,
    /// "`<CDO-token>`" (`<!--`)
    CDO,
    /// "`<CDC-token>`" (`-->`)
    CDC,
    /// "`<colon-token>`"
    Colon,
    /// "`<semicolon-token>`"
    Semicolon,
    /// "`<comma-token>`"
    Comma,
    /// `<[-token>`
    LeftBracket,
    /// `<]-token>`
    RightBracket,
    /// `<(-token>`
    LeftParen,
    /// `<)-token>`
    RightParen,
    /// `<{-token>`
    LeftBrace,
    /// `<}-token>`
    RightBrace,
    /// End of input.
    EOF,
}

impl CSSToken {
    /// Create a new ident token.
    #[must_use]
    pub fn ident(value: impl Into<String>) -> Self {
        Self::Ident(value.into())
    }

    /// Returns true if this is an EOF token.
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        matches!(self, Self::EOF)
    }

    /// Returns true if this is a whitespace token.
    #[must_use]
    pub const fn is_whitespace(&self) -> bool {
        matches!(self, Self::Whitespace)
    }
}

/// Serializes the token back to CSS source text.
impl fmt::Display for CSSToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ident(v) => f.write_str(v),
            Self::Function(v) => write!(f, "{v}("),
            Self::AtKeyword(v) => write!(f, "@{v}"),
            Self::Hash { value, .. } => write!(f, "#{value}"),
            Self::String(v) => {
                f.write_str("\"")?;
                for c in v.chars() {
                    match c {
                        '"' | '\\' => write!(f, "\\{c}")?,
                        '\n' => f.write_str("\\a ")?,
                        c => write!(f, "{c}")?,
                    }
                }
                f.write_str("\"")
            }
            Self::Url(v) => write!(f, "url({v})"),
            Self::BadString | Self::BadUrl => Ok(()),
            Self::Delim(c) => write!(f, "{c}"),
            Self::Number { repr, .. } => f.write_str(repr),
            Self::Percentage { repr, .. } => write!(f, "{repr}%"),
            Self::Dimension { repr, unit, .. } => write!(f, "{repr}{unit}"),
            Self::Whitespace => f.write_str(" "),
            Self::CDO => f.write_str("<!--"),
            Self::CDC => f.write_str("-->"),
            Self::Colon => f.write_str(":"),
            Self::Semicolon => f.write_str(";"),
            Self::Comma => f.write_str(","),
            Self::LeftBracket => f.write_str("["),
            Self::RightBracket => f.write_str("]"),
            Self::LeftParen => f.write_str("("),
            Self::RightParen => f.write_str(")"),
            Self::LeftBrace => f.write_str("{"),
            Self::RightBrace => f.write_str("}"),
            Self::EOF => Ok(()),
        }
    }
}
