//! CSS Custom Properties `var()` Substitution
//!
//! [CSS Custom Properties for Cascading Variables Module Level 1 § 3](https://www.w3.org/TR/css-variables-1/#using-variables)
//!
//! Values are substituted as text: the engine keeps custom-property values as
//! plain strings, so a lookup returns the replacement text directly.

use std::fmt::Write as _;

use crate::parser::ComponentValue;
use crate::tokenizer::CSSToken;

/// Check if component values contain any `var()` function references.
#[must_use]
pub fn contains_var(values: &[ComponentValue]) -> bool {
    values.iter().any(|cv| match cv {
        ComponentValue::Function { name, value } => name.eq_ignore_ascii_case("var") || contains_var(value),
        ComponentValue::Block { value, .. } => contains_var(value),
        ComponentValue::Token(_) => false,
    })
}

/// Custom-property names referenced through `var()`, fallbacks included.
#[must_use]
pub fn var_references(values: &[ComponentValue]) -> Vec<String> {
    fn walk(values: &[ComponentValue], out: &mut Vec<String>) {
        for cv in values {
            match cv {
                ComponentValue::Function { name, value } if name.eq_ignore_ascii_case("var") => {
                    if let Some((referenced, fallback)) = parse_var_arguments(value) {
                        out.push(referenced);
                        if let Some(fallback) = fallback {
                            walk(fallback, out);
                        }
                    }
                }
                ComponentValue::Function { value, .. } | ComponentValue::Block { value, .. } => walk(value, out),
                ComponentValue::Token(_) => {}
            }
        }
    }
    let mut out = Vec::new();
    walk(values, &mut out);
    out
}

/// [§ 3 Using Cascading Variables](https://www.w3.org/TR/css-variables-1/#using-variables)
///
/// `var() = var( <custom-property-name> , <declaration-value>? )`
///
/// Returns the referenced name and the fallback tokens (everything after the
/// first comma), or `None` if the first argument is not a custom property name.
#[must_use]
pub fn parse_var_arguments(args: &[ComponentValue]) -> Option<(String, Option<&[ComponentValue]>)> {
    let mut iter = args.iter().enumerate().skip_while(|(_, cv)| cv.is_whitespace());
    let (_, first) = iter.next()?;
    let name = match first {
        ComponentValue::Token(CSSToken::Ident(name)) if name.starts_with("--") => name.clone(),
        _ => return None,
    };
    for (i, cv) in iter {
        match cv {
            ComponentValue::Token(CSSToken::Comma) => {
                let fallback = &args[i + 1..];
                let start = fallback.iter().take_while(|cv| cv.is_whitespace()).count();
                let end = fallback.len() - fallback.iter().rev().take_while(|cv| cv.is_whitespace()).count();
                return Some((name, Some(&fallback[start.min(end)..end])));
            }
            cv if cv.is_whitespace() => {}
            _ => return None,
        }
    }
    Some((name, None))
}

/// [§ 3](https://www.w3.org/TR/css-variables-1/#substitute-a-var)
///
/// "To substitute a `var()` in a property's value:
///  2. If the value of the custom property named by the first argument to
///     the `var()` function is anything but the initial value, replace the
///     `var()` function by the value of the corresponding custom property.
///  3. Otherwise, if the `var()` function has a fallback value as its second
///     argument, replace the `var()` function by the fallback value. If there
///     are any `var()` references in the fallback, substitute them as well.
///  4. Otherwise, the property containing the `var()` function is invalid at
///     computed-value time."
///
/// Returns the substituted text, or `None` when step 4 applies.
pub fn substitute_to_string(
    values: &[ComponentValue],
    lookup: &mut dyn FnMut(&str) -> Option<String>,
) -> Option<String> {
    let mut out = String::new();
    write_substituted(&mut out, values, lookup)?;
    Some(out)
}

fn write_substituted(
    out: &mut String,
    values: &[ComponentValue],
    lookup: &mut dyn FnMut(&str) -> Option<String>,
) -> Option<()> {
    for cv in values {
        match cv {
            ComponentValue::Function { name, value } if name.eq_ignore_ascii_case("var") => {
                let (referenced, fallback) = parse_var_arguments(value)?;
                match (lookup(&referenced), fallback) {
                    (Some(text), _) => out.push_str(&text),
                    (None, Some(fallback)) => write_substituted(out, fallback, lookup)?,
                    (None, None) => return None,
                }
            }
            ComponentValue::Function { name, value } => {
                out.push_str(name);
                out.push('(');
                write_substituted(out, value, lookup)?;
                out.push(')');
            }
            ComponentValue::Block { token, value } => {
                let close = match *token {
                    '{' => '}',
                    '[' => ']',
                    _ => ')',
                };
                out.push(*token);
                write_substituted(out, value, lookup)?;
                out.push(close);
            }
            ComponentValue::Token(token) => {
                let _ = write!(out, "{token}");
            }
        }
    }
    Some(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_component_values;

    fn lookup_red(name: &str) -> Option<String> {
        (name == "--color").then(|| "red".to_string())
    }

    #[test]
    fn test_substitute_nested_function() {
        let values = parse_component_values("1px solid var(--color)");
        assert_eq!(
            substitute_to_string(&values, &mut lookup_red).as_deref(),
            Some("1px solid red")
        );
    }

    #[test]
    fn test_fallback_chain() {
        let values = parse_component_values("var(--missing, var(--color))");
        assert_eq!(substitute_to_string(&values, &mut lookup_red).as_deref(), Some("red"));
    }

    #[test]
    fn test_missing_without_fallback_is_invalid() {
        let values = parse_component_values("calc(var(--missing) + 1px)");
        assert!(substitute_to_string(&values, &mut lookup_red).is_none());
    }

    #[test]
    fn test_references_include_fallbacks() {
        let values = parse_component_values("var(--a, var(--b, 2px))");
        assert_eq!(var_references(&values), vec!["--a", "--b"]);
    }
}
