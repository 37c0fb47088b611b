//! Wildcard pattern grammar for component and modal handler names.
//!
//! A handler name may contain `{name}` (captures one `\w+` word),
//! `{name:kind}` (captures one token of the given kind) or a bare `*`
//! (captures one `\S+` word). Everything else is matched literally; regex
//! metacharacters in the literal text are escaped before compilation.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.3.0

use regex::Regex;

use crate::core::InteractionError;

/// Delimiters of the named-wildcard syntax, `{` and `}` by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WildcardSyntax {
    pub open: char,
    pub close: char,
}

impl Default for WildcardSyntax {
    fn default() -> Self {
        WildcardSyntax {
            open: '{',
            close: '}',
        }
    }
}

/// A compiled wildcard pattern: the anchored regex, the capture names in
/// pattern order, and a name-erased form used for duplicate detection.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    /// Pattern with capture names erased; two patterns that accept the same
    /// shape normalize identically.
    pub normalized: String,
    pub regex: Regex,
    pub capture_names: Vec<String>,
}

fn kind_regex(kind: &str) -> Option<&'static str> {
    match kind {
        "alpha" => Some(r"\w+"),
        "int" => Some(r"-?\d+"),
        "bool" => Some(r"(?:true|false)"),
        "datetime" => Some(r"\d{4}-\d{2}-\d{2}(?:[T ]\d{2}:\d{2}(?::\d{2})?)?"),
        "float" | "decimal" => Some(r"-?\d+(?:\.\d+)?"),
        "guid" => {
            Some(r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}")
        }
        _ => None,
    }
}

/// Compile a handler-name segment into a wildcard pattern.
///
/// Returns `Ok(None)` when the segment contains no wildcards and belongs in
/// the exact bucket. Capture names must be unique within one pattern.
pub fn compile(
    segment: &str,
    syntax: &WildcardSyntax,
) -> Result<Option<CompiledPattern>, InteractionError> {
    let mut source = String::from(r"\A");
    let mut normalized = String::new();
    let mut capture_names: Vec<String> = Vec::new();
    let mut literal = String::new();
    let mut unnamed = 0usize;

    let mut chars = segment.chars().peekable();
    while let Some(c) = chars.next() {
        if c == syntax.open {
            let mut inner = String::new();
            let mut closed = false;
            for n in chars.by_ref() {
                if n == syntax.close {
                    closed = true;
                    break;
                }
                inner.push(n);
            }
            if !closed {
                return Err(InteractionError::parse_failed(format!(
                    "unclosed wildcard in '{segment}'"
                )));
            }

            let (name, pattern, norm) = match inner.split_once(':') {
                Some((name, kind)) => {
                    let pattern = kind_regex(kind).ok_or_else(|| {
                        InteractionError::parse_failed(format!(
                            "unknown wildcard constraint '{kind}' in '{segment}'"
                        ))
                    })?;
                    (name.to_string(), pattern, format!("{{:{kind}}}"))
                }
                None => (inner.clone(), r"\w+", "{}".to_string()),
            };
            if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
                return Err(InteractionError::parse_failed(format!(
                    "invalid wildcard name '{name}' in '{segment}'"
                )));
            }
            if capture_names.contains(&name) {
                return Err(InteractionError::parse_failed(format!(
                    "duplicate wildcard name '{name}' in '{segment}'"
                )));
            }

            source.push_str(&regex::escape(&literal));
            normalized.push_str(&literal);
            literal.clear();

            source.push('(');
            source.push_str(pattern);
            source.push(')');
            normalized.push_str(&norm);
            capture_names.push(name);
        } else if c == '*' {
            source.push_str(&regex::escape(&literal));
            normalized.push_str(&literal);
            literal.clear();

            source.push_str(r"(\S+)");
            normalized.push_str("{*}");
            capture_names.push(format!("arg{unnamed}"));
            unnamed += 1;
        } else {
            literal.push(c);
        }
    }

    if capture_names.is_empty() {
        return Ok(None);
    }

    source.push_str(&regex::escape(&literal));
    normalized.push_str(&literal);
    source.push_str(r"\z");

    let regex = Regex::new(&source).map_err(|e| {
        InteractionError::parse_failed(format!("wildcard pattern '{segment}' did not compile: {e}"))
    })?;

    Ok(Some(CompiledPattern {
        normalized,
        regex,
        capture_names,
    }))
}

/// Split a handler-name pattern into path segments on the given delimiters,
/// leaving delimiter characters inside wildcard braces alone (constraints use
/// `:` which is a common delimiter choice).
pub fn split_pattern(pattern: &str, delimiters: &[char], syntax: &WildcardSyntax) -> Vec<String> {
    if delimiters.is_empty() {
        return vec![pattern.to_string()];
    }
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    for c in pattern.chars() {
        if c == syntax.open {
            depth += 1;
            current.push(c);
        } else if c == syntax.close {
            depth = depth.saturating_sub(1);
            current.push(c);
        } else if depth == 0 && delimiters.contains(&c) {
            if !current.is_empty() {
                segments.push(std::mem::take(&mut current));
            }
        } else {
            current.push(c);
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }
    segments
}
