//! Minimal ini parser with typed scanning.
//!
//! Supports the subset `.const.ini` files use:
//!
//! - `[section]` headers (one level of nesting),
//! - `key = value` pairs, with `key[sub] = value` and `key[] = value` nesting
//!   one level inside the current scope,
//! - full-line `;` / `#` comments and trailing `;` comments on unquoted values,
//! - double- or single-quoted values, which are always strings.
//!
//! Unquoted values are typed: `true`/`on`/`yes` and `false`/`off`/`no`/`none`
//! become booleans, `null` becomes null, integer and decimal literals become
//! numbers, everything else stays a string.

use crate::types::{RawTable, RawValue, Scalar};

/// A syntax error at a 1-based line.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

impl ParseError {
    fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// Parse ini text into an ordered table. Keys keep their original case.
pub fn parse(content: &str) -> Result<RawTable, ParseError> {
    let mut root = RawTable::new();
    let mut section: Option<String> = None;

    for (idx, line) in content.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = line.trim();

        if trimmed.is_empty() || trimmed.starts_with(';') || trimmed.starts_with('#') {
            continue;
        }

        if let Some(header) = trimmed.strip_prefix('[') {
            let Some(name) = header.strip_suffix(']') else {
                return Err(ParseError::new(line_no, "unterminated section header"));
            };
            let name = name.trim();
            if name.is_empty() {
                return Err(ParseError::new(line_no, "empty section name"));
            }
            ensure_table(&mut root, name);
            section = Some(name.to_string());
            continue;
        }

        let Some((key, raw_value)) = trimmed.split_once('=') else {
            return Err(ParseError::new(line_no, "expected 'key = value'"));
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(ParseError::new(line_no, "missing key before '='"));
        }

        let value = parse_value(raw_value.trim()).map_err(|m| ParseError::new(line_no, m))?;

        let mut segments: Vec<String> = section.iter().cloned().collect();
        match split_array_key(key) {
            Some((base, sub)) => {
                let sub = match sub {
                    Some(sub) => sub.to_string(),
                    None => {
                        let mut path: Vec<&str> = segments.iter().map(String::as_str).collect();
                        path.push(base);
                        find_table(&root, &path).map_or(0, Vec::len).to_string()
                    }
                };
                segments.push(base.to_string());
                segments.push(sub);
            }
            None => segments.push(key.to_string()),
        }

        let path: Vec<&str> = segments.iter().map(String::as_str).collect();
        insert_nested(&mut root, &path, RawValue::Scalar(value));
    }

    Ok(root)
}

/// Split `key[sub]` into `("key", Some("sub"))` and `key[]` into
/// `("key", None)`. Plain keys return `None`.
fn split_array_key(key: &str) -> Option<(&str, Option<&str>)> {
    let inner = key.strip_suffix(']')?;
    let (base, sub) = inner.split_once('[')?;
    let base = base.trim();
    let sub = sub.trim();
    if sub.is_empty() {
        Some((base, None))
    } else {
        Some((base, Some(sub)))
    }
}

fn ensure_table(table: &mut RawTable, key: &str) {
    match table.iter_mut().find(|(k, _)| k == key) {
        Some((_, RawValue::Table(_))) => {}
        Some((_, slot)) => *slot = RawValue::Table(RawTable::new()),
        None => table.push((key.to_string(), RawValue::Table(RawTable::new()))),
    }
}

fn find_table<'a>(table: &'a RawTable, path: &[&str]) -> Option<&'a RawTable> {
    let Some((first, rest)) = path.split_first() else {
        return Some(table);
    };
    match table.iter().find(|(k, _)| k == first) {
        Some((_, RawValue::Table(sub))) => find_table(sub, rest),
        _ => None,
    }
}

/// Insert `value` at `path`, creating intermediate tables. A later value for
/// the same key replaces the earlier one in place.
fn insert_nested(table: &mut RawTable, path: &[&str], value: RawValue) {
    let Some((first, rest)) = path.split_first() else {
        return;
    };

    if rest.is_empty() {
        match table.iter_mut().find(|(k, _)| k == first) {
            Some((_, slot)) => *slot = value,
            None => table.push((first.to_string(), value)),
        }
        return;
    }

    ensure_table(table, first);
    if let Some((_, RawValue::Table(sub))) = table.iter_mut().find(|(k, _)| k == first) {
        insert_nested(sub, rest, value);
    }
}

fn parse_value(raw: &str) -> Result<Scalar, String> {
    for quote in ['"', '\''] {
        if let Some(body) = raw.strip_prefix(quote) {
            let Some(end) = body.find(quote) else {
                return Err(format!("unterminated {quote} quoted value"));
            };
            let trailing = body[end + 1..].trim();
            if !trailing.is_empty() && !trailing.starts_with(';') && !trailing.starts_with('#') {
                return Err(format!("unexpected text after quoted value: {trailing}"));
            }
            return Ok(Scalar::String(body[..end].to_string()));
        }
    }

    let unquoted = match raw.split_once(';') {
        Some((value, _comment)) => value.trim_end(),
        None => raw,
    };
    Ok(scan_typed(unquoted))
}

/// Infer a typed scalar from unquoted text.
/// Tries: null → bool → integer → float → string.
pub(crate) fn scan_typed(s: &str) -> Scalar {
    let lower = s.to_ascii_lowercase();
    match lower.as_str() {
        "null" => return Scalar::Null,
        "true" | "on" | "yes" => return Scalar::Bool(true),
        "false" | "off" | "no" | "none" => return Scalar::Bool(false),
        _ => {}
    }
    if let Ok(i) = s.parse::<i64>() {
        return Scalar::Integer(i);
    }
    // Only use float if the string actually contains a dot,
    // to avoid "NaN" / "inf" being parsed as float. Overflow stays text.
    if s.contains('.')
        && let Ok(f) = s.parse::<f64>()
        && f.is_finite()
    {
        return Scalar::Float(f);
    }
    Scalar::String(s.to_string())
}
