//! Lexical path normalization for `php/dir` values.
//!
//! Paths are handled as strings with forward slashes, never touching the
//! filesystem, so a configuration directory that does not exist yet still
//! resolves.

/// Normalize a path string.
///
/// - Backslashes are treated as separators.
/// - Empty, whitespace-only and `.` segments are dropped.
/// - `..` pops the previous segment; with nothing left to pop it collapses to
///   the root.
/// - A leading separator is kept; a lone root renders as `/`.
///
/// The result never carries a trailing separator (except `/` itself), and
/// normalizing it again returns it unchanged.
pub fn normalize_path(path: &str) -> String {
    if path.is_empty() {
        return String::new();
    }

    let path = path.replace('\\', "/");
    let mut safe: Vec<&str> = Vec::new();

    for (idx, part) in path.split('/').enumerate() {
        if idx == 0 && part.is_empty() {
            safe.push("");
        } else if part.trim().is_empty() || part == "." {
            continue;
        } else if part == ".." {
            if safe.pop().is_none() || safe.is_empty() {
                safe.push("");
            }
        } else {
            safe.push(part);
        }
    }

    if safe.len() == 1 && safe[0].is_empty() {
        return "/".to_string();
    }

    safe.join("/")
}
