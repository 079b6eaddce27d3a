//! Header normalization
//!
//! Turns raw column labels (from a delimited file's first line or from a
//! query's result metadata) into field names that are safe to use as SQL
//! identifiers and unique within one header set.

use std::collections::HashSet;

/// Normalize raw column labels into unique, canonical field names.
///
/// The output has the same length and order as the input. Each label is
/// trimmed and unquoted, runs of characters outside `[A-Za-z0-9_]` collapse
/// to a single `_`, and leading/trailing underscores are dropped. Names that
/// are empty or do not start with a letter get an `x` prefix. Collisions
/// (compared case-insensitively) are resolved with `_2`, `_3`, ... suffixes.
///
/// # Examples
/// ```
/// use tl_core::normalize_headers;
/// let names = normalize_headers(&["Order ID", "order-id", "", "2nd"]);
/// assert_eq!(names, vec!["Order_ID", "order_id_2", "x", "x2nd"]);
/// ```
pub fn normalize_headers<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::with_capacity(raw.len());
    let mut names = Vec::with_capacity(raw.len());

    for label in raw {
        let base = canonical_name(label.as_ref());
        let mut candidate = base.clone();
        let mut suffix = 2usize;
        while !seen.insert(candidate.to_ascii_lowercase()) {
            candidate = format!("{base}_{suffix}");
            suffix += 1;
        }
        names.push(candidate);
    }

    names
}

/// Canonical form of a single label, before de-duplication.
fn canonical_name(label: &str) -> String {
    let trimmed = strip_quotes(label.trim()).trim();

    let mut out = String::with_capacity(trimmed.len());
    let mut pending_sep = false;
    for c in trimmed.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(c);
        } else {
            pending_sep = true;
        }
    }
    let out = out.trim_matches('_');

    match out.chars().next() {
        Some(c) if c.is_ascii_alphabetic() => out.to_string(),
        _ => format!("x{out}"),
    }
}

fn strip_quotes(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(s)
}

#[cfg(test)]
#[path = "header_test.rs"]
mod tests;
