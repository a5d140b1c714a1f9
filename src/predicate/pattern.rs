//! LIKE-pattern translation
//!
//! SQL LIKE wildcards are rewritten into an anchored regular expression:
//! `%` becomes `.*`, `_` becomes `.`, everything else is escaped
//! literally. The whole pattern must match the whole text.

use regex::Regex;

use crate::error::{Error, Result};

/// Translate a LIKE pattern into an anchored regex.
pub(crate) fn like_to_regex(pattern: &str, case_insensitive: bool) -> Result<Regex> {
    let mut translated = String::with_capacity(pattern.len() + 8);
    if case_insensitive {
        translated.push_str("(?i)");
    }
    // (?s): a pattern's wildcards also span newlines in the text.
    translated.push_str("(?s)^");
    for ch in pattern.chars() {
        match ch {
            '%' => translated.push_str(".*"),
            '_' => translated.push('.'),
            other => translated.push_str(&regex::escape(&other.to_string())),
        }
    }
    translated.push('$');

    Regex::new(&translated).map_err(|_| Error::type_mismatch("pattern", pattern))
}

/// Compile a raw regular expression operand.
pub(crate) fn raw_regex(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|_| Error::type_mismatch("regular expression", pattern))
}
