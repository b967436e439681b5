#![forbid(unsafe_code)]

//! Identifier shape and false-positive predicates.
//!
//! BIRD names addressable objects with two lowercase letters followed by
//! digits (`dd12`, `ve305`, `pr7`). Anything else is not an identifier.

use birdfix_core::RepairConfig;
use once_cell::sync::Lazy;
use regex::Regex;

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z]{2}[0-9]+$").expect("identifier regex"));

static COLOR_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9a-fA-F]{6}$").expect("color code regex"));

/// True iff the whole string is two lowercase ASCII letters followed by one
/// or more ASCII digits.
pub fn is_identifier_shape(s: &str) -> bool {
    IDENTIFIER.is_match(s)
}

/// Six hex digits, as in an HTML color without its `#`.
pub fn is_color_code(s: &str) -> bool {
    COLOR_CODE.is_match(s)
}

/// True for strings that look like identifiers but are known not to be
/// object references: too short, color codes, or configured literals.
pub fn is_likely_false_positive(s: &str, config: &RepairConfig) -> bool {
    s.chars().count() < 3 || is_color_code(s) || config.is_false_positive_literal(s)
}

/// Leading run of lowercase ASCII letters, used as the prefix when minting a
/// replacement identifier.
pub fn alphabetic_prefix(s: &str) -> &str {
    let end = s
        .find(|c: char| !c.is_ascii_lowercase())
        .unwrap_or(s.len());
    &s[..end]
}

/// Numeric suffix of an identifier-shaped string.
pub fn numeric_suffix(s: &str) -> Option<u64> {
    if !is_identifier_shape(s) {
        return None;
    }
    s[2..].parse().ok()
}
