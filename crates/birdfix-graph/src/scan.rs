#![forbid(unsafe_code)]

//! Reference scanners.
//!
//! Two separate rules find identifiers outside `name` attributes:
//!
//! - attribute values are split on whitespace and each token must be a whole
//!   identifier (`"dd1 dd2"`, `"ve4"`);
//! - text content is searched for identifier-shaped runs bounded on both
//!   sides by something other than an ASCII letter, digit or `#`, so that
//!   pieces of longer words and `#aa1234` color references are skipped.
//!
//! The bounded matching helpers are shared with the repair passes so that
//! rewriting finds exactly what detection found.

use crate::classify::is_identifier_shape;
use once_cell::sync::Lazy;
use regex::Regex;

static IDENTIFIER_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[a-z]{2}[0-9]+").expect("identifier run regex"));

/// Whitespace-delimited tokens of an attribute value that are identifiers.
pub fn attribute_identifiers(value: &str) -> impl Iterator<Item = &str> {
    value.split_whitespace().filter(|t| is_identifier_shape(t))
}

/// Boundary-delimited identifiers in a chunk of text.
pub fn text_identifiers(text: &str) -> Vec<&str> {
    IDENTIFIER_RUN
        .find_iter(text)
        .filter(|m| is_bounded(text, m.start(), m.end()))
        .map(|m| m.as_str())
        .collect()
}

fn is_boundary_char(c: char) -> bool {
    !(c.is_ascii_alphanumeric() || c == '#')
}

/// True if `text[start..end]` is neither preceded nor followed by a letter,
/// digit or `#`.
fn is_bounded(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    before.map_or(true, is_boundary_char) && after.map_or(true, is_boundary_char)
}

/// Replace every bounded occurrence of `needle`. Returns the new text and
/// the number of replacements.
pub fn replace_bounded(text: &str, needle: &str, replacement: &str) -> (String, usize) {
    if needle.is_empty() {
        return (text.to_owned(), 0);
    }
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    let mut count = 0;
    for (start, m) in text.match_indices(needle) {
        let end = start + m.len();
        if !is_bounded(text, start, end) {
            continue;
        }
        out.push_str(&text[last..start]);
        out.push_str(replacement);
        last = end;
        count += 1;
    }
    out.push_str(&text[last..]);
    (out, count)
}

/// Replace whitespace-delimited tokens equal to `needle`, leaving the
/// surrounding whitespace untouched.
pub fn replace_tokens(value: &str, needle: &str, replacement: &str) -> (String, usize) {
    let mut out = String::with_capacity(value.len());
    let mut count = 0;
    let mut token_start: Option<usize> = None;
    for (i, c) in value.char_indices() {
        if c.is_whitespace() {
            if let Some(start) = token_start.take() {
                count += push_token(&mut out, &value[start..i], needle, replacement);
            }
            out.push(c);
        } else if token_start.is_none() {
            token_start = Some(i);
        }
    }
    if let Some(start) = token_start {
        count += push_token(&mut out, &value[start..], needle, replacement);
    }
    (out, count)
}

fn push_token(out: &mut String, token: &str, needle: &str, replacement: &str) -> usize {
    if token == needle {
        out.push_str(replacement);
        1
    } else {
        out.push_str(token);
        0
    }
}
