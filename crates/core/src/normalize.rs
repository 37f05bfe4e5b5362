//! Canonical form for extracted text.
//!
//! Every extractor output passes through [`normalize_text`] before chunking, so
//! chunk boundaries and index terms never depend on the line-ending style or
//! stray control characters of the source file.

use regex::Regex;
use std::sync::OnceLock;

const SPANISH_LETTERS: &str = "áéíóúÁÉÍÓÚüÜñÑ";
const ALLOWED_PUNCTUATION: &str = ".,!?;:()-–—°\"/+#$%&*=[]{}<>|\\";

fn horizontal_whitespace() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[ \t]+").expect("horizontal whitespace pattern is valid"))
}

fn newline_runs() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\n{3,}").expect("newline run pattern is valid"))
}

/// Letters (ASCII plus the Spanish alphabet), digits, `_` and the punctuation
/// that survives normalization. Whitespace is handled separately.
pub fn is_allowed_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || c == '_'
        || SPANISH_LETTERS.contains(c)
        || ALLOWED_PUNCTUATION.contains(c)
}

/// Drops every character outside the allowed set. Spaces, tabs and newlines
/// are kept; any other whitespace (NBSP, form feed, `\r`) becomes a space.
pub fn strip_disallowed(text: &str) -> String {
    text.chars()
        .filter_map(|c| match c {
            ' ' | '\t' | '\n' => Some(c),
            c if c.is_whitespace() => Some(' '),
            c if is_allowed_char(c) => Some(c),
            _ => None,
        })
        .collect()
}

/// Idempotent: `normalize_text(&normalize_text(x)) == normalize_text(x)`.
pub fn normalize_text(text: &str) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");
    let filtered = strip_disallowed(&unified);
    let collapsed = horizontal_whitespace().replace_all(&filtered, " ");

    let trimmed_lines = collapsed
        .split('\n')
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n");

    newline_runs()
        .replace_all(&trimmed_lines, "\n\n")
        .trim()
        .to_string()
}

/// Length in characters, the unit every size threshold in this crate uses.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}
