//! Abstract text normalization.

use regex::Regex;
use std::sync::OnceLock;

static MARKUP_TAG: OnceLock<Regex> = OnceLock::new();

fn markup_tag() -> &'static Regex {
    // `(?s)` so a tag broken over several lines is still removed in one pass
    MARKUP_TAG.get_or_init(|| Regex::new(r"(?s)<.*?>").expect("valid markup regex"))
}

/// Normalize an abstract for full-text matching.
///
/// Removes `<...>` tags (no nesting awareness), collapses whitespace runs to a
/// single space, trims and lowercases. Empty input is returned unchanged.
pub fn process_abstract(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let stripped = markup_tag().replace_all(text, " ");
    stripped
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
