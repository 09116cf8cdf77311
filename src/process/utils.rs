// src/process/utils.rs

/// Remove embedded line breaks.
pub fn strip_newlines(raw: &str) -> String {
    raw.chars().filter(|c| *c != '\n' && *c != '\r').collect()
}

/// Remove line breaks and full-width spaces.
pub fn strip_layout_chars(raw: &str) -> String {
    raw.chars()
        .filter(|c| *c != '\n' && *c != '\r' && *c != '\u{3000}')
        .collect()
}

/// Text before the first `open`, or `None` when `open` is absent.
pub fn before_delim(raw: &str, open: char) -> Option<&str> {
    raw.split_once(open).map(|(head, _)| head)
}

/// The segment between the first and second `open`, with every `close`
/// removed; `None` when `open` is absent.
pub fn after_delim(raw: &str, open: char, close: char) -> Option<String> {
    raw.split(open).nth(1).map(|s| s.replace(close, ""))
}

/// Footnote markers and similar rows start with a digit (half- or full-width).
pub fn starts_with_digit(raw: &str) -> bool {
    raw.chars().next().map_or(false, char::is_numeric)
}
