/// JSON-style quoting used in diagnostics, e.g. `"bool"` or `"\n"`.
pub fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{}\"", text))
}

/// Column advance for `text`, counted in characters rather than bytes.
pub fn width(text: &str) -> usize {
    text.chars().count()
}
