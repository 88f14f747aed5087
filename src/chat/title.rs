/// Derive a session title from the first user turn: the text verbatim, or its
/// first 30 characters plus an ellipsis marker. Char-based so multibyte text
/// is never split.
pub fn derive_title(text: &str) -> String {
    if text.chars().count() > 30 {
        let head: String = text.chars().take(30).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}
