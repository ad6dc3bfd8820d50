//! Greedy word wrapping.

/// Break `text` into lines no wider than `max_width`.
///
/// Words are separated by any whitespace run and rejoined with single spaces.
/// Each word is appended to the current line while the joined line still
/// measures within `max_width`; otherwise it starts a new line. A word that
/// is wider than `max_width` on its own gets a line to itself and is never
/// split. Empty or all-whitespace input yields no lines.
pub fn wrap_greedy(text: &str, max_width: f32, measure: impl Fn(&str) -> f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }
        let candidate = format!("{current} {word}");
        if measure(&candidate) <= max_width {
            current = candidate;
        } else {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// `text` with whitespace runs collapsed, as it would appear on one line.
pub fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
