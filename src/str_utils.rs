use std::borrow::Cow;

/// Safely returns a prefix of the string with at most `max_chars` characters.
/// This respects UTF-8 character boundaries.
pub fn prefix_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Bounds `s` to `max_chars` characters, borrowing when nothing is cut.
pub fn truncate_chars(s: &str, max_chars: usize) -> Cow<'_, str> {
    let prefix = prefix_chars(s, max_chars);
    if prefix.len() == s.len() {
        Cow::Borrowed(s)
    } else {
        Cow::Owned(prefix.to_string())
    }
}

/// Short single-line preview for log lines.
pub fn preview(s: &str, max_chars: usize) -> String {
    let flat = s.replace('\n', " ");
    let cut = prefix_chars(&flat, max_chars);
    if cut.len() < flat.len() {
        format!("{}…", cut)
    } else {
        flat
    }
}
