//! Plain-text normalization of model replies.
//!
//! The persona asks the model to avoid markdown, but compliance is not
//! guaranteed. Replies pass through an ordered list of transforms before they
//! are shown. Order matters: bullet markers are stripped before emphasis
//! characters, otherwise `* item` would lose its `*` and keep a stray space.

use lazy_static::lazy_static;
use regex::Regex;
use std::borrow::Cow;

lazy_static! {
    static ref BULLET_MARKER: Regex = Regex::new(r"(?m)^\s*[-*•+]\s+").expect("bullet pattern");
    static ref EMPHASIS_MARKUP: Regex = Regex::new(r"[*_`~]").expect("emphasis pattern");
    static ref HEADING_MARKER: Regex = Regex::new(r"(?m)^#+\s*").expect("heading pattern");
    static ref BLOCKQUOTE_MARKER: Regex = Regex::new(r">\s?").expect("blockquote pattern");
    static ref TABLE_PIPE: Regex = Regex::new(r"\|").expect("pipe pattern");
    static ref EXCESS_NEWLINES: Regex = Regex::new(r"\n{3,}").expect("newline pattern");
}

pub type Transform = for<'a> fn(&'a str) -> Cow<'a, str>;

/// The transforms in application order.
pub const PIPELINE: &[(&str, Transform)] = &[
    ("line_endings", normalize_line_endings),
    ("bullets", strip_bullet_markers),
    ("emphasis", strip_emphasis_markup),
    ("headings", strip_heading_markers),
    ("blockquotes", strip_blockquote_markers),
    ("table_pipes", strip_table_pipes),
    ("blank_lines", collapse_blank_lines),
    ("trim", trim_whitespace),
];

pub fn normalize_line_endings(text: &str) -> Cow<'_, str> {
    if text.contains("\r\n") {
        Cow::Owned(text.replace("\r\n", "\n"))
    } else {
        Cow::Borrowed(text)
    }
}

pub fn strip_bullet_markers(text: &str) -> Cow<'_, str> {
    BULLET_MARKER.replace_all(text, "")
}

pub fn strip_emphasis_markup(text: &str) -> Cow<'_, str> {
    EMPHASIS_MARKUP.replace_all(text, "")
}

pub fn strip_heading_markers(text: &str) -> Cow<'_, str> {
    HEADING_MARKER.replace_all(text, "")
}

pub fn strip_blockquote_markers(text: &str) -> Cow<'_, str> {
    BLOCKQUOTE_MARKER.replace_all(text, "")
}

pub fn strip_table_pipes(text: &str) -> Cow<'_, str> {
    TABLE_PIPE.replace_all(text, "")
}

pub fn collapse_blank_lines(text: &str) -> Cow<'_, str> {
    EXCESS_NEWLINES.replace_all(text, "\n\n")
}

pub fn trim_whitespace(text: &str) -> Cow<'_, str> {
    Cow::Borrowed(text.trim())
}

/// One pass of the pipeline.
pub fn sanitize_once(text: &str) -> String {
    PIPELINE
        .iter()
        .fold(text.to_string(), |acc, (_, step)| step(&acc).into_owned())
}

/// Applies the pipeline until the text stops changing.
///
/// A single pass can expose a marker an earlier step would have removed
/// (`"> - x"` leaves `"- x"`). Every step only deletes characters, so each
/// pass that changes the text makes it strictly shorter and the loop ends.
pub fn sanitize_reply(text: &str) -> String {
    let mut current = sanitize_once(text);
    loop {
        let next = sanitize_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bullet_and_emphasis_scenario() {
        assert_eq!(
            sanitize_reply("- **Buy** now\n\n\n\nGood luck"),
            "Buy now\n\nGood luck"
        );
    }

    #[test]
    fn test_line_endings() {
        assert_eq!(normalize_line_endings("a\r\nb\r\n"), "a\nb\n");
        assert!(matches!(normalize_line_endings("a\nb"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_bullets_only_at_line_start() {
        assert_eq!(strip_bullet_markers("- one\n* two\n• three\n+ four"), "one\ntwo\nthree\nfour");
        assert_eq!(strip_bullet_markers("a - b"), "a - b");
        assert_eq!(strip_bullet_markers("  -  indented"), "indented");
        // a marker needs trailing whitespace
        assert_eq!(strip_bullet_markers("-5 degrees"), "-5 degrees");
    }

    #[test]
    fn test_emphasis_removed_anywhere() {
        assert_eq!(strip_emphasis_markup("a *b* _c_ `d` ~~e~~"), "a b c d e");
    }

    #[test]
    fn test_headings() {
        assert_eq!(strip_heading_markers("## Title\nbody #tag"), "Title\nbody #tag");
        assert_eq!(strip_heading_markers("#NoSpace"), "NoSpace");
    }

    #[test]
    fn test_blockquotes_and_pipes() {
        assert_eq!(strip_blockquote_markers("> quoted\n>tight"), "quoted\ntight");
        assert_eq!(strip_table_pipes("| a | b |"), " a  b ");
    }

    #[test]
    fn test_collapse_and_trim() {
        assert_eq!(collapse_blank_lines("a\n\n\n\n\nb\n\nc"), "a\n\nb\n\nc");
        assert_eq!(trim_whitespace("  x \n"), "x");
    }

    #[test]
    fn test_order_bullets_before_emphasis() {
        // emphasis first would leave " item" and the bullet rule would no longer match
        assert_eq!(sanitize_once("* item"), "item");
    }

    #[test]
    fn test_exposed_markers_reach_fixed_point() {
        assert_eq!(sanitize_once("> - x"), "- x");
        assert_eq!(sanitize_reply("> - x"), "x");
        assert_eq!(sanitize_reply("a\n - - b"), "a\nb");
    }

    #[test]
    fn test_table_reply() {
        let raw = "| Coin | Price |\r\n|------|-------|\r\n| BTC | 1 |";
        let out = sanitize_reply(raw);
        assert!(!out.contains('|'));
        assert!(out.contains("BTC"));
    }

    #[test]
    fn test_plain_text_untouched() {
        let text = "Markets were calm today.\n\nConsider a stop loss.";
        assert_eq!(sanitize_reply(text), text);
    }
}
