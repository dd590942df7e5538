//! Text cleanup shared by the extractors: wrap rejoining, whitespace, script tests.

use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

pub const SOFT_HYPHEN: char = '\u{00AD}';

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();

    // Line-break elements left in extracted markup: <lb/>, <lb></lb>, <wrap/>
    static ref WRAP_MARKER: Regex =
        Regex::new(r"<(?:lb|wrap)\s*/>|<(?:lb|wrap)\s*>\s*</(?:lb|wrap)\s*>").unwrap();
}

/// Malayalam block U+0D00..U+0D7F plus the joiners used inside conjuncts.
pub fn is_malayalam(c: char) -> bool {
    ('\u{0D00}'..='\u{0D7F}').contains(&c) || c == '\u{200C}' || c == '\u{200D}'
}

pub fn contains_malayalam(s: &str) -> bool {
    s.chars().any(is_malayalam)
}

pub fn starts_with_malayalam(s: &str) -> bool {
    s.trim_start().chars().next().is_some_and(is_malayalam)
}

/// Collapse runs of whitespace into single spaces and trim.
pub fn normalize_whitespace(s: &str) -> String {
    WHITESPACE.replace_all(s.trim(), " ").into_owned()
}

/// Remove line-wrap markers without inserting a space.
///
/// `"അക്ഷങ്ങൾ<lb/>പൊരുതീടും"` becomes `"അക്ഷങ്ങൾപൊരുതീടും"`; a soft hyphen at a
/// line end swallows the line break.
pub fn rejoin_wrapped(s: &str) -> String {
    let without_markers = WRAP_MARKER.replace_all(s, "");
    let mut out = String::with_capacity(without_markers.len());
    let mut chars = without_markers.chars().peekable();
    while let Some(c) = chars.next() {
        if c == SOFT_HYPHEN {
            while chars.peek().is_some_and(|n| *n == '\n' || *n == '\r') {
                chars.next();
            }
            continue;
        }
        out.push(c);
    }
    out
}

/// Join the physical lines of one entry.
///
/// Lines are separated by a space unless the previous line ends in a soft hyphen
/// (a word broken across the line), in which case they are glued together.
pub fn join_lines<S: AsRef<str>>(lines: &[S]) -> String {
    let mut joined = String::new();
    for line in lines {
        let line = line.as_ref().trim();
        if line.is_empty() {
            continue;
        }
        if let Some(stem) = joined.strip_suffix(SOFT_HYPHEN) {
            let keep = stem.len();
            joined.truncate(keep);
        } else if !joined.is_empty() {
            joined.push(' ');
        }
        joined.push_str(line);
    }
    normalize_whitespace(&rejoin_wrapped(&joined))
}

/// Split prose into sentences after `.`, `!` or `?` followed by whitespace.
///
/// Terminal punctuation stays with its sentence; nothing inside parentheses splits.
pub fn split_sentences(s: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut iter = s.char_indices().peekable();
    while let Some((i, c)) = iter.next() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            '.' | '!' | '?' if depth == 0 => {
                if iter.peek().is_some_and(|(_, n)| n.is_whitespace()) {
                    let end = i + c.len_utf8();
                    let sentence = s[start..end].trim();
                    if !sentence.is_empty() {
                        sentences.push(sentence);
                    }
                    start = end;
                }
            }
            _ => {}
        }
    }
    let tail = s[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}

/// Canonical composition for Latin transliterations with combining diacritics.
pub fn normalize_romanization(s: &str) -> String {
    s.nfc().collect()
}

/// Short excerpt for log lines and skip reports.
pub fn excerpt(s: &str, max_chars: usize) -> String {
    let mut out: String = s.chars().take(max_chars).collect();
    if s.chars().count() > max_chars {
        out.push('…');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_marker_rejoins_without_space() {
        assert_eq!(
            rejoin_wrapped(&format!("{}{}", "അക്ഷങ്ങൾ<lb/>പൊ", "രുതീടും")),
            "അക്ഷങ്ങൾപൊരുതീടും"
        );
        assert_eq!(rejoin_wrapped("അക<lb></lb>ഷങ്ങൾ"), "അകഷങ്ങൾ");
        assert_eq!(rejoin_wrapped("അക്ഷ<wrap/>ങ്ങൾ"), "അക്ഷങ്ങൾ");
    }

    #[test]
    fn soft_hyphen_lines_glue() {
        let lines = vec!["അക്ഷങ്ങൾപൊ\u{00AD}".to_string(), "രുതീടും".to_string()];
        assert_eq!(join_lines(&lines), "അക്ഷങ്ങൾപൊരുതീടും");
    }

    #[test]
    fn plain_lines_get_a_space() {
        assert_eq!(join_lines(&["Wedge, plug,", "  what stops"]), "Wedge, plug, what stops");
    }

    #[test]
    fn whitespace_collapses() {
        assert_eq!(normalize_whitespace("  a \n\t b  "), "a b");
    }

    #[test]
    fn sentences_keep_parentheses_together() {
        let parts = split_sentences("Eye. (a. b. c.) axle! ok");
        assert_eq!(parts, vec!["Eye.", "(a. b. c.) axle!", "ok"]);
    }

    #[test]
    fn script_detection() {
        assert!(contains_malayalam("Spoon (T. അകപ്പ)"));
        assert!(!contains_malayalam("Spoon, ladle"));
        assert!(starts_with_malayalam("  ഒരു."));
        assert!(!starts_with_malayalam("A, art."));
    }

    #[test]
    fn excerpt_truncates_on_chars() {
        assert_eq!(excerpt("അആഇ", 2), "അആ…");
        assert_eq!(excerpt("ab", 5), "ab");
    }
}
