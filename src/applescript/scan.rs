//! Character-level scanning for AppleScript record/list text.
//!
//! The record syntax emitted by osascript nests braces and parens, quotes
//! strings with `"` and escapes with `\`. Splitting that text on commas or
//! colons is only safe at depth zero, outside quotes. This module owns that
//! bookkeeping as a small state machine so the parsers above it never touch
//! raw quote/escape state.

/// Scanner state while walking record text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    /// Outside any quoted string.
    Normal,
    /// Inside a quoted string.
    Quoted,
    /// Just consumed a backslash; the next character is literal.
    Escaped { quoted: bool },
}

/// Tracks quote, escape, and nesting state one character at a time.
#[derive(Debug)]
pub(crate) struct Scanner {
    state: ScanState,
    depth: u32,
}

impl Scanner {
    pub(crate) fn new() -> Self {
        Self {
            state: ScanState::Normal,
            depth: 0,
        }
    }

    /// True when the scanner sits outside quotes at brace/paren depth zero.
    ///
    /// A delimiter character encountered here separates top-level items.
    pub(crate) fn at_top_level(&self) -> bool {
        self.state == ScanState::Normal && self.depth == 0
    }

    /// Consume one character, updating quote, escape, and nesting state.
    pub(crate) fn step(&mut self, ch: char) {
        match self.state {
            ScanState::Escaped { quoted } => {
                self.state = if quoted {
                    ScanState::Quoted
                } else {
                    ScanState::Normal
                };
            }
            ScanState::Quoted => match ch {
                '\\' => self.state = ScanState::Escaped { quoted: true },
                '"' => self.state = ScanState::Normal,
                _ => {}
            },
            ScanState::Normal => match ch {
                '\\' => self.state = ScanState::Escaped { quoted: false },
                '"' => self.state = ScanState::Quoted,
                '{' | '(' => self.depth += 1,
                // Tolerate imbalance rather than panicking on malformed output.
                '}' | ')' => self.depth = self.depth.saturating_sub(1),
                _ => {}
            },
        }
    }
}

/// Split `input` on `delim` occurrences at depth zero, outside quotes.
///
/// Parts are trimmed. A trailing empty part is dropped; interior empty parts
/// are kept so callers can decide how to treat them.
pub(crate) fn split_top_level(input: &str, delim: char) -> Vec<String> {
    let mut scanner = Scanner::new();
    let mut parts = Vec::new();
    let mut current = String::new();

    for ch in input.chars() {
        if scanner.at_top_level() && ch == delim {
            parts.push(current.trim().to_string());
            current.clear();
            continue;
        }
        scanner.step(ch);
        current.push(ch);
    }

    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }

    parts
}

/// Byte index of the first colon at depth zero, outside quotes.
///
/// This is the key/value separator of a record pair; colons inside quoted
/// values or nested structures never match.
pub(crate) fn find_separator(pair: &str) -> Option<usize> {
    let mut scanner = Scanner::new();
    for (idx, ch) in pair.char_indices() {
        if scanner.at_top_level() && ch == ':' {
            return Some(idx);
        }
        scanner.step(ch);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_simple() {
        assert_eq!(split_top_level("a, b, c", ','), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_split_empty_input() {
        assert!(split_top_level("", ',').is_empty());
    }

    #[test]
    fn test_split_comma_inside_quotes() {
        assert_eq!(
            split_top_level(r#"name:"a, b", id:1"#, ','),
            vec![r#"name:"a, b""#, "id:1"]
        );
    }

    #[test]
    fn test_split_comma_inside_nested_braces() {
        assert_eq!(
            split_top_level("tags:{errand, home}, id:1", ','),
            vec!["tags:{errand, home}", "id:1"]
        );
    }

    #[test]
    fn test_split_comma_inside_parens() {
        assert_eq!(
            split_top_level("due date:(current date) + (1 * days), id:1", ','),
            vec!["due date:(current date) + (1 * days)", "id:1"]
        );
    }

    #[test]
    fn test_split_escaped_quote_does_not_close_string() {
        assert_eq!(
            split_top_level(r#"name:"say \", then, go", id:1"#, ','),
            vec![r#"name:"say \", then, go""#, "id:1"]
        );
    }

    #[test]
    fn test_split_keeps_interior_empty_parts() {
        assert_eq!(split_top_level("a,,b", ','), vec!["a", "", "b"]);
    }

    #[test]
    fn test_split_drops_trailing_empty_part() {
        assert_eq!(split_top_level("a, b, ", ','), vec!["a", "b"]);
    }

    #[test]
    fn test_find_separator_simple() {
        assert_eq!(find_separator("name:value"), Some(4));
    }

    #[test]
    fn test_find_separator_ignores_quoted_colon() {
        assert_eq!(find_separator(r#""a:b":value"#), Some(5));
    }

    #[test]
    fn test_find_separator_first_wins() {
        // The value itself contains a nested record with colons.
        let pair = r#"child:{name:"x"}"#;
        assert_eq!(find_separator(pair), Some(5));
    }

    #[test]
    fn test_find_separator_none() {
        assert_eq!(find_separator(r#""no colon here""#), None);
    }

    #[test]
    fn test_scanner_depth_saturates_on_imbalance() {
        let mut scanner = Scanner::new();
        scanner.step('}');
        assert!(scanner.at_top_level());
    }

    #[test]
    fn test_scanner_escape_outside_quotes() {
        let mut scanner = Scanner::new();
        scanner.step('\\');
        scanner.step('"');
        // The escaped quote did not open a string.
        assert!(scanner.at_top_level());
    }
}
