use std::borrow::Cow;

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const ELLIPSIS: char = '…';

/// Removes terminal control characters and ANSI escape sequences.
///
/// Provider titles, keywords and bookmark notes are printed straight to the
/// terminal, so escape sequences (`\x1b[...m`, OSC `\x1b]...\x07`) are
/// dropped along with every other control character. Newlines and tabs are
/// dropped too: every value handled here renders on a single line.
///
/// Returns `Cow::Borrowed` when nothing needs to change.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    if !s.chars().any(char::is_control) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\x1b' {
            match chars.peek() {
                Some('[') => {
                    chars.next();
                    // CSI: parameters until a final byte in 0x40..=0x7e
                    for c in chars.by_ref() {
                        if ('\x40'..='\x7e').contains(&c) {
                            break;
                        }
                    }
                }
                Some(']') => {
                    chars.next();
                    // OSC: until BEL or ST
                    while let Some(c) = chars.next() {
                        if c == '\x07' {
                            break;
                        }
                        if c == '\x1b' && chars.peek() == Some(&'\\') {
                            chars.next();
                            break;
                        }
                    }
                }
                _ => {}
            }
        } else if !c.is_control() {
            out.push(c);
        }
    }

    Cow::Owned(out)
}

/// Strips control characters, collapses runs of whitespace and trims.
///
/// An input that is blank after cleaning yields `None`.
pub fn clean_text(s: &str) -> Option<String> {
    let stripped = strip_control_chars(s);
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Shortens `s` to at most `max_width` terminal columns, ending with `…`
/// when something was cut.
pub fn truncate_to_width(s: &str, max_width: usize) -> Cow<'_, str> {
    if display_width(s) <= max_width {
        return Cow::Borrowed(s);
    }
    if max_width == 0 {
        return Cow::Borrowed("");
    }

    let budget = max_width - 1;
    let mut used = 0;
    let mut out = String::new();
    for c in s.chars() {
        let w = UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        out.push(c);
    }
    out.push(ELLIPSIS);
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_input_is_borrowed() {
        assert!(matches!(
            strip_control_chars("Flamengo vence"),
            Cow::Borrowed(_)
        ));
    }

    #[test]
    fn test_ansi_sequences_removed() {
        assert_eq!(strip_control_chars("\x1b[31mRed\x1b[0m"), "Red");
        assert_eq!(
            strip_control_chars("\x1b]0;title\x07Topic"),
            "Topic"
        );
        assert_eq!(strip_control_chars("a\x1b]8;;x\x1b\\b"), "ab");
    }

    #[test]
    fn test_control_chars_removed() {
        assert_eq!(strip_control_chars("a\x00b\x7fc"), "abc");
    }

    #[test]
    fn test_clean_text_collapses_whitespace() {
        assert_eq!(
            clean_text("  Copa   do\tBrasil \n").as_deref(),
            Some("Copa do Brasil")
        );
    }

    #[test]
    fn test_clean_text_blank_is_none() {
        assert_eq!(clean_text("   "), None);
        assert_eq!(clean_text("\x1b[0m\n"), None);
    }

    #[test]
    fn test_truncate_fits() {
        assert_eq!(truncate_to_width("Short", 10), "Short");
    }

    #[test]
    fn test_truncate_ascii() {
        assert_eq!(truncate_to_width("Hello World", 6), "Hello…");
    }

    #[test]
    fn test_truncate_wide_chars() {
        // each CJK char is two columns
        assert_eq!(truncate_to_width("你好世界", 5), "你好…");
    }

    #[test]
    fn test_truncate_zero_width() {
        assert_eq!(truncate_to_width("Test", 0), "");
    }
}
