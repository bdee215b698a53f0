//! Logging helpers. Artifact names and display names come from users and the
//! platform; they are escaped before they reach a log line so that every
//! record stays on one line.

use std::fmt::Write;

/// Longest preview written to the log before truncating with an ellipsis.
pub const MAX_LOG_PREVIEW: usize = 120;

/// Escape a string for single-line logging.
///
/// Backslash, newline, carriage return and tab get their usual escapes; any
/// other control character is written as `\xNN`. Output is capped at
/// [`MAX_LOG_PREVIEW`] characters.
pub fn escape_log(s: &str) -> String {
    let mut out = String::with_capacity(s.len().min(MAX_LOG_PREVIEW) + 4);
    for (count, ch) in s.chars().enumerate() {
        if count == MAX_LOG_PREVIEW {
            out.push('…');
            break;
        }
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(out, "\\x{:02X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_control_characters() {
        assert_eq!(escape_log("Golden\nAmulet\t\u{1}"), "Golden\\nAmulet\\t\\x01");
        assert_eq!(escape_log("a\\b"), "a\\\\b");
    }

    #[test]
    fn truncates_long_input() {
        let long = "z".repeat(MAX_LOG_PREVIEW + 10);
        let esc = escape_log(&long);
        assert_eq!(esc.chars().count(), MAX_LOG_PREVIEW + 1);
        assert!(esc.ends_with('…'));
    }
}
