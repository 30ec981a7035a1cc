// SPDX-License-Identifier: MIT OR Apache-2.0

//! Output styling
//!
//! The renderer only talks to [`Style`]. [`AnsiStyle`] emits terminal escape
//! sequences, [`PlainStyle`] emits the text unchanged.

use colored::Colorize;
use std::borrow::Cow;

const REVERSE_ON: &str = "\x1b[7m";
const REVERSE_OFF: &str = "\x1b[27m";

/// Named accents used by the result renderer
pub trait Style {
    fn dim(&self, text: &str) -> String;
    fn bold(&self, text: &str) -> String;
    /// Bold text in the match accent color
    fn highlight(&self, text: &str) -> String;
    /// Reverse video, closed without resetting surrounding attributes
    fn reverse(&self, text: &str) -> String;
}

/// ANSI escape sequences
///
/// Constructing one forces `colored` output on, whatever `NO_COLOR` or tty
/// detection would say.
#[derive(Debug, Clone, Copy)]
pub struct AnsiStyle {
    _forced: (),
}

impl AnsiStyle {
    pub fn new() -> Self {
        colored::control::set_override(true);
        Self { _forced: () }
    }
}

impl Default for AnsiStyle {
    fn default() -> Self {
        Self::new()
    }
}

impl Style for AnsiStyle {
    fn dim(&self, text: &str) -> String {
        text.dimmed().to_string()
    }

    fn bold(&self, text: &str) -> String {
        text.bold().to_string()
    }

    fn highlight(&self, text: &str) -> String {
        text.bold().yellow().to_string()
    }

    fn reverse(&self, text: &str) -> String {
        format!("{REVERSE_ON}{text}{REVERSE_OFF}")
    }
}

/// No styling at all
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainStyle;

impl Style for PlainStyle {
    fn dim(&self, text: &str) -> String {
        text.to_string()
    }

    fn bold(&self, text: &str) -> String {
        text.to_string()
    }

    fn highlight(&self, text: &str) -> String {
        text.to_string()
    }

    fn reverse(&self, text: &str) -> String {
        text.to_string()
    }
}

/// Characters that must never reach the terminal verbatim
fn is_unsafe(ch: char) -> bool {
    ch.is_control() || matches!(ch, '\u{202A}'..='\u{202E}' | '\u{2066}'..='\u{2069}')
}

fn visible_form(ch: char) -> String {
    match ch {
        '\t' => "\t".to_string(),
        c if (c as u32) < 0x20 || c == '\x7f' => {
            format!("^{}", char::from((c as u8) ^ 0x40))
        }
        c => format!("<U+{:04X}>", c as u32),
    }
}

/// Replace control characters with a visible reverse-video notation
///
/// Tabs stay tabs inside the reverse-video markers, other C0 controls and DEL
/// use caret notation (`^G`), anything else is shown as `<U+XXXX>`.
pub fn escape_unsafe<'a>(style: &dyn Style, text: &'a str) -> Cow<'a, str> {
    if !text.chars().any(is_unsafe) {
        return Cow::Borrowed(text);
    }

    let mut escaped = String::with_capacity(text.len() + 16);
    for ch in text.chars() {
        if is_unsafe(ch) {
            escaped.push_str(&style.reverse(&visible_form(ch)));
        } else {
            escaped.push(ch);
        }
    }
    Cow::Owned(escaped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_text_is_borrowed() {
        let escaped = escape_unsafe(&AnsiStyle::new(), "fn main() {}");
        assert!(matches!(escaped, Cow::Borrowed(_)));
    }

    #[test]
    fn tab_is_wrapped_in_reverse_video() {
        let escaped = escape_unsafe(&AnsiStyle::new(), "a\tb");
        assert_eq!(escaped, "a\x1b[7m\t\x1b[27mb");
    }

    #[test]
    fn c0_and_del_use_caret_notation() {
        assert_eq!(escape_unsafe(&AnsiStyle::new(), "\u{7}"), "\x1b[7m^G\x1b[27m");
        assert_eq!(escape_unsafe(&AnsiStyle::new(), "\x1b[2J"), "\x1b[7m^[\x1b[27m[2J");
        assert_eq!(escape_unsafe(&AnsiStyle::new(), "\x7f"), "\x1b[7m^?\x1b[27m");
        assert_eq!(escape_unsafe(&AnsiStyle::new(), "\0"), "\x1b[7m^@\x1b[27m");
    }

    #[test]
    fn c1_and_bidi_controls_use_code_points() {
        assert_eq!(escape_unsafe(&AnsiStyle::new(), "\u{85}"), "\x1b[7m<U+0085>\x1b[27m");
        assert_eq!(
            escape_unsafe(&AnsiStyle::new(), "x\u{202E}y"),
            "x\x1b[7m<U+202E>\x1b[27my"
        );
    }

    #[test]
    fn plain_style_still_escapes_without_markers() {
        assert_eq!(escape_unsafe(&PlainStyle, "bell\u{7}"), "bell^G");
        assert_eq!(escape_unsafe(&PlainStyle, "tab\there"), "tab\there");
        assert!(!escape_unsafe(&PlainStyle, "\u{1b}").contains('\u{1b}'));
    }

    #[test]
    fn plain_style_accents_are_identity() {
        let style = PlainStyle;
        assert_eq!(style.dim("|"), "|");
        assert_eq!(style.bold("x"), "x");
        assert_eq!(style.highlight("x"), "x");
        assert_eq!(style.reverse("x"), "x");
    }

    #[test]
    fn ansi_reverse_does_not_reset_other_attributes() {
        let reversed = AnsiStyle::new().reverse("^G");
        assert!(!reversed.contains("\x1b[0m"));
        assert!(reversed.ends_with("\x1b[27m"));
    }

    #[test]
    fn ansi_accents_are_emitted_without_a_terminal() {
        let style = AnsiStyle::new();
        assert_eq!(style.dim("|"), "\x1b[2m|\x1b[0m");
        assert_eq!(style.bold("x"), "\x1b[1mx\x1b[0m");
        assert_eq!(style.highlight("x"), "\x1b[1;33mx\x1b[0m");
    }
}
