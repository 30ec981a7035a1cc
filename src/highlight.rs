// SPDX-License-Identifier: MIT OR Apache-2.0

//! Splitting a line into matched and unmatched spans
//!
//! The highlight pattern comes straight from the user, so it may not compile.
//! In that case the line is returned as a single unmatched span instead of
//! failing the whole render.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Leading inline flag groups such as `(?i)` or `(?im)`
static FLAG_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\(\?[A-Za-z]+\))+").expect("flag prefix regex"));

/// A contiguous piece of a line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span<'a> {
    pub text: &'a str,
    pub is_match: bool,
}

impl<'a> Span<'a> {
    fn plain(text: &'a str) -> Self {
        Self {
            text,
            is_match: false,
        }
    }

    fn matched(text: &'a str) -> Self {
        Self {
            text,
            is_match: true,
        }
    }
}

/// Wrap the pattern in one capturing group, keeping leading flags outside
///
/// `(?i)foo|bar` becomes `(?i)(foo|bar)`.
pub fn normalize_pattern(pattern: &str) -> String {
    let flags_end = FLAG_PREFIX.find(pattern).map_or(0, |m| m.end());
    let (flags, body) = pattern.split_at(flags_end);
    format!("{flags}({body})")
}

/// Compiled highlight pattern, reused for every line of a session
#[derive(Debug, Clone)]
pub struct Highlighter {
    regex: Option<Regex>,
}

impl Highlighter {
    pub fn new(pattern: &str) -> Self {
        let normalized = normalize_pattern(pattern);
        let regex = match Regex::new(&normalized) {
            Ok(regex) => Some(regex),
            Err(e) => {
                debug!(pattern, error = %e, "highlight pattern does not compile, not highlighting");
                None
            }
        };
        Self { regex }
    }

    /// A highlighter that never matches
    pub fn disabled() -> Self {
        Self { regex: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.regex.is_some()
    }

    /// Partition `text` into spans, in order, with no gaps
    ///
    /// Always returns at least one span. Empty matches are not reported.
    pub fn tokenize<'t>(&self, text: &'t str) -> Vec<Span<'t>> {
        let Some(regex) = &self.regex else {
            return vec![Span::plain(text)];
        };

        let mut spans = Vec::new();
        let mut prev_end = 0;
        for caps in regex.captures_iter(text) {
            let Some(m) = caps.get(1) else { continue };
            if m.is_empty() {
                continue;
            }
            if m.start() > prev_end {
                spans.push(Span::plain(&text[prev_end..m.start()]));
            }
            spans.push(Span::matched(m.as_str()));
            prev_end = m.end();
        }
        if prev_end < text.len() || spans.is_empty() {
            spans.push(Span::plain(&text[prev_end..]));
        }
        spans
    }
}

/// One-shot form of [`Highlighter::tokenize`]
pub fn tokenize<'t>(pattern: &str, text: &'t str) -> Vec<Span<'t>> {
    Highlighter::new(pattern).tokenize(text)
}
