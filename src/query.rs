// SPDX-License-Identifier: MIT OR Apache-2.0

//! Building the query sent to the server from command-line tokens
//!
//! Search keywords (`package:foo`, `-path:test/` ...) are passed through
//! untouched after the regular expression built from the remaining tokens.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::render::MAX_CONTEXT;

static KEYWORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?(?:filetype|package|pkg|path):").expect("keyword regex"));

/// Whether a token is a server-side search keyword
pub fn is_keyword(token: &str) -> bool {
    KEYWORD.is_match(token)
}

/// Clamp a requested context size into what the server provides
pub fn clamp_context(requested: i64) -> usize {
    // MAX_CONTEXT is tiny, the cast back is lossless
    requested.clamp(0, MAX_CONTEXT as i64) as usize
}

/// How the pattern tokens are turned into a regular expression
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryOptions {
    pub ignore_case: bool,
    pub word_regexp: bool,
    pub fixed_string: bool,
}

/// A finalized query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// Sent to the server
    pub text: String,
    /// Regular expression used to highlight matches locally
    pub highlight_pattern: String,
    /// Context lines on each side of a match, at most [`MAX_CONTEXT`]
    pub context: usize,
}

impl Query {
    pub fn build<S: AsRef<str>>(tokens: &[S], options: QueryOptions, context: i64) -> Self {
        let (keywords, words): (Vec<&str>, Vec<&str>) = tokens
            .iter()
            .map(AsRef::as_ref)
            .partition(|token| is_keyword(token));

        let mut pattern = words.join(" ");
        if options.fixed_string {
            pattern = regex::escape(&pattern);
        }
        if options.word_regexp {
            if pattern.contains('|') {
                pattern = format!("(?:{pattern})");
            }
            pattern = format!(r"\b{pattern}\b");
        }
        if options.ignore_case {
            pattern = format!("(?i){pattern}");
        }

        let text = std::iter::once(pattern.as_str())
            .chain(keywords.iter().copied())
            .collect::<Vec<_>>()
            .join(" ");

        Self {
            text,
            highlight_pattern: pattern,
            context: clamp_context(context),
        }
    }
}
