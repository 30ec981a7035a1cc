// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rendering of match records
//!
//! Output for one record:
//!
//! ```text
//! path/to/file.c:42:
//! | two lines before
//! | one line before
//! > the matching line
//! | one line after
//! | two lines after
//! (pathrank 0.8123, rank 0.6610)
//!
//! ```

use std::borrow::Cow;
use std::io::{self, Write};

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::highlight::Highlighter;
use crate::protocol::MatchRecord;
use crate::style::{escape_unsafe, Style};

/// Context lines available on each side of a match
pub const MAX_CONTEXT: usize = 2;

static CHARREF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(#[0-9]+;?|#[xX][0-9a-fA-F]+;?|[^\t\n\x0c <&#;]{1,32};?)")
        .expect("charref regex")
});

/// Windows-1252 meanings browsers give to numeric references in 0x80..=0x9f
fn cp1252(num: u32) -> Option<char> {
    let c = match num {
        0x00 => '\u{fffd}',
        0x0d => '\r',
        0x80 => '\u{20ac}',
        0x81 => '\u{81}',
        0x82 => '\u{201a}',
        0x83 => '\u{0192}',
        0x84 => '\u{201e}',
        0x85 => '\u{2026}',
        0x86 => '\u{2020}',
        0x87 => '\u{2021}',
        0x88 => '\u{02c6}',
        0x89 => '\u{2030}',
        0x8a => '\u{0160}',
        0x8b => '\u{2039}',
        0x8c => '\u{0152}',
        0x8d => '\u{8d}',
        0x8e => '\u{017d}',
        0x8f => '\u{8f}',
        0x90 => '\u{90}',
        0x91 => '\u{2018}',
        0x92 => '\u{2019}',
        0x93 => '\u{201c}',
        0x94 => '\u{201d}',
        0x95 => '\u{2022}',
        0x96 => '\u{2013}',
        0x97 => '\u{2014}',
        0x98 => '\u{02dc}',
        0x99 => '\u{2122}',
        0x9a => '\u{0161}',
        0x9b => '\u{203a}',
        0x9c => '\u{0153}',
        0x9d => '\u{9d}',
        0x9e => '\u{017e}',
        0x9f => '\u{0178}',
        _ => return None,
    };
    Some(c)
}

/// Code points a numeric reference may not produce; they decode to nothing
fn is_invalid_reference(num: u32) -> bool {
    matches!(num, 0x1..=0x8 | 0xb | 0xe..=0x1f | 0x7f..=0x9f | 0xfdd0..=0xfdef)
        || num & 0xfffe == 0xfffe
}

fn numeric_reference(digits: &str) -> String {
    let parsed = match digits.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => digits.parse(),
    };
    let num = parsed.unwrap_or(u32::MAX);

    if let Some(c) = cp1252(num) {
        return c.to_string();
    }
    if (0xd800..=0xdfff).contains(&num) || num > 0x10ffff {
        return '\u{fffd}'.to_string();
    }
    if is_invalid_reference(num) {
        return String::new();
    }
    char::from_u32(num).map(String::from).unwrap_or_default()
}

/// Decodes entity-encoded result text the way browsers do
fn decode(text: &str) -> Cow<'_, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }
    CHARREF.replace_all(text, |caps: &Captures| {
        let body = &caps[1];
        match body.strip_prefix('#') {
            Some(number) => numeric_reference(number.trim_end_matches(';')),
            None => html_escape::decode_html_entities(&caps[0]).into_owned(),
        }
    })
}

/// Formats match records for the terminal
pub struct Renderer<'a> {
    style: &'a dyn Style,
    highlighter: Highlighter,
    context: usize,
}

impl<'a> Renderer<'a> {
    pub fn new(style: &'a dyn Style, highlight_pattern: &str, context: usize) -> Self {
        Self {
            style,
            highlighter: Highlighter::new(highlight_pattern),
            context: context.min(MAX_CONTEXT),
        }
    }

    pub fn context(&self) -> usize {
        self.context
    }

    pub fn render<W: Write + ?Sized>(&self, out: &mut W, record: &MatchRecord) -> io::Result<()> {
        let style = self.style;

        writeln!(
            out,
            "{}:{}:",
            escape_unsafe(style, &record.path),
            record.line_number
        )?;

        let before = record.context_before();
        for line in &before[MAX_CONTEXT - self.context..] {
            self.context_line(out, line)?;
        }

        let line = decode(&record.context_line);
        write!(out, "{} ", style.dim(">"))?;
        for span in self.highlighter.tokenize(&line) {
            let text = escape_unsafe(style, span.text);
            if span.is_match {
                write!(out, "{}", style.highlight(&text))?;
            } else {
                write!(out, "{}", style.bold(&text))?;
            }
        }
        writeln!(out)?;

        let after = record.context_after();
        for line in &after[..self.context] {
            self.context_line(out, line)?;
        }

        let ranks = format!(
            "(pathrank {:.4}, rank {:.4})",
            record.path_rank, record.rank
        );
        writeln!(out, "{}", style.dim(&ranks))?;
        writeln!(out)?;
        out.flush()
    }

    fn context_line<W: Write + ?Sized>(&self, out: &mut W, raw: &str) -> io::Result<()> {
        let line = decode(raw);
        writeln!(
            out,
            "{} {}",
            self.style.dim("|"),
            escape_unsafe(self.style, &line)
        )
    }
}

/// Render a single record with a one-off renderer
pub fn render<W: Write + ?Sized>(
    out: &mut W,
    record: &MatchRecord,
    highlight_pattern: &str,
    context_size: usize,
    style: &dyn Style,
) -> io::Result<()> {
    Renderer::new(style, highlight_pattern, context_size).render(out, record)
}
