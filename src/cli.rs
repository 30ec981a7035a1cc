// SPDX-License-Identifier: MIT OR Apache-2.0

//! CLI argument parsing using clap

use clap::{Parser, ValueEnum};
use clap_complete::Shell;
use std::io::{self, IsTerminal};

use dcs::{Query, QueryOptions};

/// dcs - Debian Code Search from the terminal
///
/// Searches all source code in Debian and prints every match with up to two
/// lines of context on each side.
#[derive(Parser, Debug)]
#[command(name = "dcs")]
#[command(
    author,
    version,
    about,
    long_about = None,
    after_help = "Keywords are passed to the server unchanged:\n  dcs 'open\\(' filetype:c -path:test/\n  dcs -iw main package:hello\n\nSet DCS_LOG=debug to trace the session."
)]
pub struct Cli {
    /// Ignore case distinctions
    #[arg(short = 'i', long)]
    pub ignore_case: bool,

    /// Match only whole words
    #[arg(short = 'w', long)]
    pub word_regexp: bool,

    /// Interpret the pattern as a fixed string
    #[arg(short = 'F', long)]
    pub fixed_string: bool,

    /// Lines of context around each match (0-2, default 2)
    #[arg(short = 'C', long, value_name = "N", allow_negative_numbers = true)]
    pub context: Option<i64>,

    /// When to use colors
    #[arg(long, value_enum, value_name = "WHEN")]
    pub color: Option<ColorMode>,

    /// Open the query in a web browser instead
    #[arg(short = 'W', long)]
    pub web_browser: bool,

    /// Minimum time between requests, in ms (default: 200)
    #[arg(long, value_name = "MS")]
    pub delay: Option<u64>,

    /// Code search host
    #[arg(long, hide = true)]
    pub host: Option<String>,

    /// Print shell completions and exit
    #[arg(long, value_enum, value_name = "SHELL", exclusive = true)]
    pub completions: Option<Shell>,

    /// Pattern followed by optional keywords (filetype:, package:, pkg:, path:)
    #[arg(
        value_name = "QUERY",
        required_unless_present = "completions",
        num_args = 1..,
        allow_hyphen_values = true,
        trailing_var_arg = true
    )]
    pub query: Vec<String>,
}

impl Cli {
    pub fn query_options(&self) -> QueryOptions {
        QueryOptions {
            ignore_case: self.ignore_case,
            word_regexp: self.word_regexp,
            fixed_string: self.fixed_string,
        }
    }

    pub fn build_query(&self, context: i64) -> Query {
        Query::build(&self.query, self.query_options(), context)
    }
}

/// Color output mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorMode {
    Never,
    Always,
    #[default]
    Auto,
}

impl ColorMode {
    /// Parse a color mode from the config file
    pub fn from_config(value: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(value, true).ok()
    }

    pub fn enabled(self, paging: bool) -> bool {
        match self {
            ColorMode::Never => false,
            ColorMode::Always => true,
            ColorMode::Auto => {
                std::env::var_os("NO_COLOR").is_none() && (paging || io::stdout().is_terminal())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_and_keywords_parse() {
        let cli = Cli::try_parse_from([
            "dcs", "-i", "-w", "-C", "1", "open", "file", "filetype:c", "-path:test/",
        ])
        .expect("parse");
        assert!(cli.ignore_case && cli.word_regexp && !cli.fixed_string);
        assert_eq!(cli.context, Some(1));

        let query = cli.build_query(1);
        assert_eq!(query.text, r"(?i)\bopen file\b filetype:c -path:test/");
        assert_eq!(query.context, 1);
    }

    #[test]
    fn negative_context_is_accepted_and_clamped() {
        let cli = Cli::try_parse_from(["dcs", "-C", "-1", "x"]).expect("parse");
        assert_eq!(cli.context, Some(-1));
        assert_eq!(cli.build_query(-1).context, 0);
    }

    #[test]
    fn query_is_required() {
        assert!(Cli::try_parse_from(["dcs"]).is_err());
        assert!(Cli::try_parse_from(["dcs", "--completions", "bash"]).is_ok());
    }

    #[test]
    fn color_modes() {
        assert_eq!(ColorMode::from_config("NEVER"), Some(ColorMode::Never));
        assert_eq!(ColorMode::from_config("sometimes"), None);
        assert!(!ColorMode::Never.enabled(true));
        assert!(ColorMode::Always.enabled(false));
    }
}
