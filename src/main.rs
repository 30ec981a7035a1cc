// SPDX-License-Identifier: MIT OR Apache-2.0

//! dcs - Debian Code Search command-line client

mod cli;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use colored::Colorize;
use std::io::{self, IsTerminal};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use cli::{Cli, ColorMode};
use dcs::config::Config;
use dcs::errors::{exit_status, user_facing};
use dcs::pager::Pager;
use dcs::style::{AnsiStyle, PlainStyle, Style};

fn init_tracing() {
    let filter = EnvFilter::try_from_env("DCS_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    if let Some(shell) = cli.completions {
        clap_complete::generate(shell, &mut Cli::command(), "dcs", &mut io::stdout());
        return Ok(());
    }

    let file_config = Config::load();
    let config = file_config.client_config(cli.host.as_deref(), cli.delay);
    let query = cli.build_query(file_config.merge_context(cli.context));
    debug!(query = %query.text, pattern = %query.highlight_pattern, context = query.context, "query built");

    if cli.web_browser {
        return dcs::browser::open(&config, &query.text);
    }

    let color_mode = cli
        .color
        .or_else(|| file_config.color.as_deref().and_then(ColorMode::from_config))
        .unwrap_or_default();

    let mut pager = Pager::spawn(file_config.pager.as_deref())?;
    let use_color = color_mode.enabled(pager.is_some());
    colored::control::set_override(use_color);
    let ansi;
    let style: &dyn Style = if use_color {
        ansi = AnsiStyle::new();
        &ansi
    } else {
        &PlainStyle
    };

    let outcome = match pager.as_mut() {
        Some(pager) => dcs::run_query(&config, &query, style, pager, true),
        None => dcs::run_query(&config, &query, style, &mut io::stdout().lock(), false),
    };
    let paged = pager.map_or(Ok(()), Pager::finish);

    match outcome {
        Ok(summary) => {
            debug!(
                results = summary.results,
                pages = summary.pages,
                records = summary.records,
                "session finished"
            );
            paged
        }
        Err(err) => match exit_status(&err) {
            Some(code) => {
                match user_facing(&err) {
                    Some(session_err) => {
                        eprintln!("{} {}", "DCS error:".red().bold(), session_err)
                    }
                    None => debug!("output closed by reader"),
                }
                std::process::exit(code);
            }
            None => Err(err),
        },
    }
}
