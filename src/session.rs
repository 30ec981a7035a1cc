// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query session driver
//!
//! Sends the query over the session channel, follows the server's messages
//! until the query is complete, then fetches the package list and every
//! result page and renders the records.
//!
//! Completion (`progress` with all files processed) and the page count
//! (`pagination`) are recorded independently. Fetching starts once both are
//! known, whichever arrives last. A query with zero results ends the session
//! right away.

use anyhow::Result;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::{self, IsTerminal, Write};
use tracing::{debug, trace};

use crate::channel::{MessageChannel, WebSocketChannel};
use crate::config::ClientConfig;
use crate::errors::SessionError;
use crate::fetch::{Clock, HttpTransport, PageFetcher, ResultTransport, SystemClock};
use crate::protocol::{Progress, QueryRequest, ServerMessage};
use crate::query::Query;
use crate::render::Renderer;
use crate::style::{escape_unsafe, Style};

/// State of one live exchange with the server
pub struct Session<C> {
    channel: C,
    query_id: Option<String>,
    result_count: Option<u64>,
    total_pages: Option<usize>,
}

impl<C: MessageChannel> Session<C> {
    pub fn new(channel: C) -> Self {
        Self {
            channel,
            query_id: None,
            result_count: None,
            total_pages: None,
        }
    }

    fn complete(&mut self, progress: Progress) {
        self.query_id = Some(progress.query_id);
        self.result_count = Some(progress.results);
    }

    fn is_complete(&self) -> bool {
        self.result_count.is_some()
    }

    /// Query id and page count once both are known
    fn ready(&self) -> Option<(String, usize)> {
        match (&self.query_id, self.total_pages) {
            (Some(query_id), Some(pages)) => Some((query_id.clone(), pages)),
            _ => None,
        }
    }

    fn close(&mut self) -> Result<()> {
        self.channel.close()
    }
}

/// What a finished session produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub results: u64,
    pub packages: Vec<String>,
    pub pages: usize,
    pub records: usize,
}

/// Drives one query from submission to the last rendered record
pub struct SessionDriver<'a, T, K> {
    query: &'a Query,
    style: &'a dyn Style,
    fetcher: PageFetcher<'a, T, K>,
    renderer: Renderer<'a>,
    progress: ProgressBar,
}

impl<'a, T: ResultTransport, K: Clock> SessionDriver<'a, T, K> {
    pub fn new(
        config: &'a ClientConfig,
        query: &'a Query,
        style: &'a dyn Style,
        transport: T,
        clock: K,
    ) -> Self {
        Self {
            query,
            style,
            fetcher: PageFetcher::new(config, transport, clock),
            renderer: Renderer::new(style, &query.highlight_pattern, query.context),
            progress: ProgressBar::hidden(),
        }
    }

    /// Report scan progress on the given bar
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Run the session to completion; the channel is closed on every path
    pub fn run<C, W>(&mut self, channel: C, out: &mut W) -> Result<SessionSummary>
    where
        C: MessageChannel,
        W: Write + ?Sized,
    {
        let mut session = Session::new(channel);
        let outcome = self.start(&mut session, out);
        self.progress.finish_and_clear();

        match session.close() {
            Err(e) if outcome.is_ok() => Err(e),
            Err(e) => {
                debug!(error = %e, "failed to close session after error");
                outcome
            }
            Ok(()) => outcome,
        }
    }

    fn start<C, W>(&mut self, session: &mut Session<C>, out: &mut W) -> Result<SessionSummary>
    where
        C: MessageChannel,
        W: Write + ?Sized,
    {
        let style = self.style;
        writeln!(
            out,
            "Query: {}",
            style.bold(&escape_unsafe(style, &self.query.text))
        )?;
        out.flush()?;

        let request = QueryRequest::new(&self.query.text).to_json()?;
        session.channel.send_text(&request)?;
        debug!(query = %self.query.text, "query sent");

        self.receive(session, out)
    }

    fn receive<C, W>(&mut self, session: &mut Session<C>, out: &mut W) -> Result<SessionSummary>
    where
        C: MessageChannel,
        W: Write + ?Sized,
    {
        loop {
            let Some(raw) = session.channel.recv_text()? else {
                return Err(SessionError::ConnectionClosed.into());
            };
            let message = ServerMessage::parse(&raw)?;
            trace!(kind = message.kind(), "session message");

            match message {
                ServerMessage::Progress(progress) if !progress.is_complete() => {
                    self.progress.set_length(progress.files_total);
                    self.progress.set_position(progress.files_processed);
                    continue;
                }
                ServerMessage::Progress(progress) => {
                    if session.is_complete() {
                        continue;
                    }
                    self.progress.finish_and_clear();
                    writeln!(out, "Results: {}", progress.results)?;
                    out.flush()?;
                    if progress.results == 0 {
                        debug!("query has no results");
                        return Ok(SessionSummary::default());
                    }
                    session.complete(progress);
                }
                ServerMessage::Pagination(pagination) => {
                    session.total_pages = Some(pagination.result_pages);
                }
                ServerMessage::Error(report) => return Err(report.into_error().into()),
                ServerMessage::Status => continue,
                ServerMessage::Unrecognized(raw) => {
                    return Err(SessionError::ProtocolViolation { raw }.into());
                }
            }

            if !session.is_complete() {
                continue;
            }
            if let Some((query_id, pages)) = session.ready() {
                let results = session.result_count.unwrap_or_default();
                return self.fetch_results(&query_id, pages, results, out);
            }
        }
    }

    fn fetch_results<W: Write + ?Sized>(
        &mut self,
        query_id: &str,
        pages: usize,
        results: u64,
        out: &mut W,
    ) -> Result<SessionSummary> {
        let packages = self.fetcher.fetch_packages(query_id)?;
        writeln!(
            out,
            "Packages: {} ({})",
            packages.len(),
            escape_unsafe(self.style, &packages.join(" "))
        )?;
        writeln!(out)?;
        out.flush()?;

        let mut records = 0;
        for page in 0..pages {
            let items = self.fetcher.fetch_page(query_id, page)?;
            for item in &items {
                self.renderer.render(out, item)?;
            }
            records += items.len();
        }
        debug!(pages, records, "all pages rendered");

        Ok(SessionSummary {
            results,
            packages,
            pages,
            records,
        })
    }
}

/// Spinner for the scan phase; hidden when stderr is not a terminal or a
/// pager owns the screen
fn scan_progress_bar(paging: bool) -> ProgressBar {
    if paging || !io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::stderr());
    if let Ok(style) = ProgressStyle::with_template("{spinner} scanning {pos}/{len} files") {
        bar.set_style(style);
    }
    bar
}

/// Open a session to the configured server and run `query` to completion
///
/// `paging` is set when `out` feeds a pager on the same terminal.
pub fn run_query<W: Write + ?Sized>(
    config: &ClientConfig,
    query: &Query,
    style: &dyn Style,
    out: &mut W,
    paging: bool,
) -> Result<SessionSummary> {
    let transport = HttpTransport::new(config)?;
    let channel = WebSocketChannel::connect(config)?;
    SessionDriver::new(config, query, style, transport, SystemClock)
        .with_progress(scan_progress_bar(paging))
        .run(channel, out)
}
