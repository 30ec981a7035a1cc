// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fetching result resources of a finished query
//!
//! Page fetches are spaced at least `ClientConfig::delay` apart. The package
//! list is a single request and is not throttled.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::config::ClientConfig;
use crate::protocol::{MatchRecord, PackageList};

/// Blocking request/response access to result resources
pub trait ResultTransport {
    /// GET `url` and return the response body
    fn get(&self, url: &str) -> Result<String>;
}

impl<T: ResultTransport + ?Sized> ResultTransport for &T {
    fn get(&self, url: &str) -> Result<String> {
        (**self).get(url)
    }
}

/// HTTPS transport
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client })
    }
}

impl ResultTransport for HttpTransport {
    fn get(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send()?.error_for_status()?;
        Ok(response.text()?)
    }
}

/// Time source for the throttle
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration)
    }
}

/// Fetches the package list and numbered result pages of one query
pub struct PageFetcher<'a, T, C> {
    config: &'a ClientConfig,
    transport: T,
    clock: C,
    last_fetch: Option<Instant>,
}

impl<'a, T: ResultTransport, C: Clock> PageFetcher<'a, T, C> {
    pub fn new(config: &'a ClientConfig, transport: T, clock: C) -> Self {
        Self {
            config,
            transport,
            clock,
            last_fetch: None,
        }
    }

    pub fn fetch_packages(&mut self, query_id: &str) -> Result<Vec<String>> {
        let list: PackageList = self.get_json(query_id, "packages")?;
        Ok(list.packages)
    }

    /// Fetch page `page_index`, waiting out the throttle first
    pub fn fetch_page(&mut self, query_id: &str, page_index: usize) -> Result<Vec<MatchRecord>> {
        self.throttle();
        self.last_fetch = Some(self.clock.now());
        self.get_json(query_id, &format!("page_{page_index}"))
    }

    fn throttle(&self) {
        let Some(last) = self.last_fetch else { return };
        let elapsed = self.clock.now().saturating_duration_since(last);
        if elapsed < self.config.delay {
            let wait = self.config.delay - elapsed;
            debug!(?wait, "throttling page fetch");
            self.clock.sleep(wait);
        }
    }

    fn get_json<R: DeserializeOwned>(&self, query_id: &str, resource: &str) -> Result<R> {
        let url = self.config.results_url(query_id, resource);
        debug!(%url, "fetching");
        let body = self
            .transport
            .get(&url)
            .with_context(|| format!("failed to fetch <{url}>"))?;
        serde_json::from_str(&body).with_context(|| format!("malformed response from <{url}>"))
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{FakeTransport, ManualClock};
    use super::*;

    fn config() -> ClientConfig {
        ClientConfig {
            host: "dcs.test".to_string(),
            user_agent: "test".to_string(),
            delay: Duration::from_millis(200),
        }
    }

    fn transport() -> FakeTransport {
        FakeTransport::default()
            .with("https://dcs.test/results/q/packages.json", r#"{"Packages":["foo","bar"]}"#)
            .with("https://dcs.test/results/q/page_0.json", "[]")
            .with("https://dcs.test/results/q/page_1.json", "[]")
    }

    #[test]
    fn close_fetches_wait_out_the_delay() {
        let config = config();
        let clock = ManualClock::new();
        let transport = transport();
        let mut fetcher = PageFetcher::new(&config, &transport, &clock);

        fetcher.fetch_page("q", 0).expect("page 0");
        clock.advance(Duration::from_millis(10));
        fetcher.fetch_page("q", 1).expect("page 1");

        let sleeps = clock.sleeps.borrow();
        assert_eq!(sleeps.len(), 1);
        assert!(sleeps[0] >= Duration::from_millis(190));
    }

    #[test]
    fn spaced_fetches_do_not_wait() {
        let config = config();
        let clock = ManualClock::new();
        let transport = transport();
        let mut fetcher = PageFetcher::new(&config, &transport, &clock);

        fetcher.fetch_page("q", 0).expect("page 0");
        clock.advance(Duration::from_millis(250));
        fetcher.fetch_page("q", 1).expect("page 1");

        assert!(clock.sleeps.borrow().is_empty());
    }

    #[test]
    fn first_page_and_packages_are_not_throttled() {
        let config = config();
        let clock = ManualClock::new();
        let transport = transport();
        let mut fetcher = PageFetcher::new(&config, &transport, &clock);

        let packages = fetcher.fetch_packages("q").expect("packages");
        assert_eq!(packages, vec!["foo", "bar"]);
        fetcher.fetch_page("q", 0).expect("page 0");

        assert!(clock.sleeps.borrow().is_empty());
        assert_eq!(
            *transport.requests.borrow(),
            vec![
                "https://dcs.test/results/q/packages.json",
                "https://dcs.test/results/q/page_0.json"
            ]
        );
    }

    #[test]
    fn failure_names_the_url() {
        let config = config();
        let transport = FakeTransport::default();
        let mut fetcher = PageFetcher::new(&config, &transport, ManualClock::new());

        let err = fetcher.fetch_page("q", 7).unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("<https://dcs.test/results/q/page_7.json>"));
        assert!(message.contains("404"));
        assert_eq!(transport.requests.borrow().len(), 1);
    }

    #[test]
    fn malformed_body_is_an_error() {
        let config = config();
        let transport =
            FakeTransport::default().with("https://dcs.test/results/q/page_0.json", "{oops");
        let mut fetcher = PageFetcher::new(&config, &transport, ManualClock::new());
        assert!(fetcher.fetch_page("q", 0).is_err());
    }
}
