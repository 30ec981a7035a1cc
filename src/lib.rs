//! dcs - Debian Code Search from the terminal
//!
//! Runs a query against the code search service over its live session
//! protocol, then fetches the result pages and renders every match with its
//! surrounding lines.

pub mod browser;
pub mod channel;
pub mod config;
pub mod errors;
pub mod fetch;
pub mod highlight;
pub mod pager;
pub mod protocol;
pub mod query;
pub mod render;
pub mod session;
pub mod style;

pub use query::{Query, QueryOptions};
pub use session::{run_query, SessionDriver, SessionSummary};
