// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire format of the code search service
//!
//! Session messages are JSON objects discriminated by a `Type` field. A
//! missing `Type` means a plain status message. Unknown types are kept as
//! [`ServerMessage::Unrecognized`] so the driver can refuse them.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::SessionError;

/// First and only message sent by the client
#[derive(Debug, Serialize)]
pub struct QueryRequest {
    #[serde(rename = "Query")]
    pub query: String,
}

impl QueryRequest {
    pub fn new(query_text: &str) -> Self {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("q", query_text)
            .finish();
        Self { query }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).context("failed to encode query message")
    }
}

/// Scan progress; the last one also carries the result count
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Progress {
    #[serde(rename = "FilesProcessed")]
    pub files_processed: u64,
    #[serde(rename = "FilesTotal")]
    pub files_total: u64,
    #[serde(rename = "QueryId", default)]
    pub query_id: String,
    #[serde(rename = "Results", default)]
    pub results: u64,
}

impl Progress {
    pub fn is_complete(&self) -> bool {
        self.files_processed == self.files_total
    }
}

/// Number of result pages available for the query
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Pagination {
    #[serde(rename = "ResultPages")]
    pub result_pages: usize,
}

/// An `error` message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerErrorReport {
    pub error_type: String,
    pub raw: String,
}

impl ServerErrorReport {
    pub fn into_error(self) -> SessionError {
        match self.error_type.as_str() {
            "invalidquery" => SessionError::InvalidQuery,
            "backendunavailable" => SessionError::BackendUnavailable,
            _ => SessionError::UnknownServerError {
                error_type: self.error_type,
                raw: self.raw,
            },
        }
    }
}

/// Every message the session can receive
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    Progress(Progress),
    Pagination(Pagination),
    Error(ServerErrorReport),
    /// No `Type`, or `Type: "default"`
    Status,
    Unrecognized(String),
}

impl ServerMessage {
    pub fn parse(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)
            .with_context(|| format!("malformed message from server: {raw}"))?;
        let kind = value.get("Type").and_then(Value::as_str).unwrap_or("default");

        let message = match kind {
            "progress" => Self::Progress(
                serde_json::from_value(value).with_context(|| format!("bad progress message: {raw}"))?,
            ),
            "pagination" => Self::Pagination(
                serde_json::from_value(value)
                    .with_context(|| format!("bad pagination message: {raw}"))?,
            ),
            "error" => Self::Error(ServerErrorReport {
                error_type: value
                    .get("ErrorType")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                raw: raw.to_string(),
            }),
            "default" => Self::Status,
            _ => Self::Unrecognized(raw.to_string()),
        };
        Ok(message)
    }

    /// Tag used in log output
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Progress(_) => "progress",
            Self::Pagination(_) => "pagination",
            Self::Error(_) => "error",
            Self::Status => "default",
            Self::Unrecognized(_) => "unrecognized",
        }
    }
}

/// `packages.json` of a finished query
#[derive(Debug, Clone, Deserialize)]
pub struct PackageList {
    #[serde(rename = "Packages")]
    pub packages: Vec<String>,
}

/// One hit with two lines of context on each side
///
/// Text fields arrive HTML-entity-encoded.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MatchRecord {
    pub package: String,
    pub path: String,
    #[serde(rename = "line")]
    pub line_number: u64,
    #[serde(rename = "ctxp2", default)]
    pub before_far: String,
    #[serde(rename = "ctxp1", default)]
    pub before_near: String,
    #[serde(rename = "context")]
    pub context_line: String,
    #[serde(rename = "ctxn1", default)]
    pub after_near: String,
    #[serde(rename = "ctxn2", default)]
    pub after_far: String,
    #[serde(rename = "pathrank")]
    pub path_rank: f64,
    #[serde(rename = "ranking")]
    pub rank: f64,
}

impl MatchRecord {
    /// Lines before the match, farthest first
    pub fn context_before(&self) -> [&str; 2] {
        [&self.before_far, &self.before_near]
    }

    /// Lines after the match, nearest first
    pub fn context_after(&self) -> [&str; 2] {
        [&self.after_near, &self.after_far]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_request_encodes_query_string() {
        let json = QueryRequest::new(r"(?i)foo bar path:src/").to_json().expect("json");
        assert_eq!(json, r#"{"Query":"q=%28%3Fi%29foo+bar+path%3Asrc%2F"}"#);
    }

    #[test]
    fn parses_progress_and_completion() {
        let msg = ServerMessage::parse(
            r#"{"Type":"progress","QueryId":"q1","FilesProcessed":3,"FilesTotal":3,"Results":12}"#,
        )
        .expect("parse");
        let ServerMessage::Progress(progress) = msg else {
            panic!("expected progress, got {msg:?}");
        };
        assert!(progress.is_complete());
        assert_eq!(progress.query_id, "q1");
        assert_eq!(progress.results, 12);
    }

    #[test]
    fn parses_pagination() {
        let msg = ServerMessage::parse(r#"{"Type":"pagination","QueryId":"q1","ResultPages":4}"#)
            .expect("parse");
        assert_eq!(msg, ServerMessage::Pagination(Pagination { result_pages: 4 }));
    }

    #[test]
    fn missing_or_default_type_is_status() {
        assert_eq!(ServerMessage::parse(r#"{"Files":1}"#).expect("parse"), ServerMessage::Status);
        assert_eq!(
            ServerMessage::parse(r#"{"Type":"default"}"#).expect("parse"),
            ServerMessage::Status
        );
    }

    #[test]
    fn unknown_type_keeps_raw_message() {
        let raw = r#"{"Type":"bogus"}"#;
        assert_eq!(
            ServerMessage::parse(raw).expect("parse"),
            ServerMessage::Unrecognized(raw.to_string())
        );
    }

    #[test]
    fn error_subtypes_map_to_session_errors() {
        let parse_err = |raw: &str| match ServerMessage::parse(raw).expect("parse") {
            ServerMessage::Error(report) => report.into_error(),
            other => panic!("expected error, got {other:?}"),
        };
        assert!(matches!(
            parse_err(r#"{"Type":"error","ErrorType":"invalidquery"}"#),
            SessionError::InvalidQuery
        ));
        assert!(matches!(
            parse_err(r#"{"Type":"error","ErrorType":"backendunavailable"}"#),
            SessionError::BackendUnavailable
        ));
        assert!(matches!(
            parse_err(r#"{"Type":"error","ErrorType":"cancelled"}"#),
            SessionError::UnknownServerError { ref error_type, .. } if error_type == "cancelled"
        ));
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(ServerMessage::parse("not json").is_err());
        assert!(ServerMessage::parse(r#"{"Type":"pagination"}"#).is_err());
    }

    #[test]
    fn match_record_uses_wire_names() {
        let record: MatchRecord = serde_json::from_str(
            r#"{"package":"foo_1.0","path":"foo_1.0/src/a.c","line":7,
                "ctxp2":"a","ctxp1":"b","context":"c &amp; d","ctxn1":"e","ctxn2":"f",
                "pathrank":0.5,"ranking":0.25}"#,
        )
        .expect("record");
        assert_eq!(record.line_number, 7);
        assert_eq!(record.context_before(), ["a", "b"]);
        assert_eq!(record.context_after(), ["e", "f"]);
        assert_eq!(record.context_line, "c &amp; d");
    }
}
