// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for a search session
//!
//! The two errors the server reports about a query are user facing: the
//! binary prints them and exits non-zero. Everything else in [`SessionError`]
//! means the server said something this client does not understand.

use std::io;

use thiserror::Error;

/// Exit status used when the output pipe was closed by the reader
pub const BROKEN_PIPE_EXIT_CODE: i32 = 128 + 13;

/// Classified failures of one query session
#[derive(Debug, Error)]
pub enum SessionError {
    /// The server rejected the query expression
    #[error("invalid query")]
    InvalidQuery,

    /// The server has no backend to run the query on
    #[error("backend server is not available")]
    BackendUnavailable,

    /// An `error` message with a subtype this client does not know
    #[error("unrecognized server error type {error_type:?}: {raw}")]
    UnknownServerError { error_type: String, raw: String },

    /// A message whose `Type` this client does not know
    #[error("unrecognized message from server: {raw}")]
    ProtocolViolation { raw: String },

    /// The server hung up before the results were available
    #[error("connection closed before the query completed")]
    ConnectionClosed,
}

impl SessionError {
    /// True for errors the server reports about the user's query
    pub fn is_user_facing(&self) -> bool {
        matches!(self, Self::InvalidQuery | Self::BackendUnavailable)
    }
}

/// Check whether an error was caused by writing to a closed pipe
pub fn is_broken_pipe(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<io::Error>()
            .is_some_and(|e| e.kind() == io::ErrorKind::BrokenPipe)
    })
}

/// The session error to show the user as `DCS error: ...`, if any
pub fn user_facing(err: &anyhow::Error) -> Option<&SessionError> {
    err.downcast_ref::<SessionError>()
        .filter(|session_err| session_err.is_user_facing())
}

/// Exit status the binary uses for an error it handles itself
///
/// `None` means the error propagates out of `main` with its context chain.
pub fn exit_status(err: &anyhow::Error) -> Option<i32> {
    if is_broken_pipe(err) {
        Some(BROKEN_PIPE_EXIT_CODE)
    } else if user_facing(err).is_some() {
        Some(1)
    } else {
        None
    }
}
