// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Error taxonomy for query compilation, execution and document commits.
//!
//! Two layers:
//!
//! - [`TransportError`]: raised by a [`SearchService`](crate::transport::SearchService)
//!   implementation when the remote call itself fails.
//! - [`SearchError`]: everything this crate surfaces to its callers. Transport
//!   failures are wrapped, never retried here.

use thiserror::Error;

use crate::schema::EdmType;

/// Failure reported by the search transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Search service unavailable: {0}")]
    Unavailable(String),
    #[error("Search service returned HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Search service request timed out")]
    Timeout,
    #[error("Search service backend error: {0}")]
    Backend(String),
}

impl TransportError {
    /// Whether a retrying transport may try the same request again.
    ///
    /// Throttling (429) and server-side (5xx) statuses are transient, client
    /// errors are not.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Unavailable(_) | Self::Timeout => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Backend(_) => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum SearchError {
    /// Field has no schema entry. Callers absorb this into a pass-through or
    /// a match-nothing filter; it only escapes from explicit schema lookups.
    #[error("Field '{0}' is not declared in the index schema")]
    SchemaFieldNotFound(String),

    #[error(
        "Field '{field}' with value '{value}' of type '{value_type}' cannot be converted \
         to type '{target}' declared for the field in the schema: {reason}"
    )]
    UnsupportedConversion {
        field: String,
        value: String,
        value_type: &'static str,
        target: EdmType,
        reason: String,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Malformed search response: {0}")]
    MalformedResponse(String),

    #[error("[Index={index}] Commit failed, {requeued} documents returned to pending: {source}")]
    PartialCommitFailure {
        index: String,
        requeued: usize,
        #[source]
        source: TransportError,
    },

    #[error("Sequence contains no elements")]
    SequenceEmpty,

    #[error("Sequence contains more than one element")]
    MoreThanOneElement,

    #[error("Index {index} was out of range for a sequence of {len} elements")]
    ElementIndexOutOfRange { index: usize, len: usize },

    #[error("ElementAt({index}) expects at most one row, the service returned {rows}")]
    AmbiguousElementAt { index: usize, rows: usize },
}

impl From<serde_json::Error> for SearchError {
    fn from(e: serde_json::Error) -> Self {
        Self::MalformedResponse(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SearchError>;
