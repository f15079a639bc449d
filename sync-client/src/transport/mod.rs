//! Transport abstraction for carelog.
//!
//! This module provides a pluggable transport layer that abstracts how the
//! client reaches the server (HTTP, mock for testing).
//!
//! # Design
//!
//! The transport trait is request-oriented:
//! - `fetch_current()` reads the server's current copy of a resource
//! - `submit()` replays a queued mutation
//!
//! HTTP 404/406 are surfaced distinctly from other failures: a missing
//! resource is `Ok(None)` from `fetch_current()` and
//! [`TransportError::NotFound`] from `submit()`.
//!
//! # Example
//!
//! ```ignore
//! let transport = MockTransport::new();
//! transport.set_record("/api/logs/42", record);
//! let current = transport.fetch_current("42", "/api/logs/42", &headers).await?;
//! transport.submit(Method::Update, "/api/logs/42", &headers, Some(&body)).await?;
//! ```

mod http;
mod mock;

pub use http::{HttpTransport, HttpTransportConfig};
pub use mock::{MockTransport, SubmittedRequest};

use async_trait::async_trait;
use std::collections::BTreeMap;
use sync_types::{Method, Record};
use thiserror::Error;

/// Transport errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Server reports the resource missing (HTTP 404 or 406).
    #[error("resource not found (HTTP {status})")]
    NotFound {
        /// HTTP status returned.
        status: u16,
    },

    /// Server rejected the request.
    #[error("HTTP {status}: {body}")]
    Http {
        /// HTTP status returned.
        status: u16,
        /// Response body, possibly truncated.
        body: String,
    },

    /// Connection failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Request timed out.
    #[error("request timeout")]
    Timeout,

    /// Response could not be understood.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl TransportError {
    /// Whether the server reported the resource missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Classify an HTTP error status.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        match status {
            404 | 406 => Self::NotFound { status },
            _ => Self::Http {
                status,
                body: body.into(),
            },
        }
    }
}

/// Transport trait for reaching the server.
///
/// Implementations handle the underlying mechanism (HTTP, mock, etc).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch the current server copy of a resource.
    ///
    /// Returns `Ok(None)` when the server reports it missing.
    async fn fetch_current(
        &self,
        resource_id: &str,
        url: &str,
        headers: &BTreeMap<String, String>,
    ) -> Result<Option<Record>, TransportError>;

    /// Send a mutation to the server.
    ///
    /// `body` is `None` for deletes.
    async fn submit(
        &self,
        method: Method,
        url: &str,
        headers: &BTreeMap<String, String>,
        body: Option<&Record>,
    ) -> Result<(), TransportError>;
}
