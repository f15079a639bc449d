//! Error types for carelog data model.

use thiserror::Error;

/// A pending action was rejected before it reached storage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Target URL was empty or whitespace.
    #[error("target url must not be empty")]
    EmptyTargetUrl,

    /// An edit of an existing resource did not say which resource.
    #[error("{method} action requires a resource id")]
    MissingResourceId {
        /// The method that needs a resource id.
        method: String,
    },

    /// The body was not a record.
    #[error("{method} action body must be a record")]
    InvalidBody {
        /// The method whose body was rejected.
        method: String,
    },

    /// Header name was empty.
    #[error("header names must not be empty")]
    EmptyHeaderName,
}

/// Persistence encoding errors.
#[derive(Debug, Error)]
pub enum CodecError {
    /// MessagePack serialization failed
    #[error("encoding failed: {0}")]
    Encode(#[source] rmp_serde::encode::Error),

    /// MessagePack deserialization failed
    #[error("decoding failed: {0}")]
    Decode(#[source] rmp_serde::decode::Error),
}
