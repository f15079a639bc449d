//! # sync-types
//!
//! Data model for carelog offline health-event sync.
//!
//! This crate provides the foundational types used across all carelog crates:
//! - [`FieldValue`], [`Record`] - Schema-less records with typed values
//! - [`ActionId`], [`ConflictId`] - Identity types
//! - [`PendingAction`], [`PendingActionInput`] - Mutations queued while offline
//! - [`ConflictEntry`] - Durable record of an unresolved discrepancy
//! - [`ValidationError`], [`CodecError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod action;
mod conflict;
mod error;
mod ids;
mod record;

pub use action::{ActionType, Method, PendingAction, PendingActionInput};
pub use conflict::{ConflictEntry, ConflictKind, Resolution, ResourceType};
pub use error::{CodecError, ValidationError};
pub use ids::{ActionId, ConflictId};
pub use record::{FieldValue, Record};

/// Encode a value as MessagePack (named fields) for persistence.
pub fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    rmp_serde::to_vec_named(value).map_err(CodecError::Encode)
}

/// Decode a MessagePack value produced by [`encode`].
pub fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    rmp_serde::from_slice(bytes).map_err(CodecError::Decode)
}
