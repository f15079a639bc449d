//! # sync-core
//!
//! Pure reconciliation logic for carelog (no I/O, instant tests).
//!
//! This crate decides what happens when a locally queued mutation meets
//! the current server state, without any network or disk I/O.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects. This enables:
//! - Instant unit tests (no mocks, no async)
//! - Deterministic behavior (same input → same output)
//! - Easy reasoning about conflict outcomes
//!
//! The actual I/O (fetching server state, replaying requests, persisting
//! conflicts) is performed by `sync-client`, which acts on the decisions
//! produced here.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod detector;
pub mod merge;
pub mod resolution;
pub mod state;
pub mod strategy;

pub use detector::{detect, detect_at, Detection, STALENESS_THRESHOLD_HOURS};
pub use merge::{FieldMergeDecision, FieldSource, MergeEngine, MergeResult, COMBINE_SEPARATOR};
pub use resolution::{
    AutoResolution, AutoResolutionEngine, AutoResolutionPreferences, ConflictInput,
    FieldDifference, ResolutionReason,
};
pub use state::{ActionEvent, ActionOutcome, ActionState, ActionStep};
pub use strategy::{is_meta_field, MergeStrategy, StrategyTable, META_FIELDS, TIMESTAMP_FIELD};
