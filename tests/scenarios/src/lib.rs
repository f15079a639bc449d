//! # carelog-sync-scenarios
//!
//! End-to-end scenarios for carelog offline sync.
//!
//! Each scenario drives a [`harness::Device`] (an on-disk queue and conflict
//! store) against a shared in-memory server and checks the outcome with the
//! pure helpers in [`assertions`]:
//! - App restarts between enqueue and sync
//! - Flaky or slow networks
//! - Concurrent server edits and their resolution

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod assertions;
pub mod harness;

#[cfg(test)]
mod scenarios;
