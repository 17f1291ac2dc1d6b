//! Two-way task sync engine.
//!
//! A pass fetches one remote collection, reconciles it against the local
//! store, applies the outcome in a single commit, and pushes every local
//! task back. Metadata the remote service has no native field for travels
//! encoded in each record's notes.

pub mod metadata;
mod orchestrator;
mod provider;
pub mod reconcile;
pub mod resolve;

pub use metadata::Metadata;
pub use orchestrator::{PushFailure, SyncError, SyncOrchestrator, SyncOutcome, SyncReport};
pub use provider::{ProviderError, ProviderResult, TaskProvider};
pub use reconcile::{reconcile, Reconciliation};
pub use resolve::{resolve, resolve_with, ConflictEffect, Resolution};
