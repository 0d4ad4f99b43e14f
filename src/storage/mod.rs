//! Storage abstractions.
//!
//! Two stores with different lifetimes:
//! - Checkpoints: one immutable snapshot per collected unit, the resumption
//!   signal for the collector (`local`)
//! - Relational store: normalized games, officials and assignments in SQLite,
//!   the source of truth once a unit is committed (`sqlite`)

pub mod local;
mod schema;
pub mod sqlite;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Checkpoint, UnitKey};

// Re-export for convenience
pub use local::LocalCheckpointStore;
pub use sqlite::{DateSpan, GameStore, Record, StoreCounts, WriteMode, WriteOutcome};

/// Key-addressed, durable checkpoint storage.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn exists(&self, unit: &UnitKey) -> Result<bool>;

    /// Fails with `NotFound` when no checkpoint was saved for `unit`.
    async fn load(&self, unit: &UnitKey) -> Result<Checkpoint>;

    /// Save under the checkpoint's own unit key, replacing any previous one.
    async fn save(&self, checkpoint: &Checkpoint) -> Result<()>;

    /// Every unit with a stored checkpoint.
    async fn list(&self) -> Result<Vec<UnitKey>>;

    /// Returns whether a checkpoint was removed.
    async fn remove(&self, unit: &UnitKey) -> Result<bool>;
}
