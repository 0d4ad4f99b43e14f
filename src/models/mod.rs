// src/models/mod.rs

//! Domain models for the collector application.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod game;
mod unit;

// Re-export all public types
pub use config::{
    CompiledSelectors, Config, CrawlerConfig, ParserConfig, PathsConfig, RateLimitConfig,
};
pub use game::{Checkpoint, CollectedRow, GameStub, RowSkip};
pub use unit::{Exclusion, Rename, UnitKey, UnitTable};
