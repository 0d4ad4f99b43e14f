//! Service layer for the collector.
//!
//! This module contains the business logic for:
//! - Page fetching behind the shared rate limiter (`HttpFetcher`)
//! - Game log and box score extraction (`GameLogParser`)
//! - Collecting one team-season into a checkpoint (`UnitCollector`)

mod collector;
mod extractor;
mod fetcher;

pub use collector::{CollectOutcome, UnitCollector};
pub use extractor::{ExtractionAdapter, GameLogParser};
pub use fetcher::{FetchOutcome, HttpFetcher, PageFetcher};
