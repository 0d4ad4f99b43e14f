// src/services/collector.rs

//! Unit collector service.
//!
//! Collects one team-season: fetches the game log, follows every game to its
//! box score for the officiating crew, and checkpoints the result.

use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::{Checkpoint, CollectedRow, GameStub, RowSkip, UnitKey, UnitTable};
use crate::services::{ExtractionAdapter, FetchOutcome, PageFetcher};
use crate::storage::CheckpointStore;

/// How collecting a unit ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectOutcome {
    /// Checkpoint saved; `skipped` lists rows left out of it.
    Collected {
        checkpoint: Checkpoint,
        skipped: Vec<RowSkip>,
    },
    /// Nothing saved for this unit; a later run may retry it.
    Aborted { reason: String },
    /// Upstream throttled us. The whole run must stop.
    Halted { url: String },
}

enum RowStep {
    Row(CollectedRow),
    Skip(String),
    Halt(String),
}

/// Service for collecting single units.
pub struct UnitCollector {
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<dyn ExtractionAdapter>,
    checkpoints: Arc<dyn CheckpointStore>,
    units: Arc<UnitTable>,
    base_url: String,
}

impl UnitCollector {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        extractor: Arc<dyn ExtractionAdapter>,
        checkpoints: Arc<dyn CheckpointStore>,
        units: Arc<UnitTable>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            checkpoints,
            units,
            base_url: base_url.into(),
        }
    }

    /// Game log URL, using the team's alias for that season.
    pub fn listing_url(&self, unit: &UnitKey) -> String {
        format!(
            "{}/teams/{}/{}_games.html",
            self.base_url.trim_end_matches('/'),
            self.units.alias_for(unit),
            unit.period
        )
    }

    /// Collect and checkpoint one unit.
    ///
    /// Errors are reserved for checkpoint persistence; fetch and extraction
    /// problems are reported through [`CollectOutcome`].
    pub async fn collect(&self, unit: &UnitKey) -> Result<CollectOutcome> {
        let url = self.listing_url(unit);
        log::info!("Collecting {} from {}", unit, url);

        let body = match self.fetcher.fetch(&url).await {
            FetchOutcome::Success(body) => body,
            FetchOutcome::Throttled => return Ok(CollectOutcome::Halted { url }),
            FetchOutcome::TransientFailure(detail) => {
                log::warn!("Listing for {} failed: {}", unit, detail);
                return Ok(CollectOutcome::Aborted {
                    reason: format!("listing fetch failed: {detail}"),
                });
            }
        };

        let stubs = match self.extractor.extract_listing(&body) {
            Ok(stubs) => stubs,
            Err(e) => {
                log::warn!("Listing for {} unusable: {}", unit, e);
                return Ok(CollectOutcome::Aborted {
                    reason: e.to_string(),
                });
            }
        };

        let total = stubs.len();
        let mut rows = Vec::with_capacity(total);
        let mut skipped = Vec::new();

        for (index, stub) in stubs.into_iter().enumerate() {
            match self.collect_row(unit, stub).await {
                RowStep::Row(row) => rows.push(row),
                RowStep::Skip(reason) => {
                    log::warn!("{} row {} skipped: {}", unit, index, reason);
                    skipped.push(RowSkip { index, reason });
                }
                RowStep::Halt(url) => return Ok(CollectOutcome::Halted { url }),
            }
        }

        if rows.is_empty() {
            return Ok(CollectOutcome::Aborted {
                reason: format!("no usable rows ({} listed, {} skipped)", total, skipped.len()),
            });
        }

        let checkpoint = Checkpoint::new(unit.clone(), rows);
        self.checkpoints.save(&checkpoint).await?;
        if let Some((first, last)) = checkpoint.date_span() {
            log::info!(
                "Collected {} ({} to {}): {} games, {} assignments, {} skipped",
                unit,
                first,
                last,
                checkpoint.rows.len(),
                checkpoint.assignment_count(),
                skipped.len()
            );
        }

        Ok(CollectOutcome::Collected {
            checkpoint,
            skipped,
        })
    }

    async fn collect_row(&self, unit: &UnitKey, stub: Result<GameStub>) -> RowStep {
        let mut stub = match stub {
            Ok(stub) => stub,
            Err(e) => return RowStep::Skip(e.to_string()),
        };
        stub.opponent = self
            .units
            .canonical_for(&stub.opponent, unit.period)
            .to_string();

        let officials = match self.fetcher.fetch(&stub.detail_url).await.into_result(&stub.detail_url) {
            Ok(body) => self.extractor.extract_officials(&body),
            Err(AppError::RateLimitExceeded { url }) => return RowStep::Halt(url),
            Err(e) => Err(e),
        };

        match officials {
            Ok(officials) => RowStep::Row(stub.complete(&unit.entity, officials)),
            Err(e) => RowStep::Skip(format!("{}: {}", stub.detail_url, e)),
        }
    }
}
