// src/pipeline/orchestrator.rs

//! Drives collection and persistence across the unit set.
//!
//! Units run strictly one after another. Every unit ends in exactly one
//! [`UnitStatus`] unless upstream throttling halts the run, in which case
//! the report names the unit it stopped at and nothing after it is touched.

use std::fmt;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::{Checkpoint, UnitKey, UnitTable};
use crate::services::{CollectOutcome, UnitCollector};
use crate::storage::{CheckpointStore, GameStore, WriteMode, WriteOutcome};

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Re-collect units even when already checkpointed and committed.
    pub force: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitStatus {
    /// Never collected by rule.
    Excluded,
    /// Checkpointed and committed by an earlier run.
    AlreadyDone,
    /// Written from an existing checkpoint without fetching.
    Resumed { games: usize },
    Collected { games: usize, skipped: usize },
    /// Collection failed; retried on the next run.
    Aborted { reason: String },
    /// Checkpoint saved but the write rolled back; resumed on the next run.
    /// `skipped` is zero when the rows came from an earlier checkpoint.
    RolledBack {
        games: usize,
        skipped: usize,
        reason: String,
    },
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Excluded => write!(f, "excluded"),
            Self::AlreadyDone => write!(f, "already done"),
            Self::Resumed { games } => write!(f, "resumed ({games} games)"),
            Self::Collected { games, skipped } => {
                write!(f, "collected ({games} games, {skipped} skipped)")
            }
            Self::Aborted { reason } => write!(f, "aborted: {reason}"),
            Self::RolledBack {
                games,
                skipped,
                reason,
            } => write!(f, "rolled back ({games} games, {skipped} skipped): {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitReport {
    pub unit: UnitKey,
    pub status: UnitStatus,
}

#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub outcomes: Vec<UnitReport>,
    /// Unit at which throttling stopped the run.
    pub halted_at: Option<UnitKey>,
}

impl RunReport {
    pub fn count(&self, pred: impl Fn(&UnitStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }

    /// Units that need another run.
    pub fn failed(&self) -> impl Iterator<Item = &UnitReport> {
        self.outcomes.iter().filter(|o| {
            matches!(
                o.status,
                UnitStatus::Aborted { .. } | UnitStatus::RolledBack { .. }
            )
        })
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} collected, {} resumed, {} already done, {} excluded, {} aborted, {} rolled back",
            self.count(|s| matches!(s, UnitStatus::Collected { .. })),
            self.count(|s| matches!(s, UnitStatus::Resumed { .. })),
            self.count(|s| matches!(s, UnitStatus::AlreadyDone)),
            self.count(|s| matches!(s, UnitStatus::Excluded)),
            self.count(|s| matches!(s, UnitStatus::Aborted { .. })),
            self.count(|s| matches!(s, UnitStatus::RolledBack { .. })),
        )?;
        if let Some(unit) = &self.halted_at {
            write!(f, "; halted at {unit}")?;
        }
        Ok(())
    }
}

pub struct Orchestrator {
    collector: UnitCollector,
    checkpoints: Arc<dyn CheckpointStore>,
    store: GameStore,
    units: Arc<UnitTable>,
}

impl Orchestrator {
    pub fn new(
        collector: UnitCollector,
        checkpoints: Arc<dyn CheckpointStore>,
        store: GameStore,
        units: Arc<UnitTable>,
    ) -> Self {
        Self {
            collector,
            checkpoints,
            store,
            units,
        }
    }

    /// Process `units` in order.
    ///
    /// Errors are reserved for checkpoint or database failures that leave
    /// the run unable to continue.
    pub async fn run(&self, units: &[UnitKey], options: RunOptions) -> Result<RunReport> {
        let mut report = RunReport::default();
        log::info!("Processing {} units", units.len());

        for (i, unit) in units.iter().enumerate() {
            log::debug!("[{}/{}] {}", i + 1, units.len(), unit);

            if self.units.is_excluded(unit) {
                report.outcomes.push(UnitReport {
                    unit: unit.clone(),
                    status: UnitStatus::Excluded,
                });
                continue;
            }

            if !options.force {
                if let Some(status) = self.resume(unit).await? {
                    report.outcomes.push(UnitReport {
                        unit: unit.clone(),
                        status,
                    });
                    continue;
                }
            }

            let status = match self.collector.collect(unit).await? {
                CollectOutcome::Collected {
                    checkpoint,
                    skipped,
                } => {
                    let mode = if options.force {
                        WriteMode::Replace
                    } else {
                        WriteMode::Append
                    };
                    let (games, skipped) = (checkpoint.rows.len(), skipped.len());
                    match self.write(&checkpoint, mode).await? {
                        Ok(_) => UnitStatus::Collected { games, skipped },
                        Err(reason) => UnitStatus::RolledBack {
                            games,
                            skipped,
                            reason,
                        },
                    }
                }
                CollectOutcome::Aborted { reason } => {
                    log::warn!("{} aborted: {}", unit, reason);
                    UnitStatus::Aborted { reason }
                }
                CollectOutcome::Halted { url } => {
                    log::error!("Throttled at {} ({}); stopping run", unit, url);
                    report.halted_at = Some(unit.clone());
                    break;
                }
            };

            report.outcomes.push(UnitReport {
                unit: unit.clone(),
                status,
            });
        }

        log::info!("Run finished: {}", report);
        Ok(report)
    }

    /// Write every checkpointed but uncommitted unit in `units`. No fetching.
    pub async fn write_pending(&self, units: &[UnitKey]) -> Result<Vec<UnitReport>> {
        let mut reports = Vec::new();
        for unit in units {
            if self.units.is_excluded(unit) || !self.checkpoints.exists(unit).await? {
                continue;
            }
            if let Some(status) = self.resume(unit).await? {
                if status != UnitStatus::AlreadyDone {
                    reports.push(UnitReport {
                        unit: unit.clone(),
                        status,
                    });
                }
            }
        }
        log::info!("Wrote {} pending units", reports.len());
        Ok(reports)
    }

    /// Status for a unit that needs no collection, or `None` to collect it.
    async fn resume(&self, unit: &UnitKey) -> Result<Option<UnitStatus>> {
        if self.store.is_committed(unit).await? {
            return Ok(Some(UnitStatus::AlreadyDone));
        }
        if !self.checkpoints.exists(unit).await? {
            return Ok(None);
        }

        let checkpoint = match self.checkpoints.load(unit).await {
            Ok(checkpoint) => checkpoint,
            Err(e) => {
                log::warn!("Checkpoint for {} unreadable, re-collecting: {}", unit, e);
                return Ok(None);
            }
        };

        let status = match self.write(&checkpoint, WriteMode::Append).await? {
            Ok(WriteOutcome::AlreadyCommitted) => UnitStatus::AlreadyDone,
            Ok(WriteOutcome::Committed { games, .. }) => UnitStatus::Resumed { games },
            Err(reason) => UnitStatus::RolledBack {
                games: checkpoint.rows.len(),
                skipped: 0,
                reason,
            },
        };
        Ok(Some(status))
    }

    /// Separates rollbacks, which the run survives, from everything else.
    async fn write(
        &self,
        checkpoint: &Checkpoint,
        mode: WriteMode,
    ) -> Result<std::result::Result<WriteOutcome, String>> {
        match self.store.write(checkpoint, mode).await {
            Ok(outcome) => Ok(Ok(outcome)),
            Err(AppError::WriteConflict { message, .. }) => Ok(Err(message)),
            Err(e) => Err(e),
        }
    }
}
