//! Pipeline entry points.
//!
//! - `Orchestrator`: collect and persist a set of units, resumably
//! - `audit_checkpoints`: classify stored checkpoints
//! - `team_record` / `refresh_seasons`: read-side reports

pub mod check;
pub mod orchestrator;
pub mod report;

pub use check::{CheckpointAudit, audit_checkpoints};
pub use orchestrator::{Orchestrator, RunOptions, RunReport, UnitReport, UnitStatus};
pub use report::{refresh_seasons, resolve_official, team_record};
