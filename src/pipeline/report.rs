// src/pipeline/report.rs

//! Read-side queries over committed games.

use crate::error::{AppError, Result};
use crate::storage::{DateSpan, GameStore, Record};

/// Accepts an official's name or numeric id.
pub async fn resolve_official(store: &GameStore, official: &str) -> Result<String> {
    match official.trim().parse::<i64>() {
        Ok(id) => store
            .official_name(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("official #{id}"))),
        Err(_) => Ok(official.to_string()),
    }
}

/// A team's record in games worked by one official.
pub async fn team_record(
    store: &GameStore,
    team: &str,
    official: &str,
    span: &DateSpan,
) -> Result<(String, Record)> {
    let name = resolve_official(store, official).await?;
    let record = store.win_loss_with_official(team, &name, span).await?;
    log::debug!(
        "{} with {}: {}-{} over {:?}",
        team,
        name,
        record.wins,
        record.losses,
        span
    );
    Ok((name, record))
}

/// Recompute season ranges, failing when there is nothing to derive them from.
pub async fn refresh_seasons(store: &GameStore) -> Result<usize> {
    let count = store.populate_season_ranges().await?;
    if count == 0 {
        return Err(AppError::not_found("committed games to derive seasons from"));
    }
    log::info!("Derived {} season ranges", count);
    Ok(count)
}
