//! [`GameStore`]: the SQLite relational store.
//!
//! All access goes through [`tokio_rusqlite`], so queries run on the
//! connection's own thread and never block the runtime.
//!
//! A unit is written in a single transaction: officials are upserted by
//! name, then the game, then its assignment rows, for every collected row,
//! followed by the unit's `UnitCommit` marker. Any failure drops the
//! transaction and nothing from that checkpoint becomes visible.

use std::path::Path;

use chrono::Utc;
use rusqlite::{OptionalExtension as _, Transaction, params};

use crate::error::{AppError, Result};
use crate::models::{Checkpoint, UnitKey};
use crate::storage::schema::SCHEMA;

/// How to treat a unit that already has a commit marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Leave committed units alone.
    Append,
    /// Delete the unit's previous games first, in the same transaction.
    Replace,
}

/// Result of a unit write that did not roll back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Committed { games: usize, assignments: usize },
    AlreadyCommitted,
}

/// Window for a win/loss query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateSpan {
    /// Inclusive ISO dates
    Between { start: String, end: String },
    Season(i32),
    /// First day of `first` through last day of `last`
    Seasons { first: i32, last: i32 },
}

/// Wins and losses for a team.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Record {
    pub wins: u32,
    pub losses: u32,
}

impl Record {
    pub fn games(&self) -> u32 {
        self.wins + self.losses
    }
}

/// Row counts for status output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCounts {
    pub games: u64,
    pub officials: u64,
    pub assignments: u64,
    pub committed_units: u64,
}

/// Games, officials and assignments backed by one SQLite file.
///
/// Cloning is cheap; clones share the connection.
#[derive(Clone)]
pub struct GameStore {
    conn: tokio_rusqlite::Connection,
}

impl GameStore {
    /// Open (or create) the database at `path` and bootstrap the schema.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let conn = tokio_rusqlite::Connection::open(path).await?;
        let store = Self { conn };
        store.init_schema().await?;
        Ok(store)
    }

    /// Open an in-memory store.
    pub async fn open_in_memory() -> Result<Self> {
        let conn = tokio_rusqlite::Connection::open_in_memory().await?;
        let store = Self { conn };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        self.conn
            .call(|conn| {
                conn.execute_batch(SCHEMA)?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Write one checkpoint atomically.
    ///
    /// A rolled back transaction is reported as [`AppError::WriteConflict`];
    /// the store is left exactly as it was before the call.
    pub async fn write(&self, checkpoint: &Checkpoint, mode: WriteMode) -> Result<WriteOutcome> {
        let unit = checkpoint.unit.clone();
        let checkpoint = checkpoint.clone();

        let result = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let outcome = write_unit(&tx, &checkpoint, mode)?;
                if matches!(outcome, WriteOutcome::Committed { .. }) {
                    tx.commit()?;
                }
                Ok(outcome)
            })
            .await;

        match result {
            Ok(outcome) => {
                if let WriteOutcome::Committed { games, assignments } = outcome {
                    log::info!(
                        "Committed {}: {} games, {} assignments",
                        unit,
                        games,
                        assignments
                    );
                }
                Ok(outcome)
            }
            Err(e) => {
                log::error!("Write for {} rolled back: {}", unit, e);
                Err(AppError::write_conflict(&unit, e))
            }
        }
    }

    /// Whether a unit's write has been committed.
    pub async fn is_committed(&self, unit: &UnitKey) -> Result<bool> {
        let (entity, period) = (unit.entity.clone(), unit.period);
        let committed: bool = self
            .conn
            .call(move |conn| {
                Ok(conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM UnitCommit WHERE entity = ?1 AND period = ?2)",
                    params![entity, period],
                    |r| r.get(0),
                )?)
            })
            .await?;
        Ok(committed)
    }

    /// Every committed unit.
    pub async fn committed_units(&self) -> Result<Vec<UnitKey>> {
        let units = self
            .conn
            .call(|conn| {
                let mut stmt =
                    conn.prepare("SELECT entity, period FROM UnitCommit ORDER BY entity, period")?;
                let rows = stmt
                    .query_map([], |r| Ok(UnitKey::new(r.get::<_, String>(0)?, r.get(1)?)))?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .await?;
        Ok(units)
    }

    /// Recompute `SeasonRange` from committed games. Returns the row count.
    pub async fn populate_season_ranges(&self) -> Result<usize> {
        let count = self
            .conn
            .call(|conn| {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM SeasonRange", [])?;
                let count = tx.execute(
                    "INSERT INTO SeasonRange (entity, period, start_date, end_date)
                     SELECT home_entity, season, MIN(date), MAX(date)
                     FROM Game
                     GROUP BY home_entity, season",
                    [],
                )?;
                tx.commit()?;
                Ok(count)
            })
            .await?;
        Ok(count)
    }

    /// First and last game date of a team's season.
    pub async fn season_range(&self, entity: &str, period: i32) -> Result<Option<(String, String)>> {
        let entity = entity.to_string();
        let range: Option<(String, String)> = self
            .conn
            .call(move |conn| {
                Ok(conn
                    .query_row(
                        "SELECT start_date, end_date FROM SeasonRange
                         WHERE entity = ?1 AND period = ?2",
                        params![entity, period],
                        |r| Ok((r.get(0)?, r.get(1)?)),
                    )
                    .optional()?)
            })
            .await?;
        Ok(range)
    }

    async fn resolve_span(&self, entity: &str, span: &DateSpan) -> Result<(String, String)> {
        let missing = |period: i32| {
            AppError::not_found(format!(
                "season range for {entity} {period} (run the seasons pass first)"
            ))
        };

        match span {
            DateSpan::Between { start, end } => Ok((start.clone(), end.clone())),
            DateSpan::Season(period) => self
                .season_range(entity, *period)
                .await?
                .ok_or_else(|| missing(*period)),
            DateSpan::Seasons { first, last } => {
                let (start, _) = self
                    .season_range(entity, *first)
                    .await?
                    .ok_or_else(|| missing(*first))?;
                let (_, end) = self
                    .season_range(entity, *last)
                    .await?
                    .ok_or_else(|| missing(*last))?;
                Ok((start, end))
            }
        }
    }

    /// A team's record in games worked by `official`.
    pub async fn win_loss_with_official(
        &self,
        entity: &str,
        official: &str,
        span: &DateSpan,
    ) -> Result<Record> {
        let (start, end) = self.resolve_span(entity, span).await?;
        let entity = entity.to_string();
        let official = official.to_string();

        let (games, wins): (u32, u32) = self
            .conn
            .call(move |conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(*), COALESCE(SUM(CASE WHEN worked.win THEN 1 ELSE 0 END), 0)
                     FROM (
                         SELECT DISTINCT g.id, g.win
                         FROM Game g
                         JOIN GameOfficial go ON g.id = go.game_id
                         JOIN Official o ON go.official_id = o.id
                         WHERE g.date BETWEEN ?1 AND ?2
                           AND g.home_entity = ?3
                           AND o.name = ?4
                     ) AS worked",
                    params![start, end, entity, official],
                    |r| Ok((r.get(0)?, r.get(1)?)),
                )?)
            })
            .await?;

        Ok(Record {
            wins,
            losses: games - wins,
        })
    }

    /// Officials who worked a game, in assignment order.
    pub async fn officiating_crew(&self, home: &str, away: &str, date: &str) -> Result<Vec<String>> {
        let (home, away, date) = (home.to_string(), away.to_string(), date.to_string());
        let names = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT o.name
                     FROM Game g
                     JOIN GameOfficial go ON g.id = go.game_id
                     JOIN Official o ON go.official_id = o.id
                     WHERE g.home_entity = ?1 AND g.away_entity = ?2 AND g.date = ?3
                     ORDER BY go.rowid",
                )?;
                let names = stmt
                    .query_map(params![home, away, date], |r| r.get(0))?
                    .collect::<rusqlite::Result<Vec<String>>>()?;
                Ok(names)
            })
            .await?;
        Ok(names)
    }

    pub async fn official_name(&self, id: i64) -> Result<Option<String>> {
        let name: Option<String> = self
            .conn
            .call(move |conn| {
                Ok(conn
                    .query_row("SELECT name FROM Official WHERE id = ?1", [id], |r| r.get(0))
                    .optional()?)
            })
            .await?;
        Ok(name)
    }

    pub async fn counts(&self) -> Result<StoreCounts> {
        let counts = self
            .conn
            .call(|conn| {
                Ok(conn.query_row(
                    "SELECT (SELECT COUNT(*) FROM Game),
                            (SELECT COUNT(*) FROM Official),
                            (SELECT COUNT(*) FROM GameOfficial),
                            (SELECT COUNT(*) FROM UnitCommit)",
                    [],
                    |r| {
                        Ok(StoreCounts {
                            games: r.get(0)?,
                            officials: r.get(1)?,
                            assignments: r.get(2)?,
                            committed_units: r.get(3)?,
                        })
                    },
                )?)
            })
            .await?;
        Ok(counts)
    }

    /// Assignment rows pointing at a missing game or official.
    pub async fn dangling_assignments(&self) -> Result<u64> {
        let count: u64 = self
            .conn
            .call(|conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(*)
                     FROM GameOfficial go
                     LEFT JOIN Game g ON g.id = go.game_id
                     LEFT JOIN Official o ON o.id = go.official_id
                     WHERE g.id IS NULL OR o.id IS NULL",
                    [],
                    |r| r.get(0),
                )?)
            })
            .await?;
        Ok(count)
    }

    /// Run raw SQL on the shared connection.
    #[cfg(test)]
    pub(crate) async fn execute_batch(&self, sql: &str) -> Result<()> {
        let sql = sql.to_string();
        self.conn
            .call(move |conn| {
                conn.execute_batch(&sql)?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Delete every game, official, assignment, season range and commit marker.
    pub async fn clear(&self) -> Result<()> {
        self.conn
            .call(|conn| {
                let tx = conn.transaction()?;
                tx.execute_batch(
                    "DELETE FROM GameOfficial;
                     DELETE FROM Game;
                     DELETE FROM Official;
                     DELETE FROM SeasonRange;
                     DELETE FROM UnitCommit;",
                )?;
                tx.commit()?;
                Ok(())
            })
            .await?;
        log::warn!("Cleared all game data");
        Ok(())
    }
}

fn write_unit(
    tx: &Transaction<'_>,
    checkpoint: &Checkpoint,
    mode: WriteMode,
) -> rusqlite::Result<WriteOutcome> {
    let unit = &checkpoint.unit;
    let committed: bool = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM UnitCommit WHERE entity = ?1 AND period = ?2)",
        params![unit.entity, unit.period],
        |r| r.get(0),
    )?;

    match mode {
        WriteMode::Append if committed => return Ok(WriteOutcome::AlreadyCommitted),
        WriteMode::Replace => clear_unit(tx, unit)?,
        WriteMode::Append => {}
    }

    let mut assignments = 0;
    {
        let mut insert_official =
            tx.prepare_cached("INSERT INTO Official (name) VALUES (?1) ON CONFLICT(name) DO NOTHING")?;
        let mut find_official = tx.prepare_cached("SELECT id FROM Official WHERE name = ?1")?;
        let mut insert_game = tx.prepare_cached(
            "INSERT INTO Game (home_entity, away_entity, home_score, away_score, win, date, season)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        let mut insert_assignment =
            tx.prepare_cached("INSERT INTO GameOfficial (game_id, official_id) VALUES (?1, ?2)")?;

        for row in &checkpoint.rows {
            let mut official_ids = Vec::with_capacity(row.officials.len());
            for name in &row.officials {
                insert_official.execute([name])?;
                official_ids.push(find_official.query_row([name], |r| r.get::<_, i64>(0))?);
            }

            insert_game.execute(params![
                row.home,
                row.away,
                row.home_score,
                row.away_score,
                row.win,
                row.date,
                unit.period
            ])?;
            let game_id = tx.last_insert_rowid();

            for official_id in official_ids {
                insert_assignment.execute(params![game_id, official_id])?;
                assignments += 1;
            }
        }
    }

    tx.execute(
        "INSERT INTO UnitCommit (entity, period, game_count, committed_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            unit.entity,
            unit.period,
            checkpoint.rows.len() as i64,
            Utc::now().to_rfc3339()
        ],
    )?;

    Ok(WriteOutcome::Committed {
        games: checkpoint.rows.len(),
        assignments,
    })
}

fn clear_unit(tx: &Transaction<'_>, unit: &UnitKey) -> rusqlite::Result<()> {
    tx.execute(
        "DELETE FROM GameOfficial WHERE game_id IN
           (SELECT id FROM Game WHERE home_entity = ?1 AND season = ?2)",
        params![unit.entity, unit.period],
    )?;
    tx.execute(
        "DELETE FROM Game WHERE home_entity = ?1 AND season = ?2",
        params![unit.entity, unit.period],
    )?;
    tx.execute(
        "DELETE FROM UnitCommit WHERE entity = ?1 AND period = ?2",
        params![unit.entity, unit.period],
    )?;
    Ok(())
}
