// src/models/game.rs

//! Game records as they move from listing page to checkpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UnitKey;

/// One row of a team's season listing, before its box score is visited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameStub {
    /// ISO date, `YYYY-MM-DD`
    pub date: String,
    pub opponent: String,
    pub points: u32,
    pub opp_points: u32,
    pub win: bool,
    /// Absolute URL of the box score page
    pub detail_url: String,
}

impl GameStub {
    /// Attach the officiating crew and the owning team.
    pub fn complete(self, home: &str, officials: Vec<String>) -> CollectedRow {
        CollectedRow {
            home: home.to_string(),
            away: self.opponent,
            home_score: self.points,
            away_score: self.opp_points,
            win: self.win,
            date: self.date,
            officials,
        }
    }
}

/// A completed game record with its officiating crew.
///
/// `home` is always the team the unit belongs to, whichever side of the
/// court it played on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectedRow {
    pub home: String,
    pub away: String,
    pub home_score: u32,
    pub away_score: u32,
    pub win: bool,
    pub date: String,
    /// Crew in page order; duplicates are kept as found
    pub officials: Vec<String>,
}

/// A listing row that did not make it into the checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowSkip {
    /// Zero-based position among the listing's game rows
    pub index: usize,
    pub reason: String,
}

/// All rows collected for one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub unit: UnitKey,
    pub collected_at: DateTime<Utc>,
    pub rows: Vec<CollectedRow>,
}

impl Checkpoint {
    pub fn new(unit: UnitKey, rows: Vec<CollectedRow>) -> Self {
        Self {
            unit,
            collected_at: Utc::now(),
            rows,
        }
    }

    /// Total officiating assignments across all rows.
    pub fn assignment_count(&self) -> usize {
        self.rows.iter().map(|r| r.officials.len()).sum()
    }

    /// First and last game dates, in listing order.
    pub fn date_span(&self) -> Option<(&str, &str)> {
        let first = self.rows.first()?;
        let last = self.rows.last()?;
        Some((first.date.as_str(), last.date.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stub() -> GameStub {
        GameStub {
            date: "2016-10-26".to_string(),
            opponent: "ORL".to_string(),
            points: 108,
            opp_points: 96,
            win: true,
            detail_url: "https://example.com/boxscores/201610260ORL.html".to_string(),
        }
    }

    #[test]
    fn test_complete_keeps_duplicate_officials() {
        let row = stub().complete(
            "MIA",
            vec!["Scott Foster".into(), "Tony Brothers".into(), "Scott Foster".into()],
        );
        assert_eq!(row.home, "MIA");
        assert_eq!(row.away, "ORL");
        assert_eq!(row.home_score, 108);
        assert_eq!(row.officials.len(), 3);
    }

    #[test]
    fn test_checkpoint_summaries() {
        let rows = vec![
            stub().complete("MIA", vec!["A".into(), "B".into()]),
            GameStub {
                date: "2017-04-12".to_string(),
                ..stub()
            }
            .complete("MIA", vec!["C".into()]),
        ];
        let checkpoint = Checkpoint::new(UnitKey::new("MIA", 2017), rows);

        assert_eq!(checkpoint.assignment_count(), 3);
        assert_eq!(checkpoint.date_span(), Some(("2016-10-26", "2017-04-12")));
    }

    #[test]
    fn test_json_keeps_field_types() {
        let checkpoint = Checkpoint::new(
            UnitKey::new("MIA", 2017),
            vec![stub().complete("MIA", vec!["A. Smith".into()])],
        );
        let json = serde_json::to_value(&checkpoint).unwrap();

        assert!(json["rows"][0]["home_score"].is_u64());
        assert!(json["rows"][0]["win"].is_boolean());
        assert!(json["unit"]["period"].is_i64());
    }
}
