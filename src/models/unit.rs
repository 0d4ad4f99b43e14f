// src/models/unit.rs

//! Unit keys and the static exclusion/rename table.
//!
//! A unit is one team's one season. Which units exist, and which URL alias a
//! team had in a given season, is decided here and nowhere else.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Handle for one collection job: (team, season).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitKey {
    /// Team identifier (e.g. "MIA")
    pub entity: String,
    /// Season identifier, named by the year it ends in
    pub period: i32,
}

impl UnitKey {
    pub fn new(entity: impl Into<String>, period: i32) -> Self {
        Self {
            entity: entity.into(),
            period,
        }
    }

    /// File-system friendly form, e.g. `MIA_2016`.
    pub fn stem(&self) -> String {
        format!("{}_{}", self.entity, self.period)
    }

    /// Parse a key back from [`UnitKey::stem`].
    pub fn from_stem(stem: &str) -> Option<Self> {
        let (entity, period) = stem.rsplit_once('_')?;
        if entity.is_empty() {
            return None;
        }
        Some(Self::new(entity, period.parse().ok()?))
    }
}

impl fmt::Display for UnitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.entity, self.period)
    }
}

/// A team that did not exist up to and including `through_period`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Exclusion {
    pub entity: String,
    pub through_period: i32,
}

/// A team that was listed under `alias` up to and including `through_period`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Rename {
    pub entity: String,
    pub alias: String,
    pub through_period: i32,
}

/// The full unit set: two rosters, a season range, and the static
/// exclusion and rename rules that apply to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitTable {
    #[serde(default = "defaults::west")]
    pub west: Vec<String>,

    #[serde(default = "defaults::east")]
    pub east: Vec<String>,

    #[serde(default = "defaults::first_season")]
    pub first_season: i32,

    #[serde(default = "defaults::last_season")]
    pub last_season: i32,

    #[serde(default = "defaults::exclusions")]
    pub exclusions: Vec<Exclusion>,

    #[serde(default = "defaults::renames")]
    pub renames: Vec<Rename>,
}

impl Default for UnitTable {
    fn default() -> Self {
        Self {
            west: defaults::west(),
            east: defaults::east(),
            first_season: defaults::first_season(),
            last_season: defaults::last_season(),
            exclusions: defaults::exclusions(),
            renames: defaults::renames(),
        }
    }
}

impl UnitTable {
    /// All teams, western roster first.
    pub fn entities(&self) -> impl Iterator<Item = &str> {
        self.west.iter().chain(self.east.iter()).map(String::as_str)
    }

    pub fn knows(&self, entity: &str) -> bool {
        self.entities().any(|e| e == entity)
    }

    pub fn is_excluded(&self, unit: &UnitKey) -> bool {
        self.exclusions
            .iter()
            .any(|x| x.entity == unit.entity && unit.period <= x.through_period)
    }

    /// Identifier the source site used for this team in this season.
    pub fn alias_for<'a>(&'a self, unit: &'a UnitKey) -> &'a str {
        self.renames
            .iter()
            .find(|r| r.entity == unit.entity && unit.period <= r.through_period)
            .map(|r| r.alias.as_str())
            .unwrap_or(&unit.entity)
    }

    /// Canonical team id for an identifier the site used in season `period`.
    ///
    /// Inverse of [`alias_for`](Self::alias_for): an alias only maps back
    /// while its rename is in effect.
    pub fn canonical_for<'a>(&'a self, id: &'a str, period: i32) -> &'a str {
        self.renames
            .iter()
            .find(|r| r.alias == id && period <= r.through_period)
            .map(|r| r.entity.as_str())
            .unwrap_or(id)
    }

    /// Every unit in iteration order: team-major, seasons ascending.
    ///
    /// Excluded units are left out.
    pub fn units(&self) -> Vec<UnitKey> {
        self.select(&[], self.first_season, self.last_season)
    }

    /// Units restricted to `teams` (all teams when empty) and an inclusive
    /// season range, in iteration order, excluded units left out.
    pub fn select(&self, teams: &[String], from: i32, to: i32) -> Vec<UnitKey> {
        self.entities()
            .filter(|e| teams.is_empty() || teams.iter().any(|t| t == e))
            .flat_map(|entity| (from..=to).map(move |period| UnitKey::new(entity, period)))
            .filter(|unit| !self.is_excluded(unit))
            .collect()
    }
}

mod defaults {
    use super::{Exclusion, Rename};

    fn roster(teams: &[&str]) -> Vec<String> {
        teams.iter().map(|t| t.to_string()).collect()
    }

    pub fn west() -> Vec<String> {
        roster(&[
            "DEN", "MEM", "SAC", "PHO", "LAC", "GSW", "LAL", "MIN", "NOP", "OKC", "DAL", "UTA",
            "POR", "HOU", "SAS",
        ])
    }

    pub fn east() -> Vec<String> {
        roster(&[
            "MIL", "BOS", "PHI", "CLE", "NYK", "BRK", "MIA", "ATL", "TOR", "CHI", "IND", "WAS",
            "ORL", "CHO", "DET",
        ])
    }

    pub fn first_season() -> i32 {
        2012
    }

    pub fn last_season() -> i32 {
        2022
    }

    pub fn exclusions() -> Vec<Exclusion> {
        vec![Exclusion {
            entity: "NOP".into(),
            through_period: 2013,
        }]
    }

    pub fn renames() -> Vec<Rename> {
        vec![
            Rename {
                entity: "BRK".into(),
                alias: "NJN".into(),
                through_period: 2012,
            },
            Rename {
                entity: "CHO".into(),
                alias: "CHA".into(),
                through_period: 2014,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stem_roundtrip() {
        let unit = UnitKey::new("BRK", 2012);
        assert_eq!(unit.stem(), "BRK_2012");
        assert_eq!(UnitKey::from_stem("BRK_2012"), Some(unit));
        assert_eq!(UnitKey::from_stem("BRK"), None);
        assert_eq!(UnitKey::from_stem("_2012"), None);
        assert_eq!(UnitKey::from_stem("BRK_twelve"), None);
    }

    #[test]
    fn test_exclusion_before_founding() {
        let table = UnitTable::default();
        assert!(table.is_excluded(&UnitKey::new("NOP", 2012)));
        assert!(table.is_excluded(&UnitKey::new("NOP", 2013)));
        assert!(!table.is_excluded(&UnitKey::new("NOP", 2014)));
        assert!(!table.is_excluded(&UnitKey::new("DEN", 2012)));
    }

    #[test]
    fn test_alias_cutoffs() {
        let table = UnitTable::default();
        assert_eq!(table.alias_for(&UnitKey::new("BRK", 2012)), "NJN");
        assert_eq!(table.alias_for(&UnitKey::new("BRK", 2013)), "BRK");
        assert_eq!(table.alias_for(&UnitKey::new("CHO", 2014)), "CHA");
        assert_eq!(table.alias_for(&UnitKey::new("CHO", 2015)), "CHO");
        assert_eq!(table.alias_for(&UnitKey::new("MIA", 2012)), "MIA");
    }

    #[test]
    fn test_canonical_cutoffs() {
        let table = UnitTable::default();
        assert_eq!(table.canonical_for("NJN", 2012), "BRK");
        assert_eq!(table.canonical_for("CHA", 2014), "CHO");
        assert_eq!(table.canonical_for("CHA", 2015), "CHA");
        assert_eq!(table.canonical_for("BRK", 2012), "BRK");
        assert_eq!(table.canonical_for("MIA", 2014), "MIA");
    }

    #[test]
    fn test_units_order_and_count() {
        let table = UnitTable::default();
        let units = table.units();

        // 30 teams x 11 seasons, minus NOP 2012 and 2013
        assert_eq!(units.len(), 30 * 11 - 2);
        assert_eq!(units[0], UnitKey::new("DEN", 2012));
        assert_eq!(units[1], UnitKey::new("DEN", 2013));
        assert_eq!(units[11], UnitKey::new("MEM", 2012));
        assert!(units.iter().all(|u| !table.is_excluded(u)));
    }

    #[test]
    fn test_select_filters_teams_and_seasons() {
        let table = UnitTable::default();
        let units = table.select(&["NOP".to_string(), "MIA".to_string()], 2013, 2015);

        // NOP listed before MIA because the western roster comes first
        assert_eq!(
            units,
            vec![
                UnitKey::new("NOP", 2014),
                UnitKey::new("NOP", 2015),
                UnitKey::new("MIA", 2013),
                UnitKey::new("MIA", 2014),
                UnitKey::new("MIA", 2015),
            ]
        );
    }
}
