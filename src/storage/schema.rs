//! SQL schema for the game database.
//!
//! Executed once per connection. `CREATE TABLE IF NOT EXISTS` keeps it
//! idempotent.

pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One row per collected game; never updated after insert.
-- `home_entity` is the team whose game log listed the game.
CREATE TABLE IF NOT EXISTS Game (
    id          INTEGER PRIMARY KEY,
    home_entity TEXT    NOT NULL,
    away_entity TEXT    NOT NULL,
    home_score  INTEGER NOT NULL,
    away_score  INTEGER NOT NULL,
    win         BOOLEAN NOT NULL,
    date        TEXT    NOT NULL
                CHECK (date GLOB '[0-9][0-9][0-9][0-9]-[0-9][0-9]-[0-9][0-9]'),
    season      INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS Official (
    id   INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE CHECK (length(trim(name)) > 0)
);

CREATE TABLE IF NOT EXISTS GameOfficial (
    game_id     INTEGER NOT NULL REFERENCES Game(id),
    official_id INTEGER NOT NULL REFERENCES Official(id)
);

-- Derived from Game by a post-pass; never written by unit writes.
CREATE TABLE IF NOT EXISTS SeasonRange (
    entity     TEXT    NOT NULL,
    period     INTEGER NOT NULL,
    start_date TEXT    NOT NULL,
    end_date   TEXT    NOT NULL,
    PRIMARY KEY (entity, period)
);

-- Written in the same transaction as a unit's games.
CREATE TABLE IF NOT EXISTS UnitCommit (
    entity       TEXT    NOT NULL,
    period       INTEGER NOT NULL,
    game_count   INTEGER NOT NULL,
    committed_at TEXT    NOT NULL,
    PRIMARY KEY (entity, period)
);

CREATE INDEX IF NOT EXISTS game_unit_idx      ON Game(home_entity, season);
CREATE INDEX IF NOT EXISTS game_matchup_idx   ON Game(home_entity, away_entity, date);
CREATE INDEX IF NOT EXISTS game_official_game ON GameOfficial(game_id);
CREATE INDEX IF NOT EXISTS game_official_ref  ON GameOfficial(official_id);

PRAGMA user_version = 1;
";
