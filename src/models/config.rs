//! Application configuration structures.

use std::fs;
use std::path::Path;
use std::time::Duration;

use scraper::Selector;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::UnitTable;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Outbound request ceiling
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Teams, seasons, exclusions and renames
    #[serde(default)]
    pub units: UnitTable,

    /// Page structure hints for the HTML parser
    #[serde(default)]
    pub parser: ParserConfig,

    /// Where checkpoints and the database live
    #[serde(default)]
    pub paths: PathsConfig,
}

impl Config {
    /// Config file location used when none is given.
    pub const DEFAULT_PATH: &'static str = "data/config.toml";

    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Write the configuration as TOML, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::config(format!("cannot serialize config: {e}")))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        url::Url::parse(&self.crawler.base_url)?;

        if self.rate_limit.max_requests == 0 {
            return Err(AppError::validation("rate_limit.max_requests must be > 0"));
        }
        if self.rate_limit.window_secs == 0 {
            return Err(AppError::validation("rate_limit.window_secs must be > 0"));
        }

        let units = &self.units;
        if units.west.is_empty() || units.east.is_empty() {
            return Err(AppError::validation("units.west and units.east must be non-empty"));
        }
        if units.first_season > units.last_season {
            return Err(AppError::validation(
                "units.first_season must not be after units.last_season",
            ));
        }
        for exclusion in &units.exclusions {
            if !units.knows(&exclusion.entity) {
                return Err(AppError::validation(format!(
                    "exclusion names unknown team {}",
                    exclusion.entity
                )));
            }
        }
        for rename in &units.renames {
            if !units.knows(&rename.entity) {
                return Err(AppError::validation(format!(
                    "rename names unknown team {}",
                    rename.entity
                )));
            }
        }

        self.parser.compile()?;
        Ok(())
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Site root; listing and box score links are resolved against it
    #[serde(default = "defaults::base_url")]
    pub base_url: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            base_url: defaults::base_url(),
        }
    }
}

/// At most `max_requests` requests per `window_secs`, with `margin_secs`
/// added to every forced wait.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "defaults::max_requests")]
    pub max_requests: usize,

    #[serde(default = "defaults::window_secs")]
    pub window_secs: u64,

    #[serde(default = "defaults::margin_secs")]
    pub margin_secs: u64,
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn margin(&self) -> Duration {
        Duration::from_secs(self.margin_secs)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: defaults::max_requests(),
            window_secs: defaults::window_secs(),
            margin_secs: defaults::margin_secs(),
        }
    }
}

/// CSS selectors used by the game log parser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserConfig {
    /// Rows of the season game log
    #[serde(default = "defaults::row_selector")]
    pub row_selector: String,

    /// Links to official profiles on a box score page
    #[serde(default = "defaults::official_selector")]
    pub official_selector: String,

    /// Link text that ends the crew list
    #[serde(default = "defaults::official_terminator")]
    pub official_terminator: String,
}

/// Parsed form of [`ParserConfig`].
#[derive(Debug, Clone)]
pub struct CompiledSelectors {
    pub row: Selector,
    pub official: Selector,
}

impl ParserConfig {
    pub fn compile(&self) -> Result<CompiledSelectors> {
        Ok(CompiledSelectors {
            row: parse_selector(&self.row_selector)?,
            official: parse_selector(&self.official_selector)?,
        })
    }
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            row_selector: defaults::row_selector(),
            official_selector: defaults::official_selector(),
            official_terminator: defaults::official_terminator(),
        }
    }
}

/// Filesystem locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "defaults::checkpoint_dir")]
    pub checkpoint_dir: String,

    #[serde(default = "defaults::database")]
    pub database: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            checkpoint_dir: defaults::checkpoint_dir(),
            database: defaults::database(),
        }
    }
}

mod defaults {
    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; refstats/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn base_url() -> String {
        "https://www.basketball-reference.com".into()
    }

    // The site allows 20 requests a minute; stay under it.
    pub fn max_requests() -> usize {
        19
    }
    pub fn window_secs() -> u64 {
        70
    }
    pub fn margin_secs() -> u64 {
        10
    }

    // Parser defaults
    pub fn row_selector() -> String {
        "table#games > tbody > tr".into()
    }
    pub fn official_selector() -> String {
        "a[href*=\"referee\"]".into()
    }
    pub fn official_terminator() -> String {
        "Referees".into()
    }

    // Path defaults
    pub fn checkpoint_dir() -> String {
        "checkpoints".into()
    }
    pub fn database() -> String {
        "db/nba.db".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Exclusion;

    #[test]
    fn saved_config_loads_back() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("nested/refstats.toml");
        let mut config = Config::default();
        config.rate_limit.max_requests = 7;

        config.save(&path).unwrap();
        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.rate_limit.max_requests, 7);
        assert_eq!(loaded.units.renames, config.units.renames);
        assert!(loaded.validate().is_ok());
    }

    #[test]
    fn default_path_is_created_under_data_dir() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join(Config::DEFAULT_PATH);

        Config::default().save(&path).unwrap();
        assert!(tmp.path().join("data").is_dir());
        assert!(Config::load(&path).unwrap().validate().is_ok());
    }

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = Config::default();
        config.crawler.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_request_ceiling() {
        let mut config = Config::default();
        config.rate_limit.max_requests = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_inverted_seasons() {
        let mut config = Config::default();
        config.units.first_season = 2020;
        config.units.last_season = 2019;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_unknown_exclusion() {
        let mut config = Config::default();
        config.units.exclusions.push(Exclusion {
            entity: "SEA".to_string(),
            through_period: 2030,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_selector() {
        let mut config = Config::default();
        config.parser.row_selector = "[[invalid".to_string();
        assert!(matches!(
            config.validate(),
            Err(AppError::Selector { .. })
        ));
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [rate_limit]
            max_requests = 5

            [units]
            west = ["DEN"]
            east = ["MIA"]
            "#,
        )
        .unwrap();

        assert_eq!(config.rate_limit.max_requests, 5);
        assert_eq!(config.rate_limit.window_secs, 70);
        assert_eq!(config.units.first_season, 2012);
        assert_eq!(config.units.renames.len(), 2);
        assert_eq!(config.paths.database, "db/nba.db");
    }
}
