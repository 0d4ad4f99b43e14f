//! refstats CLI
//!
//! Collects team game logs with their officiating crews and queries the
//! resulting database.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use clap::{ArgGroup, Parser, Subcommand};
use refstats::{
    error::{AppError, Result},
    models::{Config, UnitKey},
    pipeline::{self, Orchestrator, RunOptions},
    services::{GameLogParser, HttpFetcher, UnitCollector},
    storage::{CheckpointStore, DateSpan, GameStore, LocalCheckpointStore},
    utils::RateLimiter,
};

/// refstats - NBA officiating statistics collector
#[derive(Parser, Debug)]
#[command(
    name = "refstats",
    version,
    about = "Collect NBA game logs and officiating crews into SQLite"
)]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, default_value = Config::DEFAULT_PATH)]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a default config file and create the database
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Collect and store team seasons, resuming where the last run stopped
    Collect {
        /// Restrict to these teams (repeatable)
        #[arg(long = "team")]
        teams: Vec<String>,

        /// First season (default: units.first_season)
        #[arg(long)]
        from: Option<i32>,

        /// Last season (default: units.last_season)
        #[arg(long)]
        to: Option<i32>,

        /// Re-collect units that are already done
        #[arg(long)]
        force: bool,
    },

    /// Write stored checkpoints that were never committed (no network)
    Write {
        #[arg(long = "team")]
        teams: Vec<String>,
    },

    /// Audit stored checkpoints
    Check,

    /// Derive season date ranges from committed games
    Seasons,

    /// A team's record in games worked by an official
    #[command(group(ArgGroup::new("span").required(true).args(["season", "seasons", "between"])))]
    Record {
        team: String,

        /// Official's name or numeric id
        official: String,

        #[arg(long)]
        season: Option<i32>,

        #[arg(long, num_args = 2, value_names = ["FIRST", "LAST"])]
        seasons: Option<Vec<i32>>,

        #[arg(long, num_args = 2, value_names = ["START", "END"])]
        between: Option<Vec<String>>,
    },

    /// Officials who worked a game
    Crew {
        home: String,
        away: String,
        /// YYYY-MM-DD
        date: String,
    },

    /// Delete all games, officials and commit markers
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },

    /// Validate the config file
    Validate,

    /// Show checkpoint and database status
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn parse_date(s: &str) -> Result<String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map(|d| d.format("%Y-%m-%d").to_string())
        .map_err(|e| AppError::validation(format!("invalid date {s:?}: {e}")))
}

fn check_teams(config: &Config, teams: &[String]) -> Result<()> {
    for team in teams {
        if !config.units.knows(team) {
            return Err(AppError::validation(format!("unknown team {team}")));
        }
    }
    Ok(())
}

fn date_span(
    season: Option<i32>,
    seasons: Option<Vec<i32>>,
    between: Option<Vec<String>>,
) -> Result<DateSpan> {
    match (season, seasons.as_deref(), between.as_deref()) {
        (Some(season), _, _) => Ok(DateSpan::Season(season)),
        (_, Some(&[first, last]), _) => Ok(DateSpan::Seasons { first, last }),
        (_, _, Some([start, end])) => Ok(DateSpan::Between {
            start: parse_date(start)?,
            end: parse_date(end)?,
        }),
        _ => Err(AppError::validation("one of --season, --seasons, --between is required")),
    }
}

fn build_orchestrator(config: &Config, store: GameStore) -> Result<Orchestrator> {
    let limiter = Arc::new(RateLimiter::from_config(&config.rate_limit));
    let fetcher = Arc::new(HttpFetcher::from_config(config, limiter)?);
    let parser = Arc::new(GameLogParser::new(&config.parser, &config.crawler.base_url)?);
    let checkpoints: Arc<dyn CheckpointStore> =
        Arc::new(LocalCheckpointStore::new(&config.paths.checkpoint_dir));
    let units = Arc::new(config.units.clone());

    let collector = UnitCollector::new(
        fetcher,
        parser,
        checkpoints.clone(),
        units.clone(),
        config.crawler.base_url.clone(),
    );
    Ok(Orchestrator::new(collector, checkpoints, store, units))
}

async fn open_store(config: &Config) -> Result<GameStore> {
    let path = Path::new(&config.paths.database);
    log::debug!("Opening database {}", path.display());
    GameStore::open(path).await
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match cli.command {
        Command::Init { .. } => Config::default(),
        _ => Config::load_or_default(&cli.config),
    };
    log::debug!("Using configuration from {}", cli.config.display());

    match cli.command {
        Command::Init { force } => {
            if cli.config.exists() && !force {
                log::warn!(
                    "Config already exists at {}. Use --force to overwrite.",
                    cli.config.display()
                );
            } else {
                config.save(&cli.config)?;
                log::info!("Wrote default config to {}", cli.config.display());
            }
            let config = Config::load(&cli.config)?;
            open_store(&config).await?;
            tokio::fs::create_dir_all(&config.paths.checkpoint_dir).await?;
            log::info!(
                "Database ready at {}, checkpoints under {}",
                config.paths.database,
                config.paths.checkpoint_dir
            );
        }

        Command::Collect {
            teams,
            from,
            to,
            force,
        } => {
            config.validate()?;
            check_teams(&config, &teams)?;
            let from = from.unwrap_or(config.units.first_season);
            let to = to.unwrap_or(config.units.last_season);
            let units = config.units.select(&teams, from, to);
            if units.is_empty() {
                return Err(AppError::validation("no units selected"));
            }

            let store = open_store(&config).await?;
            let orchestrator = build_orchestrator(&config, store)?;
            let report = orchestrator.run(&units, RunOptions { force }).await?;

            for failed in report.failed() {
                log::warn!("  {}: {}", failed.unit, failed.status);
            }
            log::info!("{}", report);
            if let Some(unit) = report.halted_at {
                log::error!("Upstream throttled the run; rerun later to resume at {}", unit);
                return Err(AppError::RateLimitExceeded {
                    url: unit.to_string(),
                });
            }
        }

        Command::Write { teams } => {
            check_teams(&config, &teams)?;
            let units = config
                .units
                .select(&teams, config.units.first_season, config.units.last_season);
            let store = open_store(&config).await?;
            let orchestrator = build_orchestrator(&config, store)?;

            let reports = orchestrator.write_pending(&units).await?;
            for report in &reports {
                log::info!("  {}: {}", report.unit, report.status);
            }
            log::info!("Wrote {} units", reports.len());
        }

        Command::Check => {
            let checkpoints = LocalCheckpointStore::new(&config.paths.checkpoint_dir);
            let audit = pipeline::audit_checkpoints(&checkpoints, &config.units.units()).await?;

            for unit in &audit.missing {
                log::warn!("Missing: {}", unit);
            }
            for (unit, reason) in &audit.unreadable {
                log::error!("Unreadable: {} ({})", unit, reason);
            }
            for unit in &audit.empty {
                log::warn!("Empty: {}", unit);
            }
            println!("{audit}");
            if !audit.is_clean() {
                return Err(AppError::validation(format!(
                    "{} of {} units lack a usable checkpoint",
                    audit.missing.len() + audit.unreadable.len() + audit.empty.len(),
                    config.units.units().len()
                )));
            }
        }

        Command::Seasons => {
            let store = open_store(&config).await?;
            let count = pipeline::refresh_seasons(&store).await?;
            log::info!("{} season ranges stored", count);
        }

        Command::Record {
            team,
            official,
            season,
            seasons,
            between,
        } => {
            let span = date_span(season, seasons, between)?;
            let store = open_store(&config).await?;
            let (name, record) = pipeline::team_record(&store, &team, &official, &span).await?;
            println!(
                "{} with {}: {}-{} ({} games)",
                team,
                name,
                record.wins,
                record.losses,
                record.games()
            );
        }

        Command::Crew { home, away, date } => {
            let date = parse_date(&date)?;
            let store = open_store(&config).await?;
            let crew = store.officiating_crew(&home, &away, &date).await?;
            if crew.is_empty() {
                return Err(AppError::not_found(format!("game {home} vs {away} on {date}")));
            }
            for name in crew {
                println!("{name}");
            }
        }

        Command::Reset { yes } => {
            if !yes {
                log::error!("Refusing to reset without --yes");
                return Err(AppError::validation("reset requires --yes"));
            }
            let store = open_store(&config).await?;
            store.clear().await?;
            log::info!("Database cleared; checkpoints kept");
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!(
                "Config OK: {} teams, seasons {}-{}, {} units",
                config.units.entities().count(),
                config.units.first_season,
                config.units.last_season,
                config.units.units().len()
            );
        }

        Command::Info => {
            log::info!("Config: {}", cli.config.display());
            let checkpoints = LocalCheckpointStore::new(&config.paths.checkpoint_dir);
            let stored: Vec<UnitKey> = checkpoints.list().await?;
            log::info!(
                "Checkpoints: {} under {}",
                stored.len(),
                config.paths.checkpoint_dir
            );

            if Path::new(&config.paths.database).exists() {
                let store = open_store(&config).await?;
                let counts = store.counts().await?;
                log::info!(
                    "Database: {} games, {} officials, {} assignments, {} committed units",
                    counts.games,
                    counts.officials,
                    counts.assignments,
                    counts.committed_units
                );
                let committed = store.committed_units().await?;
                let pending = stored.iter().filter(|u| !committed.contains(u)).count();
                if pending > 0 {
                    log::info!("{} checkpoints not yet written (run `write`)", pending);
                }
                let dangling = store.dangling_assignments().await?;
                if dangling > 0 {
                    log::warn!("{} assignments reference missing rows", dangling);
                }
            } else {
                log::info!("No database yet at {}", config.paths.database);
            }
        }
    }

    Ok(())
}
