//! Test doubles and page fixtures shared by unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::models::ParserConfig;
use crate::services::{FetchOutcome, GameLogParser, PageFetcher};

pub const BASE_URL: &str = "https://bbref.test";

/// Serves canned outcomes by URL and records every request.
#[derive(Default)]
pub struct ScriptedFetcher {
    pages: Mutex<HashMap<String, FetchOutcome>>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(&self, url: impl Into<String>, outcome: FetchOutcome) {
        self.pages.lock().unwrap().insert(url.into(), outcome);
    }

    pub fn html(&self, url: impl Into<String>, body: impl Into<String>) {
        self.page(url, FetchOutcome::Success(body.into()));
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> FetchOutcome {
        self.requests.lock().unwrap().push(url.to_string());
        self.pages
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_else(|| FetchOutcome::TransientFailure(format!("no page for {url}")))
    }
}

pub fn parser() -> GameLogParser {
    GameLogParser::new(&ParserConfig::default(), BASE_URL).unwrap()
}

pub fn listing_url(entity: &str, period: i32) -> String {
    format!("{BASE_URL}/teams/{entity}/{period}_games.html")
}

pub fn box_score_url(id: &str) -> String {
    format!("{BASE_URL}/boxscores/{id}.html")
}

/// A listing row: (date, opponent, points, opponent points, box score id).
pub struct Game<'a>(pub &'a str, pub &'a str, pub u32, pub u32, pub &'a str);

pub fn listing_page(games: &[Game<'_>]) -> String {
    let rows: Vec<String> = games
        .iter()
        .map(|Game(date, opp, pts, opp_pts, id)| {
            let streak = if pts > opp_pts { "W 1" } else { "L 1" };
            format!(
                r#"<tr>
                    <td data-stat="date_game" csk="{date}">{date}</td>
                    <td data-stat="box_score_text"><a href="/boxscores/{id}.html">Box Score</a></td>
                    <td data-stat="opp_name"><a href="/teams/{opp}/2016.html">{opp}</a></td>
                    <td data-stat="pts">{pts}</td>
                    <td data-stat="opp_pts">{opp_pts}</td>
                    <td data-stat="game_streak">{streak}</td>
                </tr>"#
            )
        })
        .collect();

    format!(
        r#"<html><body><table id="games"><tbody>{}</tbody></table></body></html>"#,
        rows.join("\n")
    )
}

pub fn box_score_page(officials: &[&str]) -> String {
    let links: Vec<String> = officials
        .iter()
        .enumerate()
        .map(|(i, name)| format!(r#"<a href="/referees/ref{i}.html">{name}</a>"#))
        .collect();

    format!(
        r#"<html><body><div><strong>Officials:</strong> {}</div>
        <a href="/referees/">Referees</a></body></html>"#,
        links.join(", ")
    )
}
