// src/services/extractor.rs

//! Page extraction.
//!
//! The collector only sees [`ExtractionAdapter`]; [`GameLogParser`] is the
//! implementation for season game logs and box scores.

use chrono::NaiveDate;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{CompiledSelectors, GameStub, ParserConfig};
use crate::utils::{path_segment, resolve_url};

/// Turns fetched pages into structured rows.
///
/// A listing yields one result per game row so a bad row can be skipped
/// without losing the rest; the outer error means the page as a whole was
/// unusable.
pub trait ExtractionAdapter: Send + Sync {
    fn extract_listing(&self, body: &str) -> Result<Vec<Result<GameStub>>>;

    /// Official names in page order.
    fn extract_officials(&self, body: &str) -> Result<Vec<String>>;
}

/// Cells of a game log row that the parser reads, keyed by `data-stat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListingField {
    Date,
    Points,
    OppPoints,
    Streak,
    Opponent,
    BoxScore,
}

impl ListingField {
    const ALL: [ListingField; 6] = [
        Self::Date,
        Self::Points,
        Self::OppPoints,
        Self::Streak,
        Self::Opponent,
        Self::BoxScore,
    ];

    fn tag(self) -> &'static str {
        match self {
            Self::Date => "date_game",
            Self::Points => "pts",
            Self::OppPoints => "opp_pts",
            Self::Streak => "game_streak",
            Self::Opponent => "opp_name",
            Self::BoxScore => "box_score_text",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.tag() == tag)
    }
}

#[derive(Debug, Default)]
struct StubFields {
    date: Option<String>,
    opponent: Option<String>,
    points: Option<u32>,
    opp_points: Option<u32>,
    win: Option<bool>,
    detail_url: Option<String>,
}

impl StubFields {
    fn finish(self) -> Result<GameStub> {
        fn need<T>(value: Option<T>, field: ListingField) -> Result<T> {
            value.ok_or_else(|| AppError::malformed(format!("missing {}", field.tag())))
        }

        Ok(GameStub {
            date: need(self.date, ListingField::Date)?,
            opponent: need(self.opponent, ListingField::Opponent)?,
            points: need(self.points, ListingField::Points)?,
            opp_points: need(self.opp_points, ListingField::OppPoints)?,
            win: need(self.win, ListingField::Streak)?,
            detail_url: need(self.detail_url, ListingField::BoxScore)?,
        })
    }
}

/// HTML parser for team game logs and box scores.
#[derive(Debug, Clone)]
pub struct GameLogParser {
    selectors: CompiledSelectors,
    cell: Selector,
    link: Selector,
    terminator: String,
    base_url: Url,
}

impl GameLogParser {
    pub fn new(config: &ParserConfig, base_url: &str) -> Result<Self> {
        Ok(Self {
            selectors: config.compile()?,
            cell: Self::parse_selector("th[data-stat], td[data-stat]")?,
            link: Self::parse_selector("a[href]")?,
            terminator: config.official_terminator.clone(),
            base_url: Url::parse(base_url)?,
        })
    }

    fn parse_row(&self, row: ElementRef<'_>) -> Result<GameStub> {
        let mut fields = StubFields::default();

        for cell in row.select(&self.cell) {
            let Some(field) = cell.value().attr("data-stat").and_then(ListingField::from_tag)
            else {
                continue;
            };
            self.read_field(field, cell, &mut fields)?;
        }

        fields.finish()
    }

    fn read_field(
        &self,
        field: ListingField,
        cell: ElementRef<'_>,
        fields: &mut StubFields,
    ) -> Result<()> {
        match field {
            ListingField::Date => {
                let raw = cell
                    .value()
                    .attr("csk")
                    .ok_or_else(|| AppError::malformed("date cell has no sort key"))?;
                let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .map_err(|e| AppError::malformed(format!("bad date '{raw}': {e}")))?;
                fields.date = Some(date.format("%Y-%m-%d").to_string());
            }
            ListingField::Points => fields.points = Some(Self::score(cell, field)?),
            ListingField::OppPoints => fields.opp_points = Some(Self::score(cell, field)?),
            ListingField::Streak => {
                let text = Self::text(cell);
                fields.win = match text.chars().next() {
                    Some('W') => Some(true),
                    Some('L') => Some(false),
                    _ => return Err(AppError::malformed(format!("bad streak '{text}'"))),
                };
            }
            ListingField::Opponent => {
                let href = self.href(cell, field)?;
                let team = path_segment(href, 1).ok_or_else(|| {
                    AppError::malformed(format!("no team id in opponent link '{href}'"))
                })?;
                fields.opponent = Some(team.to_string());
            }
            ListingField::BoxScore => {
                let href = self.href(cell, field)?;
                fields.detail_url = Some(resolve_url(&self.base_url, href));
            }
        }
        Ok(())
    }

    fn href<'a>(&self, cell: ElementRef<'a>, field: ListingField) -> Result<&'a str> {
        cell.select(&self.link)
            .next()
            .and_then(|a| a.value().attr("href"))
            .ok_or_else(|| AppError::malformed(format!("no link in {}", field.tag())))
    }

    fn score(cell: ElementRef<'_>, field: ListingField) -> Result<u32> {
        let text = Self::text(cell);
        text.parse()
            .map_err(|_| AppError::malformed(format!("bad {} '{}'", field.tag(), text)))
    }

    fn text(cell: ElementRef<'_>) -> String {
        cell.text().collect::<String>().trim().to_string()
    }

    fn is_header_row(row: &ElementRef<'_>) -> bool {
        row.value().classes().any(|c| c == "thead")
    }

    fn parse_selector(s: &str) -> Result<Selector> {
        Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
    }
}

impl ExtractionAdapter for GameLogParser {
    fn extract_listing(&self, body: &str) -> Result<Vec<Result<GameStub>>> {
        let document = Html::parse_document(body);
        let rows: Vec<_> = document
            .select(&self.selectors.row)
            .filter(|row| !Self::is_header_row(row))
            .collect();

        if rows.is_empty() {
            return Err(AppError::malformed("no game rows in listing"));
        }

        Ok(rows.into_iter().map(|row| self.parse_row(row)).collect())
    }

    fn extract_officials(&self, body: &str) -> Result<Vec<String>> {
        let document = Html::parse_document(body);
        let mut names = Vec::new();

        for link in document.select(&self.selectors.official) {
            let name = Self::text(link);
            if name == self.terminator {
                break;
            }
            if !name.is_empty() {
                names.push(name);
            }
        }

        if names.is_empty() {
            return Err(AppError::malformed("no officials on box score"));
        }
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> GameLogParser {
        GameLogParser::new(&ParserConfig::default(), "https://www.basketball-reference.com")
            .unwrap()
    }

    fn game_row(date: &str, opp: &str, pts: &str, opp_pts: &str, streak: &str, box_href: &str) -> String {
        format!(
            r#"<tr>
                <th data-stat="g">1</th>
                <td data-stat="date_game" csk="{date}"><a href="/boxscores/index.fcgi">Wed, Oct 26</a></td>
                <td data-stat="box_score_text"><a href="{box_href}">Box Score</a></td>
                <td data-stat="opp_name"><a href="/teams/{opp}/2017.html">Opponent</a></td>
                <td data-stat="pts">{pts}</td>
                <td data-stat="opp_pts">{opp_pts}</td>
                <td data-stat="game_streak">{streak}</td>
            </tr>"#
        )
    }

    fn listing(rows: &[String]) -> String {
        format!(
            r#"<html><body><table id="games"><thead><tr><th>G</th></tr></thead>
            <tbody>{}</tbody></table></body></html>"#,
            rows.join("\n")
        )
    }

    #[test]
    fn test_listing_rows_parse_in_order() {
        let body = listing(&[
            game_row("2016-10-26", "ORL", "108", "96", "W 1", "/boxscores/201610260ORL.html"),
            r#"<tr class="thead"><th data-stat="g">G</th></tr>"#.to_string(),
            game_row("2016-10-28", "CHO", "91", "97", "L 1", "/boxscores/201610280MIA.html"),
        ]);

        let rows = parser().extract_listing(&body).unwrap();
        assert_eq!(rows.len(), 2);

        let first = rows[0].as_ref().unwrap();
        assert_eq!(first.date, "2016-10-26");
        assert_eq!(first.opponent, "ORL");
        assert_eq!(first.points, 108);
        assert_eq!(first.opp_points, 96);
        assert!(first.win);
        assert_eq!(
            first.detail_url,
            "https://www.basketball-reference.com/boxscores/201610260ORL.html"
        );

        let second = rows[1].as_ref().unwrap();
        assert_eq!(second.opponent, "CHO");
        assert!(!second.win);
    }

    #[test]
    fn test_unplayed_game_is_row_error() {
        let body = listing(&[
            game_row("2016-10-26", "ORL", "108", "96", "W 1", "/boxscores/1.html"),
            game_row("2017-04-12", "WAS", "", "", "", "/boxscores/2.html"),
        ]);

        let rows = parser().extract_listing(&body).unwrap();
        assert!(rows[0].is_ok());
        assert!(matches!(rows[1], Err(AppError::MalformedPage(_))));
    }

    #[test]
    fn test_missing_box_score_link_is_row_error() {
        let row = game_row("2016-10-26", "ORL", "108", "96", "W 1", "/x.html")
            .replace(r#"<a href="/x.html">Box Score</a>"#, "");
        let rows = parser().extract_listing(&listing(&[row])).unwrap();

        let err = rows[0].as_ref().unwrap_err();
        assert!(err.to_string().contains("box_score_text"));
    }

    #[test]
    fn test_page_without_games_table_is_malformed() {
        let result = parser().extract_listing("<html><body><p>Page not found</p></body></html>");
        assert!(matches!(result, Err(AppError::MalformedPage(_))));
    }

    #[test]
    fn test_officials_stop_at_terminator() {
        let body = r#"<html><body>
            <div><strong>Officials:</strong>
              <a href="/referees/fostesc99r.html">Scott Foster</a>,
              <a href="/referees/brothto99r.html">Tony Brothers</a>,
              <a href="/referees/fostesc99r.html">Scott Foster</a>
            </div>
            <ul><li><a href="/referees/">Referees</a></li>
                <li><a href="/referees/2017_register.html">Register</a></li></ul>
        </body></html>"#;

        let names = parser().extract_officials(body).unwrap();
        assert_eq!(names, vec!["Scott Foster", "Tony Brothers", "Scott Foster"]);
    }

    #[test]
    fn test_box_score_without_officials_is_malformed() {
        let result = parser().extract_officials("<html><body><a href=\"/referees/\">Referees</a></body></html>");
        assert!(matches!(result, Err(AppError::MalformedPage(_))));
    }

    #[test]
    fn test_field_tags_roundtrip() {
        for field in ListingField::ALL {
            assert_eq!(ListingField::from_tag(field.tag()), Some(field));
        }
        assert_eq!(ListingField::from_tag("opp_name_abbr"), None);
    }
}
