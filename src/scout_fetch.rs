use anyhow::{Context, Result, anyhow};
use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use tracing::{debug, info};

use crate::model::{
    InjurySignal, LineupSignal, RecommendationSignal, RecommendationType, Sentiment,
};
use crate::signal_fetch::{
    PageFetcher, SignalSource, absolute_url, element_text, normalize_player_name,
    scraped_at_now, select_by_class,
};

pub const PL_BASE_URL: &str = "https://www.premierleague.com";
pub const SCOUT_SOURCE: &str = "Official PL Scout Selection";
pub const NEWS_SOURCE: &str = "Official PL News";

const MIN_PARAGRAPH_CHARS: usize = 50;

static ARTICLE_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("article").expect("selector"));
static DIV_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("div").expect("selector"));
static P_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("p").expect("selector"));
static LINK_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").expect("selector"));
static ARTICLE_CLASS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"article|content").expect("class regex"));

static CAPTAIN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)([\w\s]+)\s+earns?\s+the\s+armband").expect("captain regex")
});
static VICE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)vice-captaincy?[:\s]+([\w\s]+)").expect("vice regex"));
static PRICED_PLAYER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)\s+\(([^)]+)\)\s+£([\d.]+)m")
        .expect("player regex")
});
static FORMATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d-\d-\d)\s+formation").expect("formation regex"));
static GAMEWEEK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"gameweek-(\d+)").expect("gameweek regex"));
static SCOUT_LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)scout-selection").expect("scout link regex"));

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoutSummary {
    pub gameweek: Option<u32>,
    pub formation: Option<String>,
    pub captain: Option<String>,
    pub vice_captain: Option<String>,
    pub players_count: usize,
    pub url: String,
}

/// A player named with club and price, e.g. `Bukayo Saka (Arsenal) £10.1m`.
#[derive(Debug, Clone, PartialEq)]
struct PricedPick {
    name: String,
    team: String,
    price: Option<f64>,
}

pub fn gameweek_from_url(url: &str) -> Option<u32> {
    GAMEWEEK_RE
        .captures(&url.to_lowercase())
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

fn article_root(doc: &Html) -> Option<ElementRef<'_>> {
    doc.select(&ARTICLE_SEL)
        .next()
        .or_else(|| select_by_class(doc, &DIV_SEL, &ARTICLE_CLASS).next())
}

fn captain_name(text: &str) -> Option<String> {
    CAPTAIN_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| normalize_player_name(m.as_str()))
}

fn priced_picks(text: &str) -> Vec<PricedPick> {
    PRICED_PLAYER_RE
        .captures_iter(text)
        .map(|caps| PricedPick {
            name: normalize_player_name(&caps[1]),
            team: caps[2].to_string(),
            price: caps[3].parse().ok(),
        })
        .collect()
}

/// Leading "First Last (" of a write-up paragraph, if it reads like a 2-3 word name.
fn paragraph_lead_name(para: &str) -> Option<String> {
    if para.chars().count() < MIN_PARAGRAPH_CHARS {
        return None;
    }
    let first_line = para.split('\n').next().unwrap_or_default();
    let candidate = first_line.split('(').next().unwrap_or_default().trim();
    let words: Vec<&str> = candidate.split_whitespace().collect();
    let capitalised = words
        .iter()
        .all(|w| w.chars().next().is_some_and(char::is_uppercase));
    if (2..=3).contains(&words.len()) && capitalised {
        Some(normalize_player_name(candidate))
    } else {
        None
    }
}

fn article_title(gameweek: Option<u32>) -> String {
    match gameweek {
        Some(gw) => format!("Scout Selection GW{gw}"),
        None => "Scout Selection".to_string(),
    }
}

fn is_captain(captain: Option<&str>, player: &str) -> bool {
    captain.is_some_and(|c| player.to_lowercase().contains(&c.to_lowercase()))
}

pub fn parse_scout_recommendations(
    html: &str,
    url: &str,
    gameweek: Option<u32>,
) -> Result<Vec<RecommendationSignal>> {
    let doc = Html::parse_document(html);
    let article = article_root(&doc).ok_or_else(|| anyhow!("scout article body not found"))?;
    let text = element_text(article);
    let captain = captain_name(&text);
    let title = article_title(gameweek);
    let scraped_at = scraped_at_now();

    let signal = |name: &str| {
        let kind = if is_captain(captain.as_deref(), name) {
            RecommendationType::Captain
        } else {
            RecommendationType::Essential
        };
        let mut rec = RecommendationSignal::new(SCOUT_SOURCE, name, kind, Sentiment::Positive);
        rec.article_title = Some(title.clone());
        rec.article_url = Some(url.to_string());
        rec.scraped_at = scraped_at.clone();
        rec
    };

    let mut recs: Vec<RecommendationSignal> = priced_picks(&text)
        .into_iter()
        .map(|pick| {
            let mut rec = signal(&pick.name);
            rec.price = pick.price;
            rec.team = Some(pick.team);
            rec
        })
        .collect();

    for para in article.select(&P_SEL) {
        let Some(name) = paragraph_lead_name(&element_text(para)) else {
            continue;
        };
        if recs.iter().any(|r| r.player_name == name) {
            continue;
        }
        recs.push(signal(&name));
    }

    debug!(count = recs.len(), captain = ?captain, "scout selection parsed");
    Ok(recs)
}

/// The scout XI keyed `Scout XI (GW n) - formation`; `None` when no priced picks are found.
pub fn parse_scout_lineup(html: &str, gameweek: Option<u32>) -> Result<Option<LineupSignal>> {
    let doc = Html::parse_document(html);
    let article = article_root(&doc).ok_or_else(|| anyhow!("scout article body not found"))?;
    let text = element_text(article);
    let starters: Vec<String> = priced_picks(&text).into_iter().map(|p| p.name).collect();
    if starters.is_empty() {
        return Ok(None);
    }
    let formation = FORMATION_RE
        .captures(&text)
        .map(|caps| caps[1].to_string())
        .unwrap_or_else(|| "Unknown".to_string());
    let gw = gameweek.map(|g| g.to_string()).unwrap_or_else(|| "?".to_string());
    Ok(Some(LineupSignal {
        team_name: format!("Scout XI (GW{gw}) - {formation}"),
        starters,
    }))
}

pub fn parse_scout_summary(html: &str, url: &str, gameweek: Option<u32>) -> Result<ScoutSummary> {
    let doc = Html::parse_document(html);
    let article = article_root(&doc).ok_or_else(|| anyhow!("scout article body not found"))?;
    let text = element_text(article);
    Ok(ScoutSummary {
        gameweek,
        formation: FORMATION_RE.captures(&text).map(|caps| caps[1].to_string()),
        captain: captain_name(&text),
        vice_captain: VICE_RE
            .captures(&text)
            .map(|caps| normalize_player_name(&caps[1])),
        players_count: PRICED_PLAYER_RE.find_iter(&text).count(),
        url: url.to_string(),
    })
}

pub fn find_latest_scout_url(html: &str, base: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    doc.select(&LINK_SEL)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| SCOUT_LINK_RE.is_match(href))
        .map(|href| absolute_url(base, href))
        .find(|href| href.to_lowercase().contains("gameweek"))
}

/// The page is fetched once and shared by every view.
#[derive(Debug)]
pub struct ScoutSelection {
    url: String,
    gameweek: Option<u32>,
    fetcher: PageFetcher,
    page: OnceCell<String>,
}

impl ScoutSelection {
    pub fn new(url: impl Into<String>, fetcher: PageFetcher) -> Self {
        let url = url.into();
        Self {
            gameweek: gameweek_from_url(&url),
            url,
            fetcher,
            page: OnceCell::new(),
        }
    }

    /// An already downloaded article; nothing is fetched.
    pub fn from_page(url: impl Into<String>, html: impl Into<String>) -> Self {
        let selection = Self::new(url, PageFetcher::default());
        let _ = selection.page.set(html.into());
        selection
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn gameweek(&self) -> Option<u32> {
        self.gameweek
    }

    fn page(&self) -> Result<&str> {
        self.page
            .get_or_try_init(|| {
                self.fetcher
                    .fetch(&self.url)
                    .with_context(|| format!("scout selection fetch failed: {}", self.url))
            })
            .map(String::as_str)
    }

    pub fn scout_summary(&self) -> Result<ScoutSummary> {
        parse_scout_summary(self.page()?, &self.url, self.gameweek)
    }
}

impl SignalSource for ScoutSelection {
    fn source_name(&self) -> &str {
        SCOUT_SOURCE
    }

    fn scrape_recommendations(&self) -> Result<Vec<RecommendationSignal>> {
        parse_scout_recommendations(self.page()?, &self.url, self.gameweek)
    }

    fn scrape_injuries(&self) -> Result<Vec<InjurySignal>> {
        Ok(Vec::new())
    }

    fn scrape_lineups(&self) -> Result<Vec<LineupSignal>> {
        Ok(parse_scout_lineup(self.page()?, self.gameweek)?
            .into_iter()
            .collect())
    }
}

#[derive(Debug)]
pub struct ScoutNewsFinder {
    news_url: String,
    fetcher: PageFetcher,
    found: OnceCell<Option<ScoutSelection>>,
}

impl ScoutNewsFinder {
    pub fn new(fetcher: PageFetcher) -> Self {
        Self {
            news_url: format!("{PL_BASE_URL}/news"),
            fetcher,
            found: OnceCell::new(),
        }
    }

    fn selection(&self) -> Result<Option<&ScoutSelection>> {
        let found = self.found.get_or_try_init(|| {
            let html = self
                .fetcher
                .fetch(&self.news_url)
                .context("news index fetch failed")?;
            let url = find_latest_scout_url(&html, PL_BASE_URL);
            match &url {
                Some(url) => info!(%url, "found scout selection"),
                None => info!("no scout selection link on news index"),
            }
            Ok::<_, anyhow::Error>(url.map(|url| ScoutSelection::new(url, self.fetcher.clone())))
        })?;
        Ok(found.as_ref())
    }
}

impl SignalSource for ScoutNewsFinder {
    fn source_name(&self) -> &str {
        NEWS_SOURCE
    }

    fn scrape_recommendations(&self) -> Result<Vec<RecommendationSignal>> {
        match self.selection()? {
            Some(selection) => selection.scrape_recommendations(),
            None => Ok(Vec::new()),
        }
    }

    fn scrape_injuries(&self) -> Result<Vec<InjurySignal>> {
        Ok(Vec::new())
    }

    fn scrape_lineups(&self) -> Result<Vec<LineupSignal>> {
        match self.selection()? {
            Some(selection) => selection.scrape_lineups(),
            None => Ok(Vec::new()),
        }
    }
}
