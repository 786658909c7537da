use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use tracing::{info, warn};

use crate::consensus::ConsensusStore;
use crate::http_client::fetch_text;
use crate::model::{
    InjurySignal, InjuryStatus, LineupSignal, RecommendationSignal, RecommendationType, Sentiment,
    SignalSet,
};

pub const DEFAULT_SCRAPE_DELAY: Duration = Duration::from_secs(2);

static NAME_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Z][a-z]+(?:\s+[A-Z][a-z]+)*\b").expect("name regex"));
static OUT_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bout\b").expect("out regex"));

const POSITIVE_WORDS: &[&str] = &[
    "recommend",
    "great",
    "excellent",
    "best",
    "strong",
    "essential",
    "must-have",
    "fantastic",
    "form",
    "fixture",
];
const NEGATIVE_WORDS: &[&str] = &[
    "avoid", "poor", "doubt", "injury", "rotation", "risk", "benched", "dropped", "concern",
];
pub const INJURY_KEYWORDS: &[&str] = &[
    "injury",
    "doubt",
    "suspended",
    "banned",
    "out",
    "ruled out",
    "fitness",
    "unavailable",
    "sidelined",
    "red card",
];

pub trait SignalSource {
    fn source_name(&self) -> &str;
    fn scrape_recommendations(&self) -> Result<Vec<RecommendationSignal>>;
    fn scrape_injuries(&self) -> Result<Vec<InjurySignal>>;
    fn scrape_lineups(&self) -> Result<Vec<LineupSignal>>;
}

impl<T: SignalSource + ?Sized> SignalSource for Arc<T> {
    fn source_name(&self) -> &str {
        (**self).source_name()
    }

    fn scrape_recommendations(&self) -> Result<Vec<RecommendationSignal>> {
        (**self).scrape_recommendations()
    }

    fn scrape_injuries(&self) -> Result<Vec<InjurySignal>> {
        (**self).scrape_injuries()
    }

    fn scrape_lineups(&self) -> Result<Vec<LineupSignal>> {
        (**self).scrape_lineups()
    }
}

#[derive(Debug, Clone)]
pub struct PageFetcher {
    delay: Duration,
}

impl Default for PageFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_SCRAPE_DELAY)
    }
}

impl PageFetcher {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn fetch(&self, url: &str) -> Result<String> {
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        fetch_text(url)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Recommendations,
    Injuries,
    Lineups,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScrapeOutcome {
    pub source: String,
    pub capability: Capability,
    pub items: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ScrapeReport {
    pub outcomes: Vec<ScrapeOutcome>,
    pub scraped_at: String,
}

impl ScrapeReport {
    pub fn failures(&self) -> impl Iterator<Item = &ScrapeOutcome> {
        self.outcomes.iter().filter(|o| o.error.is_some())
    }

    pub fn items(&self, capability: Capability) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.capability == capability)
            .map(|o| o.items)
            .sum()
    }

    fn record<T>(&mut self, source: &str, capability: Capability, result: &Result<Vec<T>>) {
        let (items, error) = match result {
            Ok(rows) => (rows.len(), None),
            Err(err) => {
                warn!(source, ?capability, error = %format!("{err:#}"), "scrape failed");
                (0, Some(format!("{err:#}")))
            }
        };
        self.outcomes.push(ScrapeOutcome {
            source: source.to_string(),
            capability,
            items,
            error,
        });
    }
}

/// Run every source in order. A failing capability is logged, noted in the
/// report and contributes nothing; it never stops the batch.
pub fn aggregate_sources(sources: &[Box<dyn SignalSource>]) -> (ConsensusStore, ScrapeReport) {
    let mut signals = SignalSet::default();
    let mut report = ScrapeReport::default();

    for source in sources {
        let name = source.source_name();
        info!(source = name, "scraping");

        let recs = source.scrape_recommendations();
        report.record(name, Capability::Recommendations, &recs);
        if let Ok(recs) = recs {
            signals.recommendations.extend(recs);
        }

        let injuries = source.scrape_injuries();
        report.record(name, Capability::Injuries, &injuries);
        if let Ok(injuries) = injuries {
            signals.injuries.extend(injuries);
        }

        let lineups = source.scrape_lineups();
        report.record(name, Capability::Lineups, &lineups);
        if let Ok(lineups) = lineups {
            for lineup in lineups {
                signals.upsert_lineup(lineup);
            }
        }
    }

    report.scraped_at = scraped_at_now();
    info!(
        recommendations = signals.recommendations.len(),
        injuries = signals.injuries.len(),
        lineups = signals.lineups.len(),
        failures = report.failures().count(),
        "scraping finished"
    );
    (ConsensusStore::new(signals), report)
}

pub fn scraped_at_now() -> String {
    Utc::now().to_rfc3339()
}

pub fn normalize_player_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn extract_player_names(text: &str) -> Vec<String> {
    NAME_RUN
        .find_iter(text)
        .map(|m| normalize_player_name(m.as_str()))
        .collect()
}

pub fn classify_recommendation(title: &str) -> RecommendationType {
    let title = title.to_lowercase();
    if title.contains("captain") {
        RecommendationType::Captain
    } else if title.contains("differential") {
        RecommendationType::Differential
    } else if title.contains("transfer") {
        RecommendationType::Transfer
    } else if title.contains("budget") || title.contains("cheap") {
        RecommendationType::Budget
    } else if title.contains("avoid") {
        RecommendationType::Avoid
    } else if title.contains("must") || title.contains("essential") {
        RecommendationType::Essential
    } else {
        RecommendationType::General
    }
}

/// Counts distinct cue words present; one side must outweigh the other by 1.5x.
pub fn analyze_sentiment(text: &str) -> Sentiment {
    let text = text.to_lowercase();
    let pos = POSITIVE_WORDS.iter().filter(|w| text.contains(**w)).count() as f64;
    let neg = NEGATIVE_WORDS.iter().filter(|w| text.contains(**w)).count() as f64;
    if pos > neg * 1.5 {
        Sentiment::Positive
    } else if neg > pos * 1.5 {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    }
}

pub fn mentions_injury(text: &str) -> bool {
    let text = text.to_lowercase();
    INJURY_KEYWORDS.iter().any(|k| text.contains(k))
}

/// "out" must stand alone so "doubt" and "without" do not read as ruled out.
pub fn classify_injury_text(text: &str) -> InjuryStatus {
    let text = text.to_lowercase();
    if OUT_WORD.is_match(&text) {
        InjuryStatus::Out
    } else if text.contains("doubt") {
        InjuryStatus::Doubtful
    } else if text.contains("suspended") || text.contains("banned") {
        InjuryStatus::Suspended
    } else {
        InjuryStatus::Unknown
    }
}

pub fn absolute_url(base: &str, href: &str) -> String {
    if href.starts_with("http") {
        href.to_string()
    } else {
        format!("{}{}", base.trim_end_matches('/'), href)
    }
}

pub(crate) fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect()
}

pub(crate) fn stripped_text(el: ElementRef<'_>) -> String {
    el.text().map(str::trim).collect()
}

pub(crate) fn first_match<'a>(root: ElementRef<'a>, selector: &Selector) -> Option<ElementRef<'a>> {
    root.select(selector).next()
}

pub(crate) fn select_by_class<'a>(
    doc: &'a Html,
    selector: &'a Selector,
    class_re: &'a Regex,
) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    doc.select(selector).filter(move |el| {
        el.value()
            .attr("class")
            .is_some_and(|class| class_re.is_match(class))
    })
}
