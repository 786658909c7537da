use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, warn};

use crate::model::{InjurySignal, LineupSignal, RecommendationSignal};
use crate::signal_fetch::{
    PageFetcher, SignalSource, absolute_url, analyze_sentiment, classify_injury_text,
    classify_recommendation, element_text, extract_player_names, first_match, mentions_injury,
    scraped_at_now, select_by_class, stripped_text,
};

pub const FFS_BASE_URL: &str = "https://www.fantasyfootballscout.co.uk";
pub const FFS_SOURCE: &str = "Fantasy Football Scout";

const MAX_ARTICLES: usize = 5;
const MAX_NEWS_ITEMS: usize = 20;
const NEWS_TEXT_CHARS: usize = 200;

static ARTICLE_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("article").expect("selector"));
static TITLE_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("h2, h3, a").expect("selector"));
static LINK_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("a").expect("selector"));
static ENTRY_CONTENT_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.entry-content").expect("selector"));
static NEWS_ITEM_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("article, div").expect("selector"));
static LINEUP_SECTION_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div, section").expect("selector"));
static HEADER_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h2, h3, h4").expect("selector"));
static NEWS_CLASS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"news|team|injury").expect("class regex"));
static LINEUP_CLASS: Lazy<Regex> = Lazy::new(|| Regex::new(r"team|lineup").expect("class regex"));

#[derive(Debug, Clone, PartialEq)]
pub struct ArticleLink {
    pub title: String,
    pub url: Option<String>,
}

pub fn parse_tips_index(html: &str, base: &str) -> Vec<ArticleLink> {
    let doc = Html::parse_document(html);
    doc.select(&ARTICLE_SEL)
        .take(MAX_ARTICLES)
        .filter_map(|article| {
            let title_el = first_match(article, &TITLE_SEL)?;
            let href = if title_el.value().name() == "a" {
                title_el.value().attr("href")
            } else {
                first_match(title_el, &LINK_SEL).and_then(|a| a.value().attr("href"))
            };
            Some(ArticleLink {
                title: stripped_text(title_el),
                url: href.map(|h| absolute_url(base, h)),
            })
        })
        .collect()
}

pub fn parse_article_recommendations(
    html: &str,
    title: &str,
    url: &str,
) -> Vec<RecommendationSignal> {
    let doc = Html::parse_document(html);
    let Some(content) = doc
        .select(&ARTICLE_SEL)
        .next()
        .or_else(|| doc.select(&ENTRY_CONTENT_SEL).next())
    else {
        return Vec::new();
    };
    let text = element_text(content);
    let kind = classify_recommendation(title);
    let sentiment = analyze_sentiment(&text);
    let scraped_at = scraped_at_now();

    extract_player_names(&text)
        .into_iter()
        .map(|name| {
            let mut rec = RecommendationSignal::new(FFS_SOURCE, &name, kind, sentiment);
            rec.article_title = Some(title.to_string());
            rec.article_url = Some(url.to_string());
            rec.scraped_at = scraped_at.clone();
            rec
        })
        .collect()
}

pub fn parse_team_news(html: &str) -> Vec<InjurySignal> {
    let doc = Html::parse_document(html);
    let scraped_at = scraped_at_now();
    let mut injuries = Vec::new();
    for item in select_by_class(&doc, &NEWS_ITEM_SEL, &NEWS_CLASS).take(MAX_NEWS_ITEMS) {
        let text = element_text(item);
        if !mentions_injury(&text) {
            continue;
        }
        let status = classify_injury_text(&text);
        let news_text: String = text.chars().take(NEWS_TEXT_CHARS).collect();
        for name in extract_player_names(&text) {
            injuries.push(InjurySignal {
                source: FFS_SOURCE.to_string(),
                player_name: name,
                status,
                news_text: news_text.clone(),
                scraped_at: scraped_at.clone(),
            });
        }
    }
    injuries
}

/// One lineup per headed team/lineup section; a repeated header replaces the earlier one.
pub fn parse_predicted_lineups(html: &str) -> Vec<LineupSignal> {
    let doc = Html::parse_document(html);
    let mut lineups: Vec<LineupSignal> = Vec::new();
    for section in select_by_class(&doc, &LINEUP_SECTION_SEL, &LINEUP_CLASS) {
        let Some(header) = first_match(section, &HEADER_SEL) else {
            continue;
        };
        let lineup = LineupSignal {
            team_name: stripped_text(header),
            starters: extract_player_names(&element_text(section)),
        };
        match lineups.iter_mut().find(|l| l.team_name == lineup.team_name) {
            Some(existing) => existing.starters = lineup.starters,
            None => lineups.push(lineup),
        }
    }
    lineups
}

#[derive(Debug, Clone)]
pub struct FantasyFootballScout {
    base_url: String,
    fetcher: PageFetcher,
}

impl FantasyFootballScout {
    pub fn new(fetcher: PageFetcher) -> Self {
        Self::with_base_url(FFS_BASE_URL, fetcher)
    }

    pub fn with_base_url(base_url: impl Into<String>, fetcher: PageFetcher) -> Self {
        Self {
            base_url: base_url.into(),
            fetcher,
        }
    }

    fn page(&self, path: &str) -> Result<String> {
        let url = format!("{}{path}", self.base_url);
        self.fetcher
            .fetch(&url)
            .with_context(|| format!("fetch failed: {url}"))
    }
}

impl SignalSource for FantasyFootballScout {
    fn source_name(&self) -> &str {
        FFS_SOURCE
    }

    fn scrape_recommendations(&self) -> Result<Vec<RecommendationSignal>> {
        let index = self.page("/fantasy-football-tips/")?;
        let mut recs = Vec::new();
        for link in parse_tips_index(&index, &self.base_url) {
            let Some(url) = link.url else {
                continue;
            };
            // One unreachable article must not drop the others.
            match self.fetcher.fetch(&url) {
                Ok(html) => recs.extend(parse_article_recommendations(&html, &link.title, &url)),
                Err(err) => warn!(%url, error = %err, "article fetch failed"),
            }
        }
        debug!(count = recs.len(), "tips articles parsed");
        Ok(recs)
    }

    fn scrape_injuries(&self) -> Result<Vec<InjurySignal>> {
        Ok(parse_team_news(&self.page("/team-news/")?))
    }

    fn scrape_lineups(&self) -> Result<Vec<LineupSignal>> {
        Ok(parse_predicted_lineups(&self.page("/predicted-lineups/")?))
    }
}
