use std::collections::{BTreeSet, HashMap};

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::http_cache::ResponseCache;
use crate::http_client::fetch_text;
use crate::model::{
    FixtureOutlook, HistoricalRecord, NextFixture, PlayerStat, PlayerStatus, Position, TeamInfo,
};
use crate::player_score::FIXTURE_HORIZON;

pub const FPL_API_BASE: &str = "https://fantasy.premierleague.com/api/";

#[derive(Debug, Clone, Deserialize)]
pub struct GameweekEvent {
    pub id: u32,
    #[serde(default)]
    pub is_current: bool,
    #[serde(default)]
    pub is_next: bool,
}

#[derive(Debug, Clone)]
pub struct Bootstrap {
    pub events: Vec<GameweekEvent>,
    pub teams: Vec<TeamInfo>,
    pub players: Vec<PlayerStat>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureRow {
    pub id: u64,
    #[serde(default)]
    pub event: Option<u32>,
    pub team_h: u32,
    pub team_a: u32,
    #[serde(default)]
    pub team_h_difficulty: Option<u8>,
    #[serde(default)]
    pub team_a_difficulty: Option<u8>,
}

#[derive(Debug, Clone)]
pub struct SquadPicks {
    pub squad_ids: Vec<u32>,
    /// In millions; the API reports tenths.
    pub bank: f64,
    pub event_transfers_cost: i32,
}

#[derive(Debug, Clone, Default)]
pub struct EntryInfo {
    pub team_name: String,
    pub manager_name: String,
    pub overall_points: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ElementSummary {
    #[serde(default)]
    pub fixtures: Vec<SummaryFixture>,
    #[serde(default)]
    pub history: Vec<SummaryHistory>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SummaryFixture {
    pub team_h: u32,
    pub team_a: u32,
    #[serde(default)]
    pub is_home: bool,
    #[serde(default = "default_difficulty")]
    pub difficulty: u8,
    #[serde(default)]
    pub event: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SummaryHistory {
    pub opponent_team: u32,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total_points: f64,
}

#[derive(Debug, Deserialize)]
struct RawBootstrap {
    #[serde(default)]
    events: Vec<GameweekEvent>,
    #[serde(default)]
    teams: Vec<RawTeam>,
    #[serde(default)]
    elements: Vec<RawElement>,
}

#[derive(Debug, Deserialize)]
struct RawTeam {
    id: u32,
    name: String,
    #[serde(default)]
    short_name: String,
}

#[derive(Debug, Deserialize)]
struct RawElement {
    id: u32,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    second_name: String,
    #[serde(default)]
    web_name: String,
    element_type: u8,
    team: u32,
    #[serde(default, deserialize_with = "lenient_f64")]
    now_cost: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    form: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    total_points: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    ict_index: f64,
    #[serde(default)]
    status: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    selected_by_percent: f64,
}

#[derive(Debug, Deserialize)]
struct RawPicks {
    #[serde(default)]
    picks: Vec<RawPick>,
    entry_history: RawEntryHistory,
}

#[derive(Debug, Deserialize)]
struct RawPick {
    element: u32,
}

#[derive(Debug, Deserialize)]
struct RawEntryHistory {
    #[serde(default, deserialize_with = "lenient_f64")]
    bank: f64,
    #[serde(default)]
    event_transfers_cost: i32,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(default)]
    name: String,
    #[serde(default)]
    player_first_name: String,
    #[serde(default)]
    player_last_name: String,
    #[serde(default)]
    summary_overall_points: Option<i64>,
}

fn default_difficulty() -> u8 {
    3
}

/// Numbers arrive as JSON numbers or numeric strings ("5.2"); anything else reads as 0.
fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        // "NaN" and "inf" parse as floats but are not usable stats.
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .unwrap_or(0.0),
        _ => 0.0,
    })
}

pub fn parse_bootstrap_json(raw: &str) -> Result<Bootstrap> {
    let data: RawBootstrap = serde_json::from_str(raw).context("invalid bootstrap json")?;
    let team_names: HashMap<u32, String> =
        data.teams.iter().map(|t| (t.id, t.name.clone())).collect();

    let mut players = Vec::with_capacity(data.elements.len());
    for el in data.elements {
        let Some(position) = Position::from_element_type(el.element_type) else {
            debug!(id = el.id, element_type = el.element_type, "skipping unknown element type");
            continue;
        };
        let full_name = format!("{} {}", el.first_name.trim(), el.second_name.trim())
            .trim()
            .to_string();
        players.push(PlayerStat {
            id: el.id,
            full_name,
            web_name: el.web_name,
            position,
            team_id: el.team,
            team_name: team_names.get(&el.team).cloned().unwrap_or_default(),
            price: el.now_cost / 10.0,
            form: el.form,
            total_points: el.total_points as i32,
            ict_index: el.ict_index,
            status: if el.status == "a" {
                PlayerStatus::Active
            } else {
                PlayerStatus::Unavailable
            },
            selected_by_percent: el.selected_by_percent,
        });
    }

    let teams = data
        .teams
        .into_iter()
        .map(|t| TeamInfo {
            id: t.id,
            name: t.name,
            short_name: t.short_name,
        })
        .collect();

    Ok(Bootstrap {
        events: data.events,
        teams,
        players,
    })
}

pub fn parse_fixtures_json(raw: &str) -> Result<Vec<FixtureRow>> {
    serde_json::from_str(raw).context("invalid fixtures json")
}

pub fn parse_picks_json(raw: &str) -> Result<SquadPicks> {
    let data: RawPicks = serde_json::from_str(raw).context("invalid picks json")?;
    Ok(SquadPicks {
        squad_ids: data.picks.into_iter().map(|p| p.element).collect(),
        bank: data.entry_history.bank / 10.0,
        event_transfers_cost: data.entry_history.event_transfers_cost,
    })
}

pub fn parse_entry_json(raw: &str) -> Result<EntryInfo> {
    let data: RawEntry = serde_json::from_str(raw).context("invalid entry json")?;
    Ok(EntryInfo {
        team_name: data.name,
        manager_name: format!("{} {}", data.player_first_name, data.player_last_name)
            .trim()
            .to_string(),
        overall_points: data.summary_overall_points.unwrap_or(0),
    })
}

pub fn parse_element_summary_json(raw: &str) -> Result<ElementSummary> {
    serde_json::from_str(raw).context("invalid element summary json")
}

pub fn current_gameweek(events: &[GameweekEvent]) -> u32 {
    events
        .iter()
        .find(|e| e.is_next)
        .or_else(|| events.iter().find(|e| e.is_current))
        .map(|e| e.id)
        .unwrap_or(1)
}

/// Club id to its opponent in gameweek `gw`. With a double gameweek the
/// later fixture in the list wins.
pub fn next_opponents(fixtures: &[FixtureRow], gw: u32) -> HashMap<u32, NextFixture> {
    let mut map = HashMap::new();
    for f in fixtures.iter().filter(|f| f.event == Some(gw)) {
        map.insert(
            f.team_h,
            NextFixture {
                opponent_id: f.team_a,
                is_home: true,
            },
        );
        map.insert(
            f.team_a,
            NextFixture {
                opponent_id: f.team_h,
                is_home: false,
            },
        );
    }
    map
}

pub fn fixture_outlook(summary: &ElementSummary) -> FixtureOutlook {
    let upcoming = summary.fixtures.iter().take(FIXTURE_HORIZON);
    FixtureOutlook {
        difficulties: upcoming.clone().map(|f| f.difficulty).collect(),
        opponents: upcoming
            .map(|f| if f.is_home { f.team_a } else { f.team_h })
            .collect(),
    }
}

pub fn history_vs(player_id: u32, summary: &ElementSummary, opponent_id: u32) -> HistoricalRecord {
    let points: Vec<f64> = summary
        .history
        .iter()
        .filter(|h| h.opponent_team == opponent_id)
        .map(|h| h.total_points)
        .collect();
    let avg_points = if points.is_empty() {
        0.0
    } else {
        points.iter().sum::<f64>() / points.len() as f64
    };
    HistoricalRecord {
        player_id,
        opponent_id,
        matches_played: points.len() as u32,
        avg_points,
    }
}

pub fn history_records(player_id: u32, summary: &ElementSummary) -> Vec<HistoricalRecord> {
    let opponents: BTreeSet<u32> = summary.history.iter().map(|h| h.opponent_team).collect();
    opponents
        .into_iter()
        .map(|opp| history_vs(player_id, summary, opp))
        .collect()
}

fn fetch_cached(cache: &ResponseCache, key: &str, path: &str) -> Result<String> {
    let url = format!("{FPL_API_BASE}{path}");
    cache.with_cached(key, || {
        debug!(%url, "fetching");
        fetch_text(&url)
    })
}

pub fn fetch_bootstrap(cache: &ResponseCache) -> Result<Bootstrap> {
    let body = fetch_cached(cache, "bootstrap", "bootstrap-static/")
        .context("bootstrap-static request failed")?;
    parse_bootstrap_json(&body)
}

pub fn fetch_fixtures(cache: &ResponseCache) -> Result<Vec<FixtureRow>> {
    let body = fetch_cached(cache, "fixtures", "fixtures/").context("fixtures request failed")?;
    parse_fixtures_json(&body)
}

pub fn fetch_entry(cache: &ResponseCache, team_id: u64) -> Result<EntryInfo> {
    let body = fetch_cached(cache, &format!("entry_{team_id}"), &format!("entry/{team_id}/"))
        .context("entry request failed")?;
    parse_entry_json(&body)
}

pub fn fetch_picks(cache: &ResponseCache, team_id: u64, gw: u32) -> Result<SquadPicks> {
    let body = fetch_cached(
        cache,
        &format!("picks_{team_id}_{gw}"),
        &format!("entry/{team_id}/event/{gw}/picks/"),
    )
    .context("picks request failed")?;
    parse_picks_json(&body)
}

pub fn fetch_element_summary(cache: &ResponseCache, player_id: u32) -> Result<ElementSummary> {
    let body = fetch_cached(
        cache,
        &format!("element_summary_{player_id}"),
        &format!("element-summary/{player_id}/"),
    )
    .with_context(|| format!("element-summary request failed for {player_id}"))?;
    parse_element_summary_json(&body)
}

/// Fetch summaries on a bounded pool. Players whose fetch fails are left out
/// and score with neutral fixture and history defaults.
pub fn fetch_element_summaries(
    cache: &ResponseCache,
    player_ids: &[u32],
    parallelism: usize,
) -> HashMap<u32, ElementSummary> {
    let pool = build_fetch_pool(parallelism);
    let fetched: Vec<(u32, ElementSummary)> = with_fetch_pool(&pool, || {
        player_ids
            .par_iter()
            .filter_map(|id| match fetch_element_summary(cache, *id) {
                Ok(summary) => Some((*id, summary)),
                Err(err) => {
                    warn!(player_id = *id, error = %err, "element summary unavailable");
                    None
                }
            })
            .collect()
    });
    info!(
        requested = player_ids.len(),
        fetched = fetched.len(),
        "element summaries loaded"
    );
    fetched.into_iter().collect()
}

fn build_fetch_pool(threads: usize) -> Option<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads.clamp(1, 16))
        .build()
        .ok()
}

fn with_fetch_pool<T>(pool: &Option<rayon::ThreadPool>, action: impl FnOnce() -> T + Send) -> T
where
    T: Send,
{
    if let Some(pool) = pool.as_ref() {
        pool.install(action)
    } else {
        action()
    }
}
