use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::captaincy::{
    CaptainCandidate, CaptainStrategy, VICE_POOL_SIZE, ViceCaptainPick, suggest_captains,
    suggest_vice,
};
use crate::config::AdvisorConfig;
use crate::consensus::ConsensusStore;
use crate::ffs_fetch::FantasyFootballScout;
use crate::fpl_fetch::{self, ElementSummary};
use crate::http_cache::ResponseCache;
use crate::model::{
    FixtureOutlook, HistoricalRecord, HistoryTable, NextFixture, PlayerStat, Position, Sentiment,
    SignalSet, TeamInfo,
};
use crate::player_score::{ScoreBreakdown, ScoringContext, avg_difficulty};
use crate::roster::Roster;
use crate::scout_fetch::{ScoutNewsFinder, ScoutSelection};
use crate::signal_fetch::{PageFetcher, ScrapeReport, SignalSource, aggregate_sources};
use crate::transfers::{TransferSuggestion, suggest_transfers};

const WEB_DATA_KEY: &str = "web_data";
const SIGNAL_SUMMARY_ROWS: usize = 15;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub gameweek: u32,
    #[serde(default)]
    pub team_name: Option<String>,
    #[serde(default)]
    pub manager_name: Option<String>,
    #[serde(default)]
    pub overall_points: Option<i64>,
    pub bank: f64,
    /// Points deducted for this gameweek's extra transfers.
    #[serde(default)]
    pub transfers_cost: i32,
    pub squad_ids: Vec<u32>,
    pub players: Vec<PlayerStat>,
    #[serde(default)]
    pub teams: Vec<TeamInfo>,
    #[serde(default)]
    pub fixtures: HashMap<u32, FixtureOutlook>,
    #[serde(default)]
    pub next_fixtures: HashMap<u32, NextFixture>,
    #[serde(default)]
    pub history: Vec<HistoricalRecord>,
    #[serde(default)]
    pub signals: Option<SignalSet>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SquadRow {
    pub player_id: u32,
    pub name: String,
    pub team: String,
    pub position: Position,
    pub price: f64,
    pub form: f64,
    pub score: ScoreBreakdown,
    pub next_opponent: Option<String>,
    pub avg_difficulty: f64,
    pub web_mentions: usize,
    pub web_sentiment: Sentiment,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignalSummaryRow {
    pub player_name: String,
    pub resolved: Option<String>,
    pub mention_count: usize,
    pub recommendation_types: Vec<String>,
    pub sentiment: Sentiment,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdvisorReport {
    pub gameweek: u32,
    pub team_name: Option<String>,
    pub manager_name: Option<String>,
    pub overall_points: Option<i64>,
    pub bank: f64,
    pub transfers_cost: i32,
    pub web_enabled: bool,
    pub squad: Vec<SquadRow>,
    pub transfers: Vec<TransferSuggestion>,
    pub captains: Vec<CaptainCandidate>,
    pub vice_captain: Option<ViceCaptainPick>,
    pub captain_strategy: Option<CaptainStrategy>,
    pub signal_summary: Vec<SignalSummaryRow>,
}

pub fn load_snapshot(path: &Path) -> Result<Snapshot> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read snapshot {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid snapshot {}", path.display()))
}

pub fn save_snapshot(path: &Path, snapshot: &Snapshot) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).context("create snapshot dir")?;
    }
    let json = serde_json::to_string_pretty(snapshot).context("serialize snapshot")?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).context("write snapshot")?;
    fs::rename(&tmp, path).context("swap snapshot")?;
    Ok(())
}

pub struct ScrapeRun {
    pub signals: SignalSet,
    pub report: ScrapeReport,
    pub scout: Option<Arc<ScoutSelection>>,
}

/// Sources in run order. A given scout article is read directly; otherwise
/// the latest article is discovered from the news index.
pub fn default_sources(
    fetcher: &PageFetcher,
    scout: Option<Arc<ScoutSelection>>,
) -> Vec<Box<dyn SignalSource>> {
    let scout: Box<dyn SignalSource> = match scout {
        Some(selection) => Box::new(selection),
        None => Box::new(ScoutNewsFinder::new(fetcher.clone())),
    };
    vec![scout, Box::new(FantasyFootballScout::new(fetcher.clone()))]
}

pub fn scrape_signals(cfg: &AdvisorConfig) -> ScrapeRun {
    let fetcher = PageFetcher::new(cfg.scrape_delay);
    let scout = cfg
        .scout_url
        .as_ref()
        .map(|url| Arc::new(ScoutSelection::new(url.clone(), fetcher.clone())));
    let (store, report) = aggregate_sources(&default_sources(&fetcher, scout.clone()));
    ScrapeRun {
        signals: store.into_signals(),
        report,
        scout,
    }
}

pub fn build_snapshot(cfg: &AdvisorConfig) -> Result<Snapshot> {
    let team_id = cfg.team_id.context("FPL_TEAM_ID is not set")?;
    let cache = ResponseCache::at_default_location(cfg.effective_cache_ttl());

    let bootstrap = fpl_fetch::fetch_bootstrap(&cache)?;
    let fixture_rows = fpl_fetch::fetch_fixtures(&cache)?;
    let gameweek = fpl_fetch::current_gameweek(&bootstrap.events);
    let picks = fpl_fetch::fetch_picks(&cache, team_id, gameweek)?;
    let entry = fpl_fetch::fetch_entry(&cache, team_id)
        .inspect_err(|err| warn!(error = %err, "entry info unavailable"))
        .ok();
    info!(
        gameweek,
        players = bootstrap.players.len(),
        squad = picks.squad_ids.len(),
        "league data loaded"
    );

    let squad: HashSet<u32> = picks.squad_ids.iter().copied().collect();
    let wanted: Vec<u32> = bootstrap
        .players
        .iter()
        .filter(|p| p.is_active() || squad.contains(&p.id))
        .map(|p| p.id)
        .collect();
    let summaries = fpl_fetch::fetch_element_summaries(&cache, &wanted, cfg.fetch_parallelism);
    let (fixtures, history) = summaries_to_inputs(&summaries);

    let signals = if cfg.use_web_data {
        let set: SignalSet = cache.with_cached(WEB_DATA_KEY, || Ok(scrape_signals(cfg).signals))?;
        Some(set)
    } else {
        None
    };

    Ok(Snapshot {
        gameweek,
        team_name: entry.as_ref().map(|e| e.team_name.clone()),
        manager_name: entry.as_ref().map(|e| e.manager_name.clone()),
        overall_points: entry.map(|e| e.overall_points),
        bank: picks.bank,
        transfers_cost: picks.event_transfers_cost,
        squad_ids: picks.squad_ids,
        players: bootstrap.players,
        teams: bootstrap.teams,
        fixtures,
        next_fixtures: fpl_fetch::next_opponents(&fixture_rows, gameweek),
        history,
        signals,
    })
}

fn summaries_to_inputs(
    summaries: &HashMap<u32, ElementSummary>,
) -> (HashMap<u32, FixtureOutlook>, Vec<HistoricalRecord>) {
    let mut fixtures = HashMap::with_capacity(summaries.len());
    let mut history = Vec::new();
    for (id, summary) in summaries {
        fixtures.insert(*id, fpl_fetch::fixture_outlook(summary));
        history.extend(fpl_fetch::history_records(*id, summary));
    }
    // HashMap iteration order is arbitrary; keep snapshots diffable.
    history.sort_by_key(|r| (r.player_id, r.opponent_id));
    (fixtures, history)
}

pub fn run(snapshot: &Snapshot, cfg: &AdvisorConfig) -> AdvisorReport {
    let roster = Roster::new(snapshot.players.clone(), snapshot.teams.clone());
    let squad = roster.squad(&snapshot.squad_ids);
    let history = HistoryTable::from_records(snapshot.history.iter().cloned());
    debug!(
        players = roster.players().len(),
        squad = squad.len(),
        history = history.len(),
        "advisor inputs ready"
    );
    let store = snapshot
        .signals
        .clone()
        .map(|signals| ConsensusStore::with_matcher(signals, cfg.name_match.matcher()));

    let mut ctx = ScoringContext::new(&snapshot.fixtures, &snapshot.next_fixtures, &history);
    if let Some(store) = store.as_ref() {
        ctx = ctx.with_consensus(store, cfg.use_web_data);
    }

    let squad_rows = squad_rows(&ctx, &roster, &squad);
    let transfers = suggest_transfers(
        &ctx,
        &squad,
        roster.players(),
        snapshot.bank,
        cfg.position_filter,
        cfg.transfer_count,
    );
    let captains = suggest_captains(&ctx, &squad, cfg.captain_top_n);
    let vice_pool = suggest_captains(&ctx, &squad, VICE_POOL_SIZE);
    let top = captains.first();
    let vice_captain = suggest_vice(&vice_pool, top.map(|c| c.player_name.as_str()));
    let captain_strategy = top.map(|c| CaptainStrategy::for_ownership(c.selected_by_percent));

    let signal_summary = store
        .as_ref()
        .map(|store| {
            store
                .summary()
                .into_iter()
                .take(SIGNAL_SUMMARY_ROWS)
                .map(|row| SignalSummaryRow {
                    resolved: roster.resolve(&row.player_name).map(|p| p.full_name.clone()),
                    player_name: row.player_name,
                    mention_count: row.mention_count,
                    recommendation_types: row
                        .recommendation_types
                        .iter()
                        .map(|t| t.label().to_string())
                        .collect(),
                    sentiment: row.sentiment,
                })
                .collect()
        })
        .unwrap_or_default();

    AdvisorReport {
        gameweek: snapshot.gameweek,
        team_name: snapshot.team_name.clone(),
        manager_name: snapshot.manager_name.clone(),
        overall_points: snapshot.overall_points,
        bank: snapshot.bank,
        transfers_cost: snapshot.transfers_cost,
        web_enabled: ctx.web_enabled(),
        squad: squad_rows,
        transfers,
        captains,
        vice_captain,
        captain_strategy,
        signal_summary,
    }
}

fn squad_rows(ctx: &ScoringContext<'_>, roster: &Roster, squad: &[PlayerStat]) -> Vec<SquadRow> {
    let mut rows = Vec::with_capacity(squad.len());
    for pos in Position::ALL {
        let mut group: Vec<SquadRow> = squad
            .iter()
            .filter(|p| p.position == pos)
            .map(|p| {
                let consensus = ctx.consensus.map(|store| store.consensus_for(&p.full_name));
                SquadRow {
                    player_id: p.id,
                    name: p.full_name.clone(),
                    team: p.team_name.clone(),
                    position: p.position,
                    price: p.price,
                    form: p.form,
                    score: ctx.score_player(p),
                    next_opponent: ctx
                        .next_fixture(p)
                        .map(|f| roster.team_short_name(f.opponent_id).to_string()),
                    avg_difficulty: avg_difficulty(ctx.fixtures.get(&p.id)),
                    web_mentions: consensus.as_ref().map(|c| c.mention_count).unwrap_or(0),
                    web_sentiment: consensus
                        .map(|c| c.sentiment)
                        .unwrap_or(Sentiment::Neutral),
                }
            })
            .collect();
        group.sort_by(|a, b| b.score.total.total_cmp(&a.score.total));
        rows.extend(group);
    }
    rows
}
