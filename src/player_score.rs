use std::collections::HashMap;

use serde::Serialize;

use crate::consensus::ConsensusStore;
use crate::model::{
    FixtureOutlook, HistoricalRecord, HistoryTable, InjuryStatus, NextFixture, PlayerStat,
};

pub const FIXTURE_HORIZON: usize = 5;
const DEFAULT_AVG_DIFFICULTY: f64 = 3.0;
const DEFAULT_CAPTAIN_FIXTURE_SCORE: f64 = 5.0;
const NEUTRAL_WEB_CAPTAIN_SCORE: f64 = 5.0;
const PREMIUM_PRICE: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreWeights {
    pub form: f64,
    pub fixture: f64,
    pub historical: f64,
    pub points: f64,
    pub ict: f64,
    pub web: f64,
}

impl ScoreWeights {
    pub fn total(&self) -> f64 {
        self.form + self.fixture + self.historical + self.points + self.ict + self.web
    }
}

pub const WEB_WEIGHTS: ScoreWeights = ScoreWeights {
    form: 0.25,
    fixture: 0.20,
    historical: 0.15,
    points: 0.12,
    ict: 0.08,
    web: 0.20,
};

pub const BASE_WEIGHTS: ScoreWeights = ScoreWeights {
    form: 0.30,
    fixture: 0.25,
    historical: 0.20,
    points: 0.15,
    ict: 0.10,
    web: 0.0,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub form: f64,
    pub fixture: f64,
    pub historical: f64,
    pub points: f64,
    pub ict: f64,
    /// `None` when web integration is off for this run.
    pub web: Option<f64>,
    pub total: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CaptainScore {
    pub score: f64,
    pub fixture_score: f64,
    pub historical_score: f64,
    pub web_captain_score: f64,
    pub is_web_captain: bool,
    pub fixture_difficulty: Option<u8>,
    pub opponent_id: Option<u32>,
    pub is_home: bool,
    /// Informational only; never used for ranking.
    pub expected_points: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct ScoringContext<'a> {
    pub fixtures: &'a HashMap<u32, FixtureOutlook>,
    pub next_fixtures: &'a HashMap<u32, NextFixture>,
    pub history: &'a HistoryTable,
    pub consensus: Option<&'a ConsensusStore>,
    pub use_web_data: bool,
}

impl<'a> ScoringContext<'a> {
    pub fn new(
        fixtures: &'a HashMap<u32, FixtureOutlook>,
        next_fixtures: &'a HashMap<u32, NextFixture>,
        history: &'a HistoryTable,
    ) -> Self {
        Self {
            fixtures,
            next_fixtures,
            history,
            consensus: None,
            use_web_data: false,
        }
    }

    pub fn with_consensus(mut self, store: &'a ConsensusStore, use_web_data: bool) -> Self {
        self.consensus = Some(store);
        self.use_web_data = use_web_data;
        self
    }

    pub fn web_enabled(&self) -> bool {
        self.use_web_data && self.consensus.is_some()
    }

    pub fn weights(&self) -> ScoreWeights {
        if self.web_enabled() {
            WEB_WEIGHTS
        } else {
            BASE_WEIGHTS
        }
    }

    pub fn next_fixture(&self, player: &PlayerStat) -> Option<NextFixture> {
        self.next_fixtures.get(&player.team_id).copied()
    }

    pub fn score_player(&self, player: &PlayerStat) -> ScoreBreakdown {
        let next_opponent = self.next_fixture(player).map(|f| f.opponent_id);
        self.score(player, next_opponent)
    }

    pub fn score(&self, player: &PlayerStat, next_opponent: Option<u32>) -> ScoreBreakdown {
        let form = form_score(player);
        let fixture = fixture_score(self.fixtures.get(&player.id));
        let historical =
            historical_score(next_opponent.and_then(|opp| self.history.get(player.id, opp)));
        let points = points_score(player);
        let ict = ict_score(player);
        let web = if self.web_enabled() {
            self.consensus.map(|store| web_score(store, &player.full_name))
        } else {
            None
        };

        let w = self.weights();
        let total = form * w.form
            + fixture * w.fixture
            + historical * w.historical
            + points * w.points
            + ict * w.ict
            + web.unwrap_or(0.0) * w.web;

        ScoreBreakdown {
            form,
            fixture,
            historical,
            points,
            ict,
            web,
            total,
        }
    }

    pub fn captain_score(&self, player: &PlayerStat) -> CaptainScore {
        let next = self.next_fixture(player);
        let difficulty = self
            .fixtures
            .get(&player.id)
            .and_then(FixtureOutlook::next_difficulty);

        let fixture_score = difficulty
            .map(|d| (6.0 - f64::from(d)) / 5.0 * 10.0)
            .unwrap_or(DEFAULT_CAPTAIN_FIXTURE_SCORE);
        let form = form_score(player);
        let opponent_id = next.map(|f| f.opponent_id);
        let historical =
            historical_score(opponent_id.and_then(|opp| self.history.get(player.id, opp)));
        let (web_captain_score, is_web_captain) = match self.consensus {
            Some(store) => captaincy_web_score(store, &player.full_name),
            None => (NEUTRAL_WEB_CAPTAIN_SCORE, false),
        };

        let mut score =
            fixture_score * 0.40 + form * 0.25 + historical * 0.20 + web_captain_score * 0.15;
        let is_home = next.map(|f| f.is_home).unwrap_or(false);
        if is_home {
            score += 0.5;
        }
        let factor = player.position.captain_factor();
        score *= factor;
        if player.price >= PREMIUM_PRICE {
            score += 0.5;
        }

        let ease = difficulty
            .map(|d| (6.0 - f64::from(d)) / 5.0)
            .unwrap_or(0.5);
        let expected_points = player.form * ease * factor * 2.0;

        CaptainScore {
            score,
            fixture_score,
            historical_score: historical,
            web_captain_score,
            is_web_captain,
            fixture_difficulty: difficulty,
            opponent_id,
            is_home,
            expected_points,
        }
    }
}

pub fn form_score(player: &PlayerStat) -> f64 {
    if player.form > 0.0 { player.form } else { 0.0 }
}

pub fn avg_difficulty(outlook: Option<&FixtureOutlook>) -> f64 {
    let window: Vec<f64> = outlook
        .map(|o| {
            o.difficulties
                .iter()
                .take(FIXTURE_HORIZON)
                .map(|d| f64::from(*d))
                .collect()
        })
        .unwrap_or_default();
    if window.is_empty() {
        DEFAULT_AVG_DIFFICULTY
    } else {
        window.iter().sum::<f64>() / window.len() as f64
    }
}

pub fn fixture_score(outlook: Option<&FixtureOutlook>) -> f64 {
    (6.0 - avg_difficulty(outlook)) / 5.0 * 10.0
}

pub fn historical_score(record: Option<&HistoricalRecord>) -> f64 {
    record
        .map(|r| (r.avg_points * 1.5).min(10.0))
        .unwrap_or(0.0)
}

pub fn points_score(player: &PlayerStat) -> f64 {
    (f64::from(player.total_points) / 20.0).min(10.0)
}

pub fn ict_score(player: &PlayerStat) -> f64 {
    if player.ict_index > 0.0 {
        (player.ict_index / 20.0).min(10.0)
    } else {
        0.0
    }
}

/// Consensus adjusted for availability, lineup news and buzz, clamped to 0–10.
pub fn web_score(store: &ConsensusStore, name: &str) -> f64 {
    let injury = store.injury_status(name);
    // Out or suspended is a hard zero: no lineup or buzz bonus applies.
    if injury.is_some_and(InjuryStatus::rules_out) {
        return 0.0;
    }
    let consensus = store.consensus_for(name);
    let mut score = match injury {
        Some(InjuryStatus::Doubtful) => consensus.consensus_score * 0.5,
        _ => consensus.consensus_score,
    };
    if store.is_expected_to_start(name) {
        score += 1.5;
    }
    if consensus.mention_count >= 3 {
        score += 1.0;
    }
    score.clamp(0.0, 10.0)
}

/// Returns `(score, is_web_captain)`.
pub fn captaincy_web_score(store: &ConsensusStore, name: &str) -> (f64, bool) {
    let captain_mentions = store.captain_mentions(name);
    if captain_mentions > 0 {
        return ((7.0 + captain_mentions as f64 * 1.5).min(10.0), true);
    }
    let consensus = store.consensus_for(name);
    if consensus.mention_count > 0 {
        ((consensus.consensus_score * 1.2).min(10.0), false)
    } else {
        (NEUTRAL_WEB_CAPTAIN_SCORE, false)
    }
}
