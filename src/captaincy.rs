use serde::Serialize;

use crate::model::{PlayerStat, Position};
use crate::player_score::ScoringContext;

pub const VICE_POOL_SIZE: usize = 15;
const DIFFERENTIAL_RISK_OWNERSHIP: f64 = 5.0;
const CONSISTENCY_RATIO: f64 = 15.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RationaleTag {
    ExpertCaptainPick,
    GreatFixture,
    HomeAdvantage,
    ExcellentForm,
    Premium,
    Differential,
    Template,
}

impl RationaleTag {
    pub fn label(self) -> &'static str {
        match self {
            RationaleTag::ExpertCaptainPick => "Expert captain pick",
            RationaleTag::GreatFixture => "Great fixture",
            RationaleTag::HomeAdvantage => "Home advantage",
            RationaleTag::ExcellentForm => "Excellent form",
            RationaleTag::Premium => "Premium option",
            RationaleTag::Differential => "Differential",
            RationaleTag::Template => "Template/Safe",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CaptainStrategy {
    Template,
    Differential,
    Balanced,
}

impl CaptainStrategy {
    pub fn for_ownership(selected_by_percent: f64) -> Self {
        if selected_by_percent > 50.0 {
            CaptainStrategy::Template
        } else if selected_by_percent < 10.0 {
            CaptainStrategy::Differential
        } else {
            CaptainStrategy::Balanced
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            CaptainStrategy::Template => "safe choice, little rank movement either way",
            CaptainStrategy::Differential => "high risk/reward, gains rank if it lands",
            CaptainStrategy::Balanced => "good risk/reward ratio",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CaptainCandidate {
    pub player_id: u32,
    pub player_name: String,
    pub team_name: String,
    pub position: Position,
    pub price: f64,
    pub form: f64,
    pub total_points: i32,
    pub selected_by_percent: f64,
    pub captain_score: f64,
    pub expected_points: f64,
    pub opponent_id: Option<u32>,
    pub is_home: bool,
    pub fixture_difficulty: u8,
    pub is_web_captain: bool,
    pub rationale: Vec<RationaleTag>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ViceCaptainPick {
    pub candidate: CaptainCandidate,
    pub vice_score: f64,
}

pub fn suggest_captains(
    ctx: &ScoringContext<'_>,
    squad: &[PlayerStat],
    top_n: usize,
) -> Vec<CaptainCandidate> {
    let mut candidates: Vec<CaptainCandidate> =
        squad.iter().map(|p| captain_candidate(ctx, p)).collect();
    // Stable: equal scores keep squad order.
    candidates.sort_by(|a, b| b.captain_score.total_cmp(&a.captain_score));
    candidates.truncate(top_n);
    candidates
}

pub fn suggest_vice(
    candidates: &[CaptainCandidate],
    exclude_name: Option<&str>,
) -> Option<ViceCaptainPick> {
    let exclude = exclude_name.map(str::to_lowercase);
    let mut picks: Vec<ViceCaptainPick> = candidates
        .iter()
        .filter(|c| {
            exclude
                .as_deref()
                .is_none_or(|name| c.player_name.to_lowercase() != name)
        })
        .map(|c| ViceCaptainPick {
            vice_score: vice_score(c),
            candidate: c.clone(),
        })
        .collect();
    picks.sort_by(|a, b| b.vice_score.total_cmp(&a.vice_score));
    picks.into_iter().next()
}

pub fn vice_score(c: &CaptainCandidate) -> f64 {
    let mut score = if c.selected_by_percent < DIFFERENTIAL_RISK_OWNERSHIP {
        c.captain_score * 0.8
    } else {
        c.captain_score
    };
    let consistency = f64::from(c.total_points) / c.form.max(1.0);
    if consistency > CONSISTENCY_RATIO {
        score += 0.5;
    }
    score
}

fn captain_candidate(ctx: &ScoringContext<'_>, player: &PlayerStat) -> CaptainCandidate {
    let cs = ctx.captain_score(player);
    let fixture_difficulty = cs.fixture_difficulty.unwrap_or(3);

    let mut rationale = Vec::new();
    if cs.is_web_captain {
        rationale.push(RationaleTag::ExpertCaptainPick);
    }
    if fixture_difficulty <= 2 {
        rationale.push(RationaleTag::GreatFixture);
    }
    if cs.is_home {
        rationale.push(RationaleTag::HomeAdvantage);
    }
    if player.form >= 7.0 {
        rationale.push(RationaleTag::ExcellentForm);
    }
    if player.price >= 10.0 {
        rationale.push(RationaleTag::Premium);
    }
    if player.selected_by_percent < 10.0 {
        rationale.push(RationaleTag::Differential);
    } else if player.selected_by_percent > 50.0 {
        rationale.push(RationaleTag::Template);
    }

    CaptainCandidate {
        player_id: player.id,
        player_name: player.full_name.clone(),
        team_name: player.team_name.clone(),
        position: player.position,
        price: player.price,
        form: player.form,
        total_points: player.total_points,
        selected_by_percent: player.selected_by_percent,
        captain_score: cs.score,
        expected_points: cs.expected_points,
        opponent_id: cs.opponent_id,
        is_home: cs.is_home,
        fixture_difficulty,
        is_web_captain: cs.is_web_captain,
        rationale,
    }
}
