use std::collections::{HashMap, HashSet};

use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::model::{PlayerStat, Position, Sentiment};
use crate::player_score::ScoringContext;

const REPLACEMENT_POOL: usize = 10;
pub const MIN_IMPROVEMENT: f64 = 0.5;
pub const MAX_PER_CLUB: usize = 3;
/// Callers get `max_results * RESULT_POOL_FACTOR` rows to filter further.
pub const RESULT_POOL_FACTOR: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct TransferSuggestion {
    pub position: Position,
    pub out_id: u32,
    pub out_name: String,
    pub out_team: String,
    pub out_price: f64,
    pub out_score: f64,
    pub out_form: f64,
    pub in_id: u32,
    pub in_name: String,
    pub in_team: String,
    pub in_price: f64,
    pub in_score: f64,
    pub in_form: f64,
    pub improvement: f64,
    pub cost_delta: f64,
    pub web_mentions: usize,
    pub web_sentiment: Sentiment,
}

struct Scored<'a> {
    player: &'a PlayerStat,
    score: f64,
}

/// Each squad member is paired independently with its best affordable
/// replacements. `bank` is not drawn down between pairs.
pub fn suggest_transfers(
    ctx: &ScoringContext<'_>,
    squad: &[PlayerStat],
    candidates: &[PlayerStat],
    bank: f64,
    position_filter: Option<Position>,
    max_results: usize,
) -> Vec<TransferSuggestion> {
    let squad_ids: HashSet<u32> = squad.iter().map(|p| p.id).collect();
    let mut club_counts: HashMap<u32, usize> = HashMap::new();
    for p in squad {
        *club_counts.entry(p.team_id).or_default() += 1;
    }

    let wanted = |p: &PlayerStat| position_filter.is_none_or(|pos| p.position == pos);

    let squad_scored = score_all(ctx, squad.iter().filter(|p| wanted(*p)).collect());
    let pool_scored = score_all(
        ctx,
        candidates
            .iter()
            .filter(|p| p.is_active() && !squad_ids.contains(&p.id) && wanted(*p))
            .collect(),
    );

    let mut suggestions = Vec::new();
    for pos in Position::ALL {
        if position_filter.is_some_and(|f| f != pos) {
            continue;
        }

        let mut outgoing: Vec<&Scored> = squad_scored
            .iter()
            .filter(|s| s.player.position == pos)
            .collect();
        outgoing.sort_by(|a, b| a.score.total_cmp(&b.score));

        let available: Vec<&Scored> = pool_scored
            .iter()
            .filter(|s| s.player.position == pos)
            .collect();

        for out in outgoing {
            let affordable_budget = bank + out.player.price;
            let mut affordable: Vec<&Scored> = available
                .iter()
                .copied()
                .filter(|s| s.player.price <= affordable_budget)
                .collect();
            if affordable.is_empty() {
                continue;
            }
            affordable.sort_by(|a, b| b.score.total_cmp(&a.score));

            for incoming in affordable.into_iter().take(REPLACEMENT_POOL) {
                if incoming.player.team_id != out.player.team_id {
                    let count = club_counts.get(&incoming.player.team_id).copied().unwrap_or(0);
                    if count >= MAX_PER_CLUB {
                        continue;
                    }
                }

                let improvement = incoming.score - out.score;
                if improvement <= MIN_IMPROVEMENT {
                    continue;
                }

                let consensus = ctx
                    .consensus
                    .map(|store| store.consensus_for(&incoming.player.full_name));
                suggestions.push(TransferSuggestion {
                    position: pos,
                    out_id: out.player.id,
                    out_name: out.player.full_name.clone(),
                    out_team: out.player.team_name.clone(),
                    out_price: out.player.price,
                    out_score: out.score,
                    out_form: out.player.form,
                    in_id: incoming.player.id,
                    in_name: incoming.player.full_name.clone(),
                    in_team: incoming.player.team_name.clone(),
                    in_price: incoming.player.price,
                    in_score: incoming.score,
                    in_form: incoming.player.form,
                    improvement,
                    cost_delta: incoming.player.price - out.player.price,
                    web_mentions: consensus.as_ref().map(|c| c.mention_count).unwrap_or(0),
                    web_sentiment: consensus
                        .map(|c| c.sentiment)
                        .unwrap_or(Sentiment::Neutral),
                });
            }
        }
    }

    debug!(
        squad = squad.len(),
        candidates = pool_scored.len(),
        accepted = suggestions.len(),
        "transfer search finished"
    );

    suggestions.sort_by(|a, b| b.improvement.total_cmp(&a.improvement));
    suggestions.truncate(max_results.saturating_mul(RESULT_POOL_FACTOR));
    suggestions
}

fn score_all<'a>(ctx: &ScoringContext<'_>, players: Vec<&'a PlayerStat>) -> Vec<Scored<'a>> {
    players
        .into_par_iter()
        .map(|player| Scored {
            player,
            score: ctx.score_player(player).total,
        })
        .collect()
}
