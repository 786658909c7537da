use std::collections::HashMap;

use crate::model::{PlayerStat, TeamInfo};
use crate::name_match::token_sort_ratio;

pub const RESOLVE_THRESHOLD: f64 = 80.0;

#[derive(Debug, Clone, Default)]
pub struct Roster {
    players: Vec<PlayerStat>,
    by_id: HashMap<u32, usize>,
    teams: HashMap<u32, TeamInfo>,
}

impl Roster {
    pub fn new(players: Vec<PlayerStat>, teams: Vec<TeamInfo>) -> Self {
        let by_id = players
            .iter()
            .enumerate()
            .map(|(idx, p)| (p.id, idx))
            .collect();
        let teams = teams.into_iter().map(|t| (t.id, t)).collect();
        Self {
            players,
            by_id,
            teams,
        }
    }

    pub fn players(&self) -> &[PlayerStat] {
        &self.players
    }

    pub fn get(&self, id: u32) -> Option<&PlayerStat> {
        self.by_id.get(&id).map(|idx| &self.players[*idx])
    }

    pub fn team(&self, id: u32) -> Option<&TeamInfo> {
        self.teams.get(&id)
    }

    pub fn team_short_name(&self, id: u32) -> &str {
        self.team(id)
            .map(|t| {
                if t.short_name.is_empty() {
                    t.name.as_str()
                } else {
                    t.short_name.as_str()
                }
            })
            .unwrap_or("?")
    }

    pub fn squad(&self, ids: &[u32]) -> Vec<PlayerStat> {
        ids.iter().filter_map(|id| self.get(*id)).cloned().collect()
    }

    /// Exact case-insensitive hit on full or web name, else the best
    /// token-sort match at or above [`RESOLVE_THRESHOLD`].
    pub fn resolve(&self, free_text: &str) -> Option<&PlayerStat> {
        let needle = free_text.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        if let Some(hit) = self.players.iter().find(|p| {
            p.full_name.to_lowercase() == needle || p.web_name.to_lowercase() == needle
        }) {
            return Some(hit);
        }

        let mut best: Option<(&PlayerStat, f64)> = None;
        for player in &self.players {
            // Full name first so it wins ties against a web-name hit.
            for (name, score) in [
                (&player.full_name, token_sort_ratio(&player.full_name, free_text)),
                (&player.web_name, token_sort_ratio(&player.web_name, free_text)),
            ] {
                if name.is_empty() || score < RESOLVE_THRESHOLD {
                    continue;
                }
                if best.is_none_or(|(_, top)| score > top) {
                    best = Some((player, score));
                }
            }
        }
        best.map(|(player, _)| player)
    }
}
