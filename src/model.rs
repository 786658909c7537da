use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Position {
    #[serde(rename = "GK")]
    Goalkeeper,
    #[serde(rename = "DEF")]
    Defender,
    #[serde(rename = "MID")]
    Midfielder,
    #[serde(rename = "FWD")]
    Forward,
}

impl Position {
    pub const ALL: [Position; 4] = [
        Position::Goalkeeper,
        Position::Defender,
        Position::Midfielder,
        Position::Forward,
    ];

    pub fn from_element_type(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(Position::Goalkeeper),
            2 => Some(Position::Defender),
            3 => Some(Position::Midfielder),
            4 => Some(Position::Forward),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Position::Goalkeeper => "GK",
            Position::Defender => "DEF",
            Position::Midfielder => "MID",
            Position::Forward => "FWD",
        }
    }

    pub fn captain_factor(self) -> f64 {
        match self {
            Position::Forward => 1.2,
            Position::Midfielder => 1.1,
            Position::Defender => 0.9,
            Position::Goalkeeper => 0.5,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for Position {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "GK" | "GKP" => Ok(Position::Goalkeeper),
            "DEF" => Ok(Position::Defender),
            "MID" => Ok(Position::Midfielder),
            "FWD" => Ok(Position::Forward),
            other => Err(anyhow::anyhow!("unknown position: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerStatus {
    Active,
    Unavailable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerStat {
    pub id: u32,
    pub full_name: String,
    #[serde(default)]
    pub web_name: String,
    pub position: Position,
    pub team_id: u32,
    #[serde(default)]
    pub team_name: String,
    pub price: f64,
    pub form: f64,
    pub total_points: i32,
    pub ict_index: f64,
    pub status: PlayerStatus,
    pub selected_by_percent: f64,
}

impl PlayerStat {
    pub fn is_active(&self) -> bool {
        self.status == PlayerStatus::Active
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamInfo {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub short_name: String,
}

/// Upcoming fixtures for one player, in kickoff order. Difficulty is 1 (easy) to 5 (hard).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixtureOutlook {
    #[serde(default)]
    pub difficulties: Vec<u8>,
    #[serde(default)]
    pub opponents: Vec<u32>,
}

impl FixtureOutlook {
    pub fn next_difficulty(&self) -> Option<u8> {
        self.difficulties.first().copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextFixture {
    pub opponent_id: u32,
    pub is_home: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalRecord {
    pub player_id: u32,
    pub opponent_id: u32,
    pub matches_played: u32,
    pub avg_points: f64,
}

#[derive(Debug, Clone, Default)]
pub struct HistoryTable {
    by_key: HashMap<(u32, u32), HistoricalRecord>,
}

impl HistoryTable {
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = HistoricalRecord>,
    {
        let by_key = records
            .into_iter()
            .map(|r| ((r.player_id, r.opponent_id), r))
            .collect();
        Self { by_key }
    }

    pub fn get(&self, player_id: u32, opponent_id: u32) -> Option<&HistoricalRecord> {
        self.by_key.get(&(player_id, opponent_id))
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationType {
    Captain,
    Essential,
    Transfer,
    Differential,
    Budget,
    Avoid,
    General,
}

impl RecommendationType {
    pub fn weight(self) -> f64 {
        match self {
            RecommendationType::Captain => 3.0,
            RecommendationType::Essential => 2.5,
            RecommendationType::Transfer => 2.0,
            RecommendationType::Differential => 1.5,
            RecommendationType::General => 1.0,
            RecommendationType::Budget => 1.0,
            RecommendationType::Avoid => -2.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RecommendationType::Captain => "captain",
            RecommendationType::Essential => "essential",
            RecommendationType::Transfer => "transfer",
            RecommendationType::Differential => "differential",
            RecommendationType::Budget => "budget",
            RecommendationType::Avoid => "avoid",
            RecommendationType::General => "general",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Negative,
    Neutral,
    Positive,
}

impl Sentiment {
    pub fn value(self) -> f64 {
        match self {
            Sentiment::Positive => 1.0,
            Sentiment::Neutral => 0.0,
            Sentiment::Negative => -1.0,
        }
    }

    pub fn from_average(avg: f64) -> Self {
        if avg > 0.3 {
            Sentiment::Positive
        } else if avg < -0.3 {
            Sentiment::Negative
        } else {
            Sentiment::Neutral
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationSignal {
    pub source: String,
    pub player_name: String,
    pub recommendation_type: RecommendationType,
    pub sentiment: Sentiment,
    #[serde(default)]
    pub scraped_at: String,
    #[serde(default)]
    pub article_title: Option<String>,
    #[serde(default)]
    pub article_url: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub team: Option<String>,
}

impl RecommendationSignal {
    pub fn new(
        source: &str,
        player_name: &str,
        recommendation_type: RecommendationType,
        sentiment: Sentiment,
    ) -> Self {
        Self {
            source: source.to_string(),
            player_name: player_name.to_string(),
            recommendation_type,
            sentiment,
            scraped_at: String::new(),
            article_title: None,
            article_url: None,
            price: None,
            team: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InjuryStatus {
    Out,
    Doubtful,
    Suspended,
    Unknown,
    #[serde(rename = "none")]
    Clear,
}

impl InjuryStatus {
    pub fn rules_out(self) -> bool {
        matches!(self, InjuryStatus::Out | InjuryStatus::Suspended)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InjurySignal {
    #[serde(default)]
    pub source: String,
    pub player_name: String,
    pub status: InjuryStatus,
    #[serde(default)]
    pub news_text: String,
    #[serde(default)]
    pub scraped_at: String,
}

impl InjurySignal {
    pub fn new(player_name: &str, status: InjuryStatus) -> Self {
        Self {
            source: String::new(),
            player_name: player_name.to_string(),
            status,
            news_text: String::new(),
            scraped_at: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineupSignal {
    pub team_name: String,
    pub starters: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignalSet {
    #[serde(default)]
    pub recommendations: Vec<RecommendationSignal>,
    #[serde(default)]
    pub injuries: Vec<InjurySignal>,
    #[serde(default)]
    pub lineups: Vec<LineupSignal>,
}

impl SignalSet {
    pub fn is_empty(&self) -> bool {
        self.recommendations.is_empty() && self.injuries.is_empty() && self.lineups.is_empty()
    }

    /// Later lineups replace earlier ones for the same team name.
    pub fn upsert_lineup(&mut self, lineup: LineupSignal) {
        if let Some(existing) = self
            .lineups
            .iter_mut()
            .find(|l| l.team_name == lineup.team_name)
        {
            existing.starters = lineup.starters;
        } else {
            self.lineups.push(lineup);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusRecord {
    pub consensus_score: f64,
    pub mention_count: usize,
    pub sentiment: Sentiment,
    pub avg_sentiment: f64,
}

impl ConsensusRecord {
    pub fn empty() -> Self {
        Self {
            consensus_score: 0.0,
            mention_count: 0,
            sentiment: Sentiment::Neutral,
            avg_sentiment: 0.0,
        }
    }
}
