use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Serialize;

use crate::model::{
    ConsensusRecord, InjurySignal, InjuryStatus, LineupSignal, RecommendationSignal, RecommendationType,
    Sentiment, SignalSet,
};
use crate::name_match::{NameMatcher, SubstringMatcher};

#[derive(Debug, Clone)]
pub struct ConsensusStore {
    signals: SignalSet,
    matcher: Arc<dyn NameMatcher>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConsensusSummaryRow {
    pub player_name: String,
    pub mention_count: usize,
    pub recommendation_types: Vec<RecommendationType>,
    pub sentiment: Sentiment,
}

impl Default for ConsensusStore {
    fn default() -> Self {
        Self::new(SignalSet::default())
    }
}

impl ConsensusStore {
    pub fn new(signals: SignalSet) -> Self {
        Self::with_matcher(signals, Arc::new(SubstringMatcher))
    }

    pub fn with_matcher(signals: SignalSet, matcher: Arc<dyn NameMatcher>) -> Self {
        Self { signals, matcher }
    }

    pub fn signals(&self) -> &SignalSet {
        &self.signals
    }

    pub fn into_signals(self) -> SignalSet {
        self.signals
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    pub fn add_recommendations<I>(&mut self, recs: I)
    where
        I: IntoIterator<Item = RecommendationSignal>,
    {
        self.signals.recommendations.extend(recs);
    }

    pub fn add_injuries<I>(&mut self, injuries: I)
    where
        I: IntoIterator<Item = InjurySignal>,
    {
        self.signals.injuries.extend(injuries);
    }

    pub fn upsert_lineups<I>(&mut self, lineups: I)
    where
        I: IntoIterator<Item = LineupSignal>,
    {
        for lineup in lineups {
            self.signals.upsert_lineup(lineup);
        }
    }

    fn matching_recommendations<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a RecommendationSignal> + 'a {
        self.signals
            .recommendations
            .iter()
            .filter(move |r| self.matcher.matches(&r.player_name, name))
    }

    pub fn consensus_for(&self, name: &str) -> ConsensusRecord {
        let mut mention_count = 0usize;
        let mut weighted = 0.0;
        let mut sentiment_sum = 0.0;
        for rec in self.matching_recommendations(name) {
            let sentiment = rec.sentiment.value();
            weighted += rec.recommendation_type.weight() * (sentiment + 1.0);
            sentiment_sum += sentiment;
            mention_count += 1;
        }
        if mention_count == 0 {
            return ConsensusRecord::empty();
        }
        let n = mention_count as f64;
        let avg_sentiment = sentiment_sum / n;
        ConsensusRecord {
            consensus_score: weighted / n,
            mention_count,
            sentiment: Sentiment::from_average(avg_sentiment),
            avg_sentiment,
        }
    }

    /// First matching signal in source order wins.
    pub fn injury_status(&self, name: &str) -> Option<InjuryStatus> {
        self.signals
            .injuries
            .iter()
            .find(|i| self.matcher.matches(&i.player_name, name))
            .map(|i| i.status)
    }

    pub fn is_expected_to_start(&self, name: &str) -> bool {
        self.signals
            .lineups
            .iter()
            .flat_map(|l| l.starters.iter())
            .any(|starter| self.matcher.matches(starter, name))
    }

    pub fn captain_mentions(&self, name: &str) -> usize {
        self.matching_recommendations(name)
            .filter(|r| r.recommendation_type == RecommendationType::Captain)
            .count()
    }

    pub fn summary(&self) -> Vec<ConsensusSummaryRow> {
        // BTreeMap keeps ties in name order after the stable count sort below.
        let mut groups: BTreeMap<&str, Vec<&RecommendationSignal>> = BTreeMap::new();
        for rec in &self.signals.recommendations {
            groups.entry(rec.player_name.as_str()).or_default().push(rec);
        }

        let mut rows: Vec<ConsensusSummaryRow> = groups
            .into_iter()
            .map(|(name, recs)| {
                let mut types: Vec<RecommendationType> = Vec::new();
                for rec in &recs {
                    if !types.contains(&rec.recommendation_type) {
                        types.push(rec.recommendation_type);
                    }
                }
                ConsensusSummaryRow {
                    player_name: name.to_string(),
                    mention_count: recs.len(),
                    recommendation_types: types,
                    sentiment: modal_sentiment(&recs),
                }
            })
            .collect();
        rows.sort_by(|a, b| b.mention_count.cmp(&a.mention_count));
        rows
    }
}

fn modal_sentiment(recs: &[&RecommendationSignal]) -> Sentiment {
    let mut counts: HashMap<Sentiment, usize> = HashMap::new();
    for rec in recs {
        *counts.entry(rec.sentiment).or_default() += 1;
    }
    // Ties resolve to the alphabetically first label (negative < neutral < positive).
    [Sentiment::Negative, Sentiment::Neutral, Sentiment::Positive]
        .into_iter()
        .fold((Sentiment::Neutral, 0usize), |best, s| {
            let n = counts.get(&s).copied().unwrap_or(0);
            if n > best.1 { (s, n) } else { best }
        })
        .0
}
