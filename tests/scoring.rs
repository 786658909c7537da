use std::collections::HashMap;
use std::sync::Arc;

use fpl_advisor::captaincy::{CaptainStrategy, RationaleTag, suggest_captains, suggest_vice, vice_score};
use fpl_advisor::consensus::ConsensusStore;
use fpl_advisor::model::{
    FixtureOutlook, HistoricalRecord, HistoryTable, InjurySignal, InjuryStatus, LineupSignal,
    NextFixture, PlayerStat, PlayerStatus, Position, RecommendationSignal, RecommendationType,
    Sentiment, SignalSet,
};
use fpl_advisor::name_match::TokenBoundaryMatcher;
use fpl_advisor::player_score::{BASE_WEIGHTS, ScoringContext, WEB_WEIGHTS, web_score};

fn player(id: u32, name: &str, position: Position, team_id: u32) -> PlayerStat {
    PlayerStat {
        id,
        full_name: name.to_string(),
        web_name: name.rsplit(' ').next().unwrap_or(name).to_string(),
        position,
        team_id,
        team_name: format!("Team {team_id}"),
        price: 7.0,
        form: 5.0,
        total_points: 40,
        ict_index: 50.0,
        status: PlayerStatus::Active,
        selected_by_percent: 20.0,
    }
}

fn rec(name: &str, kind: RecommendationType, sentiment: Sentiment) -> RecommendationSignal {
    RecommendationSignal::new("test", name, kind, sentiment)
}

fn store(recs: Vec<RecommendationSignal>, injuries: Vec<InjurySignal>) -> ConsensusStore {
    ConsensusStore::new(SignalSet {
        recommendations: recs,
        injuries,
        lineups: Vec::new(),
    })
}

#[test]
fn unmentioned_player_has_neutral_consensus() {
    let store = store(
        vec![rec("Bukayo Saka", RecommendationType::Essential, Sentiment::Positive)],
        Vec::new(),
    );
    let record = store.consensus_for("Haaland");
    assert_eq!(record.mention_count, 0);
    assert_eq!(record.consensus_score, 0.0);
    assert_eq!(record.sentiment, Sentiment::Neutral);
}

#[test]
fn single_positive_captain_signal_scores_six() {
    let store = store(
        vec![rec("Erling Haaland", RecommendationType::Captain, Sentiment::Positive)],
        Vec::new(),
    );
    let record = store.consensus_for("Haaland");
    assert!((record.consensus_score - 6.0).abs() < 1e-12);
    assert_eq!(record.mention_count, 1);
    assert_eq!(record.sentiment, Sentiment::Positive);
}

#[test]
fn mixed_signals_average_out() {
    let store = store(
        vec![
            rec("Cole Palmer", RecommendationType::Essential, Sentiment::Positive),
            rec("Cole Palmer", RecommendationType::Avoid, Sentiment::Negative),
        ],
        Vec::new(),
    );
    let record = store.consensus_for("Palmer");
    // (2.5 * 2 + -2.0 * 0) / 2
    assert!((record.consensus_score - 2.5).abs() < 1e-12);
    assert_eq!(record.sentiment, Sentiment::Neutral);
    assert_eq!(record.avg_sentiment, 0.0);
}

#[test]
fn sentiment_thresholds_are_strict() {
    let mut recs = vec![rec("Cole Palmer", RecommendationType::Transfer, Sentiment::Positive); 3];
    recs.extend(vec![
        rec("Cole Palmer", RecommendationType::Transfer, Sentiment::Neutral);
        7
    ]);
    let record = store(recs, Vec::new()).consensus_for("Palmer");
    assert!((record.avg_sentiment - 0.3).abs() < 1e-12);
    assert_eq!(record.sentiment, Sentiment::Neutral);

    let mut recs = vec![rec("Cole Palmer", RecommendationType::Avoid, Sentiment::Negative); 3];
    recs.extend(vec![
        rec("Cole Palmer", RecommendationType::Avoid, Sentiment::Neutral);
        7
    ]);
    let record = store(recs, Vec::new()).consensus_for("Palmer");
    assert!((record.avg_sentiment + 0.3).abs() < 1e-12);
    assert_eq!(record.sentiment, Sentiment::Neutral);

    let mut recs = vec![rec("Cole Palmer", RecommendationType::Transfer, Sentiment::Positive); 4];
    recs.extend(vec![
        rec("Cole Palmer", RecommendationType::Transfer, Sentiment::Neutral);
        6
    ]);
    let record = store(recs, Vec::new()).consensus_for("Palmer");
    assert_eq!(record.sentiment, Sentiment::Positive);
}

#[test]
fn first_matching_injury_signal_wins() {
    let store = store(
        Vec::new(),
        vec![
            InjurySignal::new("Bukayo Saka", InjuryStatus::Doubtful),
            InjurySignal::new("Saka", InjuryStatus::Out),
        ],
    );
    assert_eq!(store.injury_status("saka"), Some(InjuryStatus::Doubtful));
    // Only the full stored name contains the longer query.
    assert_eq!(store.injury_status("Bukayo Saka"), Some(InjuryStatus::Doubtful));
}

#[test]
fn lineup_match_needs_query_inside_starter_name() {
    let mut signals = SignalSet::default();
    signals.upsert_lineup(LineupSignal {
        team_name: "Liverpool".to_string(),
        starters: vec!["Salah".to_string()],
    });
    let store = ConsensusStore::new(signals);
    assert!(store.is_expected_to_start("salah"));
    assert!(!store.is_expected_to_start("Mohamed Salah"));
}

#[test]
fn ruled_out_players_get_zero_web_score() {
    for status in [InjuryStatus::Out, InjuryStatus::Suspended] {
        let mut signals = SignalSet {
            recommendations: vec![
                rec("Bukayo Saka", RecommendationType::Captain, Sentiment::Positive),
                rec("Bukayo Saka", RecommendationType::Essential, Sentiment::Positive),
                rec("Bukayo Saka", RecommendationType::Transfer, Sentiment::Positive),
            ],
            injuries: vec![InjurySignal::new("Bukayo Saka", status)],
            lineups: Vec::new(),
        };
        signals.upsert_lineup(LineupSignal {
            team_name: "Arsenal".to_string(),
            starters: vec!["Bukayo Saka".to_string()],
        });
        let store = ConsensusStore::new(signals);
        assert_eq!(web_score(&store, "Saka"), 0.0);
    }
}

#[test]
fn web_score_rewards_starts_and_buzz_up_to_ten() {
    let mut signals = SignalSet {
        recommendations: vec![
            rec("Mohamed Salah", RecommendationType::Captain, Sentiment::Positive),
            rec("Mohamed Salah", RecommendationType::Captain, Sentiment::Positive),
            rec("Mohamed Salah", RecommendationType::Captain, Sentiment::Positive),
        ],
        ..SignalSet::default()
    };
    signals.upsert_lineup(LineupSignal {
        team_name: "Liverpool".to_string(),
        starters: vec!["Mohamed Salah".to_string()],
    });
    let store = ConsensusStore::new(signals);
    // 6.0 consensus + 1.5 expected start + 1.0 buzz
    assert!((web_score(&store, "Salah") - 8.5).abs() < 1e-12);
}

#[test]
fn substring_matching_is_loose_but_swappable() {
    let signals = SignalSet {
        recommendations: vec![rec(
            "Andrew Robertson",
            RecommendationType::Essential,
            Sentiment::Positive,
        )],
        ..SignalSet::default()
    };
    let loose = ConsensusStore::new(signals.clone());
    assert_eq!(loose.consensus_for("Son").mention_count, 1);

    let strict = ConsensusStore::with_matcher(signals, Arc::new(TokenBoundaryMatcher));
    assert_eq!(strict.consensus_for("Son").mention_count, 0);
    assert_eq!(strict.consensus_for("Robertson").mention_count, 1);
}

#[test]
fn summary_groups_by_stored_name() {
    let store = store(
        vec![
            rec("Cole Palmer", RecommendationType::Essential, Sentiment::Positive),
            rec("Bukayo Saka", RecommendationType::Captain, Sentiment::Positive),
            rec("Cole Palmer", RecommendationType::Captain, Sentiment::Neutral),
            rec("Cole Palmer", RecommendationType::Captain, Sentiment::Positive),
        ],
        Vec::new(),
    );
    let rows = store.summary();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].player_name, "Cole Palmer");
    assert_eq!(rows[0].mention_count, 3);
    assert_eq!(
        rows[0].recommendation_types,
        vec![RecommendationType::Essential, RecommendationType::Captain]
    );
    assert_eq!(rows[0].sentiment, Sentiment::Positive);
}

#[test]
fn weight_columns_sum_to_one() {
    assert!((WEB_WEIGHTS.total() - 1.0).abs() < 1e-9);
    assert!((BASE_WEIGHTS.total() - 1.0).abs() < 1e-9);
}

#[test]
fn base_weights_scenario_scores_six_point_four() {
    let mut p = player(1, "Test Forward", Position::Forward, 1);
    p.form = 8.0;
    p.total_points = 200;
    p.ict_index = 100.0;

    let fixtures = HashMap::from([(
        1,
        FixtureOutlook {
            difficulties: vec![2, 2, 2, 2, 2],
            opponents: vec![2, 3, 4, 5, 6],
        },
    )]);
    let next = HashMap::new();
    let history = HistoryTable::default();
    let ctx = ScoringContext::new(&fixtures, &next, &history);

    let breakdown = ctx.score_player(&p);
    assert!((breakdown.fixture - 8.0).abs() < 1e-12);
    assert!((breakdown.points - 10.0).abs() < 1e-12);
    assert!((breakdown.ict - 5.0).abs() < 1e-12);
    assert_eq!(breakdown.web, None);
    assert!((breakdown.total - 6.4).abs() < 1e-9);
}

#[test]
fn web_weights_need_flag_and_store() {
    let fixtures = HashMap::new();
    let next = HashMap::new();
    let history = HistoryTable::default();
    let store = ConsensusStore::default();

    let off = ScoringContext::new(&fixtures, &next, &history).with_consensus(&store, false);
    assert!(!off.web_enabled());
    assert_eq!(off.weights(), BASE_WEIGHTS);

    let on = ScoringContext::new(&fixtures, &next, &history).with_consensus(&store, true);
    assert!(on.web_enabled());
    assert_eq!(on.weights(), WEB_WEIGHTS);
}

#[test]
fn history_against_next_opponent_counts() {
    let p = player(7, "Bukayo Saka", Position::Midfielder, 1);
    let fixtures = HashMap::new();
    let next = HashMap::from([(
        1,
        NextFixture {
            opponent_id: 2,
            is_home: true,
        },
    )]);
    let history = HistoryTable::from_records([HistoricalRecord {
        player_id: 7,
        opponent_id: 2,
        matches_played: 2,
        avg_points: 8.0,
    }]);
    let ctx = ScoringContext::new(&fixtures, &next, &history);
    // min(8.0 * 1.5, 10)
    assert!((ctx.score_player(&p).historical - 10.0).abs() < 1e-12);
    assert_eq!(ctx.score(&p, Some(3)).historical, 0.0);
}

#[test]
fn goalkeeper_captain_score_is_lower_than_forward() {
    let gk = player(1, "Keeper One", Position::Goalkeeper, 1);
    let fwd = player(2, "Striker Two", Position::Forward, 1);
    let fixtures = HashMap::new();
    let next = HashMap::new();
    let history = HistoryTable::default();
    let ctx = ScoringContext::new(&fixtures, &next, &history);
    assert!(ctx.captain_score(&gk).score < ctx.captain_score(&fwd).score);
}

#[test]
fn captain_score_applies_modifiers_in_order() {
    let mut p = player(1, "Erling Haaland", Position::Forward, 3);
    p.form = 6.0;
    p.price = 14.5;
    let fixtures = HashMap::from([(
        1,
        FixtureOutlook {
            difficulties: vec![2],
            opponents: vec![4],
        },
    )]);
    let next = HashMap::from([(
        3,
        NextFixture {
            opponent_id: 4,
            is_home: true,
        },
    )]);
    let history = HistoryTable::default();
    let ctx = ScoringContext::new(&fixtures, &next, &history);
    let cs = ctx.captain_score(&p);
    // fixture 8.0*0.4 + form 6*0.25 + hist 0 + neutral web 5*0.15 = 5.45
    // (+0.5 home) * 1.2 + 0.5 premium
    assert!((cs.score - ((5.45 + 0.5) * 1.2 + 0.5)).abs() < 1e-9);
    assert!(cs.is_home);
    assert_eq!(cs.fixture_difficulty, Some(2));
    // 6 * 0.8 * 1.2 * 2
    assert!((cs.expected_points - 11.52).abs() < 1e-9);
}

#[test]
fn captain_mentions_drive_web_captain_score() {
    let store = store(
        vec![
            rec("Mohamed Salah", RecommendationType::Captain, Sentiment::Positive),
            rec("Mohamed Salah", RecommendationType::Captain, Sentiment::Positive),
            rec("Mohamed Salah", RecommendationType::Captain, Sentiment::Neutral),
        ],
        Vec::new(),
    );
    let p = player(11, "Mohamed Salah", Position::Midfielder, 2);
    let fixtures = HashMap::new();
    let next = HashMap::new();
    let history = HistoryTable::default();
    // Web captaincy applies whenever a store is attached.
    let ctx = ScoringContext::new(&fixtures, &next, &history).with_consensus(&store, false);
    let cs = ctx.captain_score(&p);
    assert!(cs.is_web_captain);
    assert_eq!(cs.web_captain_score, 10.0);
}

#[test]
fn captains_are_ranked_and_vice_excludes_captain() {
    let mut squad = vec![
        player(1, "Keeper One", Position::Goalkeeper, 1),
        player(2, "Erling Haaland", Position::Forward, 3),
        player(3, "Mohamed Salah", Position::Midfielder, 2),
        player(4, "Defender Four", Position::Defender, 4),
    ];
    squad[1].form = 9.0;
    squad[1].selected_by_percent = 71.0;
    squad[2].form = 8.0;

    let fixtures = HashMap::new();
    let next = HashMap::new();
    let history = HistoryTable::default();
    let ctx = ScoringContext::new(&fixtures, &next, &history);

    let captains = suggest_captains(&ctx, &squad, 3);
    assert_eq!(captains.len(), 3);
    assert_eq!(captains[0].player_name, "Erling Haaland");
    assert!(captains[0].rationale.contains(&RationaleTag::ExcellentForm));
    assert!(captains[0].rationale.contains(&RationaleTag::Template));
    assert!(
        captains
            .windows(2)
            .all(|w| w[0].captain_score >= w[1].captain_score)
    );
    assert_eq!(
        CaptainStrategy::for_ownership(captains[0].selected_by_percent),
        CaptainStrategy::Template
    );

    let vice = suggest_vice(&captains, Some("ERLING HAALAND")).expect("vice pick");
    assert!(!vice.candidate.player_name.eq_ignore_ascii_case("erling haaland"));
    assert_eq!(vice.candidate.player_name, "Mohamed Salah");
}

#[test]
fn equal_captain_scores_keep_squad_order() {
    let squad = vec![
        player(1, "Twin One", Position::Midfielder, 1),
        player(2, "Twin Two", Position::Midfielder, 1),
    ];
    let fixtures = HashMap::new();
    let next = HashMap::new();
    let history = HistoryTable::default();
    let ctx = ScoringContext::new(&fixtures, &next, &history);
    let captains = suggest_captains(&ctx, &squad, 5);
    let ids: Vec<u32> = captains.iter().map(|c| c.player_id).collect();
    assert_eq!(ids, vec![1, 2]);

    let vice = suggest_vice(&captains, None).expect("vice pick");
    assert_eq!(vice.candidate.player_id, 1);
}

#[test]
fn vice_score_penalises_differentials_and_rewards_consistency() {
    let squad = vec![player(1, "Low Owned", Position::Midfielder, 1)];
    let fixtures = HashMap::new();
    let next = HashMap::new();
    let history = HistoryTable::default();
    let ctx = ScoringContext::new(&fixtures, &next, &history);
    let mut candidate = suggest_captains(&ctx, &squad, 1).remove(0);
    let base = candidate.captain_score;

    candidate.selected_by_percent = 3.0;
    candidate.total_points = 40;
    candidate.form = 5.0;
    assert!((vice_score(&candidate) - base * 0.8).abs() < 1e-12);

    candidate.selected_by_percent = 30.0;
    candidate.total_points = 80;
    assert!((vice_score(&candidate) - (base + 0.5)).abs() < 1e-12);
}

#[test]
fn empty_squad_gives_no_captain() {
    let fixtures = HashMap::new();
    let next = HashMap::new();
    let history = HistoryTable::default();
    let ctx = ScoringContext::new(&fixtures, &next, &history);
    let captains = suggest_captains(&ctx, &[], 5);
    assert!(captains.is_empty());
    assert!(suggest_vice(&captains, None).is_none());
}

#[test]
fn store_accepts_signals_after_construction() {
    let mut store = ConsensusStore::default();
    assert!(store.is_empty());
    store.add_recommendations([rec(
        "Cole Palmer",
        RecommendationType::Differential,
        Sentiment::Positive,
    )]);
    store.add_injuries([InjurySignal::new("Cole Palmer", InjuryStatus::Doubtful)]);
    store.upsert_lineups([
        LineupSignal {
            team_name: "Chelsea".to_string(),
            starters: vec!["Nicolas Jackson".to_string()],
        },
        LineupSignal {
            team_name: "Chelsea".to_string(),
            starters: vec!["Cole Palmer".to_string()],
        },
    ]);

    assert!(!store.is_empty());
    assert_eq!(store.signals().lineups.len(), 1);
    assert!(store.is_expected_to_start("Palmer"));
    assert!(!store.is_expected_to_start("Jackson"));
    assert_eq!(store.injury_status("palmer"), Some(InjuryStatus::Doubtful));
    // 1.5 * 2 halved, plus 1.5 for the expected start
    assert!((web_score(&store, "Palmer") - 3.0).abs() < 1e-12);
}
