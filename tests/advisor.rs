use std::fs;
use std::path::PathBuf;

use fpl_advisor::advisor::{self, Snapshot};
use fpl_advisor::config::AdvisorConfig;
use fpl_advisor::fpl_fetch::{
    current_gameweek, fixture_outlook, history_records, next_opponents, parse_bootstrap_json,
    parse_element_summary_json, parse_entry_json, parse_fixtures_json, parse_picks_json,
};
use fpl_advisor::model::{
    InjurySignal, InjuryStatus, Position, RecommendationSignal, RecommendationType, Sentiment,
    SignalSet,
};

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

/// Offline equivalent of `advisor::build_snapshot` over the canned API payloads.
fn fixture_snapshot() -> Snapshot {
    let bootstrap = parse_bootstrap_json(&read_fixture("fpl_bootstrap.json")).expect("bootstrap");
    let rows = parse_fixtures_json(&read_fixture("fpl_fixtures.json")).expect("fixtures");
    let picks = parse_picks_json(&read_fixture("fpl_picks.json")).expect("picks");
    let entry = parse_entry_json(&read_fixture("fpl_entry.json")).expect("entry");
    let summary =
        parse_element_summary_json(&read_fixture("fpl_element_summary.json")).expect("summary");

    let gameweek = current_gameweek(&bootstrap.events);
    Snapshot {
        gameweek,
        team_name: Some(entry.team_name),
        manager_name: Some(entry.manager_name),
        overall_points: Some(entry.overall_points),
        bank: picks.bank,
        transfers_cost: picks.event_transfers_cost,
        squad_ids: picks.squad_ids,
        players: bootstrap.players,
        teams: bootstrap.teams,
        fixtures: [(10, fixture_outlook(&summary))].into_iter().collect(),
        next_fixtures: next_opponents(&rows, gameweek),
        history: history_records(10, &summary),
        signals: None,
    }
}

fn web_signals() -> SignalSet {
    let mut captain = RecommendationSignal::new(
        "test",
        "Erling Haaland",
        RecommendationType::Captain,
        Sentiment::Positive,
    );
    captain.team = Some("Man City".to_string());
    SignalSet {
        recommendations: vec![
            captain.clone(),
            captain,
            RecommendationSignal::new(
                "test",
                "M.Salah",
                RecommendationType::Essential,
                Sentiment::Positive,
            ),
        ],
        injuries: vec![InjurySignal::new("Bukayo Saka", InjuryStatus::Out)],
        lineups: Vec::new(),
    }
}

#[test]
fn offline_run_scores_squad_and_picks_captains() {
    let snapshot = fixture_snapshot();
    let report = advisor::run(&snapshot, &AdvisorConfig::default());

    assert_eq!(report.gameweek, 7);
    assert_eq!(report.team_name.as_deref(), Some("Expected Toulouse"));
    assert_eq!(report.manager_name.as_deref(), Some("Sam Reyes"));
    assert_eq!(report.overall_points, Some(402));
    assert_eq!(report.transfers_cost, 4);
    assert!(!report.web_enabled);
    assert!(report.signal_summary.is_empty());

    let positions: Vec<Position> = report.squad.iter().map(|r| r.position).collect();
    assert_eq!(
        positions,
        vec![Position::Goalkeeper, Position::Midfielder, Position::Midfielder]
    );
    let saka = report
        .squad
        .iter()
        .find(|r| r.player_id == 10)
        .expect("saka in squad");
    assert_eq!(saka.next_opponent.as_deref(), Some("LIV"));
    assert!((saka.avg_difficulty - 3.6).abs() < 1e-9);
    assert_eq!(saka.score.web, None);
    // 6.0 average vs Liverpool, scaled by 1.5 and capped.
    assert!((saka.score.historical - 9.0).abs() < 1e-9);

    assert_eq!(report.captains.len(), 3);
    assert_eq!(report.captains[0].player_name, "Bukayo Saka");
    let vice = report.vice_captain.as_ref().expect("vice pick");
    assert_eq!(vice.candidate.player_name, "Mohamed Salah");
    assert!(report.captain_strategy.is_some());
}

#[test]
fn web_signals_switch_weights_and_zero_ruled_out_players() {
    let mut snapshot = fixture_snapshot();
    snapshot.signals = Some(web_signals());
    let cfg = AdvisorConfig {
        use_web_data: true,
        ..AdvisorConfig::default()
    };
    let report = advisor::run(&snapshot, &cfg);

    assert!(report.web_enabled);
    let saka = report
        .squad
        .iter()
        .find(|r| r.player_id == 10)
        .expect("saka in squad");
    assert_eq!(saka.score.web, Some(0.0));

    let top = &report.signal_summary[0];
    assert_eq!(top.player_name, "Erling Haaland");
    assert_eq!(top.mention_count, 2);
    assert_eq!(top.resolved.as_deref(), Some("Erling Haaland"));
    assert_eq!(top.recommendation_types, vec!["captain".to_string()]);

    let salah = report
        .signal_summary
        .iter()
        .find(|r| r.player_name == "M.Salah")
        .expect("salah row");
    assert_eq!(salah.resolved.as_deref(), Some("Mohamed Salah"));
}

#[test]
fn loaded_signals_without_flag_keep_base_weights() {
    let mut snapshot = fixture_snapshot();
    snapshot.signals = Some(web_signals());
    let report = advisor::run(&snapshot, &AdvisorConfig::default());
    assert!(!report.web_enabled);
    assert!(report.squad.iter().all(|r| r.score.web.is_none()));
    // The summary still reports what was scraped.
    assert!(!report.signal_summary.is_empty());
}

#[test]
fn position_filter_reaches_transfers() {
    let snapshot = fixture_snapshot();
    let cfg = AdvisorConfig {
        position_filter: Some(Position::Goalkeeper),
        ..AdvisorConfig::default()
    };
    let report = advisor::run(&snapshot, &cfg);
    assert!(
        report
            .transfers
            .iter()
            .all(|t| t.position == Position::Goalkeeper)
    );
}

#[test]
fn snapshot_survives_save_and_load() {
    let mut snapshot = fixture_snapshot();
    snapshot.signals = Some(web_signals());

    let dir = std::env::temp_dir().join(format!("fpl_advisor_snapshot_{}", std::process::id()));
    let path = dir.join("snapshot.json");
    advisor::save_snapshot(&path, &snapshot).expect("save");
    let loaded = advisor::load_snapshot(&path).expect("load");
    let _ = fs::remove_dir_all(&dir);

    assert_eq!(loaded.gameweek, snapshot.gameweek);
    assert_eq!(loaded.squad_ids, snapshot.squad_ids);
    assert_eq!(loaded.manager_name, snapshot.manager_name);
    assert_eq!(loaded.transfers_cost, 4);
    assert_eq!(loaded.players.len(), snapshot.players.len());
    assert_eq!(loaded.fixtures[&10].difficulties, vec![4, 4, 3, 3, 4]);
    assert_eq!(loaded.next_fixtures.len(), snapshot.next_fixtures.len());
    assert_eq!(loaded.history.len(), 3);
    let signals = loaded.signals.expect("signals kept");
    assert_eq!(signals.recommendations.len(), 3);
    assert_eq!(signals.injuries[0].status, InjuryStatus::Out);
}
