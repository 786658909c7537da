use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use fpl_advisor::advisor;
use fpl_advisor::config::AdvisorConfig;
use fpl_advisor::consensus::ConsensusStore;
use fpl_advisor::scout_fetch::ScoutSelection;

const DEFAULT_OUT: &str = "fpl_scraped_data.json";

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    fpl_advisor::init_logging();

    let out = parse_out_arg().unwrap_or_else(|| PathBuf::from(DEFAULT_OUT));
    let cfg = AdvisorConfig::from_env();
    let run = advisor::scrape_signals(&cfg);
    let (signals, report) = (run.signals, run.report);

    let json = serde_json::to_string_pretty(&signals).context("serialize signals")?;
    fs::write(&out, json).with_context(|| format!("failed to write {}", out.display()))?;

    println!("Scrape complete at {}", report.scraped_at);
    println!("Recommendations: {}", signals.recommendations.len());
    println!("Injury updates: {}", signals.injuries.len());
    println!("Lineups: {}", signals.lineups.len());
    let failures: Vec<_> = report.failures().collect();
    if !failures.is_empty() {
        println!("Failures: {}", failures.len());
        for f in failures.iter().take(8) {
            println!(
                " - {} {:?}: {}",
                f.source,
                f.capability,
                f.error.as_deref().unwrap_or_default()
            );
        }
    }

    if let Some(scout) = run.scout.as_deref() {
        print_scout_summary(scout);
    }

    let store = ConsensusStore::with_matcher(signals, cfg.name_match.matcher());
    let summary = store.summary();
    if !summary.is_empty() {
        println!("\nTop recommended players:");
        for row in summary.iter().take(15) {
            println!(
                "  {:25} {:3} | {}",
                row.player_name,
                row.mention_count,
                row.sentiment.label()
            );
        }
    }
    println!("\nWrote {}", out.display());
    Ok(())
}

fn print_scout_summary(selection: &ScoutSelection) {
    match selection.scout_summary() {
        Ok(summary) => {
            let gw = selection
                .gameweek()
                .map(|g| g.to_string())
                .unwrap_or_else(|| "?".to_string());
            println!("\nScout selection GW{gw} ({})", selection.url());
            println!(
                "  formation {} | captain {} | vice {} | {} players",
                summary.formation.as_deref().unwrap_or("-"),
                summary.captain.as_deref().unwrap_or("-"),
                summary.vice_captain.as_deref().unwrap_or("-"),
                summary.players_count
            );
        }
        Err(err) => eprintln!("scout summary unavailable: {err:#}"),
    }
}

fn parse_out_arg() -> Option<PathBuf> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(path) = arg.strip_prefix("--out=") {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
        if arg == "--out" {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(PathBuf::from(next));
            }
        }
    }
    None
}
