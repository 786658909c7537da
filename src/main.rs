use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use fpl_advisor::advisor::{self, AdvisorReport, Snapshot};
use fpl_advisor::config::AdvisorConfig;
use fpl_advisor::http_cache::ResponseCache;
use fpl_advisor::model::Position;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    fpl_advisor::init_logging();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let mut cfg = AdvisorConfig::from_env();
    if let Some(raw) = arg_value(&args, "--position") {
        let pos = raw.parse::<Position>().context("invalid --position")?;
        cfg.position_filter = Some(pos);
    }
    if args.iter().any(|a| a == "--web") {
        cfg.use_web_data = true;
    }

    if args.iter().any(|a| a == "--clear-cache") {
        let removed = ResponseCache::at_default_location(cfg.cache_ttl).clear()?;
        println!("Cleared {removed} cached responses");
        return Ok(());
    }

    let snapshot: Snapshot = match arg_value(&args, "--snapshot").map(PathBuf::from) {
        Some(path) => {
            info!(path = %path.display(), "loading snapshot");
            advisor::load_snapshot(&path)?
        }
        None => advisor::build_snapshot(&cfg)?,
    };
    if let Some(path) = arg_value(&args, "--save-snapshot").map(PathBuf::from) {
        advisor::save_snapshot(&path, &snapshot)?;
        info!(path = %path.display(), "snapshot saved");
    }

    let report = advisor::run(&snapshot, &cfg);
    print_report(&report);
    Ok(())
}

fn print_report(report: &AdvisorReport) {
    let rule = "=".repeat(100);
    println!("{rule}");
    let mut header = Vec::new();
    if let Some(name) = &report.team_name {
        header.push(match &report.manager_name {
            Some(manager) if !manager.is_empty() => format!("{name} ({manager})"),
            _ => name.clone(),
        });
    }
    header.push(format!("Gameweek {}", report.gameweek));
    if let Some(points) = report.overall_points {
        header.push(format!("{points} pts overall"));
    }
    println!("{}", header.join(" | "));
    let hits = if report.transfers_cost > 0 {
        format!(" | Transfer hits: -{}", report.transfers_cost)
    } else {
        String::new()
    };
    println!(
        "Bank: £{:.1}m{hits} | Web signals: {}",
        report.bank,
        if report.web_enabled { "on" } else { "off" }
    );
    println!("{rule}");

    let mut last_pos = None;
    for row in &report.squad {
        if last_pos != Some(row.position) {
            println!("\n{}:", row.position);
            last_pos = Some(row.position);
        }
        let web = if row.web_mentions > 0 {
            format!(
                " | Web: {}({})",
                row.web_sentiment.label()[..3].to_uppercase(),
                row.web_mentions
            )
        } else {
            String::new()
        };
        println!(
            "  {:25} ({:14}) £{:4.1}m | Score: {:4.1} | Form: {:4.1} | Next: vs {:3} | FDR(5): {:.1}{web}",
            row.name,
            row.team,
            row.price,
            row.score.total,
            row.form,
            row.next_opponent.as_deref().unwrap_or("-"),
            row.avg_difficulty,
        );
    }

    println!("\n{rule}\nTRANSFER SUGGESTIONS\n{rule}");
    if report.transfers.is_empty() {
        println!("No transfer improves the squad by enough to be worth it.");
    }
    for (idx, t) in report.transfers.iter().enumerate() {
        println!(
            "{:2}. [{}] OUT {} ({}, £{:.1}m, score {:.2}) -> IN {} ({}, £{:.1}m, score {:.2})",
            idx + 1,
            t.position,
            t.out_name,
            t.out_team,
            t.out_price,
            t.out_score,
            t.in_name,
            t.in_team,
            t.in_price,
            t.in_score,
        );
        let web = if t.web_mentions > 0 {
            format!(" | web: {} mentions, {}", t.web_mentions, t.web_sentiment.label())
        } else {
            String::new()
        };
        println!(
            "    improvement +{:.2} | cost {:+.1}m{web}",
            t.improvement, t.cost_delta
        );
    }

    println!("\n{rule}\nCAPTAINCY\n{rule}");
    for (idx, c) in report.captains.iter().enumerate() {
        let venue = if c.is_home { "H" } else { "A" };
        println!(
            "{}. {} ({}, {}) | score {:.2} | exp pts {:.1} | FDR {}/5 {venue} | owned {:.1}%",
            idx + 1,
            c.player_name,
            c.team_name,
            c.position,
            c.captain_score,
            c.expected_points,
            c.fixture_difficulty,
            c.selected_by_percent,
        );
        if !c.rationale.is_empty() {
            let tags: Vec<&str> = c.rationale.iter().map(|t| t.label()).collect();
            println!("   {}", tags.join(" | "));
        }
    }
    if let Some(strategy) = report.captain_strategy {
        println!("\nStrategy: {strategy:?} ({})", strategy.describe());
    }
    if let Some(vice) = &report.vice_captain {
        println!(
            "Vice-captain: {} (vice score {:.2})",
            vice.candidate.player_name, vice.vice_score
        );
    }

    if !report.signal_summary.is_empty() {
        println!("\n{rule}\nMOST RECOMMENDED ONLINE\n{rule}");
        for row in &report.signal_summary {
            println!(
                "  {:25} {:3} mentions | {:8} | {}{}",
                row.player_name,
                row.mention_count,
                row.sentiment.label(),
                row.recommendation_types.join(", "),
                row.resolved
                    .as_deref()
                    .map(|name| format!(" -> {name}"))
                    .unwrap_or_default(),
            );
        }
    }
}

fn arg_value(args: &[String], flag: &str) -> Option<String> {
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == flag {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(next.trim().to_string());
            }
        }
    }
    None
}
