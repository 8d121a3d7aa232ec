// src/main.rs
//
// CLI frontend: loads normalized attendance CSV batches, runs the
// aggregation engine over them, and prints or exports the session report.
// All file and environment handling stays here; the engine modules are
// pure batch transforms.

mod attendance;
mod ingest;
mod kpi;
mod leaderboard;
mod report;
mod rollup;
mod roster;
mod scoring;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate, NaiveTime};
use clap::{Parser, ValueEnum};
use serde::Deserialize;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use crate::report::SessionReport;
use crate::rollup::PeriodKind;
use crate::scoring::ScoringConfig;

#[derive(Parser, Debug)]
#[command(
    name = "punchcard",
    version,
    about = "Attendance leaderboards, badges and KPIs from sign-in records"
)]
struct Cli {
    /// Normalized attendance CSV batches (typically one file per week)
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Roster CSV of expected staff (person_id,name,department)
    #[arg(long)]
    roster: Option<PathBuf>,

    /// Reference date for the present/absent KPIs, YYYY-MM-DD
    /// (defaults to the latest fact date in the batch)
    #[arg(long)]
    today: Option<NaiveDate>,

    /// Only report the given week label
    #[arg(long)]
    week: Option<String>,

    /// Roll up by calendar month instead of by week
    #[arg(long)]
    month: bool,

    /// Derive ISO week labels from dates instead of using file stems
    #[arg(long)]
    iso_weeks: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Directory for CSV output (with --format csv)
    #[arg(long)]
    out: Option<PathBuf>,

    /// Latest sign-in that still counts as on time, HH:MM
    #[arg(long, value_parser = parse_time_arg)]
    late_threshold: Option<NaiveTime>,

    /// Points per on-time sign-in
    #[arg(long)]
    points_on_time: Option<u32>,

    /// Points per late sign-in
    #[arg(long)]
    points_late: Option<u32>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Csv,
}

/// Scoring knobs that may come from the environment (PUNCHCARD_ prefix),
/// overridden in turn by CLI flags.
#[derive(Debug, Default, Deserialize)]
struct EnvOverrides {
    late_threshold: Option<String>,
    points_on_time: Option<u32>,
    points_late: Option<u32>,
}

fn parse_time_arg(s: &str) -> std::result::Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .map_err(|_| format!("'{s}' is not an HH:MM time"))
}

fn resolve_config(cli: &Cli) -> Result<ScoringConfig> {
    let mut config = ScoringConfig::default();

    let env: EnvOverrides = envy::prefixed("PUNCHCARD_")
        .from_env()
        .context("reading PUNCHCARD_* environment overrides")?;
    if let Some(raw) = env.late_threshold {
        match parse_time_arg(&raw) {
            Ok(t) => config.late_threshold = t,
            Err(e) => bail!("PUNCHCARD_LATE_THRESHOLD: {e}"),
        }
    }
    if let Some(points) = env.points_on_time {
        config.points_on_time = points;
    }
    if let Some(points) = env.points_late {
        config.points_late = points;
    }

    if let Some(t) = cli.late_threshold {
        config.late_threshold = t;
    }
    if let Some(points) = cli.points_on_time {
        config.points_on_time = points;
    }
    if let Some(points) = cli.points_late {
        config.points_late = points;
    }

    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    let mut facts = ingest::load_fact_files(&cli.files, cli.iso_weeks, &config)?;
    info!(
        facts = facts.len(),
        files = cli.files.len(),
        "merged attendance batches"
    );

    if let Some(week) = &cli.week {
        let before = facts.len();
        facts.retain(|f| f.week_key == *week);
        info!(
            week = %week,
            kept = facts.len(),
            dropped = before - facts.len(),
            "applied week filter"
        );
        if facts.is_empty() {
            warn!(week = %week, "week filter matched no facts");
        }
    }

    let roster_entries = match &cli.roster {
        Some(path) => Some(ingest::load_roster(path)?),
        None => None,
    };

    // Replaying a historical batch without --today should stay stable, so
    // the fallback is the latest fact date rather than the wall clock.
    let today = cli
        .today
        .or_else(|| facts.iter().map(|f| f.date).max())
        .unwrap_or_else(|| Local::now().date_naive());

    // With a roster in play, stable ids beat display names as the
    // grouping key; without one, names are all there is.
    let leaderboard = if roster_entries.is_some() {
        leaderboard::build_leaderboard(&facts, &config, leaderboard::id_or_name_key)?
    } else {
        leaderboard::build_leaderboard(&facts, &config, leaderboard::name_key)?
    };
    let kind = if cli.month {
        PeriodKind::Month
    } else {
        PeriodKind::Week
    };
    let rollups = rollup::build_rollups(&facts, &config, kind)?;
    let weekday_overview = rollup::weekday_overview(&facts);
    let kpis = kpi::compute_kpis(&facts, today, roster_entries.as_deref());
    let reconciliation = match &roster_entries {
        Some(entries) => Some(roster::reconcile(&facts, entries, &config)?),
        None => None,
    };

    let report = SessionReport {
        kpis,
        leaderboard,
        rollups,
        weekday_overview,
        reconciliation,
    };

    match cli.format {
        OutputFormat::Text => print!("{}", report::render_text(&report)),
        OutputFormat::Json => println!("{}", report::render_json(&report)?),
        OutputFormat::Csv => {
            let dir = cli.out.clone().unwrap_or_else(|| PathBuf::from("."));
            report::write_csv_reports(&dir, &report)?;
            info!(dir = %dir.display(), "wrote CSV reports");
        }
    }
    Ok(())
}
