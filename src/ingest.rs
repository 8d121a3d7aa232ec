// src/ingest.rs
//
// Upstream normalizer: turns attendance CSV batches into facts. This is
// the only place that deals with strings, missing columns and bad rows;
// the engine downstream assumes well-typed input. Bad rows are skipped
// with a warning, never fatal.
//
// Expected attendance header: person_id,name,department,date,sign_in,sign_out
// Expected roster header:     person_id,name,department

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use tracing::{info, warn};

use crate::attendance::AttendanceFact;
use crate::roster::RosterEntry;
use crate::scoring::ScoringConfig;

#[derive(Debug, Deserialize)]
struct RawAttendanceRow {
    person_id: Option<String>,
    name: Option<String>,
    department: Option<String>,
    date: Option<String>,
    sign_in: Option<String>,
    sign_out: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawRosterRow {
    person_id: Option<String>,
    name: Option<String>,
    department: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .ok()
}

/// Reads one attendance batch. `week_label` overrides the per-fact week
/// key (one batch per week, as uploaded); pass `None` to derive ISO week
/// labels from the dates instead.
pub fn read_facts<R: Read>(
    reader: R,
    source_label: &str,
    week_label: Option<&str>,
    config: &ScoringConfig,
) -> Result<Vec<AttendanceFact>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut facts = Vec::new();
    let mut skipped = 0usize;

    for (index, row) in csv_reader.deserialize::<RawAttendanceRow>().enumerate() {
        let line = index + 2; // header is line 1
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                warn!(source = source_label, line, "unreadable row: {e}");
                skipped += 1;
                continue;
            }
        };

        let Some(name) = non_blank(row.name) else {
            warn!(source = source_label, line, "row has no name, skipping");
            skipped += 1;
            continue;
        };
        let Some(date) = non_blank(row.date).as_deref().and_then(parse_date) else {
            warn!(source = source_label, line, "row has no parseable date, skipping");
            skipped += 1;
            continue;
        };

        let sign_in = match non_blank(row.sign_in) {
            Some(raw) => match parse_time(&raw) {
                Some(t) => Some(t),
                None => {
                    warn!(source = source_label, line, "unparseable sign-in '{raw}', treated as missing");
                    None
                }
            },
            None => None,
        };

        let mut fact =
            AttendanceFact::new(&name, date, sign_in, config.late_threshold).source(source_label);
        if let Some(label) = week_label {
            fact = fact.week_label(label);
        }
        if let Some(id) = non_blank(row.person_id) {
            fact = fact.person_id(&id);
        }
        if let Some(dept) = non_blank(row.department) {
            fact = fact.department(&dept);
        }
        if let Some(out) = non_blank(row.sign_out).as_deref().and_then(parse_time) {
            fact = fact.sign_out(out);
        }
        facts.push(fact);
    }

    if skipped > 0 {
        warn!(source = source_label, skipped, "rows skipped in batch");
    }
    Ok(facts)
}

/// Merges one or more attendance CSV files. Each file's stem becomes the
/// facts' source label and, unless `iso_weeks` is set, their week label.
pub fn load_fact_files(
    paths: &[PathBuf],
    iso_weeks: bool,
    config: &ScoringConfig,
) -> Result<Vec<AttendanceFact>> {
    let mut all_facts = Vec::new();
    for path in paths {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        let file = File::open(path)
            .with_context(|| format!("opening attendance file {}", path.display()))?;
        let week_label = if iso_weeks { None } else { Some(stem.as_str()) };
        let facts = read_facts(file, &stem, week_label, config)
            .with_context(|| format!("reading attendance file {}", path.display()))?;
        info!(file = %path.display(), facts = facts.len(), "loaded attendance batch");
        all_facts.extend(facts);
    }
    Ok(all_facts)
}

pub fn read_roster<R: Read>(reader: R) -> Result<Vec<RosterEntry>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut entries = Vec::new();
    for (index, row) in csv_reader.deserialize::<RawRosterRow>().enumerate() {
        let line = index + 2;
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                warn!(line, "unreadable roster row: {e}");
                continue;
            }
        };
        let Some(name) = non_blank(row.name) else {
            warn!(line, "roster row has no name, skipping");
            continue;
        };
        entries.push(RosterEntry {
            name,
            department: non_blank(row.department),
            person_id: non_blank(row.person_id),
        });
    }
    Ok(entries)
}

pub fn load_roster(path: &Path) -> Result<Vec<RosterEntry>> {
    let file =
        File::open(path).with_context(|| format!("opening roster file {}", path.display()))?;
    let entries =
        read_roster(file).with_context(|| format!("reading roster file {}", path.display()))?;
    info!(file = %path.display(), entries = entries.len(), "loaded roster");
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "person_id,name,department,date,sign_in,sign_out\n";

    fn facts_of(body: &str) -> Vec<AttendanceFact> {
        let csv = format!("{HEADER}{body}");
        read_facts(csv.as_bytes(), "week1", Some("week1"), &ScoringConfig::default()).unwrap()
    }

    #[test]
    fn parses_a_normal_row() {
        let facts = facts_of("E1,Ada Lovelace,Engineering,2024-01-02,07:45,16:30\n");
        assert_eq!(facts.len(), 1);
        let fact = &facts[0];
        assert_eq!(fact.person_id.as_deref(), Some("E1"));
        assert_eq!(fact.name, "Ada Lovelace");
        assert_eq!(fact.department.as_deref(), Some("Engineering"));
        assert!(fact.on_time);
        assert!(fact.sign_out.is_some());
        assert_eq!(fact.week_key, "week1");
        assert_eq!(fact.source_label, "week1");
    }

    #[test]
    fn skips_rows_without_parseable_dates() {
        let facts = facts_of(
            ",Ada,,not-a-date,07:45,\n\
             ,Bea,,2024-01-02,07:45,\n\
             ,Cleo,,,07:45,\n",
        );
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].name, "Bea");
    }

    #[test]
    fn blank_sign_in_stays_missing() {
        let facts = facts_of(",Ada,,2024-01-02,,\n");
        assert_eq!(facts.len(), 1);
        assert!(facts[0].sign_in.is_none());
        assert!(!facts[0].on_time);
    }

    #[test]
    fn accepts_seconds_in_times() {
        let facts = facts_of(",Ada,,2024-01-02,07:45:30,16:30:00\n");
        assert_eq!(facts[0].sign_in, NaiveTime::from_hms_opt(7, 45, 30));
    }

    #[test]
    fn derives_iso_week_when_no_label_given() {
        let csv = format!("{HEADER},Ada,,2024-01-02,07:45,\n");
        let facts =
            read_facts(csv.as_bytes(), "batch", None, &ScoringConfig::default()).unwrap();
        assert_eq!(facts[0].week_key, "2024-W01");
    }

    #[test]
    fn roster_rows_parse_and_skip_blanks() {
        let csv = "person_id,name,department\nE1,Ada,Engineering\n,,\n,Bea,\n";
        let entries = read_roster(csv.as_bytes()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].person_id.as_deref(), Some("E1"));
        assert_eq!(entries[1].name, "Bea");
        assert_eq!(entries[1].department, None);
    }
}
