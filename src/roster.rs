// src/roster.rs
//
// Reconciles the attendance-derived person set against an optional master
// roster. Facts join on person_id when both sides carry one, otherwise on
// the normalized name. Output is a three-way partition: attending, never
// attended, and names seen in facts but missing from the roster.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::attendance::{normalize_key, AttendanceFact};
use crate::scoring::{ConfigError, ScoringConfig};

/// One row of the authoritative staff list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub name: String,
    pub department: Option<String>,
    pub person_id: Option<String>,
}

/// A roster entry with at least one matching fact, annotated with its
/// counts and a status label from the configured status bands.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendingStaff {
    pub entry: RosterEntry,
    pub sign_in_count: u32,
    pub on_time_count: u32,
    pub late_count: u32,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NeverAttended {
    pub entry: RosterEntry,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RosterReconciliation {
    pub attending: Vec<AttendingStaff>,
    pub never_attended: Vec<NeverAttended>,
    /// Display names present in facts but absent from the roster,
    /// deduplicated and sorted. Possibly new staff.
    pub unlisted: Vec<String>,
}

#[derive(Debug, Default)]
struct FactCounts {
    display_name: String,
    sign_in_count: u32,
    on_time_count: u32,
    late_count: u32,
}

pub fn reconcile(
    facts: &[AttendanceFact],
    roster: &[RosterEntry],
    config: &ScoringConfig,
) -> Result<RosterReconciliation, ConfigError> {
    // Index scoreable facts by normalized name; remember which name key
    // each normalized person_id points at.
    let mut counts: BTreeMap<String, FactCounts> = BTreeMap::new();
    let mut id_to_name_key: BTreeMap<String, String> = BTreeMap::new();
    for fact in facts.iter().filter(|f| f.is_scoreable()) {
        let key = normalize_key(&fact.name);
        let entry = counts.entry(key.clone()).or_default();
        if entry.display_name.is_empty() {
            entry.display_name = fact.name.trim().to_string();
        }
        entry.sign_in_count += 1;
        if fact.on_time {
            entry.on_time_count += 1;
        } else {
            entry.late_count += 1;
        }
        if let Some(id) = &fact.person_id {
            if !id.trim().is_empty() {
                id_to_name_key.insert(normalize_key(id), key);
            }
        }
    }

    let mut matched_keys: BTreeSet<String> = BTreeSet::new();
    let mut attending = Vec::new();
    let mut never_attended = Vec::new();

    for entry in roster {
        let fact_key = entry
            .person_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .and_then(|id| id_to_name_key.get(&normalize_key(id)).cloned())
            .unwrap_or_else(|| normalize_key(&entry.name));

        match counts.get(&fact_key) {
            Some(person) => {
                matched_keys.insert(fact_key);
                attending.push(AttendingStaff {
                    entry: entry.clone(),
                    sign_in_count: person.sign_in_count,
                    on_time_count: person.on_time_count,
                    late_count: person.late_count,
                    status: config.status(person.sign_in_count)?.to_string(),
                });
            }
            None => {
                never_attended.push(NeverAttended {
                    entry: entry.clone(),
                    status: config.status(0)?.to_string(),
                });
            }
        }
    }

    let unlisted: Vec<String> = counts
        .iter()
        .filter(|(key, _)| !matched_keys.contains(*key))
        .map(|(_, person)| person.display_name.clone())
        .collect();

    debug!(
        attending = attending.len(),
        never_attended = never_attended.len(),
        unlisted = unlisted.len(),
        "roster reconciliation done"
    );

    Ok(RosterReconciliation {
        attending,
        never_attended,
        unlisted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn fact(name: &str, date: &str, sign_in: &str) -> AttendanceFact {
        let config = ScoringConfig::default();
        let time = NaiveTime::parse_from_str(sign_in, "%H:%M").unwrap();
        AttendanceFact::new(name, d(date), Some(time), config.late_threshold)
    }

    fn entry(name: &str) -> RosterEntry {
        RosterEntry {
            name: name.to_string(),
            department: None,
            person_id: None,
        }
    }

    #[test]
    fn partitions_roster_against_facts() {
        let facts = vec![
            fact("Ada", "2024-01-01", "07:00"),
            fact("Bea", "2024-01-01", "07:00"),
        ];
        let roster = vec![entry("Ada"), entry("Bea"), entry("Cleo")];
        let result = reconcile(&facts, &roster, &ScoringConfig::default()).unwrap();

        assert_eq!(result.attending.len(), 2);
        assert_eq!(result.never_attended.len(), 1);
        assert_eq!(result.never_attended[0].entry.name, "Cleo");
        assert_eq!(result.never_attended[0].status, "Non-Attending");
        assert!(result.unlisted.is_empty());
    }

    #[test]
    fn unlisted_names_surface() {
        let facts = vec![
            fact("Ada", "2024-01-01", "07:00"),
            fact("Bea", "2024-01-01", "07:00"),
            fact("Dan", "2024-01-01", "07:00"),
        ];
        let roster = vec![entry("Ada"), entry("Bea")];
        let result = reconcile(&facts, &roster, &ScoringConfig::default()).unwrap();
        assert_eq!(result.unlisted, vec!["Dan".to_string()]);
    }

    #[test]
    fn join_is_case_and_whitespace_insensitive() {
        let facts = vec![fact("  ada LOVELACE ", "2024-01-01", "07:00")];
        let roster = vec![entry("Ada Lovelace")];
        let result = reconcile(&facts, &roster, &ScoringConfig::default()).unwrap();
        assert_eq!(result.attending.len(), 1);
        assert!(result.unlisted.is_empty());
    }

    #[test]
    fn person_id_join_beats_name_mismatch() {
        let config = ScoringConfig::default();
        let fact = AttendanceFact::new(
            "A. Lovelace",
            d("2024-01-01"),
            NaiveTime::from_hms_opt(7, 0, 0),
            config.late_threshold,
        )
        .person_id("E1");
        let roster = vec![RosterEntry {
            name: "Ada Lovelace".to_string(),
            department: None,
            person_id: Some("e1".to_string()),
        }];
        let result = reconcile(&[fact], &roster, &config).unwrap();
        assert_eq!(result.attending.len(), 1);
        assert!(result.unlisted.is_empty());
    }

    #[test]
    fn status_comes_from_the_configured_bands() {
        let facts = vec![
            fact("Ada", "2024-01-01", "07:00"),
            fact("Ada", "2024-01-02", "07:00"),
            fact("Ada", "2024-01-03", "07:00"),
            fact("Bea", "2024-01-01", "09:00"),
        ];
        let roster = vec![entry("Ada"), entry("Bea")];
        let result = reconcile(&facts, &roster, &ScoringConfig::default()).unwrap();
        assert_eq!(result.attending[0].status, "Regular");
        assert_eq!(result.attending[0].sign_in_count, 3);
        assert_eq!(result.attending[1].status, "Occasional");
        assert_eq!(result.attending[1].late_count, 1);
    }

    #[test]
    fn empty_roster_marks_everyone_unlisted() {
        let facts = vec![fact("Ada", "2024-01-01", "07:00")];
        let result = reconcile(&facts, &[], &ScoringConfig::default()).unwrap();
        assert!(result.attending.is_empty());
        assert!(result.never_attended.is_empty());
        assert_eq!(result.unlisted, vec!["Ada".to_string()]);
    }
}
