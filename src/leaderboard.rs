// src/leaderboard.rs
//
// Per-person aggregation and the ranked leaderboard. Grouping uses a
// BTreeMap keyed on the normalized person key so iteration order, and
// therefore tie order after the stable points sort, is deterministic
// across runs.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::attendance::{normalize_key, AttendanceFact};
use crate::scoring::{ConfigError, ScoringConfig};

/// One leaderboard row. Rebuilt from scratch on every run; nothing here
/// outlives a single computation pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonAggregate {
    pub name: String,
    pub department: Option<String>,
    pub sign_in_count: u32,
    pub on_time_count: u32,
    pub late_count: u32,
    pub points: u32,
    pub level: String,
    pub badges: Vec<String>,
    pub max_on_time_streak: u32,
    /// 1-based row position after the points sort. This is the row
    /// number, not a competition rank: two persons with equal points at
    /// positions 2 and 3 get ranks 2 and 3, never both 2.
    pub rank: u32,
}

/// Default person key: the normalized display name.
pub fn name_key(fact: &AttendanceFact) -> String {
    normalize_key(&fact.name)
}

/// Person key preferring a stable id when the fact carries one, for use
/// alongside a roster keyed the same way.
pub fn id_or_name_key(fact: &AttendanceFact) -> String {
    match &fact.person_id {
        Some(id) if !id.trim().is_empty() => normalize_key(id),
        _ => normalize_key(&fact.name),
    }
}

/// Longest run of consecutive on-time facts in date order for one person.
///
/// Calendar gaps do not break a streak; only a late day with a recorded
/// sign-in does, since absences are not emitted as facts. The date sort is
/// stable, so same-day duplicate sign-ins stay in encounter order and each
/// one is evaluated on its own (a duplicated on-time day lengthens the
/// streak by two; see DESIGN.md).
pub fn max_on_time_streak(facts: &[&AttendanceFact]) -> u32 {
    let mut ordered: Vec<&AttendanceFact> =
        facts.iter().filter(|f| f.is_scoreable()).copied().collect();
    ordered.sort_by_key(|f| f.date);

    let mut current = 0u32;
    let mut max = 0u32;
    for fact in ordered {
        if fact.on_time {
            current += 1;
            max = max.max(current);
        } else {
            current = 0;
        }
    }
    max
}

/// Builds the ranked leaderboard for a fact subset.
///
/// Facts without a sign-in are dropped first, which also guarantees every
/// emitted row has `sign_in_count > 0`. An input that is empty after that
/// filter yields an empty leaderboard, not an error.
pub fn build_leaderboard<F>(
    facts: &[AttendanceFact],
    config: &ScoringConfig,
    key_of: F,
) -> Result<Vec<PersonAggregate>, ConfigError>
where
    F: Fn(&AttendanceFact) -> String,
{
    let refs: Vec<&AttendanceFact> = facts.iter().collect();
    leaderboard_from_refs(&refs, config, key_of)
}

pub(crate) fn leaderboard_from_refs<F>(
    facts: &[&AttendanceFact],
    config: &ScoringConfig,
    key_of: F,
) -> Result<Vec<PersonAggregate>, ConfigError>
where
    F: Fn(&AttendanceFact) -> String,
{
    let mut groups: BTreeMap<String, Vec<&AttendanceFact>> = BTreeMap::new();
    for fact in facts.iter().filter(|f| f.is_scoreable()) {
        groups.entry(key_of(fact)).or_default().push(fact);
    }
    if groups.is_empty() {
        debug!("no scoreable facts, leaderboard is empty");
        return Ok(Vec::new());
    }

    let mut rows = Vec::with_capacity(groups.len());
    for person_facts in groups.values() {
        let first = person_facts[0];
        let sign_in_count = person_facts.len() as u32;
        let on_time_count = person_facts.iter().filter(|f| f.on_time).count() as u32;
        let late_count = sign_in_count - on_time_count;
        let points = config.points(on_time_count, late_count);
        let max_streak = max_on_time_streak(person_facts);

        rows.push(PersonAggregate {
            name: first.name.trim().to_string(),
            department: person_facts.iter().find_map(|f| f.department.clone()),
            sign_in_count,
            on_time_count,
            late_count,
            points,
            level: config.level(points)?.to_string(),
            badges: config.assign_badges(
                sign_in_count,
                on_time_count,
                late_count,
                points,
                max_streak,
            ),
            max_on_time_streak: max_streak,
            rank: 0,
        });
    }

    // Stable sort: equal points keep the BTreeMap key order.
    rows.sort_by(|a, b| b.points.cmp(&a.points));
    for (index, row) in rows.iter_mut().enumerate() {
        row.rank = (index + 1) as u32;
    }
    Ok(rows)
}
