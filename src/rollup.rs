// src/rollup.rs
//
// Period rollups: facts grouped by week or month label, each period
// summarized and paired with its rank-1 leaderboard row. Period labels
// sort chronologically via a natural comparator, not lexically, so
// "2025-W9" comes before "2025-W10".

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use chrono::Weekday;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::attendance::AttendanceFact;
use crate::leaderboard::{leaderboard_from_refs, name_key, PersonAggregate};
use crate::scoring::{ConfigError, ScoringConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PeriodKind {
    Week,
    Month,
}

impl PeriodKind {
    fn label_of(self, fact: &AttendanceFact) -> String {
        match self {
            PeriodKind::Week => fact.week_key.clone(),
            PeriodKind::Month => fact.month_key(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodRollup {
    pub period_label: String,
    pub unique_staff_count: u32,
    pub total_sign_ins: u32,
    pub on_time_count: u32,
    pub late_count: u32,
    /// on_time / (on_time + late); 0.0 when the period has no sign-ins.
    pub on_time_rate: f64,
    /// Share of all staff seen anywhere in the batch that appeared in
    /// this period; 0.0 when the batch has no staff at all.
    pub attendance_rate: f64,
    /// Rank-1 leaderboard row for the period, if the period leaderboard
    /// is non-empty. Ties fall to the leaderboard's deterministic order.
    pub winner: Option<PersonAggregate>,
}

/// Summarizes each period present in the facts, sorted chronologically.
pub fn build_rollups(
    facts: &[AttendanceFact],
    config: &ScoringConfig,
    kind: PeriodKind,
) -> Result<Vec<PeriodRollup>, ConfigError> {
    let scoreable: Vec<&AttendanceFact> = facts.iter().filter(|f| f.is_scoreable()).collect();

    let all_staff: HashSet<String> = scoreable.iter().map(|f| name_key(f)).collect();

    let mut periods: BTreeMap<String, Vec<&AttendanceFact>> = BTreeMap::new();
    for &fact in &scoreable {
        periods.entry(kind.label_of(fact)).or_default().push(fact);
    }

    let mut rollups = Vec::with_capacity(periods.len());
    for (label, period_facts) in &periods {
        let staff: HashSet<String> = period_facts.iter().map(|f| name_key(f)).collect();
        let total_sign_ins = period_facts.len() as u32;
        let on_time_count = period_facts.iter().filter(|f| f.on_time).count() as u32;
        let late_count = total_sign_ins - on_time_count;

        let leaderboard = leaderboard_from_refs(period_facts, config, name_key)?;

        rollups.push(PeriodRollup {
            period_label: label.clone(),
            unique_staff_count: staff.len() as u32,
            total_sign_ins,
            on_time_count,
            late_count,
            on_time_rate: ratio(on_time_count, total_sign_ins),
            attendance_rate: ratio(staff.len() as u32, all_staff.len() as u32),
            winner: leaderboard.into_iter().next(),
        });
    }

    rollups.sort_by(|a, b| natural_cmp(&a.period_label, &b.period_label));
    Ok(rollups)
}

fn ratio(numerator: u32, denominator: u32) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        f64::from(numerator) / f64::from(denominator)
    }
}

static LABEL_TOKENS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+|\D+").unwrap());

/// Compares labels run by run, with digit runs compared numerically, so
/// "week9" < "week10" and "2025-W9" < "2025-W10". Digit runs sort before
/// text runs at the same position.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = LABEL_TOKENS.find_iter(a);
    let mut right = LABEL_TOKENS.find_iter(b);
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) => {
                let ordering = match (l.as_str().parse::<u64>(), r.as_str().parse::<u64>()) {
                    (Ok(ln), Ok(rn)) => ln.cmp(&rn),
                    (Ok(_), Err(_)) => Ordering::Less,
                    (Err(_), Ok(_)) => Ordering::Greater,
                    (Err(_), Err(_)) => l.as_str().cmp(r.as_str()),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekdayRollup {
    pub weekday: String,
    pub on_time: u32,
    pub late: u32,
}

const WEEKDAY_ORDER: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// On-time/late counts per weekday across the whole batch, Monday first.
/// Weekdays with no sign-ins are omitted.
pub fn weekday_overview(facts: &[AttendanceFact]) -> Vec<WeekdayRollup> {
    WEEKDAY_ORDER
        .iter()
        .filter_map(|&weekday| {
            let day_facts: Vec<&AttendanceFact> = facts
                .iter()
                .filter(|f| f.is_scoreable() && f.weekday() == weekday)
                .collect();
            if day_facts.is_empty() {
                return None;
            }
            let on_time = day_facts.iter().filter(|f| f.on_time).count() as u32;
            Some(WeekdayRollup {
                weekday: weekday_name(weekday).to_string(),
                on_time,
                late: day_facts.len() as u32 - on_time,
            })
        })
        .collect()
}
