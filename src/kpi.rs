// src/kpi.rs
//
// Session-level summary numbers over the full fact table. Everything is
// division-guarded: empty input produces a zeroed snapshot, never an
// error. "Today" is always an explicit parameter so the same batch always
// yields the same snapshot.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::Serialize;

use crate::attendance::{normalize_key, AttendanceFact};
use crate::leaderboard::name_key;
use crate::roster::RosterEntry;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiSnapshot {
    /// Distinct persons with at least one recorded sign-in.
    pub total_staff: u32,
    pub present_today: u32,
    /// Roster size minus present when a roster exists, otherwise
    /// total_staff minus present. Floored at zero.
    pub absent_today: u32,
    pub avg_sign_ins_per_staff: f64,
    pub on_time_rate: f64,
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    /// Inclusive day span of the date range; 0 with no facts.
    pub days_covered: i64,
}

pub fn compute_kpis(
    facts: &[AttendanceFact],
    today: NaiveDate,
    roster: Option<&[RosterEntry]>,
) -> KpiSnapshot {
    let scoreable: Vec<&AttendanceFact> = facts.iter().filter(|f| f.is_scoreable()).collect();

    let staff: HashSet<String> = scoreable.iter().map(|f| name_key(f)).collect();
    let total_staff = staff.len() as u32;

    let present_today = scoreable
        .iter()
        .filter(|f| f.date == today)
        .map(|f| name_key(f))
        .collect::<HashSet<String>>()
        .len() as u32;

    let expected = match roster {
        Some(entries) => {
            // Distinct roster names, in case the roster itself repeats one.
            entries
                .iter()
                .map(|e| normalize_key(&e.name))
                .collect::<HashSet<String>>()
                .len() as u32
        }
        None => total_staff,
    };
    let absent_today = expected.saturating_sub(present_today);

    let total_sign_ins = scoreable.len() as u32;
    let total_on_time = scoreable.iter().filter(|f| f.on_time).count() as u32;

    let avg_sign_ins_per_staff = if total_staff == 0 {
        0.0
    } else {
        f64::from(total_sign_ins) / f64::from(total_staff)
    };
    let on_time_rate = if total_sign_ins == 0 {
        0.0
    } else {
        f64::from(total_on_time) / f64::from(total_sign_ins)
    };

    // Date coverage counts every valid fact, recorded sign-in or not.
    let min_date = facts.iter().map(|f| f.date).min();
    let max_date = facts.iter().map(|f| f.date).max();
    let date_range = min_date.zip(max_date);
    let days_covered = date_range.map_or(0, |(min, max)| (max - min).num_days() + 1);

    KpiSnapshot {
        total_staff,
        present_today,
        absent_today,
        avg_sign_ins_per_staff,
        on_time_rate,
        date_range,
        days_covered,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::ScoringConfig;
    use chrono::NaiveTime;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn fact(name: &str, date: &str, sign_in: &str) -> AttendanceFact {
        let config = ScoringConfig::default();
        let time = NaiveTime::parse_from_str(sign_in, "%H:%M").unwrap();
        AttendanceFact::new(name, d(date), Some(time), config.late_threshold)
    }

    fn roster(names: &[&str]) -> Vec<RosterEntry> {
        names
            .iter()
            .map(|name| RosterEntry {
                name: name.to_string(),
                department: None,
                person_id: None,
            })
            .collect()
    }

    #[test]
    fn counts_and_rates_over_a_small_batch() {
        let facts = vec![
            fact("Ada", "2024-01-01", "07:00"),
            fact("Ada", "2024-01-02", "09:00"),
            fact("Bea", "2024-01-02", "07:00"),
        ];
        let kpis = compute_kpis(&facts, d("2024-01-02"), None);
        assert_eq!(kpis.total_staff, 2);
        assert_eq!(kpis.present_today, 2);
        assert_eq!(kpis.absent_today, 0);
        assert!((kpis.avg_sign_ins_per_staff - 1.5).abs() < 1e-9);
        assert!((kpis.on_time_rate - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn inclusive_day_span() {
        let facts = vec![
            fact("Ada", "2024-01-01", "07:00"),
            fact("Ada", "2024-01-10", "07:00"),
        ];
        let kpis = compute_kpis(&facts, d("2024-01-10"), None);
        assert_eq!(kpis.date_range, Some((d("2024-01-01"), d("2024-01-10"))));
        assert_eq!(kpis.days_covered, 10);
    }

    #[test]
    fn absent_today_uses_roster_size_when_present() {
        let facts = vec![fact("Ada", "2024-01-02", "07:00")];
        let staff = roster(&["Ada", "Bea", "Cleo"]);
        let kpis = compute_kpis(&facts, d("2024-01-02"), Some(&staff));
        assert_eq!(kpis.present_today, 1);
        assert_eq!(kpis.absent_today, 2);
    }

    #[test]
    fn absent_today_never_goes_negative() {
        // Unlisted attendee outnumbers the roster.
        let facts = vec![
            fact("Ada", "2024-01-02", "07:00"),
            fact("Dan", "2024-01-02", "07:00"),
        ];
        let staff = roster(&["Ada"]);
        let kpis = compute_kpis(&facts, d("2024-01-02"), Some(&staff));
        assert_eq!(kpis.absent_today, 0);
    }

    #[test]
    fn empty_batch_yields_zeroed_snapshot() {
        let kpis = compute_kpis(&[], d("2024-01-01"), None);
        assert_eq!(kpis.total_staff, 0);
        assert_eq!(kpis.present_today, 0);
        assert_eq!(kpis.absent_today, 0);
        assert_eq!(kpis.avg_sign_ins_per_staff, 0.0);
        assert_eq!(kpis.on_time_rate, 0.0);
        assert_eq!(kpis.date_range, None);
        assert_eq!(kpis.days_covered, 0);
    }
}
