// src/attendance.rs
use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

/// One normalized sign-in record for one person on one date.
///
/// Facts arrive already parsed: `date` is always real, `sign_in`/`sign_out`
/// are `None` when the source row had no recorded time. A fact without a
/// sign-in never counts toward scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceFact {
    pub person_id: Option<String>,
    pub name: String,
    pub department: Option<String>,
    pub date: NaiveDate,
    pub sign_in: Option<NaiveTime>,
    pub sign_out: Option<NaiveTime>,
    /// Derived at construction: sign-in at or before the late threshold.
    pub on_time: bool,
    /// Period label for weekly grouping. Either supplied by the caller
    /// (one uploaded batch per week) or derived from `date` as an ISO
    /// week label.
    pub week_key: String,
    /// Which uploaded batch this fact came from. Provenance only.
    pub source_label: String,
}

impl AttendanceFact {
    pub fn new(
        name: &str,
        date: NaiveDate,
        sign_in: Option<NaiveTime>,
        late_threshold: NaiveTime,
    ) -> Self {
        Self {
            person_id: None,
            name: name.to_string(),
            department: None,
            date,
            sign_in,
            sign_out: None,
            on_time: sign_in.is_some_and(|t| t <= late_threshold),
            week_key: iso_week_label(date),
            source_label: String::new(),
        }
    }

    pub fn person_id(mut self, id: &str) -> Self {
        self.person_id = Some(id.to_string());
        self
    }

    pub fn department(mut self, dept: &str) -> Self {
        self.department = Some(dept.to_string());
        self
    }

    pub fn sign_out(mut self, t: NaiveTime) -> Self {
        self.sign_out = Some(t);
        self
    }

    pub fn week_label(mut self, label: &str) -> Self {
        self.week_key = label.to_string();
        self
    }

    pub fn source(mut self, label: &str) -> Self {
        self.source_label = label.to_string();
        self
    }

    /// Has a recorded sign-in and therefore participates in scoring.
    pub fn is_scoreable(&self) -> bool {
        self.sign_in.is_some()
    }

    pub fn month_key(&self) -> String {
        month_label(self.date)
    }

    pub fn weekday(&self) -> Weekday {
        self.date.weekday()
    }
}

/// Canonical grouping key: trimmed, uppercased. Display strings keep
/// their original case; only grouping and roster joins use this.
pub fn normalize_key(s: &str) -> String {
    s.trim().to_uppercase()
}

pub fn iso_week_label(date: NaiveDate) -> String {
    let iso = date.iso_week();
    format!("{}-W{:02}", iso.year(), iso.week())
}

pub fn month_label(date: NaiveDate) -> String {
    format!("{}-{:02}", date.year(), date.month())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn threshold() -> NaiveTime {
        NaiveTime::from_hms_opt(8, 0, 0).unwrap()
    }

    #[test]
    fn sign_in_at_threshold_is_on_time() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let fact = AttendanceFact::new("Ada", date, NaiveTime::from_hms_opt(8, 0, 0), threshold());
        assert!(fact.on_time);

        let late = AttendanceFact::new("Ada", date, NaiveTime::from_hms_opt(8, 0, 1), threshold());
        assert!(!late.on_time);
    }

    #[test]
    fn missing_sign_in_is_never_on_time() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let fact = AttendanceFact::new("Ada", date, None, threshold());
        assert!(!fact.on_time);
        assert!(!fact.is_scoreable());
    }

    #[test]
    fn period_labels_derive_from_date() {
        // 2024-01-01 is a Monday in ISO week 1.
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let fact = AttendanceFact::new("Ada", date, NaiveTime::from_hms_opt(7, 30, 0), threshold());
        assert_eq!(fact.week_key, "2024-W01");
        assert_eq!(fact.month_key(), "2024-01");
        assert_eq!(fact.weekday(), Weekday::Mon);
    }

    #[test]
    fn normalize_key_trims_and_uppercases() {
        assert_eq!(normalize_key("  ada lovelace "), "ADA LOVELACE");
        assert_eq!(normalize_key("Ada Lovelace"), normalize_key("ADA LOVELACE"));
    }
}
