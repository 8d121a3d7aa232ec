// src/scoring.rs
//
// All scoring knobs live here: point weights, level bands, badge
// thresholds and the roster status bands. Band lists are ordered and must
// cover [0, inf) with no gaps or overlaps; a value that matches no band is
// a configuration error and fails loudly rather than defaulting.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const BADGE_PERFECT_ATTENDANCE: &str = "Perfect Attendance";
pub const BADGE_PUNCTUALITY_CHAMP: &str = "Punctuality Champ";
pub const BADGE_CONSISTENCY_KING: &str = "Consistency King";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no {kind} bands configured")]
    EmptyBands { kind: &'static str },
    #[error("first {kind} band '{label}' must start at 0, starts at {min}")]
    FirstBandNotZero {
        kind: &'static str,
        label: String,
        min: u32,
    },
    #[error("{kind} band '{label}' ends at {max} but '{next_label}' starts at {next_min}")]
    BandsNotContiguous {
        kind: &'static str,
        label: String,
        max: u32,
        next_label: String,
        next_min: u32,
    },
    #[error("{kind} band '{label}' is open-ended but is not the last band")]
    OpenBandNotLast { kind: &'static str, label: String },
    #[error("last {kind} band '{label}' must be open-ended")]
    LastBandClosed { kind: &'static str, label: String },
    #[error("no {kind} band matches value {value}")]
    NoMatchingBand { kind: &'static str, value: u32 },
}

/// One labelled range in an ordered band list. `max` is inclusive;
/// `None` means open-ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Band {
    pub label: String,
    pub min: u32,
    pub max: Option<u32>,
}

impl Band {
    pub fn new(label: &str, min: u32, max: Option<u32>) -> Self {
        Self {
            label: label.to_string(),
            min,
            max,
        }
    }

    fn contains(&self, value: u32) -> bool {
        value >= self.min && self.max.map_or(true, |max| value <= max)
    }
}

/// Checks a band list is ordered, starts at 0, has no gaps or overlaps,
/// and ends open-ended.
pub fn validate_bands(kind: &'static str, bands: &[Band]) -> Result<(), ConfigError> {
    let first = bands.first().ok_or(ConfigError::EmptyBands { kind })?;
    if first.min != 0 {
        return Err(ConfigError::FirstBandNotZero {
            kind,
            label: first.label.clone(),
            min: first.min,
        });
    }
    for pair in bands.windows(2) {
        let (band, next) = (&pair[0], &pair[1]);
        let max = band.max.ok_or_else(|| ConfigError::OpenBandNotLast {
            kind,
            label: band.label.clone(),
        })?;
        if next.min != max + 1 {
            return Err(ConfigError::BandsNotContiguous {
                kind,
                label: band.label.clone(),
                max,
                next_label: next.label.clone(),
                next_min: next.min,
            });
        }
    }
    let last = bands.last().expect("bands checked non-empty");
    if last.max.is_some() {
        return Err(ConfigError::LastBandClosed {
            kind,
            label: last.label.clone(),
        });
    }
    Ok(())
}

/// First-match lookup over an ordered band list.
pub fn band_label<'a>(
    kind: &'static str,
    bands: &'a [Band],
    value: u32,
) -> Result<&'a str, ConfigError> {
    bands
        .iter()
        .find(|band| band.contains(value))
        .map(|band| band.label.as_str())
        .ok_or(ConfigError::NoMatchingBand { kind, value })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BadgeThresholds {
    /// Minimum longest on-time streak for the streak badge.
    pub streak_min: u32,
    /// Minimum on-time share of sign-ins for "Punctuality Champ".
    pub punctuality_ratio: f64,
    /// Minimum points for "Consistency King".
    pub consistency_min_points: u32,
}

impl Default for BadgeThresholds {
    fn default() -> Self {
        Self {
            streak_min: 5,
            punctuality_ratio: 0.9,
            consistency_min_points: 300,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Sign-in at or before this time counts as on time.
    pub late_threshold: NaiveTime,
    pub points_on_time: u32,
    pub points_late: u32,
    pub level_bands: Vec<Band>,
    pub badge_thresholds: BadgeThresholds,
    /// Roster classification by sign-in count.
    pub status_bands: Vec<Band>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            late_threshold: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            points_on_time: 10,
            points_late: 2,
            level_bands: vec![
                Band::new("Bronze", 0, Some(99)),
                Band::new("Silver", 100, Some(249)),
                Band::new("Gold", 250, Some(449)),
                Band::new("Platinum", 450, None),
            ],
            badge_thresholds: BadgeThresholds::default(),
            status_bands: vec![
                Band::new("Non-Attending", 0, Some(0)),
                Band::new("Occasional", 1, Some(2)),
                Band::new("Regular", 3, None),
            ],
        }
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_bands("level", &self.level_bands)?;
        validate_bands("status", &self.status_bands)
    }

    pub fn points(&self, on_time_count: u32, late_count: u32) -> u32 {
        on_time_count * self.points_on_time + late_count * self.points_late
    }

    pub fn level(&self, points: u32) -> Result<&str, ConfigError> {
        band_label("level", &self.level_bands, points)
    }

    pub fn status(&self, sign_in_count: u32) -> Result<&str, ConfigError> {
        band_label("status", &self.status_bands, sign_in_count)
    }

    /// Badge rules are independent and cumulative; a person can earn any
    /// subset. The streak is an explicit parameter, never derived here.
    pub fn assign_badges(
        &self,
        sign_in_count: u32,
        on_time_count: u32,
        late_count: u32,
        points: u32,
        max_streak: u32,
    ) -> Vec<String> {
        let mut badges = Vec::new();
        if late_count == 0 {
            badges.push(BADGE_PERFECT_ATTENDANCE.to_string());
        }
        if sign_in_count > 0
            && f64::from(on_time_count) / f64::from(sign_in_count)
                >= self.badge_thresholds.punctuality_ratio
        {
            badges.push(BADGE_PUNCTUALITY_CHAMP.to_string());
        }
        if points >= self.badge_thresholds.consistency_min_points {
            badges.push(BADGE_CONSISTENCY_KING.to_string());
        }
        if max_streak >= self.badge_thresholds.streak_min {
            badges.push(format!("{max_streak}-Day On-Time Streak"));
        }
        badges
    }
}
