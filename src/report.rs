// src/report.rs
//
// Rendering and export. The engine hands over plain structures; this
// module turns them into aligned text tables, one JSON document, or CSV
// files. Nothing here feeds back into the computation.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::kpi::KpiSnapshot;
use crate::leaderboard::PersonAggregate;
use crate::rollup::{PeriodRollup, WeekdayRollup};
use crate::roster::RosterReconciliation;

/// Explicit marker for an empty badge set, so the column never reads as
/// accidentally blank.
const NONE_MARKER: &str = "—";

/// Everything one invocation produces, in output order.
#[derive(Debug, Serialize)]
pub struct SessionReport {
    pub kpis: KpiSnapshot,
    pub leaderboard: Vec<PersonAggregate>,
    pub rollups: Vec<PeriodRollup>,
    pub weekday_overview: Vec<WeekdayRollup>,
    pub reconciliation: Option<RosterReconciliation>,
}

fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let render_row = |cells: &[String]| -> String {
        cells
            .iter()
            .enumerate()
            .map(|(i, cell)| format!("{:<width$}", cell, width = widths[i]))
            .collect::<Vec<String>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let header_cells: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    let mut out = render_row(&header_cells);
    out.push('\n');
    out.push_str(
        &widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<String>>()
            .join("  "),
    );
    for row in rows {
        out.push('\n');
        out.push_str(&render_row(row));
    }
    out.push('\n');
    out
}

fn percent(rate: f64) -> String {
    format!("{:.1}%", rate * 100.0)
}

fn badges_cell(badges: &[String]) -> String {
    if badges.is_empty() {
        NONE_MARKER.to_string()
    } else {
        badges.join(", ")
    }
}

pub fn render_leaderboard(rows: &[PersonAggregate]) -> String {
    if rows.is_empty() {
        return "Leaderboard\n(no scoreable sign-ins)\n".to_string();
    }
    let table_rows: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            vec![
                row.rank.to_string(),
                row.name.clone(),
                row.department.clone().unwrap_or_default(),
                row.points.to_string(),
                row.on_time_count.to_string(),
                row.late_count.to_string(),
                row.max_on_time_streak.to_string(),
                row.level.clone(),
                badges_cell(&row.badges),
            ]
        })
        .collect();
    format!(
        "Leaderboard\n{}",
        render_table(
            &["Rank", "Name", "Department", "Points", "On-Time", "Late", "Streak", "Level", "Badges"],
            &table_rows,
        )
    )
}

pub fn render_rollups(rollups: &[PeriodRollup]) -> String {
    if rollups.is_empty() {
        return "Period rollup\n(no periods)\n".to_string();
    }
    let table_rows: Vec<Vec<String>> = rollups
        .iter()
        .map(|r| {
            let winner = r
                .winner
                .as_ref()
                .map(|w| format!("{} ({} pts)", w.name, w.points))
                .unwrap_or_else(|| NONE_MARKER.to_string());
            vec![
                r.period_label.clone(),
                r.unique_staff_count.to_string(),
                r.total_sign_ins.to_string(),
                r.on_time_count.to_string(),
                r.late_count.to_string(),
                percent(r.on_time_rate),
                percent(r.attendance_rate),
                winner,
            ]
        })
        .collect();
    format!(
        "Period rollup\n{}",
        render_table(
            &["Period", "Staff", "Sign-Ins", "On-Time", "Late", "On-Time %", "Attendance %", "Winner"],
            &table_rows,
        )
    )
}

pub fn render_weekday_overview(rows: &[WeekdayRollup]) -> String {
    if rows.is_empty() {
        return "Attendance by day\n(no sign-ins)\n".to_string();
    }
    let table_rows: Vec<Vec<String>> = rows
        .iter()
        .map(|r| vec![r.weekday.clone(), r.on_time.to_string(), r.late.to_string()])
        .collect();
    format!(
        "Attendance by day\n{}",
        render_table(&["Day", "On-Time", "Late"], &table_rows)
    )
}

pub fn render_kpis(kpis: &KpiSnapshot) -> String {
    let range = kpis
        .date_range
        .map(|(min, max)| format!("{min} to {max}"))
        .unwrap_or_else(|| NONE_MARKER.to_string());
    format!(
        "KPIs\n\
         Total staff:          {}\n\
         Present today:        {}\n\
         Absent today:         {}\n\
         Avg sign-ins/staff:   {:.2}\n\
         On-time rate:         {}\n\
         Date range:           {}\n\
         Days covered:         {}\n",
        kpis.total_staff,
        kpis.present_today,
        kpis.absent_today,
        kpis.avg_sign_ins_per_staff,
        percent(kpis.on_time_rate),
        range,
        kpis.days_covered,
    )
}

pub fn render_reconciliation(reconciliation: &RosterReconciliation) -> String {
    let mut out = String::from("Roster reconciliation\n");

    if reconciliation.attending.is_empty() {
        out.push_str("Attending: (none)\n");
    } else {
        let rows: Vec<Vec<String>> = reconciliation
            .attending
            .iter()
            .map(|a| {
                vec![
                    a.entry.name.clone(),
                    a.entry.department.clone().unwrap_or_default(),
                    a.sign_in_count.to_string(),
                    a.on_time_count.to_string(),
                    a.late_count.to_string(),
                    a.status.clone(),
                ]
            })
            .collect();
        out.push_str(&render_table(
            &["Name", "Department", "Sign-Ins", "On-Time", "Late", "Status"],
            &rows,
        ));
    }

    out.push('\n');
    if reconciliation.never_attended.is_empty() {
        out.push_str("Never attended: (none)\n");
    } else {
        let rows: Vec<Vec<String>> = reconciliation
            .never_attended
            .iter()
            .map(|n| {
                vec![
                    n.entry.name.clone(),
                    n.entry.department.clone().unwrap_or_default(),
                    n.status.clone(),
                ]
            })
            .collect();
        out.push_str("Never attended\n");
        out.push_str(&render_table(&["Name", "Department", "Status"], &rows));
    }

    out.push('\n');
    if reconciliation.unlisted.is_empty() {
        out.push_str("Unlisted: (none)\n");
    } else {
        out.push_str(&format!(
            "Unlisted (possibly new staff): {}\n",
            reconciliation.unlisted.join(", ")
        ));
    }
    out
}

pub fn render_text(report: &SessionReport) -> String {
    let mut out = String::new();
    out.push_str(&render_kpis(&report.kpis));
    out.push('\n');
    out.push_str(&render_leaderboard(&report.leaderboard));
    out.push('\n');
    out.push_str(&render_rollups(&report.rollups));
    out.push('\n');
    out.push_str(&render_weekday_overview(&report.weekday_overview));
    if let Some(reconciliation) = &report.reconciliation {
        out.push('\n');
        out.push_str(&render_reconciliation(reconciliation));
    }
    out
}

pub fn render_json(report: &SessionReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("serializing session report to JSON")
}

/// Writes each report section as its own CSV file under `dir`.
pub fn write_csv_reports(dir: &Path, report: &SessionReport) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("creating output directory {}", dir.display()))?;

    let leaderboard_path = dir.join("leaderboard.csv");
    let mut writer = csv::Writer::from_path(&leaderboard_path)
        .with_context(|| format!("creating {}", leaderboard_path.display()))?;
    writer.write_record([
        "rank", "name", "department", "points", "sign_ins", "on_time", "late", "streak", "level",
        "badges",
    ])?;
    for row in &report.leaderboard {
        writer.write_record([
            row.rank.to_string(),
            row.name.clone(),
            row.department.clone().unwrap_or_default(),
            row.points.to_string(),
            row.sign_in_count.to_string(),
            row.on_time_count.to_string(),
            row.late_count.to_string(),
            row.max_on_time_streak.to_string(),
            row.level.clone(),
            row.badges.join("; "),
        ])?;
    }
    writer.flush()?;

    let rollups_path = dir.join("period_rollups.csv");
    let mut writer = csv::Writer::from_path(&rollups_path)
        .with_context(|| format!("creating {}", rollups_path.display()))?;
    writer.write_record([
        "period",
        "unique_staff",
        "total_sign_ins",
        "on_time",
        "late",
        "on_time_rate",
        "attendance_rate",
        "winner",
    ])?;
    for r in &report.rollups {
        writer.write_record([
            r.period_label.clone(),
            r.unique_staff_count.to_string(),
            r.total_sign_ins.to_string(),
            r.on_time_count.to_string(),
            r.late_count.to_string(),
            format!("{:.4}", r.on_time_rate),
            format!("{:.4}", r.attendance_rate),
            r.winner.as_ref().map(|w| w.name.clone()).unwrap_or_default(),
        ])?;
    }
    writer.flush()?;

    if let Some(reconciliation) = &report.reconciliation {
        let roster_path = dir.join("roster_reconciliation.csv");
        let mut writer = csv::Writer::from_path(&roster_path)
            .with_context(|| format!("creating {}", roster_path.display()))?;
        writer.write_record([
            "category", "name", "department", "sign_ins", "on_time", "late", "status",
        ])?;
        for a in &reconciliation.attending {
            writer.write_record([
                "attending".to_string(),
                a.entry.name.clone(),
                a.entry.department.clone().unwrap_or_default(),
                a.sign_in_count.to_string(),
                a.on_time_count.to_string(),
                a.late_count.to_string(),
                a.status.clone(),
            ])?;
        }
        for n in &reconciliation.never_attended {
            writer.write_record([
                "never_attended".to_string(),
                n.entry.name.clone(),
                n.entry.department.clone().unwrap_or_default(),
                String::new(),
                String::new(),
                String::new(),
                n.status.clone(),
            ])?;
        }
        for name in &reconciliation.unlisted {
            writer.write_record([
                "unlisted".to_string(),
                name.clone(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
            ])?;
        }
        writer.flush()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row(rank: u32, name: &str, points: u32, badges: Vec<String>) -> PersonAggregate {
        PersonAggregate {
            name: name.to_string(),
            department: None,
            sign_in_count: 5,
            on_time_count: 4,
            late_count: 1,
            points,
            level: "Bronze".to_string(),
            badges,
            max_on_time_streak: 3,
            rank,
        }
    }

    #[test]
    fn empty_badge_set_renders_explicit_marker() {
        let rows = vec![sample_row(1, "Ada", 42, Vec::new())];
        let text = render_leaderboard(&rows);
        assert!(text.contains(NONE_MARKER), "missing none marker in: {text}");
    }

    #[test]
    fn leaderboard_columns_align() {
        let rows = vec![
            sample_row(1, "Ada Lovelace", 420, vec!["Punctuality Champ".to_string()]),
            sample_row(2, "Bea", 41, Vec::new()),
        ];
        let text = render_leaderboard(&rows);
        assert!(text.contains("Rank"));
        assert!(text.contains("Ada Lovelace"));
        // Two rows plus title, header and separator.
        assert_eq!(text.trim_end().lines().count(), 5);
    }

    #[test]
    fn json_report_round_trips_to_value() {
        let report = SessionReport {
            kpis: crate::kpi::compute_kpis(
                &[],
                chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                None,
            ),
            leaderboard: Vec::new(),
            rollups: Vec::new(),
            weekday_overview: Vec::new(),
            reconciliation: None,
        };
        let json = render_json(&report).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["kpis"]["total_staff"], 0);
    }
}
