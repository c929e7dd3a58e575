use crate::analyzer::chart::{ChartDataset, Granularity, build_chart_dataset};
use crate::analyzer::clock::{day_window, format_clock, local_datetime};
use crate::analyzer::session::{SessionKind, SessionRecord};
use crate::analyzer::{Dashboard, build_dashboard, round_half_up};
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DayTotals {
    pub work_sessions: u32,
    pub work_minutes: u64,
    pub break_minutes: u64,
    pub skipped_sessions: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyReport {
    pub date: String,
    pub generated_at: String,
    pub as_of: i64,
    pub day: DayTotals,
    pub dashboard: Dashboard,
    pub timeline: ChartDataset,
}

#[derive(Debug)]
pub struct SavedReport {
    pub markdown_path: PathBuf,
    pub json_path: PathBuf,
}

/// The instant a report for `date` is computed at: `now` for the current
/// day, the last millisecond of the day otherwise.
pub fn report_instant<Tz: TimeZone>(now: &DateTime<Tz>, date: NaiveDate) -> DateTime<Tz> {
    if date == now.date_naive() {
        return now.clone();
    }

    let tz = now.timezone();
    local_datetime(&tz, day_window(&tz, date).end_ms - 1).unwrap_or_else(|| now.clone())
}

pub fn build_daily_report<Tz>(
    sessions: &[SessionRecord],
    date: NaiveDate,
    now: &DateTime<Tz>,
) -> DailyReport
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let window = day_window(&now.timezone(), date);
    let day = sessions
        .iter()
        .filter(|session| session.is_valid() && window.contains(session.start))
        .fold((DayTotals::default(), 0.0, 0.0), |(mut totals, work, rest), session| {
            if session.skipped {
                totals.skipped_sessions += 1;
                return (totals, work, rest);
            }

            match session.kind {
                SessionKind::Work => {
                    totals.work_sessions += 1;
                    (totals, work + session.duration_minutes(), rest)
                }
                SessionKind::ShortBreak | SessionKind::LongBreak => {
                    (totals, work, rest + session.duration_minutes())
                }
            }
        });
    let (mut totals, work_minutes, break_minutes) = day;
    totals.work_minutes = round_half_up(work_minutes).max(0) as u64;
    totals.break_minutes = round_half_up(break_minutes).max(0) as u64;

    DailyReport {
        date: date.format("%Y-%m-%d").to_string(),
        generated_at: Utc::now().to_rfc3339(),
        as_of: now.timestamp_millis(),
        day: totals,
        dashboard: build_dashboard(sessions, now),
        timeline: build_chart_dataset(sessions, Granularity::Daily, now),
    }
}

pub fn render_markdown(report: &DailyReport) -> String {
    let stats = &report.dashboard.stats;

    let timeline_rows = if report.timeline.bars().is_empty() {
        "- No sessions recorded".to_string()
    } else {
        report
            .timeline
            .bars()
            .iter()
            .map(|bar| format!("- {}", bar.tooltip))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let hour_rows = if report.dashboard.productive_hours.is_empty() {
        "- No data".to_string()
    } else {
        report
            .dashboard
            .productive_hours
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                format!(
                    "{}. {}:00 - {}",
                    index + 1,
                    entry.hour,
                    format_minutes(round_half_up(entry.minutes).max(0) as u64)
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    let insight_rows = report
        .dashboard
        .insights
        .iter()
        .map(|entry| format!("- {entry}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "# Daily Pomodoro Report - {}\n\n## Day\n- Pomodoros: {}\n- Focus time: {}\n- Break time: {}\n- Skipped: {}\n\n## Overview\n| Metric | Value |\n|--------|-------|\n| Today | {} |\n| Rolling week | {} |\n| Month | {} |\n| Month focus time | {} |\n| Average session | {} |\n| Completion rate | {}% |\n| Streak | {} days |\n| Focus score | {} |\n| Week over week | {} |\n| Best day | {} |\n\n## Most Productive Hours\n{}\n\n## Timeline\n{}\n\n## Insights\n{}\n",
        report.date,
        report.day.work_sessions,
        format_minutes(report.day.work_minutes),
        format_minutes(report.day.break_minutes),
        report.day.skipped_sessions,
        stats.today_work_sessions,
        stats.week_work_sessions,
        stats.month_work_sessions,
        format_minutes(stats.total_minutes),
        format_minutes(stats.avg_session_minutes),
        stats.completion_rate,
        stats.streak,
        stats.focus_score,
        report.dashboard.week_over_week_label,
        report.dashboard.best_day,
        hour_rows,
        timeline_rows,
        insight_rows
    )
}

pub fn save_report_files(report: &DailyReport, report_dir: &Path) -> Result<SavedReport> {
    fs::create_dir_all(report_dir).with_context(|| {
        format!(
            "Failed to create report directory: {}",
            report_dir.display()
        )
    })?;

    let date = report.date.clone();
    let markdown_path = report_dir.join(format!("{date}.md"));
    let json_path = report_dir.join(format!("{date}.json"));

    fs::write(&markdown_path, render_markdown(report)).with_context(|| {
        format!(
            "Failed to write Markdown report: {}",
            markdown_path.display()
        )
    })?;

    let json_content =
        serde_json::to_string_pretty(report).context("Failed to serialize report JSON")?;
    fs::write(&json_path, json_content)
        .with_context(|| format!("Failed to write JSON report: {}", json_path.display()))?;

    Ok(SavedReport {
        markdown_path,
        json_path,
    })
}

/// Clock label of an instant for report headers and CLI output.
pub fn describe_instant<Tz>(tz: &Tz, timestamp_ms: Option<i64>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    timestamp_ms
        .map(|value| format_clock(tz, value, "%Y-%m-%d %H:%M"))
        .unwrap_or_else(|| "never".to_string())
}

pub fn format_minutes(minutes: u64) -> String {
    let hours = minutes / 60;
    let remain_minutes = minutes % 60;

    if hours > 0 {
        if remain_minutes == 0 {
            format!("{hours}h")
        } else {
            format!("{hours}h {remain_minutes}m")
        }
    } else {
        format!("{remain_minutes}m")
    }
}
