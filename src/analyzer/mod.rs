pub mod aggregator;
pub mod chart;
pub mod clock;
pub mod insights;
pub mod profile;
pub mod report;
pub mod session;
pub mod streak;
pub mod trends;

use crate::analyzer::aggregator::{
    AggregateStats, LogSummary, SessionBreakdown, compute_stats, log_summary, session_breakdown,
};
use crate::analyzer::insights::generate_insights;
use crate::analyzer::profile::{
    HOURS_PER_DAY, ProductiveHour, find_most_productive_hours, format_hour, hourly_buckets,
    hourly_intensity, peak_hour,
};
use crate::analyzer::report::{DailyReport, SavedReport};
use crate::analyzer::session::SessionRecord;
use crate::analyzer::trends::{
    WeekdayProgress, best_day_name, best_day_of_week, format_signed_percent,
    week_over_week_change, weekday_progress,
};
use crate::config::Config;
use crate::db::{Database, SessionStore};
use anyhow::Result;
use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use tracing::info;

/// JavaScript-style `Math.round`: halves round towards positive infinity.
pub(crate) fn round_half_up(value: f64) -> i64 {
    if !value.is_finite() {
        return 0;
    }

    (value + 0.5).floor() as i64
}

pub(crate) fn ratio_percent(part: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }

    round_half_up(100.0 * part as f64 / total as f64).clamp(0, 100) as u32
}

/// Every derived view for one snapshot and one `now`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub now: i64,
    pub stats: AggregateStats,
    pub hourly_intensity: [u8; HOURS_PER_DAY],
    pub hourly_minutes: [f64; HOURS_PER_DAY],
    pub productive_hours: Vec<ProductiveHour>,
    pub peak_hour: String,
    pub week_over_week: i64,
    pub week_over_week_label: String,
    pub best_day: String,
    pub weekday_progress: Vec<WeekdayProgress>,
    pub breakdown: SessionBreakdown,
    pub summary: LogSummary,
    pub insights: Vec<String>,
}

pub fn build_dashboard<Tz: TimeZone>(sessions: &[SessionRecord], now: &DateTime<Tz>) -> Dashboard {
    let tz = now.timezone();
    let stats = compute_stats(sessions, now);
    let week_over_week = week_over_week_change(sessions, now);

    Dashboard {
        now: now.timestamp_millis(),
        stats,
        hourly_intensity: hourly_intensity(sessions, &tz),
        hourly_minutes: hourly_buckets(sessions, &tz),
        productive_hours: find_most_productive_hours(sessions, &tz),
        peak_hour: format_hour(peak_hour(sessions, &tz)),
        week_over_week,
        week_over_week_label: format!("{}%", format_signed_percent(week_over_week)),
        best_day: best_day_name(best_day_of_week(sessions, &tz)).to_string(),
        weekday_progress: weekday_progress(sessions, &tz),
        breakdown: session_breakdown(sessions),
        summary: log_summary(sessions, &tz),
        insights: generate_insights(sessions, &stats, &tz),
    }
}

pub fn generate_and_store_report(
    config: &Config,
    date: NaiveDate,
) -> Result<(DailyReport, SavedReport)> {
    let database = Database::open(&config.db_path)?;
    let sessions = database.load_sessions()?;

    let now = report::report_instant(&Local::now(), date);
    let report = report::build_daily_report(&sessions, date, &now);
    let saved = report::save_report_files(&report, &config.report_dir)?;

    database.upsert_report_meta(
        date,
        Utc::now().timestamp(),
        &saved.markdown_path.display().to_string(),
        &saved.json_path.display().to_string(),
    )?;
    info!(date = %report.date, path = %saved.markdown_path.display(), "daily report stored");

    Ok((report, saved))
}
