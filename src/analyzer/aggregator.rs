use crate::analyzer::clock::{TimeWindow, local_date, month_window, rolling_week, today_window};
use crate::analyzer::session::{SessionKind, SessionRecord};
use crate::analyzer::streak::compute_streak;
use crate::analyzer::trends::focus_score;
use crate::analyzer::{ratio_percent, round_half_up};
use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateStats {
    pub today_work_sessions: u32,
    pub week_work_sessions: u32,
    pub month_work_sessions: u32,
    pub total_minutes: u64,
    pub avg_session_minutes: u64,
    pub completion_rate: u32,
    pub streak: u32,
    pub focus_score: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionBreakdown {
    pub work: u32,
    pub short: u32,
    pub long: u32,
    pub skipped: u32,
    pub work_percent: u32,
    pub short_percent: u32,
    pub long_percent: u32,
    pub skipped_percent: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LogSummary {
    pub total_sessions: u32,
    pub first_session_start: Option<i64>,
    pub last_session_end: Option<i64>,
    pub avg_daily_sessions: f64,
}

pub fn compute_stats<Tz: TimeZone>(sessions: &[SessionRecord], now: &DateTime<Tz>) -> AggregateStats {
    let today = today_window(now);
    let week = rolling_week(now);
    let month = month_window(now);

    let month_work = productive_work_in(sessions, month).collect::<Vec<_>>();
    let total_minutes = round_half_up(
        month_work
            .iter()
            .map(|session| session.duration_minutes())
            .sum::<f64>(),
    )
    .max(0) as u64;
    let avg_session_minutes = if month_work.is_empty() {
        0
    } else {
        round_half_up(total_minutes as f64 / month_work.len() as f64).max(0) as u64
    };

    AggregateStats {
        today_work_sessions: productive_work_in(sessions, today).count() as u32,
        week_work_sessions: productive_work_in(sessions, week).count() as u32,
        month_work_sessions: month_work.len() as u32,
        total_minutes,
        avg_session_minutes,
        completion_rate: completion_rate(sessions),
        streak: compute_streak(sessions, now),
        focus_score: focus_score(sessions, now),
    }
}

/// Share of non-skipped records across the whole log, 0-100. An empty log is
/// a perfect 100.
pub fn completion_rate(sessions: &[SessionRecord]) -> u32 {
    let valid = sessions.iter().filter(|session| session.is_valid());
    let (total, skipped) = valid.fold((0_usize, 0_usize), |(total, skipped), session| {
        (total + 1, skipped + usize::from(session.skipped))
    });

    if total == 0 {
        return 100;
    }

    ratio_percent(total - skipped, total)
}

pub fn productive_work_in(
    sessions: &[SessionRecord],
    window: TimeWindow,
) -> impl Iterator<Item = &SessionRecord> {
    sessions
        .iter()
        .filter(move |session| session.is_productive_work() && window.contains(session.start))
}

pub fn session_breakdown(sessions: &[SessionRecord]) -> SessionBreakdown {
    let valid = sessions
        .iter()
        .filter(|session| session.is_valid())
        .collect::<Vec<_>>();
    let total = valid.len();
    if total == 0 {
        return SessionBreakdown::default();
    }

    let count_kind = |kind: SessionKind| {
        valid
            .iter()
            .filter(|session| session.kind == kind && !session.skipped)
            .count()
    };
    let work = count_kind(SessionKind::Work);
    let short = count_kind(SessionKind::ShortBreak);
    let long = count_kind(SessionKind::LongBreak);
    let skipped = valid.iter().filter(|session| session.skipped).count();

    SessionBreakdown {
        work: work as u32,
        short: short as u32,
        long: long as u32,
        skipped: skipped as u32,
        work_percent: ratio_percent(work, total),
        short_percent: ratio_percent(short, total),
        long_percent: ratio_percent(long, total),
        skipped_percent: ratio_percent(skipped, total),
    }
}

pub fn log_summary<Tz: TimeZone>(sessions: &[SessionRecord], tz: &Tz) -> LogSummary {
    let valid = sessions
        .iter()
        .filter(|session| session.is_valid())
        .collect::<Vec<_>>();
    if valid.is_empty() {
        return LogSummary::default();
    }

    let active_days = valid
        .iter()
        .filter_map(|session| local_date(tz, session.start))
        .collect::<HashSet<_>>()
        .len()
        .max(1);
    let avg_daily_sessions = round_half_up(valid.len() as f64 / active_days as f64 * 10.0) as f64 / 10.0;

    LogSummary {
        total_sessions: valid.len() as u32,
        first_session_start: valid.iter().map(|session| session.start).min(),
        last_session_end: valid.iter().map(|session| session.end).max(),
        avg_daily_sessions,
    }
}
