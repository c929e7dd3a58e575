use crate::analyzer::aggregator::productive_work_in;
use crate::analyzer::clock::{
    WEEKDAY_NAMES, local_weekday_index, previous_rolling_week, rolling_week,
};
use crate::analyzer::round_half_up;
use crate::analyzer::session::{SessionKind, SessionRecord};
use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekdayProgress {
    pub name: String,
    pub sessions: u32,
    pub percentage: f64,
}

/// Percent change of productive work sessions in `[now-7d, now)` against the
/// seven days before. An empty previous week counts as +100 when anything
/// happened this week.
pub fn week_over_week_change<Tz: TimeZone>(sessions: &[SessionRecord], now: &DateTime<Tz>) -> i64 {
    let current = productive_work_in(sessions, rolling_week(now)).count() as i64;
    let previous = productive_work_in(sessions, previous_rolling_week(now)).count() as i64;

    if previous == 0 {
        return if current > 0 { 100 } else { 0 };
    }

    round_half_up(100.0 * (current - previous) as f64 / previous as f64)
}

pub fn format_signed_percent(change: i64) -> String {
    if change > 0 {
        format!("+{change}")
    } else {
        change.to_string()
    }
}

fn weekday_counts<Tz: TimeZone>(sessions: &[SessionRecord], tz: &Tz) -> [u32; 7] {
    sessions
        .iter()
        .filter(|session| session.is_productive_work())
        .filter_map(|session| local_weekday_index(tz, session.start))
        .fold([0; 7], |mut counts, weekday| {
            counts[weekday] += 1;
            counts
        })
}

/// Index 0 = Sunday. The first weekday holding the maximum wins.
pub fn best_day_of_week<Tz: TimeZone>(sessions: &[SessionRecord], tz: &Tz) -> Option<usize> {
    let counts = weekday_counts(sessions, tz);
    let max = counts.iter().copied().max().unwrap_or_default();
    if max == 0 {
        return None;
    }

    counts.iter().position(|count| *count == max)
}

pub fn best_day_name(index: Option<usize>) -> &'static str {
    index
        .and_then(|value| WEEKDAY_NAMES.get(value).copied())
        .unwrap_or("None")
}

/// Per-weekday work counts with bar heights relative to the busiest weekday,
/// never below 5% so empty days stay visible.
pub fn weekday_progress<Tz: TimeZone>(sessions: &[SessionRecord], tz: &Tz) -> Vec<WeekdayProgress> {
    let counts = weekday_counts(sessions, tz);
    let max = counts.iter().copied().max().unwrap_or_default().max(1);

    counts
        .iter()
        .zip(WEEKDAY_NAMES)
        .map(|(count, name)| WeekdayProgress {
            name: name.to_string(),
            sessions: *count,
            percentage: (f64::from(*count) / f64::from(max) * 100.0).max(5.0),
        })
        .collect()
}

/// 0-100 blend of the last seven days: 70% overall completion, 30% work
/// session consistency.
pub fn focus_score<Tz: TimeZone>(sessions: &[SessionRecord], now: &DateTime<Tz>) -> u32 {
    let window = rolling_week(now);
    let recent = sessions
        .iter()
        .filter(|session| session.is_valid() && window.contains(session.start))
        .collect::<Vec<_>>();

    if recent.is_empty() {
        return 0;
    }

    let completed = recent.iter().filter(|session| !session.skipped).count();
    let work = recent
        .iter()
        .filter(|session| session.kind == SessionKind::Work)
        .collect::<Vec<_>>();
    let completed_work = work.iter().filter(|session| !session.skipped).count();

    let completion_rate = completed as f64 / recent.len() as f64;
    let work_consistency = if work.is_empty() {
        0.0
    } else {
        completed_work as f64 / work.len() as f64
    };

    round_half_up(100.0 * (0.7 * completion_rate + 0.3 * work_consistency)).clamp(0, 100) as u32
}

#[cfg(test)]
mod tests {
    use super::{
        best_day_name, best_day_of_week, focus_score, format_signed_percent,
        week_over_week_change, weekday_progress,
    };
    use crate::analyzer::clock::{DAY_MS, MINUTE_MS};
    use crate::analyzer::session::{SessionKind, SessionRecord};
    use chrono::{TimeZone, Utc};

    fn work_at(start: i64) -> SessionRecord {
        SessionRecord::completed(SessionKind::Work, start, start + 25 * MINUTE_MS)
    }

    #[test]
    fn empty_previous_week_reports_full_growth() {
        let now = Utc.with_ymd_and_hms(2026, 2, 18, 12, 0, 0).unwrap();
        let now_ms = now.timestamp_millis();
        let sessions = (1..=3)
            .map(|offset| work_at(now_ms - offset * DAY_MS))
            .collect::<Vec<_>>();

        let change = week_over_week_change(&sessions, &now);
        assert_eq!(change, 100);
        assert_eq!(format_signed_percent(change), "+100");
        assert_eq!(week_over_week_change(&[], &now), 0);
        assert_eq!(format_signed_percent(0), "0");
    }

    #[test]
    fn change_against_previous_week() {
        let now = Utc.with_ymd_and_hms(2026, 2, 18, 12, 0, 0).unwrap();
        let now_ms = now.timestamp_millis();
        let mut sessions = (8..=11)
            .map(|offset| work_at(now_ms - offset * DAY_MS))
            .collect::<Vec<_>>();
        sessions.push(work_at(now_ms - DAY_MS));

        assert_eq!(week_over_week_change(&sessions, &now), -75);
        assert_eq!(format_signed_percent(-75), "-75");
    }

    #[test]
    fn ties_pick_the_lower_weekday() {
        // 2026-02-16 is a Monday, 2026-02-18 a Wednesday.
        let monday = Utc
            .with_ymd_and_hms(2026, 2, 16, 9, 0, 0)
            .unwrap()
            .timestamp_millis();
        let wednesday = monday + 2 * DAY_MS;
        let sessions = vec![work_at(wednesday), work_at(monday), work_at(wednesday + 1)];
        let tied = vec![work_at(wednesday), work_at(monday)];

        assert_eq!(best_day_name(best_day_of_week(&sessions, &Utc)), "Wed");
        assert_eq!(best_day_of_week(&tied, &Utc), Some(1));
        assert_eq!(best_day_name(best_day_of_week(&[], &Utc)), "None");
    }

    #[test]
    fn weekday_progress_keeps_a_visible_floor() {
        let monday = Utc
            .with_ymd_and_hms(2026, 2, 16, 9, 0, 0)
            .unwrap()
            .timestamp_millis();
        let progress = weekday_progress(&[work_at(monday), work_at(monday + 1)], &Utc);

        assert_eq!(progress.len(), 7);
        assert_eq!(progress[1].sessions, 2);
        assert_eq!(progress[1].percentage, 100.0);
        assert_eq!(progress[0].percentage, 5.0);
    }

    #[test]
    fn focus_score_blends_completion_and_consistency() {
        let now = Utc.with_ymd_and_hms(2026, 2, 18, 12, 0, 0).unwrap();
        let start = now.timestamp_millis() - DAY_MS;
        let mut sessions =
            SessionRecord::split_skip(SessionKind::Work, start, 25 * MINUTE_MS, start + 10 * MINUTE_MS)
                .to_vec();
        sessions.push(SessionRecord::completed(
            SessionKind::ShortBreak,
            start + 25 * MINUTE_MS,
            start + 30 * MINUTE_MS,
        ));

        // completion 2/3, consistency 1/2 -> 0.7*0.667 + 0.3*0.5 = 0.6167
        assert_eq!(focus_score(&sessions, &now), 62);
        assert_eq!(focus_score(&[], &now), 0);
    }

    #[test]
    fn focus_score_ignores_old_sessions() {
        let now = Utc.with_ymd_and_hms(2026, 2, 18, 12, 0, 0).unwrap();
        let old = work_at(now.timestamp_millis() - 8 * DAY_MS);

        assert_eq!(focus_score(&[old], &now), 0);
    }
}
