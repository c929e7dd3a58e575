use crate::analyzer::clock::local_date;
use crate::analyzer::session::SessionRecord;
use chrono::{DateTime, TimeZone};
use std::collections::HashSet;

/// Upper bound on days walked back, independent of the data.
const MAX_STREAK_DAYS: u32 = 366;

/// Consecutive local days, ending today, that hold at least one productive
/// work session. A day without sessions yet (including today) ends the streak.
pub fn compute_streak<Tz: TimeZone>(sessions: &[SessionRecord], now: &DateTime<Tz>) -> u32 {
    let tz = now.timezone();
    let active_days = sessions
        .iter()
        .filter(|session| session.is_productive_work())
        .filter_map(|session| local_date(&tz, session.start))
        .collect::<HashSet<_>>();

    if active_days.is_empty() {
        return 0;
    }

    let mut streak = 0;
    let mut day = now.date_naive();

    while streak < MAX_STREAK_DAYS && active_days.contains(&day) {
        streak += 1;
        match day.pred_opt() {
            Some(previous) => day = previous,
            None => break,
        }
    }

    streak
}

#[cfg(test)]
mod tests {
    use super::compute_streak;
    use crate::analyzer::clock::{DAY_MS, MINUTE_MS};
    use crate::analyzer::session::{SessionKind, SessionRecord};
    use chrono::{TimeZone, Utc};

    fn work_at(start: i64) -> SessionRecord {
        SessionRecord::completed(SessionKind::Work, start, start + 25 * MINUTE_MS)
    }

    #[test]
    fn counts_every_consecutive_day_exactly() {
        let now = Utc.with_ymd_and_hms(2026, 2, 18, 20, 0, 0).unwrap();
        let morning = Utc
            .with_ymd_and_hms(2026, 2, 18, 9, 0, 0)
            .unwrap()
            .timestamp_millis();

        for days in 1..=10_i64 {
            let sessions = (0..days)
                .map(|offset| work_at(morning - offset * DAY_MS))
                .collect::<Vec<_>>();
            assert_eq!(compute_streak(&sessions, &now), days as u32);
        }
    }

    #[test]
    fn empty_today_breaks_the_streak() {
        let now = Utc.with_ymd_and_hms(2026, 2, 18, 8, 0, 0).unwrap();
        let yesterday = Utc
            .with_ymd_and_hms(2026, 2, 17, 9, 0, 0)
            .unwrap()
            .timestamp_millis();

        assert_eq!(compute_streak(&[work_at(yesterday)], &now), 0);
    }

    #[test]
    fn skipped_and_break_sessions_do_not_count() {
        let now = Utc.with_ymd_and_hms(2026, 2, 18, 20, 0, 0).unwrap();
        let today = Utc
            .with_ymd_and_hms(2026, 2, 18, 9, 0, 0)
            .unwrap()
            .timestamp_millis();
        let sessions = vec![
            SessionRecord {
                kind: SessionKind::Work,
                start: today,
                end: today + MINUTE_MS,
                completed: false,
                skipped: true,
            },
            SessionRecord::completed(SessionKind::LongBreak, today, today + 15 * MINUTE_MS),
        ];

        assert_eq!(compute_streak(&sessions, &now), 0);
    }

    #[test]
    fn walk_is_capped() {
        let now = Utc.with_ymd_and_hms(2026, 2, 18, 20, 0, 0).unwrap();
        let morning = Utc
            .with_ymd_and_hms(2026, 2, 18, 9, 0, 0)
            .unwrap()
            .timestamp_millis();
        let sessions = (0..400_i64)
            .map(|offset| work_at(morning - offset * DAY_MS))
            .collect::<Vec<_>>();

        assert_eq!(compute_streak(&sessions, &now), 366);
    }
}
