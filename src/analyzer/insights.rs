use crate::analyzer::aggregator::AggregateStats;
use crate::analyzer::profile::find_most_productive_hours;
use crate::analyzer::round_half_up;
use crate::analyzer::session::SessionRecord;
use chrono::TimeZone;

/// Rule-based callouts in fixed order: peak hour, streak, completion tier,
/// weekly volume. The streak rule always fires, so the list is never empty.
pub fn generate_insights<Tz: TimeZone>(
    sessions: &[SessionRecord],
    stats: &AggregateStats,
    tz: &Tz,
) -> Vec<String> {
    let peak_hour = find_most_productive_hours(sessions, tz)
        .first()
        .map(|top| {
            format!(
                "Most productive at {}:00 ({} min)",
                top.hour,
                round_half_up(top.minutes)
            )
        });

    let streak = Some(match stats.streak {
        0 => "Start a new streak today!".to_string(),
        1 => "Started a new streak today!".to_string(),
        days => format!("{days} day streak - keep it up!"),
    });

    let completion = if stats.completion_rate >= 90 {
        Some(format!(
            "Excellent completion rate ({}%)",
            stats.completion_rate
        ))
    } else if stats.completion_rate >= 70 {
        Some(format!("Good completion rate ({}%)", stats.completion_rate))
    } else if stats.completion_rate < 50 {
        Some("Try shorter sessions to improve completion rate".to_string())
    } else {
        None
    };

    let weekly_volume = if stats.week_work_sessions >= 20 {
        Some(format!(
            "Great week! {} Pomodoros completed",
            stats.week_work_sessions
        ))
    } else if stats.week_work_sessions >= 10 {
        Some(format!(
            "Solid progress: {} Pomodoros this week",
            stats.week_work_sessions
        ))
    } else {
        None
    };

    [peak_hour, streak, completion, weekly_volume]
        .into_iter()
        .flatten()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::generate_insights;
    use crate::analyzer::aggregator::{AggregateStats, compute_stats};
    use crate::analyzer::clock::MINUTE_MS;
    use crate::analyzer::session::{SessionKind, SessionRecord};
    use chrono::{TimeZone, Utc};

    #[test]
    fn empty_log_still_suggests_a_streak() {
        let now = Utc.with_ymd_and_hms(2026, 2, 18, 12, 0, 0).unwrap();
        let stats = compute_stats(&[], &now);

        let insights = generate_insights(&[], &stats, &Utc);

        assert_eq!(
            insights,
            vec![
                "Start a new streak today!".to_string(),
                "Excellent completion rate (100%)".to_string(),
            ]
        );
    }

    #[test]
    fn rules_keep_their_order() {
        let start = Utc
            .with_ymd_and_hms(2026, 2, 18, 9, 0, 0)
            .unwrap()
            .timestamp_millis();
        let sessions = vec![SessionRecord::completed(
            SessionKind::Work,
            start,
            start + 25 * MINUTE_MS,
        )];
        let stats = AggregateStats {
            streak: 4,
            completion_rate: 40,
            week_work_sessions: 12,
            ..AggregateStats::default()
        };

        let insights = generate_insights(&sessions, &stats, &Utc);

        assert_eq!(
            insights,
            vec![
                "Most productive at 9:00 (25 min)".to_string(),
                "4 day streak - keep it up!".to_string(),
                "Try shorter sessions to improve completion rate".to_string(),
                "Solid progress: 12 Pomodoros this week".to_string(),
            ]
        );
    }

    #[test]
    fn middle_completion_band_is_silent() {
        let stats = AggregateStats {
            streak: 1,
            completion_rate: 60,
            week_work_sessions: 25,
            ..AggregateStats::default()
        };

        let insights = generate_insights(&[], &stats, &Utc);

        assert_eq!(
            insights,
            vec![
                "Started a new streak today!".to_string(),
                "Great week! 25 Pomodoros completed".to_string(),
            ]
        );
    }
}
