use crate::analyzer::clock::{MINUTE_MS, instant_at};
use crate::analyzer::session::{SessionKind, SessionRecord};
use crate::config::Config;
use anyhow::{Context, Result, bail};
use chrono::{NaiveDate, NaiveTime, TimeZone};

pub fn parse_kind(raw: &str) -> Result<SessionKind> {
    SessionKind::parse(raw)
        .with_context(|| format!("Unsupported session kind: {raw}. Supported: work, short, long"))
}

pub fn parse_clock_time(raw: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .with_context(|| format!("Invalid time format: {raw}. Example: 09:30"))
}

pub fn planned_minutes(config: &Config, kind: SessionKind) -> u32 {
    match kind {
        SessionKind::Work => config.work_minutes,
        SessionKind::ShortBreak => config.short_break_minutes,
        SessionKind::LongBreak => config.long_break_minutes,
    }
    .max(1)
}

/// Records for one manually logged session. A skip yields the elapsed part
/// and the skipped remainder.
pub fn build_log_entry<Tz: TimeZone>(
    tz: &Tz,
    date: NaiveDate,
    time: NaiveTime,
    kind: SessionKind,
    minutes: u32,
    skipped_after: Option<u32>,
) -> Result<Vec<SessionRecord>> {
    if minutes == 0 {
        bail!("Session length must be at least 1 minute");
    }

    let start = instant_at(tz, date.and_time(time));
    let planned_ms = i64::from(minutes) * MINUTE_MS;

    match skipped_after {
        None => Ok(vec![SessionRecord::completed(
            kind,
            start,
            start + planned_ms,
        )]),
        Some(elapsed) if elapsed > minutes => {
            bail!("--skipped-after ({elapsed}) cannot exceed the session length ({minutes})")
        }
        Some(elapsed) => Ok(SessionRecord::split_skip(
            kind,
            start,
            planned_ms,
            start + i64::from(elapsed) * MINUTE_MS,
        )
        .to_vec()),
    }
}

/// One full Pomodoro cycle starting three hours before `now_ms`: work and
/// break alternate `intervals` times and the final break is a long one.
pub fn demo_cycle(config: &Config, now_ms: i64) -> Vec<SessionRecord> {
    let cycles = config.intervals.max(1);
    let work_ms = config.work_ms();
    let short_ms = config.short_break_ms();
    let long_ms = config.long_break_ms();

    let mut cursor = now_ms - 3 * 60 * MINUTE_MS;
    (0..cycles)
        .flat_map(|cycle| {
            let work = SessionRecord::completed(SessionKind::Work, cursor, cursor + work_ms);
            cursor = work.end;

            let (kind, length) = if cycle + 1 == cycles {
                (SessionKind::LongBreak, long_ms)
            } else {
                (SessionKind::ShortBreak, short_ms)
            };
            let rest = SessionRecord::completed(kind, cursor, cursor + length);
            cursor = rest.end;

            [work, rest]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{build_log_entry, demo_cycle, parse_clock_time, parse_kind, planned_minutes};
    use crate::analyzer::clock::MINUTE_MS;
    use crate::analyzer::session::SessionKind;
    use crate::config::Config;
    use chrono::{NaiveDate, TimeZone, Utc};

    #[test]
    fn demo_cycle_ends_with_a_long_break() {
        let config = Config::default();
        let now = Utc
            .with_ymd_and_hms(2026, 2, 18, 12, 0, 0)
            .unwrap()
            .timestamp_millis();

        let sessions = demo_cycle(&config, now);

        assert_eq!(sessions.len(), 8);
        assert_eq!(sessions[0].start, now - 180 * MINUTE_MS);
        assert!(sessions.windows(2).all(|pair| pair[0].end == pair[1].start));
        assert_eq!(sessions[1].kind, SessionKind::ShortBreak);
        assert_eq!(sessions[7].kind, SessionKind::LongBreak);
        assert_eq!(sessions[7].duration_ms(), 15 * MINUTE_MS);
        assert_eq!(sessions[7].end, now - 180 * MINUTE_MS + (4 * 25 + 3 * 5 + 15) * MINUTE_MS);
    }

    #[test]
    fn logged_skip_is_split_at_the_elapsed_minute() {
        let date = NaiveDate::from_ymd_opt(2026, 2, 18).expect("date");
        let time = parse_clock_time("09:00").expect("time");

        let records =
            build_log_entry(&Utc, date, time, SessionKind::Work, 25, Some(10)).expect("entry");

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].duration_ms(), 10 * MINUTE_MS);
        assert!(records[1].skipped);
        assert_eq!(records[0].end, records[1].start);
        assert_eq!(
            records[0].duration_ms() + records[1].duration_ms(),
            25 * MINUTE_MS
        );
    }

    #[test]
    fn invalid_entries_are_rejected() {
        let date = NaiveDate::from_ymd_opt(2026, 2, 18).expect("date");
        let time = parse_clock_time("09:00").expect("time");

        assert!(build_log_entry(&Utc, date, time, SessionKind::Work, 25, Some(30)).is_err());
        assert!(build_log_entry(&Utc, date, time, SessionKind::Work, 0, None).is_err());
        assert!(parse_clock_time("9am").is_err());
        assert!(parse_kind("nap").is_err());
        assert_eq!(parse_kind("Short").ok(), Some(SessionKind::ShortBreak));
        assert_eq!(planned_minutes(&Config::default(), SessionKind::LongBreak), 15);
    }
}
