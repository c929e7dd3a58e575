use crate::analyzer::clock::format_clock;
use crate::analyzer::session::SessionRecord;
use chrono::TimeZone;
use std::fmt;

const HEADER: &str = "date,type,start,end,duration,status";

/// One row per valid record, in log order, with local wall-clock columns.
pub fn export_csv<Tz>(sessions: &[SessionRecord], tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let mut out = String::new();
    out.push_str(HEADER);
    out.push('\n');

    sessions
        .iter()
        .filter(|session| session.is_valid())
        .for_each(|session| {
            let row = [
                format_clock(tz, session.start, "%Y-%m-%d"),
                session.kind.label().to_string(),
                format_clock(tz, session.start, "%H:%M:%S"),
                format_clock(tz, session.end, "%H:%M:%S"),
                format_duration(session.duration_ms()),
                session.status_label().to_string(),
            ]
            .iter()
            .map(|value| csv_escape(value))
            .collect::<Vec<_>>();

            out.push_str(&row.join(","));
            out.push('\n');
        });

    out
}

fn format_duration(duration_ms: i64) -> String {
    let seconds = duration_ms.max(0) / 1000;
    format!("{}m {:02}s", seconds / 60, seconds % 60)
}

fn csv_escape(value: &str) -> String {
    let needs_quote = value.contains([',', '"', '\n', '\r']);
    if !needs_quote {
        return value.to_string();
    }

    format!("\"{}\"", value.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::{csv_escape, export_csv};
    use crate::analyzer::clock::MINUTE_MS;
    use crate::analyzer::session::{SessionKind, SessionRecord};
    use chrono::{TimeZone, Utc};

    #[test]
    fn rows_follow_the_log() {
        let start = Utc
            .with_ymd_and_hms(2026, 2, 18, 9, 0, 0)
            .unwrap()
            .timestamp_millis();
        let mut sessions = SessionRecord::split_skip(
            SessionKind::Work,
            start,
            25 * MINUTE_MS,
            start + 10 * MINUTE_MS + 30_000,
        )
        .to_vec();
        sessions.push(SessionRecord::completed(SessionKind::ShortBreak, start, start - 1));

        let csv = export_csv(&sessions, &Utc);
        let lines = csv.lines().collect::<Vec<_>>();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "date,type,start,end,duration,status");
        assert_eq!(lines[1], "2026-02-18,Work,09:00:00,09:10:30,10m 30s,Completed");
        assert_eq!(lines[2], "2026-02-18,Work,09:10:30,09:25:00,14m 30s,Skipped");
    }

    #[test]
    fn empty_log_keeps_the_header() {
        assert_eq!(export_csv(&[], &Utc), "date,type,start,end,duration,status\n");
    }

    #[test]
    fn escapes_separators_and_quotes() {
        assert_eq!(csv_escape("plain"), "plain");
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
