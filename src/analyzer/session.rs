use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionKind {
    #[serde(rename = "work")]
    Work,
    #[serde(rename = "short")]
    ShortBreak,
    #[serde(rename = "long")]
    LongBreak,
}

impl SessionKind {
    pub const ALL: [SessionKind; 3] = [
        SessionKind::Work,
        SessionKind::ShortBreak,
        SessionKind::LongBreak,
    ];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "work" | "focus" | "pomodoro" => Some(Self::Work),
            "short" | "short_break" | "shortbreak" => Some(Self::ShortBreak),
            "long" | "long_break" | "longbreak" => Some(Self::LongBreak),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Work => "work",
            Self::ShortBreak => "short",
            Self::LongBreak => "long",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Work => "Work",
            Self::ShortBreak => "Short Break",
            Self::LongBreak => "Long Break",
        }
    }

    /// Row index used by timeline charts (Work on top).
    pub fn row(self) -> usize {
        match self {
            Self::Work => 0,
            Self::ShortBreak => 1,
            Self::LongBreak => 2,
        }
    }
}

/// One logged interval. Timestamps are epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    #[serde(rename = "type")]
    pub kind: SessionKind,
    pub start: i64,
    pub end: i64,
    #[serde(default = "default_completed")]
    pub completed: bool,
    #[serde(default)]
    pub skipped: bool,
}

fn default_completed() -> bool {
    true
}

impl SessionRecord {
    pub fn completed(kind: SessionKind, start: i64, end: i64) -> Self {
        Self {
            kind,
            start,
            end,
            completed: true,
            skipped: false,
        }
    }

    /// Splits a session abandoned at `skipped_at` into the elapsed part and
    /// the synthetic remainder. `first.end == second.start` and the two spans
    /// always add up to `planned_ms`.
    pub fn split_skip(
        kind: SessionKind,
        start: i64,
        planned_ms: i64,
        skipped_at: i64,
    ) -> [SessionRecord; 2] {
        let planned_end = start + planned_ms.max(0);
        let boundary = skipped_at.clamp(start, planned_end);

        [
            SessionRecord::completed(kind, start, boundary),
            SessionRecord {
                kind,
                start: boundary,
                end: planned_end,
                completed: false,
                skipped: true,
            },
        ]
    }

    pub fn is_valid(&self) -> bool {
        self.end >= self.start
    }

    pub fn duration_ms(&self) -> i64 {
        self.end.saturating_sub(self.start).max(0)
    }

    pub fn duration_minutes(&self) -> f64 {
        self.duration_ms() as f64 / 60_000.0
    }

    /// Work-kind, not a skip remainder, with a sane span.
    pub fn is_productive_work(&self) -> bool {
        self.kind == SessionKind::Work && !self.skipped && self.is_valid()
    }

    pub fn status_label(&self) -> &'static str {
        if self.skipped {
            "Skipped"
        } else if self.completed {
            "Completed"
        } else {
            "Interrupted"
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LogAnomalies {
    pub accepted: usize,
    pub invalid_span: usize,
    pub unknown_kind: usize,
    pub malformed: usize,
}

impl LogAnomalies {
    pub fn rejected(&self) -> usize {
        self.invalid_span + self.unknown_kind + self.malformed
    }
}

#[derive(Debug, Deserialize)]
struct RawSessionRecord {
    #[serde(rename = "type", alias = "kind")]
    kind: String,
    start: f64,
    end: f64,
    completed: Option<bool>,
    skipped: Option<bool>,
}

/// Drops records with `end < start`, orders by start and reports what was dropped.
pub fn sanitize(records: Vec<SessionRecord>) -> (Vec<SessionRecord>, LogAnomalies) {
    let mut anomalies = LogAnomalies::default();
    let mut kept = records
        .into_iter()
        .filter(|record| {
            let valid = record.is_valid();
            if !valid {
                anomalies.invalid_span += 1;
            }
            valid
        })
        .collect::<Vec<_>>();
    kept.sort_by_key(|record| record.start);
    anomalies.accepted = kept.len();

    if anomalies.invalid_span > 0 {
        warn!(
            invalid_span = anomalies.invalid_span,
            "dropped session records ending before they start"
        );
    }

    (kept, anomalies)
}

/// Rounds a JSON timestamp to whole milliseconds, rejecting values outside
/// the range a calendar date can be derived from.
fn representable_ms(raw: f64) -> Option<i64> {
    if !raw.is_finite() {
        return None;
    }

    let millis = raw.round() as i64;
    DateTime::from_timestamp_millis(millis).map(|_| millis)
}

/// Parses the browser's stored blob: either `{ "sessions": [...] }` or a bare
/// array. Anything else is treated as an empty log.
pub fn parse_session_log(raw: &str) -> (Vec<SessionRecord>, LogAnomalies) {
    let value = match serde_json::from_str::<Value>(raw) {
        Ok(value) => value,
        Err(error) => {
            warn!(error = %error, "session log is not valid JSON. treating as empty");
            return (Vec::new(), LogAnomalies::default());
        }
    };

    let entries = match value {
        Value::Array(entries) => entries,
        Value::Object(mut object) => match object.remove("sessions") {
            Some(Value::Array(entries)) => entries,
            _ => {
                warn!("session log object has no `sessions` array. treating as empty");
                Vec::new()
            }
        },
        _ => {
            warn!("session log is neither an array nor an object. treating as empty");
            Vec::new()
        }
    };

    let mut malformed = 0;
    let mut unknown_kind = 0;
    let records = entries
        .into_iter()
        .filter_map(|entry| {
            let raw = serde_json::from_value::<RawSessionRecord>(entry)
                .map_err(|_| malformed += 1)
                .ok()?;
            let (Some(start), Some(end)) = (representable_ms(raw.start), representable_ms(raw.end))
            else {
                malformed += 1;
                return None;
            };
            let Some(kind) = SessionKind::parse(&raw.kind) else {
                unknown_kind += 1;
                return None;
            };

            Some(SessionRecord {
                kind,
                start,
                end,
                completed: raw.completed.unwrap_or(true),
                skipped: raw.skipped.unwrap_or(false),
            })
        })
        .collect::<Vec<_>>();

    if malformed > 0 || unknown_kind > 0 {
        warn!(malformed, unknown_kind, "skipped unreadable session entries");
    }

    let (records, mut anomalies) = sanitize(records);
    anomalies.malformed = malformed;
    anomalies.unknown_kind = unknown_kind;

    (records, anomalies)
}

#[cfg(test)]
mod tests {
    use super::{SessionKind, SessionRecord, parse_session_log, sanitize};

    const MINUTE: i64 = 60_000;

    #[test]
    fn split_skip_preserves_planned_duration() {
        let start = 1_000_000;
        let [elapsed, remainder] =
            SessionRecord::split_skip(SessionKind::Work, start, 25 * MINUTE, start + 10 * MINUTE);

        assert_eq!(elapsed.end, remainder.start);
        assert_eq!(elapsed.duration_ms() + remainder.duration_ms(), 25 * MINUTE);
        assert!(elapsed.completed && !elapsed.skipped);
        assert!(!remainder.completed && remainder.skipped);
    }

    #[test]
    fn split_skip_clamps_out_of_range_skip_point() {
        let [elapsed, remainder] =
            SessionRecord::split_skip(SessionKind::ShortBreak, 0, 5 * MINUTE, 9 * MINUTE);

        assert_eq!(elapsed.duration_ms(), 5 * MINUTE);
        assert_eq!(remainder.duration_ms(), 0);
    }

    #[test]
    fn parses_browser_blob_with_fractional_timestamps() {
        let raw = r#"{
            "workDuration": 25,
            "sessions": [
                {"type": "work", "start": 1000, "end": 601000.4, "completed": true},
                {"type": "work", "start": 601000.4, "end": 1501000, "completed": false, "skipped": true},
                {"type": "short", "start": 1501000, "end": 1801000}
            ]
        }"#;

        let (records, anomalies) = parse_session_log(raw);

        assert_eq!(records.len(), 3);
        assert_eq!(anomalies.rejected(), 0);
        assert_eq!(records[0].end, 601_000);
        assert!(records[1].skipped);
        assert!(records[2].completed);
        assert_eq!(records[2].kind, SessionKind::ShortBreak);
    }

    #[test]
    fn malformed_input_degrades_to_empty_log() {
        assert!(parse_session_log("null").0.is_empty());
        assert!(parse_session_log("42").0.is_empty());
        assert!(parse_session_log("{\"sessions\": 3}").0.is_empty());
        assert!(parse_session_log("not json").0.is_empty());
    }

    #[test]
    fn counts_unknown_kinds_and_bad_entries() {
        let raw = r#"[
            {"type": "nap", "start": 0, "end": 10},
            {"type": "work", "start": "soon"},
            {"type": "work", "start": 50, "end": 10},
            {"type": "long", "start": 0, "end": 10}
        ]"#;

        let (records, anomalies) = parse_session_log(raw);

        assert_eq!(records.len(), 1);
        assert_eq!(anomalies.unknown_kind, 1);
        assert_eq!(anomalies.malformed, 1);
        assert_eq!(anomalies.invalid_span, 1);
    }

    #[test]
    fn out_of_range_timestamps_are_malformed() {
        let raw = r#"[
            {"type": "work", "start": -1e300, "end": 1e300},
            {"type": "work", "start": 0, "end": 9.3e18},
            {"type": "short", "start": 0, "end": 60000}
        ]"#;

        let (records, anomalies) = parse_session_log(raw);

        assert_eq!(records.len(), 1);
        assert_eq!(anomalies.malformed, 2);
        assert_eq!(records[0].duration_ms(), MINUTE);
    }

    #[test]
    fn duration_saturates_on_extreme_spans() {
        let record = SessionRecord::completed(SessionKind::Work, i64::MIN, i64::MAX);

        assert_eq!(record.duration_ms(), i64::MAX);
    }

    #[test]
    fn sanitize_orders_by_start() {
        let (records, _) = sanitize(vec![
            SessionRecord::completed(SessionKind::Work, 500, 600),
            SessionRecord::completed(SessionKind::ShortBreak, 100, 200),
        ]);

        assert_eq!(records[0].start, 100);
        assert_eq!(records[1].start, 500);
    }
}
