use crate::analyzer::clock::{
    MINUTE_MS, TimeWindow, WEEKDAY_NAMES, date_start, days_in_month, first_of_month,
    format_clock, instant_at, local_date, month_window, week_start_date, weekday_index,
};
use crate::analyzer::profile::intensity_levels;
use crate::analyzer::session::{SessionKind, SessionRecord};
use anyhow::{Result, bail};
use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Timelike};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Minimum vertical scale of the weekly stacked bars.
const WEEKLY_SCALE_FLOOR_MINUTES: f64 = 6.0 * 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Granularity {
    Hourly,
    Quarterly,
    HalfDay,
    Daily,
    Weekly,
    Monthly,
}

impl Granularity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hourly => "hourly",
            Self::Quarterly => "quarterly",
            Self::HalfDay => "half-day",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    /// Window length and tick step in minutes for the timeline views.
    fn timeline_layout(self) -> Option<(i64, i64)> {
        match self {
            Self::Hourly => Some((60, 15)),
            Self::Quarterly => Some((360, 60)),
            Self::HalfDay => Some((720, 120)),
            Self::Daily => Some((1440, 240)),
            Self::Weekly | Self::Monthly => None,
        }
    }

    fn window_start_hour(self, hour: u32) -> u32 {
        match self {
            Self::Hourly => hour,
            Self::Quarterly => hour / 6 * 6,
            Self::HalfDay => {
                if hour < 12 {
                    0
                } else {
                    12
                }
            }
            Self::Daily | Self::Weekly | Self::Monthly => 0,
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_lowercase().as_str() {
            "hourly" | "hour" => Ok(Self::Hourly),
            "quarterly" | "quarter" => Ok(Self::Quarterly),
            "half-day" | "half_day" | "halfday" => Ok(Self::HalfDay),
            "daily" | "day" => Ok(Self::Daily),
            "weekly" | "week" => Ok(Self::Weekly),
            "monthly" | "month" => Ok(Self::Monthly),
            _ => bail!(
                "Unsupported granularity: {raw}. Supported: hourly, quarterly, half-day, daily, weekly, monthly"
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BarStyle {
    Work,
    ShortBreak,
    LongBreak,
    Skipped,
}

impl BarStyle {
    pub fn for_session(session: &SessionRecord) -> Self {
        if session.skipped {
            return Self::Skipped;
        }

        match session.kind {
            SessionKind::Work => Self::Work,
            SessionKind::ShortBreak => Self::ShortBreak,
            SessionKind::LongBreak => Self::LongBreak,
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Self::Work => "#e57373",
            Self::ShortBreak => "#65a2ff",
            Self::LongBreak => "#81c784",
            Self::Skipped => "#bdbdbd",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisTick {
    pub label: String,
    pub offset: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineBar {
    pub kind: SessionKind,
    pub row: usize,
    pub start: i64,
    pub end: i64,
    pub left: f64,
    pub width: f64,
    pub style: BarStyle,
    pub color: &'static str,
    pub tooltip: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyColumn {
    pub name: &'static str,
    pub date: NaiveDate,
    pub work_minutes: f64,
    pub short_minutes: f64,
    pub long_minutes: f64,
    pub total_minutes: f64,
    pub work_height: f64,
    pub short_height: f64,
    pub long_height: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarCell {
    pub day: u32,
    pub date: NaiveDate,
    pub minutes: f64,
    pub intensity: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChartBody {
    Timeline {
        rows: Vec<&'static str>,
        bars: Vec<TimelineBar>,
    },
    Weekly {
        scale_minutes: f64,
        days: Vec<WeeklyColumn>,
    },
    Monthly {
        leading_blanks: u32,
        cells: Vec<CalendarCell>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartDataset {
    pub granularity: Granularity,
    pub window: TimeWindow,
    pub ticks: Vec<AxisTick>,
    pub body: ChartBody,
}

impl ChartDataset {
    pub fn bars(&self) -> &[TimelineBar] {
        match &self.body {
            ChartBody::Timeline { bars, .. } => bars,
            _ => &[],
        }
    }
}

pub fn build_chart_dataset<Tz>(
    sessions: &[SessionRecord],
    granularity: Granularity,
    now: &DateTime<Tz>,
) -> ChartDataset
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    match granularity.timeline_layout() {
        Some((length_minutes, step_minutes)) => {
            build_timeline(sessions, granularity, now, length_minutes, step_minutes)
        }
        None if granularity == Granularity::Weekly => build_weekly(sessions, now),
        None => build_monthly(sessions, now),
    }
}

fn build_timeline<Tz>(
    sessions: &[SessionRecord],
    granularity: Granularity,
    now: &DateTime<Tz>,
    length_minutes: i64,
    step_minutes: i64,
) -> ChartDataset
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let tz = now.timezone();
    let start_hour = granularity.window_start_hour(now.hour());
    let window_start = now
        .date_naive()
        .and_hms_opt(start_hour, 0, 0)
        .map(|naive| instant_at(&tz, naive))
        .unwrap_or_else(|| now.timestamp_millis());
    let window = TimeWindow::new(window_start, window_start + length_minutes * MINUTE_MS);
    let length = window.length_ms() as f64;

    let ticks = (0..=length_minutes)
        .step_by(step_minutes as usize)
        .map(|offset| {
            let total = i64::from(start_hour) * 60 + offset;
            AxisTick {
                label: format!("{}:{:02}", total / 60, total % 60),
                offset: offset as f64 / length_minutes as f64,
            }
        })
        .collect();

    let bars = sessions
        .iter()
        .filter(|session| session.is_valid() && overlaps(session, window))
        .map(|session| {
            let clipped_start = session.start.max(window.start_ms);
            let clipped_end = session.end.min(window.end_ms);
            let left = ((clipped_start - window.start_ms) as f64 / length).clamp(0.0, 1.0);
            let width = ((clipped_end - clipped_start) as f64 / length).clamp(0.0, 1.0 - left);
            let style = BarStyle::for_session(session);

            TimelineBar {
                kind: session.kind,
                row: session.kind.row(),
                start: session.start,
                end: session.end,
                left,
                width,
                style,
                color: style.color(),
                tooltip: bar_tooltip(&tz, session),
            }
        })
        .collect();

    ChartDataset {
        granularity,
        window,
        ticks,
        body: ChartBody::Timeline {
            rows: SessionKind::ALL.iter().map(|kind| kind.label()).collect(),
            bars,
        },
    }
}

fn overlaps(session: &SessionRecord, window: TimeWindow) -> bool {
    session.start < window.end_ms
        && (session.end > window.start_ms || session.start >= window.start_ms)
}

fn bar_tooltip<Tz>(tz: &Tz, session: &SessionRecord) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let from = format_clock(tz, session.start, "%H:%M:%S");
    let to = format_clock(tz, session.end, "%H:%M:%S");

    if session.skipped {
        format!(
            "{} skipped: {from} to {to} ({} min unused)",
            session.kind.label(),
            session.duration_minutes().round()
        )
    } else {
        format!("{}: from {from} to {to}", session.kind.label())
    }
}

fn build_weekly<Tz: TimeZone>(sessions: &[SessionRecord], now: &DateTime<Tz>) -> ChartDataset {
    let tz = now.timezone();
    let first_day = week_start_date(now.date_naive());
    let window = TimeWindow::new(
        date_start(&tz, first_day),
        date_start(&tz, first_day + Duration::days(7)),
    );

    let mut minutes = [[0.0_f64; 3]; 7];
    sessions
        .iter()
        .filter(|session| session.is_valid() && !session.skipped && window.contains(session.start))
        .filter_map(|session| {
            local_date(&tz, session.start).map(|date| ((date - first_day).num_days(), session))
        })
        .filter(|(day, _)| (0..7).contains(day))
        .for_each(|(day, session)| {
            minutes[day as usize][session.kind.row()] += session.duration_minutes();
        });

    let max_total = minutes
        .iter()
        .map(|day| day.iter().sum::<f64>())
        .fold(0.0_f64, f64::max);
    let scale_minutes = max_total.max(WEEKLY_SCALE_FLOOR_MINUTES);

    let days = minutes
        .iter()
        .enumerate()
        .map(|(index, [work, short, long])| {
            let date = first_day + Duration::days(index as i64);
            let total = work + short + long;
            WeeklyColumn {
                name: WEEKDAY_NAMES[weekday_index(date.weekday())],
                date,
                work_minutes: *work,
                short_minutes: *short,
                long_minutes: *long,
                total_minutes: total,
                work_height: work / scale_minutes,
                short_height: short / scale_minutes,
                long_height: long / scale_minutes,
                height: total / scale_minutes,
            }
        })
        .collect();

    let ticks = WEEKDAY_NAMES
        .iter()
        .enumerate()
        .map(|(index, name)| AxisTick {
            label: name.to_string(),
            offset: index as f64 / 7.0,
        })
        .collect();

    ChartDataset {
        granularity: Granularity::Weekly,
        window,
        ticks,
        body: ChartBody::Weekly {
            scale_minutes,
            days,
        },
    }
}

fn build_monthly<Tz: TimeZone>(sessions: &[SessionRecord], now: &DateTime<Tz>) -> ChartDataset {
    let tz = now.timezone();
    let window = month_window(now);
    let first_day = first_of_month(now.date_naive());
    let day_count = days_in_month(first_day);

    let mut minutes = vec![0.0_f64; day_count as usize];
    sessions
        .iter()
        .filter(|session| session.is_valid() && !session.skipped && window.contains(session.start))
        .filter_map(|session| {
            local_date(&tz, session.start).map(|date| (date.day0() as usize, session))
        })
        .for_each(|(index, session)| {
            if let Some(slot) = minutes.get_mut(index) {
                *slot += session.duration_minutes();
            }
        });

    let levels = intensity_levels(&minutes);
    let cells = minutes
        .iter()
        .zip(levels)
        .enumerate()
        .map(|(index, (minutes, intensity))| CalendarCell {
            day: index as u32 + 1,
            date: first_day + Duration::days(index as i64),
            minutes: *minutes,
            intensity,
        })
        .collect();

    let ticks = (1..=day_count)
        .map(|day| AxisTick {
            label: day.to_string(),
            offset: f64::from(day - 1) / f64::from(day_count),
        })
        .collect();

    ChartDataset {
        granularity: Granularity::Monthly,
        window,
        ticks,
        body: ChartBody::Monthly {
            leading_blanks: first_day.weekday().num_days_from_sunday(),
            cells,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::{BarStyle, ChartBody, Granularity, build_chart_dataset};
    use crate::analyzer::clock::MINUTE_MS;
    use crate::analyzer::session::{SessionKind, SessionRecord};
    use chrono::{TimeZone, Utc};

    fn at(month: u32, day: u32, hour: u32, minute: u32) -> i64 {
        Utc.with_ymd_and_hms(2026, month, day, hour, minute, 0)
            .unwrap()
            .timestamp_millis()
    }

    fn close(left: f64, right: f64) -> bool {
        (left - right).abs() < 1e-9
    }

    #[test]
    fn hourly_window_positions_bars() {
        let now = Utc.with_ymd_and_hms(2026, 2, 18, 14, 37, 0).unwrap();
        let sessions = vec![SessionRecord::completed(
            SessionKind::Work,
            at(2, 18, 14, 10),
            at(2, 18, 14, 25),
        )];

        let dataset = build_chart_dataset(&sessions, Granularity::Hourly, &now);

        assert_eq!(dataset.window.start_ms, at(2, 18, 14, 0));
        assert_eq!(dataset.window.length_ms(), 60 * MINUTE_MS);
        assert_eq!(
            dataset
                .ticks
                .iter()
                .map(|tick| tick.label.as_str())
                .collect::<Vec<_>>(),
            vec!["14:00", "14:15", "14:30", "14:45", "15:00"]
        );
        let bar = &dataset.bars()[0];
        assert!(close(bar.left, 10.0 / 60.0));
        assert!(close(bar.width, 15.0 / 60.0));
        assert_eq!(bar.style, BarStyle::Work);
        assert_eq!(bar.color, "#e57373");
    }

    #[test]
    fn skipped_session_renders_two_adjacent_bars() {
        let now = Utc.with_ymd_and_hms(2026, 2, 18, 10, 30, 0).unwrap();
        let sessions = SessionRecord::split_skip(
            SessionKind::Work,
            at(2, 18, 10, 0),
            25 * MINUTE_MS,
            at(2, 18, 10, 10),
        );

        let dataset = build_chart_dataset(&sessions, Granularity::Daily, &now);
        let bars = dataset.bars();

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].style, BarStyle::Work);
        assert_eq!(bars[1].style, BarStyle::Skipped);
        assert!(close(bars[0].left + bars[0].width, bars[1].left));
        assert!(bars[1].tooltip.contains("skipped"));
        assert_eq!(dataset.ticks.len(), 7);
        assert_eq!(dataset.ticks[6].label, "24:00");
    }

    #[test]
    fn bars_are_clipped_to_the_window() {
        let now = Utc.with_ymd_and_hms(2026, 2, 18, 13, 0, 0).unwrap();
        let sessions = vec![
            SessionRecord::completed(SessionKind::LongBreak, at(2, 18, 11, 50), at(2, 18, 12, 20)),
            SessionRecord::completed(SessionKind::Work, at(2, 18, 9, 0), at(2, 18, 9, 25)),
            SessionRecord {
                kind: SessionKind::Work,
                start: at(2, 18, 13, 0),
                end: at(2, 18, 12, 0),
                completed: true,
                skipped: false,
            },
        ];

        let dataset = build_chart_dataset(&sessions, Granularity::HalfDay, &now);
        let bars = dataset.bars();

        assert_eq!(dataset.window.start_ms, at(2, 18, 12, 0));
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].left, 0.0);
        assert!(close(bars[0].width, 20.0 / 720.0));
        assert_eq!(bars[0].row, 2);
    }

    #[test]
    fn quarterly_window_snaps_to_six_hour_blocks() {
        let now = Utc.with_ymd_and_hms(2026, 2, 18, 17, 45, 0).unwrap();
        let dataset = build_chart_dataset(&[], Granularity::Quarterly, &now);

        assert_eq!(dataset.window.start_ms, at(2, 18, 12, 0));
        assert_eq!(dataset.ticks.first().map(|tick| tick.label.as_str()), Some("12:00"));
        assert_eq!(dataset.ticks.last().map(|tick| tick.label.as_str()), Some("18:00"));
        assert!(dataset.bars().is_empty());
    }

    #[test]
    fn weekly_view_stacks_minutes_with_a_floor() {
        // 2026-02-18 is a Wednesday; the week starts on Sunday the 15th.
        let now = Utc.with_ymd_and_hms(2026, 2, 18, 18, 0, 0).unwrap();
        let sessions = vec![
            SessionRecord::completed(SessionKind::Work, at(2, 16, 9, 0), at(2, 16, 9, 30)),
            SessionRecord::completed(SessionKind::ShortBreak, at(2, 16, 9, 30), at(2, 16, 9, 36)),
            SessionRecord {
                kind: SessionKind::Work,
                start: at(2, 16, 10, 0),
                end: at(2, 16, 11, 0),
                completed: false,
                skipped: true,
            },
            SessionRecord::completed(SessionKind::Work, at(2, 14, 9, 0), at(2, 14, 9, 30)),
        ];

        let dataset = build_chart_dataset(&sessions, Granularity::Weekly, &now);

        assert_eq!(dataset.window.start_ms, at(2, 15, 0, 0));
        let ChartBody::Weekly {
            scale_minutes,
            days,
        } = &dataset.body
        else {
            panic!("expected weekly body");
        };
        assert_eq!(*scale_minutes, 360.0);
        assert_eq!(days.len(), 7);
        assert_eq!(days[0].name, "Sun");
        assert_eq!(days[1].work_minutes, 30.0);
        assert_eq!(days[1].short_minutes, 6.0);
        assert_eq!(days[1].total_minutes, 36.0);
        assert!(close(days[1].height, 0.1));
        assert_eq!(days[0].total_minutes, 0.0);
    }

    #[test]
    fn monthly_heatmap_offsets_the_first_weekday() {
        // 2026-01-01 is a Thursday.
        let now = Utc.with_ymd_and_hms(2026, 1, 20, 12, 0, 0).unwrap();
        let sessions = vec![
            SessionRecord::completed(SessionKind::Work, at(1, 5, 9, 0), at(1, 5, 10, 40)),
            SessionRecord::completed(SessionKind::Work, at(1, 6, 9, 0), at(1, 6, 9, 25)),
            SessionRecord::completed(SessionKind::Work, at(2, 6, 9, 0), at(2, 6, 9, 25)),
        ];

        let dataset = build_chart_dataset(&sessions, Granularity::Monthly, &now);

        let ChartBody::Monthly {
            leading_blanks,
            cells,
        } = &dataset.body
        else {
            panic!("expected monthly body");
        };
        assert_eq!(*leading_blanks, 4);
        assert_eq!(cells.len(), 31);
        assert_eq!(cells[4].minutes, 100.0);
        assert_eq!(cells[4].intensity, 4);
        assert_eq!(cells[5].intensity, 1);
        assert_eq!(cells[0].intensity, 0);
        assert_eq!(dataset.ticks.len(), 31);
    }

    #[test]
    fn granularity_names_round_trip_through_parsing() {
        for granularity in [
            Granularity::Hourly,
            Granularity::Quarterly,
            Granularity::HalfDay,
            Granularity::Daily,
            Granularity::Weekly,
            Granularity::Monthly,
        ] {
            assert_eq!(
                granularity.as_str().parse::<Granularity>().ok(),
                Some(granularity)
            );
        }
        assert!("yearly".parse::<Granularity>().is_err());
    }
}
