use chrono::{
    DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike,
    Weekday,
};
use serde::Serialize;

pub const MINUTE_MS: i64 = 60_000;
pub const HOUR_MS: i64 = 60 * MINUTE_MS;
pub const DAY_MS: i64 = 24 * HOUR_MS;
pub const WEEK_MS: i64 = 7 * DAY_MS;

pub const WEEKDAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Half-open `[start_ms, end_ms)` span of absolute time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    pub start_ms: i64,
    pub end_ms: i64,
}

impl TimeWindow {
    pub fn new(start_ms: i64, end_ms: i64) -> Self {
        Self { start_ms, end_ms }
    }

    pub fn contains(&self, timestamp_ms: i64) -> bool {
        timestamp_ms >= self.start_ms && timestamp_ms < self.end_ms
    }

    pub fn length_ms(&self) -> i64 {
        (self.end_ms - self.start_ms).max(0)
    }
}

pub fn local_datetime<Tz: TimeZone>(tz: &Tz, timestamp_ms: i64) -> Option<DateTime<Tz>> {
    tz.timestamp_millis_opt(timestamp_ms).single()
}

pub fn local_date<Tz: TimeZone>(tz: &Tz, timestamp_ms: i64) -> Option<NaiveDate> {
    local_datetime(tz, timestamp_ms).map(|datetime| datetime.date_naive())
}

pub fn local_hour<Tz: TimeZone>(tz: &Tz, timestamp_ms: i64) -> Option<u32> {
    local_datetime(tz, timestamp_ms).map(|datetime| datetime.hour())
}

/// 0 = Sunday .. 6 = Saturday.
pub fn local_weekday_index<Tz: TimeZone>(tz: &Tz, timestamp_ms: i64) -> Option<usize> {
    local_datetime(tz, timestamp_ms).map(|datetime| weekday_index(datetime.weekday()))
}

pub fn weekday_index(weekday: Weekday) -> usize {
    weekday.num_days_from_sunday() as usize
}

/// Resolves a wall-clock time to an instant. Times that fall into a DST gap
/// are pushed forward an hour; ambiguous times take the earlier instant.
pub fn instant_at<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> i64 {
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| {
            tz.from_local_datetime(&(naive + Duration::hours(1)))
                .earliest()
        })
        .map(|datetime| datetime.timestamp_millis())
        .unwrap_or_else(|| naive.and_utc().timestamp_millis())
}

pub fn date_start<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> i64 {
    // NaiveTime::default() is midnight.
    instant_at(tz, date.and_time(NaiveTime::default()))
}

pub fn day_window<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> TimeWindow {
    let next = date.succ_opt().unwrap_or(date);
    TimeWindow::new(date_start(tz, date), date_start(tz, next))
}

pub fn today_window<Tz: TimeZone>(now: &DateTime<Tz>) -> TimeWindow {
    day_window(&now.timezone(), now.date_naive())
}

/// Rolling `[now - 7d, now)`, not aligned to calendar weeks.
pub fn rolling_week<Tz: TimeZone>(now: &DateTime<Tz>) -> TimeWindow {
    let now_ms = now.timestamp_millis();
    TimeWindow::new(now_ms - WEEK_MS, now_ms)
}

pub fn previous_rolling_week<Tz: TimeZone>(now: &DateTime<Tz>) -> TimeWindow {
    let now_ms = now.timestamp_millis();
    TimeWindow::new(now_ms - 2 * WEEK_MS, now_ms - WEEK_MS)
}

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn first_of_next_month(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(date)
}

pub fn days_in_month(date: NaiveDate) -> u32 {
    (first_of_next_month(date) - first_of_month(date)).num_days() as u32
}

pub fn month_window<Tz: TimeZone>(now: &DateTime<Tz>) -> TimeWindow {
    let tz = now.timezone();
    let today = now.date_naive();
    TimeWindow::new(
        date_start(&tz, first_of_month(today)),
        date_start(&tz, first_of_next_month(today)),
    )
}

/// Sunday on or before `date`.
pub fn week_start_date(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_sunday()))
}

pub fn format_clock<Tz: TimeZone>(tz: &Tz, timestamp_ms: i64, pattern: &str) -> String
where
    Tz::Offset: std::fmt::Display,
{
    local_datetime(tz, timestamp_ms)
        .map(|datetime| datetime.format(pattern).to_string())
        .unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::{
        WEEK_MS, days_in_month, first_of_next_month, month_window, rolling_week, today_window,
        week_start_date,
    };
    use chrono::{NaiveDate, TimeZone, Utc};

    #[test]
    fn month_boundaries_roll_over_the_year() {
        let december = NaiveDate::from_ymd_opt(2025, 12, 14).expect("date");
        assert_eq!(
            first_of_next_month(december),
            NaiveDate::from_ymd_opt(2026, 1, 1).expect("date")
        );
        assert_eq!(days_in_month(december), 31);
        assert_eq!(
            days_in_month(NaiveDate::from_ymd_opt(2024, 2, 3).expect("date")),
            29
        );
    }

    #[test]
    fn windows_around_now() {
        let now = Utc.with_ymd_and_hms(2026, 2, 18, 9, 30, 0).unwrap();

        let today = today_window(&now);
        assert_eq!(
            today.start_ms,
            Utc.with_ymd_and_hms(2026, 2, 18, 0, 0, 0)
                .unwrap()
                .timestamp_millis()
        );
        assert!(today.contains(now.timestamp_millis()));

        let week = rolling_week(&now);
        assert_eq!(week.length_ms(), WEEK_MS);
        assert!(!week.contains(now.timestamp_millis()));

        let month = month_window(&now);
        assert_eq!(
            month.end_ms,
            Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0)
                .unwrap()
                .timestamp_millis()
        );
    }

    #[test]
    fn weeks_start_on_sunday() {
        let wednesday = NaiveDate::from_ymd_opt(2026, 2, 18).expect("date");
        assert_eq!(
            week_start_date(wednesday),
            NaiveDate::from_ymd_opt(2026, 2, 15).expect("date")
        );
        let sunday = NaiveDate::from_ymd_opt(2026, 2, 15).expect("date");
        assert_eq!(week_start_date(sunday), sunday);
    }
}
