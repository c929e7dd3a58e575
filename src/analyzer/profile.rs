use crate::analyzer::clock::local_hour;
use crate::analyzer::session::SessionRecord;
use chrono::TimeZone;
use serde::{Deserialize, Serialize};

pub const HOURS_PER_DAY: usize = 24;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProductiveHour {
    pub hour: u32,
    pub minutes: f64,
}

/// Productive work minutes per local start hour, summed over the whole log.
pub fn hourly_buckets<Tz: TimeZone>(sessions: &[SessionRecord], tz: &Tz) -> [f64; HOURS_PER_DAY] {
    sessions
        .iter()
        .filter(|session| session.is_productive_work())
        .filter_map(|session| {
            local_hour(tz, session.start).map(|hour| (hour as usize, session.duration_minutes()))
        })
        .fold([0.0; HOURS_PER_DAY], |mut buckets, (hour, minutes)| {
            buckets[hour % HOURS_PER_DAY] += minutes;
            buckets
        })
}

pub fn hourly_minutes<Tz: TimeZone>(sessions: &[SessionRecord], tz: &Tz, hour: u32) -> f64 {
    hourly_buckets(sessions, tz)
        .get(hour as usize)
        .copied()
        .unwrap_or_default()
}

pub fn hourly_intensity<Tz: TimeZone>(sessions: &[SessionRecord], tz: &Tz) -> [u8; HOURS_PER_DAY] {
    let buckets = hourly_buckets(sessions, tz);
    let levels = intensity_levels(&buckets);

    let mut intensity = [0; HOURS_PER_DAY];
    intensity.copy_from_slice(&levels);
    intensity
}

/// Quantizes every value against the largest one: 0 for empty, then 1-4 by
/// quarter of the maximum.
pub fn intensity_levels(values: &[f64]) -> Vec<u8> {
    let max = values.iter().copied().fold(0.0_f64, f64::max);

    values
        .iter()
        .map(|value| intensity_level(*value, max))
        .collect()
}

pub fn intensity_level(value: f64, max: f64) -> u8 {
    if value <= 0.0 || max <= 0.0 {
        return 0;
    }

    let ratio = value / max;
    if ratio > 0.75 {
        4
    } else if ratio > 0.5 {
        3
    } else if ratio > 0.25 {
        2
    } else {
        1
    }
}

/// Top three hours by minutes. Ties keep the earlier hour first.
pub fn find_most_productive_hours<Tz: TimeZone>(
    sessions: &[SessionRecord],
    tz: &Tz,
) -> Vec<ProductiveHour> {
    let mut hours = hourly_buckets(sessions, tz)
        .into_iter()
        .enumerate()
        .filter(|(_, minutes)| *minutes > 0.0)
        .map(|(hour, minutes)| ProductiveHour {
            hour: hour as u32,
            minutes,
        })
        .collect::<Vec<_>>();

    hours.sort_by(|left, right| right.minutes.total_cmp(&left.minutes));
    hours.truncate(3);
    hours
}

pub fn peak_hour<Tz: TimeZone>(sessions: &[SessionRecord], tz: &Tz) -> Option<u32> {
    find_most_productive_hours(sessions, tz)
        .first()
        .map(|entry| entry.hour)
}

pub fn format_hour(hour: Option<u32>) -> String {
    hour.map(|value| format!("{value}:00"))
        .unwrap_or_else(|| "None".to_string())
}
