//! Dates and times of matches.
//!
//! The sheet holds one tournament date in its first header cell and local
//! wall-clock times per match. Meetings are always scheduled in UTC+9.

use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};

/// The offset every meeting is announced with.
pub const MEETING_UTC_OFFSET_SECS: i32 = 9 * 3600;
pub const MEETING_TIMEZONE: &str = "Asia/Tokyo";

/// Parses the date header: `M/D` (year taken from `default_year`) or `YYYY/M/D`.
pub fn parse_date_header(cell: &str, default_year: i32) -> Option<NaiveDate> {
    let parts: Vec<&str> = cell.trim().split('/').map(|p| p.trim()).collect();
    let nums: Vec<u32> = parts
        .iter()
        .map(|p| p.parse::<u32>().ok())
        .collect::<Option<Vec<u32>>>()?;
    match nums.as_slice() {
        [month, day] => NaiveDate::from_ymd_opt(default_year, *month, *day),
        [year, month, day] => NaiveDate::from_ymd_opt(*year as i32, *month, *day),
        _ => None,
    }
}

/// `HH:MM` or `HH:MM:SS`.
pub fn parse_time_of_day(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .ok()
}

/// Whole minutes between two instants, rounding any partial minute up.
pub fn duration_minutes(start: NaiveDateTime, end: NaiveDateTime) -> i64 {
    let secs = (end - start).num_seconds();
    (secs + 59).div_euclid(60)
}

/// When a match takes place.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Slot {
    pub start: NaiveDateTime,
    pub duration_minutes: u32,
}

impl Slot {
    /// `None` when a time does not parse or the match ends before it starts.
    pub fn new(date: NaiveDate, start: &str, end: &str) -> Option<Slot> {
        let start = date.and_time(parse_time_of_day(start)?);
        let end = date.and_time(parse_time_of_day(end)?);
        if end < start {
            return None;
        }
        Some(Slot {
            start,
            duration_minutes: duration_minutes(start, end) as u32,
        })
    }

    /// The start as `YYYY-MM-DDTHH:MM:SS+09:00`.
    pub fn start_time(&self) -> Option<String> {
        let offset = FixedOffset::east_opt(MEETING_UTC_OFFSET_SECS)?;
        let start = offset.from_local_datetime(&self.start).single()?;
        Some(start.format("%Y-%m-%dT%H:%M:%S%:z").to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    #[test]
    fn whole_minutes_are_not_rounded() {
        let slot = Slot::new(day(), "09:00", "09:47").unwrap();
        assert_eq!(slot.duration_minutes, 47);
    }

    #[test]
    fn partial_minutes_round_up() {
        let slot = Slot::new(day(), "09:00", "09:00:30").unwrap();
        assert_eq!(slot.duration_minutes, 1);
        let slot = Slot::new(day(), "09:00", "09:00").unwrap();
        assert_eq!(slot.duration_minutes, 0);
    }

    #[test]
    fn end_before_start_is_rejected() {
        assert_eq!(Slot::new(day(), "10:00", "09:00"), None);
        assert_eq!(Slot::new(day(), "ten", "11:00"), None);
    }

    #[test]
    fn start_time_carries_fixed_offset() {
        let slot = Slot::new(day(), "9:05", "10:00").unwrap();
        assert_eq!(slot.start_time().unwrap(), "2026-10-19T09:05:00+09:00");
    }

    #[test]
    fn date_headers() {
        assert_eq!(parse_date_header("10/19", 2026), Some(day()));
        assert_eq!(parse_date_header(" 2026/10/19 ", 1999), Some(day()));
        assert_eq!(parse_date_header("2/30", 2026), None);
        assert_eq!(parse_date_header("Round 1", 2026), None);
        assert_eq!(parse_date_header("", 2026), None);
    }
}
