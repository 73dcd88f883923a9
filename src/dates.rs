// Day boundaries and human-friendly date helpers

use chrono::{DateTime, Days, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use std::fmt::Display;

use crate::error::{Result, StoreError};

const MS_PER_DAY: f64 = 86_400_000.0;

/// Midnight of `date` in `tz`, as a UTC instant
///
/// When a DST jump skips midnight the first valid instant of the day is used.
pub fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&midnight)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(midnight + Duration::hours(1))).earliest())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| midnight.and_utc())
}

/// Start of the calendar day containing `now`, in `now`'s time zone
pub fn start_of_day<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Utc> {
    local_midnight(&now.timezone(), now.date_naive())
}

/// The relative-day boundaries used by due-date buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    /// Start of the current day
    pub today: DateTime<Utc>,
    /// Start of the next day
    pub tomorrow: DateTime<Utc>,
    /// Start of the current day plus seven days
    pub next_week: DateTime<Utc>,
}

impl DayWindow {
    pub fn at<Tz: TimeZone>(now: &DateTime<Tz>) -> Self {
        let tz = now.timezone();
        let date = now.date_naive();
        let offset = |days: u64| date.checked_add_days(Days::new(days)).unwrap_or(NaiveDate::MAX);

        Self {
            today: local_midnight(&tz, date),
            tomorrow: local_midnight(&tz, offset(1)),
            next_week: local_midnight(&tz, offset(7)),
        }
    }

    /// `[today, tomorrow)`
    pub fn is_today(&self, date: DateTime<Utc>) -> bool {
        date >= self.today && date < self.tomorrow
    }

    /// `[today, today + 7 days]`, both ends inclusive
    pub fn is_upcoming(&self, date: DateTime<Utc>) -> bool {
        date >= self.today && date <= self.next_week
    }

    /// Strictly before the start of today
    pub fn is_past(&self, date: DateTime<Utc>) -> bool {
        date < self.today
    }
}

pub fn is_today<Tz: TimeZone>(date: DateTime<Utc>, now: &DateTime<Tz>) -> bool {
    DayWindow::at(now).is_today(date)
}

pub fn is_past<Tz: TimeZone>(date: DateTime<Utc>, now: &DateTime<Tz>) -> bool {
    DayWindow::at(now).is_past(date)
}

pub fn is_upcoming<Tz: TimeZone>(date: DateTime<Utc>, now: &DateTime<Tz>) -> bool {
    DayWindow::at(now).is_upcoming(date)
}

/// "Today", "Tomorrow", "Yesterday", "3 days ago", "In 4 days"
///
/// Day distance is the ceiling of the difference in days, so any time
/// later than `now` but less than a day ahead is already "Tomorrow".
pub fn relative_time<Tz: TimeZone>(date: DateTime<Utc>, now: &DateTime<Tz>) -> String {
    let diff_ms = (date - now.with_timezone(&Utc)).num_milliseconds() as f64;
    let diff_days = (diff_ms / MS_PER_DAY).ceil() as i64;

    match diff_days {
        0 => "Today".to_string(),
        1 => "Tomorrow".to_string(),
        -1 => "Yesterday".to_string(),
        d if d < 0 => format!("{} days ago", d.abs()),
        d => format!("In {} days", d),
    }
}

/// "Mar 10, 2025" in the given time zone
pub fn format_date<Tz>(date: DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    date.with_timezone(tz).format("%b %-d, %Y").to_string()
}

/// Parse a due date from user input
///
/// Accepts a full RFC 3339 timestamp or a bare `YYYY-MM-DD`, which is taken
/// as local midnight in `tz`.
pub fn parse_due_date<Tz: TimeZone>(input: &str, tz: &Tz) -> Result<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }
    match NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        Ok(date) => Ok(local_midnight(tz, date)),
        Err(_) => Err(StoreError::validation(
            "dueDate",
            format!("'{}' is not a date (expected YYYY-MM-DD or RFC 3339)", input),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_start_of_day_utc() {
        let now = utc(2025, 3, 10, 15);
        assert_eq!(start_of_day(&now), utc(2025, 3, 10, 0));
    }

    #[test]
    fn test_start_of_day_uses_local_calendar() {
        // 01:00 on Mar 10 at +05:00 is still Mar 9 in UTC
        let tz = FixedOffset::east_opt(5 * 3600).unwrap();
        let now = tz.with_ymd_and_hms(2025, 3, 10, 1, 0, 0).unwrap();
        assert_eq!(start_of_day(&now), utc(2025, 3, 9, 19));
    }

    #[test]
    fn test_day_window_boundaries() {
        let window = DayWindow::at(&utc(2025, 3, 10, 15));

        assert!(window.is_today(utc(2025, 3, 10, 0)));
        assert!(window.is_today(utc(2025, 3, 10, 23)));
        assert!(!window.is_today(utc(2025, 3, 11, 0)));

        assert!(window.is_upcoming(utc(2025, 3, 17, 0)));
        assert!(!window.is_upcoming(utc(2025, 3, 17, 1)));
        assert!(!window.is_upcoming(utc(2025, 3, 9, 23)));

        assert!(window.is_past(utc(2025, 3, 9, 23)));
        assert!(!window.is_past(utc(2025, 3, 10, 0)));
    }

    #[test]
    fn test_free_function_wrappers() {
        let now = utc(2025, 3, 10, 15);
        assert!(is_today(utc(2025, 3, 10, 8), &now));
        assert!(is_past(utc(2025, 3, 9, 8), &now));
        assert!(is_upcoming(utc(2025, 3, 14, 8), &now));
    }

    #[test]
    fn test_relative_time() {
        let now = utc(2025, 3, 10, 12);
        assert_eq!(relative_time(now, &now), "Today");
        assert_eq!(relative_time(utc(2025, 3, 11, 12), &now), "Tomorrow");
        assert_eq!(relative_time(utc(2025, 3, 9, 12), &now), "Yesterday");
        assert_eq!(relative_time(utc(2025, 3, 7, 12), &now), "3 days ago");
        assert_eq!(relative_time(utc(2025, 3, 14, 12), &now), "In 4 days");
        // Ceiling: half a day ahead already counts as tomorrow
        assert_eq!(relative_time(utc(2025, 3, 10, 18), &now), "Tomorrow");
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date(utc(2025, 3, 5, 12), &Utc), "Mar 5, 2025");
    }

    #[test]
    fn test_parse_due_date() {
        assert_eq!(parse_due_date("2025-03-12", &Utc).unwrap(), utc(2025, 3, 12, 0));
        assert_eq!(
            parse_due_date("2025-03-12T09:00:00.000Z", &Utc).unwrap(),
            utc(2025, 3, 12, 9)
        );
        assert!(matches!(
            parse_due_date("next tuesday", &Utc),
            Err(StoreError::Validation { field: "dueDate", .. })
        ));
    }
}
