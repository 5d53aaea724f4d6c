//! Calendar parsing and formatting shared by the date dimension and the fact
//! resolver. Both must agree on how a raw value maps to a calendar date, or
//! facts would reference dates the dimension never emitted.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%m-%Y"];

const DATETIME_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Storage format for dates inside produced tables.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Storage format for SCD2 validity timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Parse a raw date or timestamp into its calendar date.
///
/// Slash dates are read month first. Time components are dropped.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use rcm_core::calendar::parse_calendar_date;
///
/// let march_5 = NaiveDate::from_ymd_opt(2024, 3, 5);
/// assert_eq!(parse_calendar_date("2024-03-05"), march_5);
/// assert_eq!(parse_calendar_date("03/05/2024"), march_5);
/// assert_eq!(parse_calendar_date("2024-03-05T14:30:00"), march_5);
/// assert_eq!(parse_calendar_date("not a date"), None);
/// ```
pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }
    if value.len() == 8 && value.bytes().all(|b| b.is_ascii_digit()) {
        let year = value[0..4].parse().ok()?;
        let month = value[4..6].parse().ok()?;
        let day = value[6..8].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Some(date);
        }
    }
    // The date as written, not shifted by the offset.
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Some(timestamp.naive_local().date());
    }
    parse_timestamp(value).map(|timestamp| timestamp.date())
}

/// Parse a raw timestamp. Bare dates read as midnight; offset timestamps are
/// converted to UTC.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }
    for format in DATETIME_FORMATS {
        if let Ok(timestamp) = NaiveDateTime::parse_from_str(value, format) {
            return Some(timestamp);
        }
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Some(timestamp.naive_utc());
    }
    NaiveDate::parse_from_str(value, DATE_FORMATS[0])
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Integer key `YYYYMMDD`; integer order matches chronological order.
pub fn date_key(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 10_000 + i64::from(date.month()) * 100 + i64::from(date.day())
}

pub fn quarter(date: NaiveDate) -> u32 {
    (date.month() - 1) / 3 + 1
}

/// Day of week with Monday = 0 through Sunday = 6.
pub fn day_of_week(date: NaiveDate) -> u32 {
    date.weekday().num_days_from_monday()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn format_timestamp(timestamp: NaiveDateTime) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_supported_layouts() {
        let expected = Some(ymd(2024, 3, 5));
        for raw in [
            "2024-03-05",
            "2024/03/05",
            "03/05/2024",
            "05-03-2024",
            "20240305",
            "2024-03-05 09:15:00",
            "2024-03-05 09:15:00.250",
            "2024-03-05T09:15:00",
            "2024-03-05T23:15:00+00:00",
            " 2024-03-05 ",
        ] {
            assert_eq!(parse_calendar_date(raw), expected, "{raw}");
        }
    }

    #[test]
    fn offset_timestamps_keep_their_written_date() {
        assert_eq!(
            parse_calendar_date("2024-03-05T23:15:00-05:00"),
            Some(ymd(2024, 3, 5))
        );
        assert_eq!(
            parse_calendar_date("2024-03-05T01:00:00+09:00"),
            Some(ymd(2024, 3, 5))
        );
        assert_eq!(
            parse_timestamp("2024-03-05T23:15:00-05:00"),
            ymd(2024, 3, 6).and_hms_opt(4, 15, 0)
        );
    }

    #[test]
    fn rejects_garbage_and_impossible_dates() {
        for raw in ["", "   ", "N/A", "2024-02-30", "20241340", "13/45/2024"] {
            assert_eq!(parse_calendar_date(raw), None, "{raw}");
        }
    }

    #[test]
    fn date_key_sorts_chronologically() {
        let dates = [ymd(2023, 12, 31), ymd(2024, 1, 1), ymd(2024, 10, 2)];
        let keys: Vec<i64> = dates.iter().map(|d| date_key(*d)).collect();
        assert_eq!(keys, vec![20231231, 20240101, 20241002]);
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn quarter_and_weekday_conventions() {
        assert_eq!(quarter(ymd(2024, 1, 31)), 1);
        assert_eq!(quarter(ymd(2024, 4, 1)), 2);
        assert_eq!(quarter(ymd(2024, 12, 31)), 4);
        // 2024-03-04 is a Monday.
        assert_eq!(day_of_week(ymd(2024, 3, 4)), 0);
        assert_eq!(day_of_week(ymd(2024, 3, 10)), 6);
    }

    #[test]
    fn timestamps_parse_and_format() {
        let ts = parse_timestamp("2024-03-05 09:15:00").unwrap();
        assert_eq!(format_timestamp(ts), "2024-03-05 09:15:00.000000");
        assert_eq!(
            parse_timestamp("2024-03-05"),
            ymd(2024, 3, 5).and_hms_opt(0, 0, 0)
        );
    }
}
