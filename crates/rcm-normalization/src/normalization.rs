//! Value-level normalization functions.
//!
//! Pure functions over single cells, composed by the executor.

use chrono::{Datelike, NaiveDate};

use rcm_common::parse_f64;
use rcm_core::calendar::{format_date, parse_calendar_date};

/// Canonical form of a header for alias matching: lower-case ASCII
/// alphanumerics only, so `Patient ID`, `patient_id` and `PatientID` agree.
///
/// # Examples
///
/// ```
/// use rcm_normalization::normalization::canonical_header;
///
/// assert_eq!(canonical_header(" Patient_ID "), "patientid");
/// assert_eq!(canonical_header("\u{feff}PhoneNumber"), "phonenumber");
/// ```
pub fn canonical_header(raw: &str) -> String {
    raw.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|ch| ch.to_ascii_lowercase())
        .collect()
}

/// `Male`, `Female` or `Unknown`.
pub fn normalize_gender(raw: &str) -> &'static str {
    match raw.trim().to_ascii_uppercase().as_str() {
        "M" | "MALE" => "Male",
        "F" | "FEMALE" => "Female",
        _ => "Unknown",
    }
}

/// The last ten digits of a phone number. Shorter numbers are kept as found,
/// trimmed.
pub fn normalize_phone(raw: &str) -> String {
    let digits: Vec<char> = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.len() < 10 {
        return raw.trim().to_string();
    }
    digits[digits.len() - 10..].iter().collect()
}

/// Outcome of normalizing one typed cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized<T> {
    Value(T),
    Blank,
    /// Unparseable input, kept as found.
    Invalid(String),
}

/// ISO calendar date.
pub fn normalize_date(raw: &str) -> Normalized<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Normalized::Blank;
    }
    match parse_calendar_date(trimmed) {
        Some(date) => Normalized::Value(format_date(date)),
        None => Normalized::Invalid(trimmed.to_string()),
    }
}

/// Decimal measure. Currency signs and thousands separators are accepted.
pub fn normalize_decimal(raw: &str) -> Normalized<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Normalized::Blank;
    }
    match parse_f64(trimmed) {
        Some(value) => Normalized::Value(value),
        None => Normalized::Invalid(trimmed.to_string()),
    }
}

/// Whole years between `dob` and `as_of`; `None` for a birth date in the
/// future.
pub fn age_at(dob: NaiveDate, as_of: NaiveDate) -> Option<i64> {
    if dob > as_of {
        return None;
    }
    let mut years = as_of.year() - dob.year();
    if (as_of.month(), as_of.day()) < (dob.month(), dob.day()) {
        years -= 1;
    }
    Some(i64::from(years))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gender_codes() {
        assert_eq!(normalize_gender("m"), "Male");
        assert_eq!(normalize_gender(" FEMALE "), "Female");
        assert_eq!(normalize_gender("x"), "Unknown");
        assert_eq!(normalize_gender(""), "Unknown");
    }

    #[test]
    fn phone_keeps_last_ten_digits() {
        assert_eq!(normalize_phone("+1 (555) 123-4567"), "5551234567");
        assert_eq!(normalize_phone("555.123.4567"), "5551234567");
        assert_eq!(normalize_phone(" 555-1111 "), "555-1111");
    }

    #[test]
    fn dates_and_decimals() {
        assert_eq!(
            normalize_date("03/05/2024"),
            Normalized::Value("2024-03-05".to_string())
        );
        assert_eq!(normalize_date("  "), Normalized::Blank);
        assert_eq!(
            normalize_date("soon"),
            Normalized::Invalid("soon".to_string())
        );
        assert_eq!(normalize_decimal("$1,250.50"), Normalized::Value(1250.5));
        assert!(matches!(normalize_decimal("n/a"), Normalized::Invalid(_)));
    }

    #[test]
    fn age_counts_completed_years() {
        let dob = NaiveDate::from_ymd_opt(1980, 6, 15).unwrap();
        let before_birthday = NaiveDate::from_ymd_opt(2024, 6, 14).unwrap();
        let on_birthday = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        assert_eq!(age_at(dob, before_birthday), Some(43));
        assert_eq!(age_at(dob, on_birthday), Some(44));
        assert_eq!(age_at(on_birthday, dob), None);
    }
}
