//! Display formatting for amounts and dates
//!
//! Numbers follow the es-HN convention used by the widget: `,` groups thousands
//! and `.` separates decimals (`2,470.00`). Dates are rendered as Spanish long dates.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

const WEEKDAYS: [&str; 7] = [
    "lunes",
    "martes",
    "miércoles",
    "jueves",
    "viernes",
    "sábado",
    "domingo",
];

const MONTHS: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

/// Formats `value` with exactly `decimals` fraction digits and grouped thousands
///
/// Non-finite input formats as zero.
pub fn format_number(value: f64, decimals: usize) -> String {
    let value = if value.is_finite() { value } else { 0.0 };
    let fixed = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (fixed.as_str(), None),
    };

    let mut out = String::with_capacity(fixed.len() + fixed.len() / 3 + 1);
    // -0.001 rounds to "0.00" and must not keep its sign
    if value < 0.0 && fixed.bytes().any(|b| (b'1'..=b'9').contains(&b)) {
        out.push('-');
    }
    out.push_str(&group_thousands(int_part));
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Parses the upstream `Fecha` into a calendar date
///
/// Accepts RFC 3339 timestamps, `YYYY-MM-DDTHH:MM:SS` (with or without fraction),
/// plain `YYYY-MM-DD`, and `DD/MM/YYYY`.
pub fn parse_rate_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    for fmt in ["%Y-%m-%d", "%d/%m/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }
    None
}

/// `lunes, 1 de enero de 2024`
pub fn format_long_date(date: NaiveDate) -> String {
    let weekday = WEEKDAYS[date.weekday().num_days_from_monday() as usize];
    format!("{}, {}", weekday, format_date(date))
}

/// `1 de enero de 2024`
pub fn format_date(date: NaiveDate) -> String {
    let month = MONTHS[date.month0() as usize];
    format!("{} de {} de {}", date.day(), month, date.year())
}

/// Long date for a rate's `Fecha`, or the raw string when it cannot be parsed
pub fn display_rate_date(fecha: &str) -> String {
    parse_rate_date(fecha)
        .map(format_long_date)
        .unwrap_or_else(|| fecha.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number_two_decimals_with_grouping() {
        assert_eq!(format_number(2470.0, 2), "2,470.00");
        assert_eq!(format_number(24.7, 2), "24.70");
        assert_eq!(format_number(1_234_567.891, 2), "1,234,567.89");
        assert_eq!(format_number(0.0, 2), "0.00");
        assert_eq!(format_number(999.999, 2), "1,000.00");
    }

    #[test]
    fn test_format_number_whole_units() {
        assert_eq!(format_number(1.0, 0), "1");
        assert_eq!(format_number(1000.0, 0), "1,000");
        assert_eq!(format_number(5000.0, 0), "5,000");
        assert_eq!(format_number(100.0, 0), "100");
    }

    #[test]
    fn test_format_number_non_finite_is_zero() {
        assert_eq!(format_number(f64::NAN, 2), "0.00");
        assert_eq!(format_number(f64::INFINITY, 2), "0.00");
        assert_eq!(format_number(f64::NAN, 0), "0");
    }

    #[test]
    fn test_format_number_negative() {
        assert_eq!(format_number(-1234.5, 2), "-1,234.50");
        assert_eq!(format_number(-0.001, 2), "0.00");
    }

    #[test]
    fn test_parse_rate_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 1);
        assert_eq!(parse_rate_date("2024-01-01"), expected);
        assert_eq!(parse_rate_date("2024-01-01T00:00:00"), expected);
        assert_eq!(parse_rate_date("2024-01-01T00:00:00.000"), expected);
        assert_eq!(parse_rate_date("2024-01-01T00:00:00Z"), expected);
        assert_eq!(parse_rate_date("01/01/2024"), expected);
        assert_eq!(parse_rate_date("yesterday"), None);
    }

    #[test]
    fn test_format_long_date_spanish() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(format_long_date(date), "lunes, 1 de enero de 2024");

        let date = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
        assert_eq!(format_long_date(date), "sábado, 17 de octubre de 2026");
        assert_eq!(format_date(date), "17 de octubre de 2026");
    }

    #[test]
    fn test_display_rate_date_falls_back_to_raw() {
        assert_eq!(display_rate_date("2024-03-15T00:00:00"), "viernes, 15 de marzo de 2024");
        assert_eq!(display_rate_date("Q1 2024"), "Q1 2024");
    }
}
