use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::core::error::{TimeCampError, TimeCampResult};

// Constants for format strings and remote conventions
pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
pub const SERVICE_TAG: &str = "timecamp-mcp";
pub const LOOKUP_WINDOW_DAYS: i64 = 30;

/// Available resource URIs for the TimeCamp MCP Server
pub const AVAILABLE_RESOURCES: &[&str] = &["timecamp://status", "timecamp://help"];

/// Append seconds to a `YYYY-MM-DD HH:MM` value, leaving any other shape untouched.
pub fn normalize_datetime(value: &str) -> String {
    let bytes = value.as_bytes();
    let minute_precision = bytes.len() == 16
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            10 => *b == b' ',
            13 => *b == b':',
            _ => b.is_ascii_digit(),
        });

    if minute_precision {
        format!("{}:00", value)
    } else {
        value.to_string()
    }
}

/// Parse a normalized datetime in any of the accepted formats
pub fn parse_datetime(value: &str) -> TimeCampResult<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .ok_or_else(|| {
            TimeCampError::validation(format!(
                "Invalid datetime '{}'. Expected YYYY-MM-DD HH:MM",
                value
            ))
        })
}

/// Split a clock value into hour and minute, accepting `HH:MM` only.
fn parse_clock(value: &str) -> Option<(u32, u32)> {
    let (hour, minute) = value.split_once(':')?;
    if hour.is_empty()
        || hour.len() > 2
        || minute.len() != 2
        || !hour.bytes().chain(minute.bytes()).all(|b| b.is_ascii_digit())
    {
        return None;
    }

    let hour: u32 = hour.parse().ok()?;
    let minute: u32 = minute.parse().ok()?;
    (hour <= 23 && minute <= 59).then_some((hour, minute))
}

/// Check a value against the `HH:MM` format (hour 0-23, minute 0-59)
pub fn validate_clock_time(value: &str) -> TimeCampResult<()> {
    parse_clock(value).map(|_| ()).ok_or_else(|| {
        TimeCampError::validation(format!(
            "Invalid time format '{}'. Expected HH:MM (e.g. 09:30)",
            value
        ))
    })
}

/// Turn a bare `HH:MM` into `HH:MM:SS`; values already carrying seconds pass through.
pub fn normalize_clock_time(value: &str) -> String {
    match parse_clock(value) {
        Some((hour, minute)) => format!("{:02}:{:02}:00", hour, minute),
        None => value.to_string(),
    }
}

/// Minutes since midnight of an `HH:MM` or `HH:MM:SS` value
pub fn minutes_of_day(value: &str) -> TimeCampResult<i64> {
    let invalid = || TimeCampError::validation(format!("Invalid time value '{}'", value));

    let mut parts = value.split(':');
    let hour: i64 = parts.next().and_then(|h| h.parse().ok()).ok_or_else(invalid)?;
    let minute: i64 = parts.next().and_then(|m| m.parse().ok()).ok_or_else(invalid)?;
    if !(0..24).contains(&hour) || !(0..60).contains(&minute) {
        return Err(invalid());
    }

    Ok(hour * 60 + minute)
}

/// Date range used when looking an entry up by id
///
/// A given date searches that single day; otherwise the trailing window ending `today`.
pub fn lookup_window(today: NaiveDate, date: Option<&str>) -> (String, String) {
    match date {
        Some(day) => (day.to_string(), day.to_string()),
        None => {
            let start = today - Duration::days(LOOKUP_WINDOW_DAYS);
            (
                start.format(DATE_FORMAT).to_string(),
                today.format(DATE_FORMAT).to_string(),
            )
        }
    }
}

/// Read an integer out of a JSON number or numeric string, defaulting to 0
pub fn parse_seconds(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            let end = trimmed
                .char_indices()
                .find(|(i, c)| !(c.is_ascii_digit() || (*i == 0 && *c == '-')))
                .map_or(trimmed.len(), |(i, _)| i);
            trimmed[..end].parse().unwrap_or(0)
        }
        _ => 0,
    }
}

/// Seconds to hours, rounded to two decimals
pub fn seconds_to_hours(seconds: i64) -> f64 {
    (seconds as f64 / 3600.0 * 100.0).round() / 100.0
}

/// Numeric identifier carried as a JSON number or string
pub fn as_numeric_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Whether a remote archived flag is set (anything but zero, false or empty)
pub fn is_flag_set(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => {
            let s = s.trim();
            !s.is_empty() && s.parse::<f64>().map_or(true, |f| f != 0.0)
        }
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_datetime() {
        assert_eq!(normalize_datetime("2025-06-21 09:00"), "2025-06-21 09:00:00");
        assert_eq!(
            normalize_datetime("2025-06-21 09:00:30"),
            "2025-06-21 09:00:30"
        );
        assert_eq!(normalize_datetime("2025-06-21T09:00"), "2025-06-21T09:00");
        assert_eq!(normalize_datetime("yesterday"), "yesterday");
    }

    #[test]
    fn test_parse_datetime_accepts_both_separators() {
        assert!(parse_datetime("2025-06-21 09:00:00").is_ok());
        assert!(parse_datetime("2025-06-21T09:00:00").is_ok());
        assert!(parse_datetime("2025-06-21 09:00").is_err());
        assert!(parse_datetime("not a date").is_err());
    }

    #[test]
    fn test_validate_clock_time() {
        assert!(validate_clock_time("09:00").is_ok());
        assert!(validate_clock_time("9:05").is_ok());
        assert!(validate_clock_time("23:59").is_ok());
        assert!(validate_clock_time("00:00").is_ok());

        assert!(validate_clock_time("24:00").is_err());
        assert!(validate_clock_time("12:60").is_err());
        assert!(validate_clock_time("12:5").is_err());
        assert!(validate_clock_time("12:00:00").is_err());
        assert!(validate_clock_time("noon").is_err());
        assert!(validate_clock_time("").is_err());
    }

    #[test]
    fn test_normalize_clock_time() {
        assert_eq!(normalize_clock_time("09:00"), "09:00:00");
        assert_eq!(normalize_clock_time("9:15"), "09:15:00");
        assert_eq!(normalize_clock_time("17:30:00"), "17:30:00");
    }

    #[test]
    fn test_minutes_of_day() {
        assert_eq!(minutes_of_day("00:00").unwrap(), 0);
        assert_eq!(minutes_of_day("09:43:00").unwrap(), 583);
        assert_eq!(minutes_of_day("23:59").unwrap(), 1439);
        assert!(minutes_of_day("25:00").is_err());
        assert!(minutes_of_day("abc").is_err());
    }

    #[test]
    fn test_lookup_window() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 21).unwrap();

        assert_eq!(
            lookup_window(today, None),
            ("2025-05-22".to_string(), "2025-06-21".to_string())
        );
        assert_eq!(
            lookup_window(today, Some("2025-06-01")),
            ("2025-06-01".to_string(), "2025-06-01".to_string())
        );
    }

    #[test]
    fn test_parse_seconds() {
        assert_eq!(parse_seconds(Some(&json!("2580"))), 2580);
        assert_eq!(parse_seconds(Some(&json!(3600))), 3600);
        assert_eq!(parse_seconds(Some(&json!("90s"))), 90);
        assert_eq!(parse_seconds(Some(&json!("n/a"))), 0);
        assert_eq!(parse_seconds(Some(&Value::Null)), 0);
        assert_eq!(parse_seconds(None), 0);
    }

    #[test]
    fn test_seconds_to_hours() {
        assert_eq!(seconds_to_hours(3600), 1.0);
        assert_eq!(seconds_to_hours(2580), 0.72);
        assert_eq!(seconds_to_hours(0), 0.0);
    }

    #[test]
    fn test_is_flag_set() {
        assert!(!is_flag_set(&json!(0)));
        assert!(!is_flag_set(&json!("0")));
        assert!(!is_flag_set(&Value::Null));
        assert!(!is_flag_set(&json!(false)));
        assert!(is_flag_set(&json!(1)));
        assert!(is_flag_set(&json!("1")));
        assert!(is_flag_set(&json!(true)));
    }
}
