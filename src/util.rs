use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Parse a stored date. Accepts `YYYY-MM-DD`, RFC 3339 timestamps and
/// SQLite's `YYYY-MM-DD HH:MM:SS`; timestamps are truncated to their UTC date.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    parse_timestamp(raw).map(|ts| ts.date_naive())
}

/// Parse a stored timestamp. Bare dates resolve to midnight UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

pub fn parse_date_opt(raw: Option<String>) -> Option<NaiveDate> {
    raw.as_deref().and_then(parse_date)
}

pub fn parse_timestamp_opt(raw: Option<String>) -> Option<DateTime<Utc>> {
    raw.as_deref().and_then(parse_timestamp)
}

/// Whole days from `from` to `to` (negative when `from` is later).
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    to.signed_duration_since(from).num_days()
}

/// Integer percentage in `[0, 100]` for `part / whole`, 0 when `whole` is 0.
pub fn percent(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    let pct = (part as f64 / whole as f64 * 100.0).round();
    pct.clamp(0.0, 100.0) as u32
}

/// Round to a fixed number of decimal places.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_forms() {
        let expected = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        assert_eq!(parse_date("2025-03-14"), Some(expected));
        assert_eq!(parse_date("2025-03-14T22:10:00Z"), Some(expected));
        assert_eq!(parse_date("2025-03-14 08:00:00"), Some(expected));
        assert_eq!(parse_date("  "), None);
        assert_eq!(parse_date("yesterday"), None);
    }

    #[test]
    fn test_parse_timestamp_from_bare_date() {
        let ts = parse_timestamp("2025-03-14").unwrap();
        assert_eq!(ts.to_rfc3339(), "2025-03-14T00:00:00+00:00");
    }

    #[test]
    fn test_percent_rounds_and_guards_zero() {
        assert_eq!(percent(0, 0), 0);
        assert_eq!(percent(4, 10), 40);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(3, 3), 100);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1.756, 2), 1.76);
        assert_eq!(round_to(3.25, 1), 3.3);
        assert_eq!(round_to(2.0 / 3.0, 2), 0.67);
    }
}
