use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

const DASH_TS: &str = "%Y-%m-%d %H:%M:%S";
const SLASH_TS: &str = "%Y/%m/%d %H:%M:%S";
// what a sheet with a US locale renders an entered ISO timestamp as
const US_TS: &str = "%m/%d/%Y %H:%M:%S";

/// Parse a request timestamp as written by us or as handed back by the sheet.
/// Zone-less forms are taken as UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    [DASH_TS, SLASH_TS, US_TS]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Current time the way the requests region stores it: `2024-01-02T10:00:00.000Z`.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_rfc3339() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2024-01-02T10:00:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-02T10:00:00.000Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-02T12:00:00+02:00"), Some(expected));
    }

    #[test]
    fn test_sheet_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2024-01-02 10:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2024/01/02 10:00:00"), Some(expected));
        assert_eq!(parse_timestamp("1/2/2024 10:00:00"), Some(expected));
    }

    #[test]
    fn test_garbage() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("   "), None);
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_now_iso_round_trips() {
        let now = now_iso();
        assert!(now.ends_with('Z'));
        assert!(parse_timestamp(&now).is_some());
    }
}
