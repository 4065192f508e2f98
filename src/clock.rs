use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// Human-readable local time, e.g. "Monday, October 19, 2026 8:15 PM".
pub fn format_local(now: DateTime<Utc>, tz: Tz) -> String {
    now.with_timezone(&tz).format("%A, %B %-d, %Y %-I:%M %p").to_string()
}

pub fn local_now(tz: Tz) -> String {
    format_local(Utc::now(), tz)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_manila_is_utc_plus_eight() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 15, 0).unwrap();
        assert_eq!(format_local(now, chrono_tz::Asia::Manila), "Monday, October 19, 2026 8:15 PM");
    }

    #[test]
    fn test_crosses_midnight() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 17, 5, 0).unwrap();
        assert_eq!(format_local(now, chrono_tz::Asia::Manila), "Friday, January 2, 2026 1:05 AM");
    }
}
