//! Clock string parsing.
//!
//! Session times arrive as `H:M:S.f`, `M:S.f` or `S.f` with an optional
//! leading sign and 1-9 fractional digits (truncated to microseconds).
//! Wall-clock dates arrive as `YYYY-MM-DDTHH:MM:SS[.f][Z]` or with an
//! RFC 3339 offset.

use chrono::{DateTime, NaiveDateTime, TimeDelta, Timelike};
use contracts::SessionTime;

const UTC_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Parse a session clock string. Returns `None` for anything malformed.
pub fn parse_session_time(text: &str) -> Option<SessionTime> {
    let text = text.trim();
    let (negative, body) = match text.as_bytes().first()? {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };

    let fields: Vec<&str> = body.split(':').collect();
    let (hours, minutes, seconds) = match fields.as_slice() {
        [h, m, s] => (*h, *m, *s),
        [m, s] => ("0", *m, *s),
        [s] => ("0", "0", *s),
        _ => return None,
    };

    let (whole, fraction) = seconds.split_once('.').unwrap_or((seconds, ""));
    let micros = parse_micros(fraction)?;

    let total_seconds = parse_digits(hours)?
        .checked_mul(3600)?
        .checked_add(parse_digits(minutes)?.checked_mul(60)?)?
        .checked_add(parse_digits(whole)?)?;
    let total_micros = total_seconds.checked_mul(1_000_000)?.checked_add(micros)?;

    let time = TimeDelta::microseconds(total_micros);
    Some(if negative { -time } else { time })
}

/// Parse a UTC date string, truncated to microseconds.
///
/// Accepts the feed's naive form with an optional trailing `Z`, and falls
/// back to RFC 3339 with an explicit offset.
pub fn parse_utc(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    let parsed = NaiveDateTime::parse_from_str(text.trim_end_matches('Z'), UTC_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(text).map(|date| date.naive_utc()))
        .ok()?;
    parsed.with_nanosecond(parsed.nanosecond() / 1000 * 1000)
}

fn parse_digits(text: &str) -> Option<i64> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// Fractional seconds to microseconds: right-padded or truncated to 6 digits
fn parse_micros(fraction: &str) -> Option<i64> {
    if fraction.is_empty() {
        return Some(0);
    }
    if !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let mut digits: String = fraction.chars().take(6).collect();
    while digits.len() < 6 {
        digits.push('0');
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_full_clock() {
        assert_eq!(
            parse_session_time("01:02:03.456"),
            Some(TimeDelta::milliseconds(3_723_456))
        );
    }

    #[test]
    fn test_short_forms() {
        assert_eq!(
            parse_session_time("1:30.5"),
            Some(TimeDelta::milliseconds(90_500))
        );
        assert_eq!(
            parse_session_time("24.3564"),
            Some(TimeDelta::microseconds(24_356_400))
        );
        assert_eq!(parse_session_time("12"), Some(TimeDelta::seconds(12)));
    }

    #[test]
    fn test_signed_gap_strings() {
        assert_eq!(
            parse_session_time("+1.234"),
            Some(TimeDelta::milliseconds(1_234))
        );
        assert_eq!(
            parse_session_time("-0.5"),
            Some(TimeDelta::milliseconds(-500))
        );
    }

    #[test]
    fn test_fraction_truncated_to_micros() {
        assert_eq!(
            parse_session_time("0.1234567"),
            Some(TimeDelta::microseconds(123_456))
        );
    }

    #[test]
    fn test_rejects_garbage() {
        assert_eq!(parse_session_time(""), None);
        assert_eq!(parse_session_time("1L"), None);
        assert_eq!(parse_session_time("LAP 1"), None);
        assert_eq!(parse_session_time("1:2:3:4"), None);
        assert_eq!(parse_session_time("+"), None);
    }

    #[test]
    fn test_parse_utc() {
        let date = parse_utc("2020-08-08T09:45:03.0619797Z").unwrap();
        assert_eq!(
            date,
            NaiveDate::from_ymd_opt(2020, 8, 8)
                .unwrap()
                .and_hms_micro_opt(9, 45, 3, 61_979)
                .unwrap()
        );

        let plain = parse_utc("2020-12-13T13:27:15").unwrap();
        assert_eq!(plain.and_utc().timestamp_subsec_micros(), 0);

        assert_eq!(parse_utc("2020-12-13 13:27:15"), None);
        assert_eq!(parse_utc("2020-13-13T13:27:15"), None);
    }

    #[test]
    fn test_parse_utc_with_offset() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 2)
            .unwrap()
            .and_hms_milli_opt(15, 0, 1, 100)
            .unwrap();
        assert_eq!(parse_utc("2024-03-02T15:00:01.1Z"), Some(expected));
        assert_eq!(parse_utc("2024-03-02T15:00:01.1+00:00"), Some(expected));
        assert_eq!(
            parse_utc("2024-03-02T16:00:01.1+01:00"),
            Some(expected)
        );
    }
}
