//! Conversion between human-entered time strings and milliseconds.
//!
//! Accepted forms are bare seconds (`5`, `5.5`), `MM:SS[.ms]` and
//! `HH:MM:SS[.ms]`. A `,` decimal separator is treated like `.`, so SRT
//! timestamps parse directly.

use crate::error::{DubError, Result};

const MS_PER_SECOND: u64 = 1_000;
const MS_PER_MINUTE: u64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: u64 = 60 * MS_PER_MINUTE;

/// Parse a time representation into milliseconds.
///
/// `segment` only labels the error message.
pub fn parse(time_repr: &str, segment: impl ToString) -> Result<u64> {
    let trimmed = time_repr.trim();
    let invalid = |reason: &str| DubError::InvalidTimeFormat {
        segment: segment.to_string(),
        reason: format!("{reason}: '{time_repr}'"),
    };

    if trimmed.is_empty() {
        return Err(invalid("Enter time"));
    }

    let normalized = trimmed.replace(',', ".");
    let parts: Vec<&str> = normalized.split(':').collect();

    let (hours, minutes, seconds) = match parts.as_slice() {
        [seconds] => ("0", "0", *seconds),
        [minutes, seconds] => ("0", *minutes, *seconds),
        [hours, minutes, seconds] => (*hours, *minutes, *seconds),
        _ => return Err(invalid("Invalid time format")),
    };

    let hours = parse_whole(hours).ok_or_else(|| invalid("Invalid hours"))?;
    let minutes = parse_whole(minutes).ok_or_else(|| invalid("Invalid minutes"))?;
    let seconds_ms = parse_seconds(seconds).ok_or_else(|| invalid("Invalid seconds"))?;

    hours
        .checked_mul(MS_PER_HOUR)
        .zip(minutes.checked_mul(MS_PER_MINUTE))
        .and_then(|(h, m)| h.checked_add(m))
        .and_then(|hm| hm.checked_add(seconds_ms))
        .ok_or_else(|| invalid("Time out of range"))
}

/// Format milliseconds as `HH:MM:SS,mmm`.
pub fn format(ms: u64) -> String {
    let hours = ms / MS_PER_HOUR;
    let minutes = (ms % MS_PER_HOUR) / MS_PER_MINUTE;
    let seconds = (ms % MS_PER_MINUTE) / MS_PER_SECOND;
    let millis = ms % MS_PER_SECOND;
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
}

fn parse_whole(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Decimal seconds to milliseconds, truncating below one millisecond.
///
/// `None` also covers values too large to express in milliseconds.
fn parse_seconds(s: &str) -> Option<u64> {
    let (whole, fraction) = match s.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (s, ""),
    };

    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let whole_ms = if whole.is_empty() {
        0
    } else {
        parse_whole(whole)?.checked_mul(MS_PER_SECOND)?
    };

    let mut millis = 0;
    for (i, digit) in fraction.bytes().take(3).enumerate() {
        millis += u64::from(digit - b'0') * 10u64.pow(2 - i as u32);
    }

    whole_ms.checked_add(millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_seconds() {
        assert_eq!(parse("5", 1).unwrap(), 5000);
        assert_eq!(parse("5.5", 1).unwrap(), 5500);
        assert_eq!(parse("1.001", 1).unwrap(), 1001);
        assert_eq!(parse(".25", 1).unwrap(), 250);
        assert_eq!(parse(" 16 ", 1).unwrap(), 16000);
    }

    #[test]
    fn test_parse_minutes_seconds() {
        assert_eq!(parse("0:17", 1).unwrap(), 17000);
        assert_eq!(parse("0:20.500", 1).unwrap(), 20500);
        assert_eq!(parse("02:03,040", 1).unwrap(), 123_040);
    }

    #[test]
    fn test_parse_hours_minutes_seconds() {
        assert_eq!(parse("00:00:06", 1).unwrap(), 6000);
        assert_eq!(parse("00:00:11.500", 1).unwrap(), 11500);
        assert_eq!(parse("01:01:01,123", 1).unwrap(), 3_661_123);
    }

    #[test]
    fn test_parse_truncates_sub_millisecond() {
        assert_eq!(parse("1.23456", 1).unwrap(), 1234);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        for bad in ["", "   ", "abc", "1:2:3:4", ":30", "1:", "-5", "1.2.3", "00:xx:10"] {
            let err = parse(bad, 7).unwrap_err();
            match err {
                DubError::InvalidTimeFormat { segment, .. } => assert_eq!(segment, "7"),
                other => panic!("expected InvalidTimeFormat for {bad:?}, got {other}"),
            }
        }
    }

    #[test]
    fn test_parse_rejects_out_of_range_values() {
        for huge in [
            "18446744073709551615:00:00",
            "99999999999999999",
            "0:307445734561825861",
            "18446744073709551.999",
        ] {
            match parse(huge, 3) {
                Err(DubError::InvalidTimeFormat { segment, .. }) => assert_eq!(segment, "3"),
                other => panic!("expected InvalidTimeFormat for {huge:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_format_pads_fields() {
        assert_eq!(format(0), "00:00:00,000");
        assert_eq!(format(1500), "00:00:01,500");
        assert_eq!(format(3_661_123), "01:01:01,123");
        assert_eq!(format(100 * 3_600_000), "100:00:00,000");
    }

    #[test]
    fn test_round_trip() {
        for ms in [0, 1, 999, 1000, 59_999, 60_000, 3_599_999, 3_600_000, 86_399_999, 123_456_789] {
            assert_eq!(parse(&format(ms), "rt").unwrap(), ms);
        }
    }

    #[test]
    fn test_normalization_is_idempotent() {
        for s in ["5.5", "0:17", "00:00:11.500", "1:02:03,004", "42"] {
            let once = parse(s, "n").unwrap();
            assert_eq!(parse(&format(once), "n").unwrap(), once);
        }
    }
}
