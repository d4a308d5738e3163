// Duration grammars: ISO-8601 (`P1Y2MT2H`) and the native clock form (`1.02:14:18.5`).
// Both parse into `time::Duration`; overflow is a parse failure, never a wrap.
use time::Duration;

use crate::core::error::Error;
use crate::core::number::is_white;

const DAYS_PER_YEAR: i64 = 365;
const DAYS_PER_MONTH: i64 = 30;
const MAX_FRACTION_DIGITS: usize = 7;
/// Largest whole-day magnitude a native duration may carry.
const MAX_DAYS: i64 = 10_675_199;

/// `-?P[nY][nM][nD][T[nH][nM][n[.n]S]]`, at least one component overall and after `T`.
pub fn parse_iso8601_duration(input: &str) -> Result<Duration, Error> {
    iso8601(input).ok_or_else(|| Error::parse("not a valid ISO-8601 duration").with_input(input))
}

fn iso8601(input: &str) -> Option<Duration> {
    let (negative, rest) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input),
    };
    let mut rest = rest.strip_prefix('P')?;

    let mut total = Duration::ZERO;
    let mut components = 0;
    let mut in_time = false;
    // Designators must appear in this order; the index only moves forward.
    let date_units: [(char, i64); 3] = [
        ('Y', DAYS_PER_YEAR * 86_400),
        ('M', DAYS_PER_MONTH * 86_400),
        ('D', 86_400),
    ];
    let time_units: [(char, i64); 3] = [('H', 3_600), ('M', 60), ('S', 1)];
    let mut next_unit = 0;

    while !rest.is_empty() {
        if rest.starts_with('T') {
            if in_time {
                return None;
            }
            in_time = true;
            next_unit = 0;
            rest = &rest[1..];
            if rest.is_empty() {
                return None;
            }
            continue;
        }

        let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
        if digits_len == 0 {
            return None;
        }
        let (digits, tail) = rest.split_at(digits_len);
        let whole: i64 = digits.parse().ok()?;

        let (fraction_nanos, tail) = match tail.strip_prefix('.') {
            Some(after) if in_time => {
                let len = after.bytes().take_while(u8::is_ascii_digit).count();
                if len == 0 {
                    return None;
                }
                let (fraction, after) = after.split_at(len);
                (fraction_to_nanos(fraction), after)
            }
            Some(_) => return None,
            None => (0, tail),
        };

        let designator = tail.chars().next()?;
        let units = if in_time { &time_units } else { &date_units };
        let offset = units[next_unit..]
            .iter()
            .position(|(unit, _)| *unit == designator)?;
        let (unit, seconds) = units[next_unit + offset];
        if fraction_nanos != 0 && unit != 'S' {
            return None;
        }
        next_unit += offset + 1;

        let component = Duration::seconds(whole.checked_mul(seconds)?)
            .checked_add(Duration::nanoseconds(i64::from(fraction_nanos)))?;
        total = total.checked_add(component)?;
        components += 1;
        rest = &tail[designator.len_utf8()..];
    }

    if components == 0 {
        return None;
    }
    Some(if negative { -total } else { total })
}

/// Fractions beyond nanosecond precision are truncated.
fn fraction_to_nanos(fraction: &str) -> u32 {
    let kept = &fraction[..fraction.len().min(9)];
    let value: u32 = kept.parse().unwrap_or(0);
    value * 10u32.pow((9 - kept.len()) as u32)
}

/// `[ws][-]{ d | [d.]hh:mm[:ss[.fffffff]] | d:hh:mm:ss[.fffffff] }[ws]`.
pub fn parse_native_duration(input: &str) -> Result<Duration, Error> {
    native(input).ok_or_else(|| Error::parse("not a valid duration").with_input(input))
}

fn native(input: &str) -> Option<Duration> {
    let trimmed = input.trim_matches(is_white);
    let (negative, body) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };

    let parts: Vec<&str> = body.split(':').collect();
    let (days, hours, minutes, seconds) = match parts.as_slice() {
        [days] => (unsigned(days)?, "0", "0", "0"),
        [days, hours, minutes, seconds] => (unsigned(days)?, *hours, *minutes, *seconds),
        [first, minutes] => {
            let (days, hours) = split_days(first)?;
            (days, hours, *minutes, "0")
        }
        [first, minutes, seconds] => {
            let (days, hours) = split_days(first)?;
            (days, hours, *minutes, *seconds)
        }
        _ => return None,
    };

    let (seconds, nanos) = match seconds.split_once('.') {
        Some((_, fraction))
            if fraction.is_empty()
                || fraction.len() > MAX_FRACTION_DIGITS
                || !fraction.bytes().all(|b| b.is_ascii_digit()) =>
        {
            return None;
        }
        Some((seconds, fraction)) => (seconds, fraction_to_nanos(fraction)),
        None => (seconds, 0),
    };

    let total = days * 86_400
        + clock_field(hours, 23)? * 3_600
        + clock_field(minutes, 59)? * 60
        + clock_field(seconds, 59)?;
    let duration = Duration::new(total, nanos as i32);
    if duration.whole_days() > MAX_DAYS {
        return None;
    }
    Some(if negative { -duration } else { duration })
}

/// `d.hh` or `hh` in the leading clock field.
fn split_days(field: &str) -> Option<(i64, &str)> {
    match field.split_once('.') {
        Some((days, hours)) => Some((unsigned(days)?, hours)),
        None => Some((0, field)),
    }
}

fn unsigned(field: &str) -> Option<i64> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value: i64 = field.parse().ok()?;
    (value <= MAX_DAYS).then_some(value)
}

fn clock_field(field: &str, max: i64) -> Option<i64> {
    if field.is_empty() || field.len() > 2 {
        return None;
    }
    unsigned(field).filter(|value| *value <= max)
}

#[cfg(test)]
mod tests {
    use super::{parse_iso8601_duration, parse_native_duration};
    use time::Duration;

    #[test]
    fn iso8601_accepts_ordered_components() {
        assert_eq!(
            parse_iso8601_duration("P1Y2MT2H").unwrap(),
            Duration::days(365 + 60) + Duration::hours(2)
        );
        assert_eq!(parse_iso8601_duration("PT1.5S").unwrap(), Duration::milliseconds(1500));
        assert_eq!(parse_iso8601_duration("-P1D").unwrap(), Duration::days(-1));
        assert_eq!(parse_iso8601_duration("PT0S").unwrap(), Duration::ZERO);
        assert_eq!(parse_iso8601_duration("P1MT1M").unwrap(), Duration::days(30) + Duration::minutes(1));
    }

    #[test]
    fn iso8601_rejects_malformed_input() {
        for input in [
            "", "P", "PT", "P1", "02:14:18", "P1D2Y", "P1H", "PT1D", "P1.5D", "P1DT", "1D",
            "PP1D", "P1YT1H2H", "P-1D", "P99999999999999999999Y",
        ] {
            assert!(parse_iso8601_duration(input).is_err(), "{input:?}");
        }
    }

    #[test]
    fn native_accepts_clock_forms() {
        assert_eq!(
            parse_native_duration("02:14:18").unwrap(),
            Duration::hours(2) + Duration::minutes(14) + Duration::seconds(18)
        );
        assert_eq!(parse_native_duration("6").unwrap(), Duration::days(6));
        assert_eq!(parse_native_duration("6:12").unwrap(), Duration::hours(6) + Duration::minutes(12));
        assert_eq!(
            parse_native_duration("1.02:03").unwrap(),
            Duration::days(1) + Duration::hours(2) + Duration::minutes(3)
        );
        assert_eq!(
            parse_native_duration(" -1:02:03:04.5 ").unwrap(),
            -(Duration::days(1)
                + Duration::hours(2)
                + Duration::minutes(3)
                + Duration::seconds(4)
                + Duration::milliseconds(500))
        );
        assert_eq!(
            parse_native_duration("00:00:01.0000001").unwrap(),
            Duration::seconds(1) + Duration::nanoseconds(100)
        );
    }

    #[test]
    fn native_rejects_out_of_range_and_malformed() {
        for input in [
            "", "-", "P1Y2MT2H", "24:00", "10:60", "10:00:60", "1.", "1.2", "10:00.5",
            "00:00:01.12345678", "10675200", "1:2:3:4:5", "ab:cd", "+1:00",
        ] {
            assert!(parse_native_duration(input).is_err(), "{input:?}");
        }
    }
}
