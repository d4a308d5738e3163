//! Purpose: Boolean "is this text a valid T" predicates for every scalar UDF validator.
//! Exports: `is_int` .. `is_decimal`, `is_bool`, `is_char`, `is_guid`, range predicates,
//! `date_is_valid`, `is_uri`, `regex_is_match`, duration checks, `new_guid`.
//! Role: Total functions over any input string; parse errors reduce to `false` here.
//! Invariants: Numeric validators accept the invariant `ANY` number style.
//! Invariants: No validator panics, allocates unboundedly, or touches shared state.

use regex::Regex;
use rust_decimal::Decimal;
use tracing::debug;
use url::{ParseError, Url};
use uuid::Uuid;

use crate::core::datetime::{FORMAT_SEPARATOR, parse_with_formats};
use crate::core::duration::{parse_iso8601_duration, parse_native_duration};
use crate::core::number::{NumberStyles, is_number, is_white, parse_number};

macro_rules! numeric_validator {
    ($($(#[$meta:meta])* $name:ident => $ty:ty),+ $(,)?) => {
        $(
            $(#[$meta])*
            pub fn $name(input: &str) -> bool {
                is_number::<$ty>(input, NumberStyles::ANY)
            }
        )+
    };
}

numeric_validator! {
    /// `"2,147,483,647"` is valid, `"2,147,483,648"` is not.
    is_int => i32,
    is_uint => u32,
    is_byte => u8,
    is_sbyte => i8,
    is_short => i16,
    is_ushort => u16,
    is_long => i64,
    is_ulong => u64,
    /// Finite literals that overflow to infinity are rejected.
    is_float => f32,
    is_double => f64,
    is_decimal => Decimal,
}

/// `"1"`, `"0"`, or `true`/`false` in any case with surrounding white space.
pub fn is_bool(input: &str) -> bool {
    if input == "1" || input == "0" {
        return true;
    }
    let trimmed = input.trim_matches(|ch| is_white(ch) || ch == '\0');
    trimmed.eq_ignore_ascii_case("true") || trimmed.eq_ignore_ascii_case("false")
}

/// Exactly one UTF-16 code unit, so astral characters do not qualify.
pub fn is_char(input: &str) -> bool {
    input.encode_utf16().count() == 1
}

pub fn is_guid(input: &str) -> bool {
    let trimmed = input.trim_matches(is_white);
    let wrapped = [('{', '}'), ('(', ')')]
        .into_iter()
        .find_map(|(open, close)| trimmed.strip_prefix(open)?.strip_suffix(close));
    match wrapped {
        Some(inner) => inner.len() == 36 && Uuid::try_parse(inner).is_ok(),
        None => matches!(trimmed.len(), 32 | 36) && Uuid::try_parse(trimmed).is_ok(),
    }
}

pub fn new_guid() -> Uuid {
    Uuid::new_v4()
}

/// A valid `long` narrowed to 32 bits; values outside the `int` range are not applicable.
fn narrowed_int(input: &str) -> Option<i32> {
    let value: i64 = parse_number(input, NumberStyles::ANY).ok()?;
    i32::try_from(value).ok()
}

pub fn is_non_positive_int(input: &str) -> bool {
    narrowed_int(input).is_some_and(|value| value <= 0)
}

pub fn is_non_negative_int(input: &str) -> bool {
    narrowed_int(input).is_some_and(|value| value >= 0)
}

pub fn is_positive_int(input: &str) -> bool {
    narrowed_int(input).is_some_and(|value| value > 0)
}

pub fn is_negative_int(input: &str) -> bool {
    narrowed_int(input).is_some_and(|value| value < 0)
}

/// True when any pattern in the `|`-separated list matches the whole input.
pub fn date_is_valid(input: &str, formats: &str) -> bool {
    parse_with_formats(input, formats).is_ok()
}

/// Accepts absolute and relative references. A non-empty first scheme entry
/// restricts the result to absolute URIs whose scheme is listed.
pub fn is_uri(input: &str, schemes: &str) -> bool {
    let absolute = match Url::parse(input) {
        Ok(url) => Some(url),
        Err(ParseError::RelativeUrlWithoutBase) => {
            if !is_relative_reference(input) {
                return false;
            }
            None
        }
        Err(err) => {
            debug!(input, error = %err, "uri rejected");
            return false;
        }
    };

    let mut allowed = schemes.split(FORMAT_SEPARATOR).peekable();
    if allowed.peek().is_none_or(|first| first.is_empty()) {
        return true;
    }
    match absolute {
        Some(url) => allowed.any(|scheme| scheme.eq_ignore_ascii_case(url.scheme())),
        None => false,
    }
}

fn is_relative_reference(input: &str) -> bool {
    // Any hierarchical base works; only the reference itself is under test.
    Url::parse("http://localhost/")
        .and_then(|base| base.join(input))
        .is_ok()
}

/// Unanchored search; an invalid pattern matches nothing.
pub fn regex_is_match(input: &str, pattern: &str) -> bool {
    match Regex::new(pattern) {
        Ok(regex) => regex.is_match(input),
        Err(err) => {
            debug!(pattern, error = %err, "invalid regex pattern");
            false
        }
    }
}

/// `"P1Y2MT2H"` style.
pub fn is_iso8601_duration(input: &str) -> bool {
    parse_iso8601_duration(input).is_ok()
}

/// `"1.02:14:18.5"` style.
pub fn is_native_duration(input: &str) -> bool {
    parse_native_duration(input).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_validators_honor_ranges() {
        assert!(is_int("2,147,483,647"));
        assert!(!is_int("2,147,483,648"));
        assert!(is_int(" -2147483648 "));
        assert!(is_uint("4,294,967,295"));
        assert!(!is_uint("4,294,967,296"));
        assert!(is_byte("254.0"));
        assert!(!is_byte("254.5"));
        assert!(!is_byte("256"));
        assert!(is_sbyte("(128)"));
        assert!(!is_sbyte("128"));
        assert!(is_ushort("65535"));
        assert!(!is_short("32768"));
        assert!(is_ulong("18446744073709551615"));
        assert!(!is_long("9223372036854775808"));
        assert!(is_float("3.4E38"));
        assert!(!is_float("3.4E39"));
        assert!(is_double("1.7E308"));
        assert!(!is_double("1.7E309"));
        assert!(is_decimal("79228162514264337593543950335"));
        assert!(!is_decimal("79228162514264337593543950336"));
        assert!(!is_int(""));
        assert!(!is_int("twelve"));
    }

    #[test]
    fn bool_accepts_digits_and_literals() {
        for input in ["1", "0", "true", "FALSE", " True ", "false\0"] {
            assert!(is_bool(input), "{input:?}");
        }
        for input in ["", "2", "yes", " 1", "truee", "t"] {
            assert!(!is_bool(input), "{input:?}");
        }
    }

    #[test]
    fn char_counts_utf16_units() {
        assert!(is_char("a"));
        assert!(is_char("é"));
        assert!(!is_char(""));
        assert!(!is_char("ab"));
        assert!(!is_char("😀"));
    }

    #[test]
    fn guid_accepts_canonical_forms_only() {
        let guid = "6f9619ff-8b86-d011-b42d-00c04fc964ff";
        for input in [
            guid.to_string(),
            guid.replace('-', ""),
            format!("{{{guid}}}"),
            format!("({guid})"),
            format!("  {}  ", guid.to_uppercase()),
        ] {
            assert!(is_guid(&input), "{input:?}");
        }
        for input in [
            String::new(),
            format!("urn:uuid:{guid}"),
            format!("{{{}}}", guid.replace('-', "")),
            format!("({guid}}}"),
            guid[..35].to_string(),
        ] {
            assert!(!is_guid(&input), "{input:?}");
        }
        assert!(is_guid(&new_guid().to_string()));
    }

    #[test]
    fn range_predicates_reject_values_outside_int() {
        assert!(is_positive_int("2147483647"));
        assert!(is_negative_int("-2147483648"));
        assert!(is_non_positive_int("0"));
        assert!(is_non_negative_int("0"));
        assert!(!is_positive_int("0"));
        assert!(!is_negative_int("0"));
        for input in ["2147483648", "-2147483649", "9223372036854775807"] {
            assert!(!is_positive_int(input), "{input}");
            assert!(!is_negative_int(input), "{input}");
            assert!(!is_non_positive_int(input), "{input}");
            assert!(!is_non_negative_int(input), "{input}");
        }
        assert!(!is_positive_int("1.5"));
    }

    #[test]
    fn uri_scheme_filter() {
        assert!(is_uri("http://www.cint.io", "http"));
        assert!(is_uri("http://www.cint.io", "HTTPS|Http"));
        assert!(is_uri("file://myfile.txt", "file"));
        assert!(!is_uri("http://www.cint.io", "mailto|uuid"));
        assert!(is_uri("http://www.cint.io", ""));
        assert!(is_uri("docs/index.html", ""));
        assert!(!is_uri("docs/index.html", "http"));
        assert!(!is_uri("http://[::1", ""));
    }

    #[test]
    fn regex_searches_without_anchoring() {
        assert!(regex_is_match("12345", r"\d{5}"));
        assert!(regex_is_match("zip 12345 here", r"\d{5}"));
        assert!(!regex_is_match("this is a 123 test", r"\w+\d{3}\w+"));
        assert!(!regex_is_match("anything", "("));
    }

    #[test]
    fn durations_use_distinct_grammars() {
        assert!(is_iso8601_duration("P1Y2MT2H"));
        assert!(!is_iso8601_duration("02:14:18"));
        assert!(is_native_duration("02:14:18"));
        assert!(!is_native_duration("P1Y2MT2H"));
    }
}
