// Culture-invariant numeric grammar shared by every numeric validator and comparator.
// Symbols are fixed: '.' decimal point, ',' group separator, '+'/'-' signs, '¤' currency.
// Scanning yields an exact digit string; range checks happen per target type.
use std::ops::BitOr;
use std::str::FromStr;

use rust_decimal::Decimal;

use crate::core::error::Error;

const DECIMAL_POINT: char = '.';
const GROUP_SEPARATOR: char = ',';
const CURRENCY_SYMBOL: char = '¤';
const INFINITY_SYMBOL: &str = "Infinity";
const NAN_SYMBOL: &str = "NaN";

/// Exponents beyond this magnitude are clamped; every target over- or underflows long before.
const EXPONENT_LIMIT: i64 = 100_000;

/// Flags selecting which parts of the numeric grammar are accepted.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct NumberStyles(u16);

impl NumberStyles {
    pub const NONE: Self = Self(0);
    pub const LEADING_WHITE: Self = Self(1);
    pub const TRAILING_WHITE: Self = Self(1 << 1);
    pub const LEADING_SIGN: Self = Self(1 << 2);
    pub const TRAILING_SIGN: Self = Self(1 << 3);
    pub const PARENTHESES: Self = Self(1 << 4);
    pub const DECIMAL_POINT: Self = Self(1 << 5);
    pub const THOUSANDS: Self = Self(1 << 6);
    pub const EXPONENT: Self = Self(1 << 7);
    pub const CURRENCY: Self = Self(1 << 8);

    pub const INTEGER: Self = Self::LEADING_WHITE
        .union(Self::TRAILING_WHITE)
        .union(Self::LEADING_SIGN);
    pub const FLOAT: Self = Self::INTEGER
        .union(Self::DECIMAL_POINT)
        .union(Self::EXPONENT);
    pub const NUMBER: Self = Self::INTEGER
        .union(Self::TRAILING_SIGN)
        .union(Self::DECIMAL_POINT)
        .union(Self::THOUSANDS);
    pub const ANY: Self = Self::NUMBER
        .union(Self::PARENTHESES)
        .union(Self::EXPONENT)
        .union(Self::CURRENCY);

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for NumberStyles {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// A scanned literal: `value = digits * 10^exponent`, sign applied separately.
/// `digits` holds no leading or trailing zeros; empty means zero.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ScannedNumber {
    pub negative: bool,
    pub digits: String,
    pub exponent: i64,
}

impl ScannedNumber {
    pub fn is_zero(&self) -> bool {
        self.digits.is_empty()
    }

    /// Number of digits left of the decimal point once the exponent is applied.
    fn integer_len(&self) -> i64 {
        self.digits.len() as i64 + self.exponent
    }
}

/// White space as the invariant grammar sees it: space and `\t` through `\r`.
pub fn is_white(ch: char) -> bool {
    ch == ' ' || ('\u{9}'..='\u{d}').contains(&ch)
}

pub fn scan_number(input: &str, styles: NumberStyles) -> Option<ScannedNumber> {
    let mut chars = input.chars().peekable();

    let mut negative = false;
    let mut signed = false;
    let mut parens = false;
    let mut currency = false;

    while let Some(&ch) = chars.peek() {
        if is_white(ch) && styles.contains(NumberStyles::LEADING_WHITE) && !signed {
        } else if (ch == '+' || ch == '-') && styles.contains(NumberStyles::LEADING_SIGN) && !signed
        {
            signed = true;
            negative = ch == '-';
        } else if ch == '(' && styles.contains(NumberStyles::PARENTHESES) && !signed {
            signed = true;
            parens = true;
            negative = true;
        } else if ch == CURRENCY_SYMBOL && styles.contains(NumberStyles::CURRENCY) && !currency {
            currency = true;
        } else {
            break;
        }
        chars.next();
    }

    let mut integer_digits = String::new();
    let mut fraction_digits = String::new();
    let mut seen_digit = false;
    let mut seen_point = false;

    while let Some(&ch) = chars.peek() {
        if ch.is_ascii_digit() {
            seen_digit = true;
            if seen_point {
                fraction_digits.push(ch);
            } else {
                integer_digits.push(ch);
            }
        } else if ch == DECIMAL_POINT && styles.contains(NumberStyles::DECIMAL_POINT) && !seen_point
        {
            seen_point = true;
        } else if ch == GROUP_SEPARATOR
            && styles.contains(NumberStyles::THOUSANDS)
            && seen_digit
            && !seen_point
        {
        } else {
            break;
        }
        chars.next();
    }

    if !seen_digit {
        return None;
    }

    let mut exponent: i64 = 0;
    if styles.contains(NumberStyles::EXPONENT) && matches!(chars.peek(), Some('e' | 'E')) {
        let mut lookahead = chars.clone();
        lookahead.next();
        let mut exponent_negative = false;
        if let Some(&sign) = lookahead.peek().filter(|ch| matches!(ch, '+' | '-')) {
            exponent_negative = sign == '-';
            lookahead.next();
        }
        if matches!(lookahead.peek(), Some(ch) if ch.is_ascii_digit()) {
            while let Some(&ch) = lookahead.peek() {
                let Some(digit) = ch.to_digit(10) else {
                    break;
                };
                exponent = (exponent * 10 + i64::from(digit)).min(EXPONENT_LIMIT);
                lookahead.next();
            }
            if exponent_negative {
                exponent = -exponent;
            }
            chars = lookahead;
        }
    }

    let mut closed = false;
    while let Some(&ch) = chars.peek() {
        if is_white(ch) && styles.contains(NumberStyles::TRAILING_WHITE) {
        } else if (ch == '+' || ch == '-')
            && styles.contains(NumberStyles::TRAILING_SIGN)
            && !signed
        {
            signed = true;
            negative = ch == '-';
        } else if ch == ')' && parens && !closed {
            closed = true;
        } else if ch == CURRENCY_SYMBOL && styles.contains(NumberStyles::CURRENCY) && !currency {
            currency = true;
        } else {
            break;
        }
        chars.next();
    }

    if parens && !closed {
        return None;
    }
    if !chars.all(|ch| ch == '\0') {
        return None;
    }

    let fraction_len = fraction_digits.len() as i64;
    let mut digits = integer_digits;
    digits.push_str(&fraction_digits);
    let leading = digits.len() - digits.trim_start_matches('0').len();
    digits.replace_range(..leading, "");
    let trimmed_len = digits.trim_end_matches('0').len();
    let trailing = digits.len() - trimmed_len;
    digits.truncate(trimmed_len);

    Some(ScannedNumber {
        negative,
        digits,
        exponent: (exponent - fraction_len + trailing as i64).clamp(-EXPONENT_LIMIT, EXPONENT_LIMIT),
    })
}

/// A type with a textual grammar under the invariant number styles.
pub trait ParseNumber: Sized {
    const TYPE_NAME: &'static str;
    /// Styles the type's plain `parse` accepts when no styles are given.
    const DEFAULT_STYLES: NumberStyles;

    fn from_scanned(scanned: &ScannedNumber) -> Option<Self>;

    /// Non-numeric spellings (`Infinity`, `NaN`) for types that have them.
    fn from_symbol(_input: &str, _styles: NumberStyles) -> Option<Self> {
        None
    }
}

pub fn parse_number<T: ParseNumber>(input: &str, styles: NumberStyles) -> Result<T, Error> {
    let parsed = match scan_number(input, styles) {
        Some(scanned) => T::from_scanned(&scanned),
        None => T::from_symbol(input, styles),
    };
    parsed.ok_or_else(|| {
        Error::parse(format!("not a valid {}", T::TYPE_NAME)).with_input(input)
    })
}

pub fn is_number<T: ParseNumber>(input: &str, styles: NumberStyles) -> bool {
    parse_number::<T>(input, styles).is_ok()
}

fn integer_from_scanned(scanned: &ScannedNumber) -> Option<i128> {
    if scanned.is_zero() {
        return Some(0);
    }
    // Trailing zeros are already folded into the exponent, so a negative one means a real fraction.
    if scanned.exponent < 0 || scanned.integer_len() > 39 {
        return None;
    }
    let mut value: i128 = 0;
    for digit in scanned.digits.bytes() {
        value = value.checked_mul(10)?.checked_add(i128::from(digit - b'0'))?;
    }
    for _ in 0..scanned.exponent {
        value = value.checked_mul(10)?;
    }
    if scanned.negative {
        value = -value;
    }
    Some(value)
}

macro_rules! integer_number {
    ($ty:ty, $name:literal) => {
        impl ParseNumber for $ty {
            const TYPE_NAME: &'static str = $name;
            const DEFAULT_STYLES: NumberStyles = NumberStyles::INTEGER;

            fn from_scanned(scanned: &ScannedNumber) -> Option<Self> {
                integer_from_scanned(scanned).and_then(|value| <$ty>::try_from(value).ok())
            }
        }
    };
}

integer_number!(i8, "sbyte");
integer_number!(u8, "byte");
integer_number!(i16, "short");
integer_number!(u16, "ushort");
integer_number!(i32, "int");
integer_number!(u32, "uint");
integer_number!(i64, "long");
integer_number!(u64, "ulong");

fn scientific_text(scanned: &ScannedNumber) -> String {
    let sign = if scanned.negative { "-" } else { "" };
    if scanned.is_zero() {
        return format!("{sign}0");
    }
    format!("{sign}{}e{}", scanned.digits, scanned.exponent)
}

/// Matches `Infinity`, `-Infinity` and `NaN` (optionally signed), case-insensitively.
fn float_symbol(input: &str, styles: NumberStyles) -> Option<f64> {
    let mut text = input;
    if styles.contains(NumberStyles::LEADING_WHITE) {
        text = text.trim_start_matches(is_white);
    }
    if styles.contains(NumberStyles::TRAILING_WHITE) {
        text = text.trim_end_matches(is_white);
    }
    let (negative, body) = match text.chars().next() {
        Some(sign @ ('+' | '-')) if styles.contains(NumberStyles::LEADING_SIGN) => {
            (sign == '-', &text[1..])
        }
        _ => (false, text),
    };
    if body.eq_ignore_ascii_case(INFINITY_SYMBOL) {
        Some(if negative {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        })
    } else if body.eq_ignore_ascii_case(NAN_SYMBOL) {
        Some(f64::NAN)
    } else {
        None
    }
}

impl ParseNumber for f32 {
    const TYPE_NAME: &'static str = "float";
    const DEFAULT_STYLES: NumberStyles = NumberStyles::FLOAT.union(NumberStyles::THOUSANDS);

    fn from_scanned(scanned: &ScannedNumber) -> Option<Self> {
        f32::from_str(&scientific_text(scanned))
            .ok()
            .filter(|value| value.is_finite())
    }

    fn from_symbol(input: &str, styles: NumberStyles) -> Option<Self> {
        float_symbol(input, styles).map(|value| value as f32)
    }
}

impl ParseNumber for f64 {
    const TYPE_NAME: &'static str = "double";
    const DEFAULT_STYLES: NumberStyles = NumberStyles::FLOAT.union(NumberStyles::THOUSANDS);

    fn from_scanned(scanned: &ScannedNumber) -> Option<Self> {
        f64::from_str(&scientific_text(scanned))
            .ok()
            .filter(|value| value.is_finite())
    }

    fn from_symbol(input: &str, styles: NumberStyles) -> Option<Self> {
        float_symbol(input, styles)
    }
}

/// Largest scale `Decimal` keeps; digits beyond it round away.
const DECIMAL_MAX_SCALE: i64 = 28;
const DECIMAL_MAX_INTEGER_DIGITS: i64 = 29;

impl ParseNumber for Decimal {
    const TYPE_NAME: &'static str = "decimal";
    const DEFAULT_STYLES: NumberStyles = NumberStyles::NUMBER;

    fn from_scanned(scanned: &ScannedNumber) -> Option<Self> {
        if scanned.is_zero() || scanned.integer_len() < -DECIMAL_MAX_SCALE {
            return Some(Decimal::ZERO);
        }
        if scanned.integer_len() > DECIMAL_MAX_INTEGER_DIGITS {
            return None;
        }
        let mut text = String::with_capacity(scanned.digits.len() + 32);
        if scanned.negative {
            text.push('-');
        }
        if scanned.exponent >= 0 {
            text.push_str(&scanned.digits);
            text.extend(std::iter::repeat_n('0', scanned.exponent as usize));
        } else if scanned.integer_len() > 0 {
            let (whole, fraction) = scanned.digits.split_at(scanned.integer_len() as usize);
            text.push_str(whole);
            text.push('.');
            text.push_str(fraction);
        } else {
            text.push_str("0.");
            text.extend(std::iter::repeat_n('0', (-scanned.integer_len()) as usize));
            text.push_str(&scanned.digits);
        }
        Decimal::from_str(&text).ok()
    }
}
