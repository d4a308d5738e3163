// Exact date/time parsing against invariant-culture format patterns.
// A pattern must consume the whole input; there is no white-space leniency.
// Values carrying a UTC offset are normalized to UTC so they compare by instant.
use time::{Date, Duration, Month, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset, Weekday};
use tracing::debug;

use crate::core::error::{Error, ErrorKind};

pub const FORMAT_SEPARATOR: char = '|';

const MAX_FRACTION_DIGITS: usize = 7;
const MAX_YEAR_DIGITS: usize = 9;
const MIN_YEAR: i32 = 1;
const MAX_YEAR: i32 = 9999;
/// Two-digit years resolve into the century window ending here.
const TWO_DIGIT_YEAR_MAX: i32 = 2049;
const MAX_OFFSET_HOURS: u32 = 14;

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const DAY_NAMES: [(&str, Weekday); 7] = [
    ("Sunday", Weekday::Sunday),
    ("Monday", Weekday::Monday),
    ("Tuesday", Weekday::Tuesday),
    ("Wednesday", Weekday::Wednesday),
    ("Thursday", Weekday::Thursday),
    ("Friday", Weekday::Friday),
    ("Saturday", Weekday::Saturday),
];

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Token {
    Year(usize),
    Month(usize),
    Day(usize),
    Hour { len: usize, twelve: bool },
    Minute(usize),
    Second(usize),
    Fraction { len: usize, optional: bool },
    Designator(usize),
    Offset(usize),
    OffsetOrUtc,
    Era,
    Literal(char),
}

/// A compiled format pattern, e.g. `yyyyMMdd` or `dd/MM/yyyy HH:mm`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DatePattern {
    source: String,
    tokens: Vec<Token>,
}

impl DatePattern {
    pub fn parse(pattern: &str) -> Result<Self, Error> {
        let mut chars = pattern.chars();
        let tokens = match (chars.next(), chars.next()) {
            (None, _) => return Err(pattern_error(pattern, "format pattern is empty")),
            (Some(standard), None) => {
                let expanded = standard_pattern(standard).ok_or_else(|| {
                    pattern_error(pattern, "unknown standard format specifier")
                        .with_hint("Single-character patterns must be one of d D f F g G m M o O r R s t T u U y Y.")
                })?;
                tokenize(expanded).map_err(|err| err.with_input(pattern))?
            }
            _ => tokenize(pattern)?,
        };
        Ok(Self {
            source: pattern.to_string(),
            tokens,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Parses `input`, resolving absent date parts against the current UTC date.
    pub fn parse_exact(&self, input: &str) -> Result<PrimitiveDateTime, Error> {
        self.parse_exact_on(input, OffsetDateTime::now_utc().date())
    }

    pub fn parse_exact_on(&self, input: &str, today: Date) -> Result<PrimitiveDateTime, Error> {
        let fields = self
            .match_fields(input)
            .ok_or_else(|| self.mismatch(input, "input does not match format"))?;
        fields
            .resolve(today)
            .ok_or_else(|| self.mismatch(input, "input is not a representable date/time"))
    }

    fn mismatch(&self, input: &str, message: &str) -> Error {
        Error::parse(format!("{message} `{}`", self.source)).with_input(input)
    }

    fn match_fields(&self, input: &str) -> Option<Fields> {
        let mut cursor = Cursor { rest: input };
        let mut fields = Fields::default();
        let mut tokens = self.tokens.iter().peekable();

        while let Some(token) = tokens.next() {
            match *token {
                Token::Year(len) => {
                    let year = if len <= 2 {
                        to_four_digit_year(cursor.digits_for(len)? as i32)
                    } else if len <= MAX_YEAR_DIGITS {
                        cursor.digits(len, len)? as i32
                    } else {
                        return None;
                    };
                    set(&mut fields.year, year)?;
                }
                Token::Month(len) => {
                    let month = match len {
                        1 | 2 => cursor.digits_for(len)?,
                        3 => cursor.name_index(MONTH_NAMES.iter().map(|name| &name[..3]))? as u32 + 1,
                        _ => cursor.name_index(MONTH_NAMES.iter().copied())? as u32 + 1,
                    };
                    set(&mut fields.month, month)?;
                }
                Token::Day(len) => match len {
                    1 | 2 => set(&mut fields.day, cursor.digits_for(len)?)?,
                    3 => {
                        let index = cursor.name_index(DAY_NAMES.iter().map(|(name, _)| &name[..3]))?;
                        set(&mut fields.weekday, DAY_NAMES[index].1)?;
                    }
                    _ => {
                        let index = cursor.name_index(DAY_NAMES.iter().map(|(name, _)| *name))?;
                        set(&mut fields.weekday, DAY_NAMES[index].1)?;
                    }
                },
                Token::Hour { len, twelve } => {
                    set(&mut fields.hour, cursor.digits_for(len)?)?;
                    fields.twelve_hour |= twelve;
                }
                Token::Minute(len) => set(&mut fields.minute, cursor.digits_for(len)?)?,
                Token::Second(len) => set(&mut fields.second, cursor.digits_for(len)?)?,
                Token::Fraction { len, optional } => {
                    let nanos = cursor.fraction(len, optional)?;
                    set(&mut fields.nanos, nanos)?;
                }
                Token::Designator(len) => {
                    let pm = cursor.designator(len)?;
                    set(&mut fields.pm, pm)?;
                }
                Token::Offset(len) => {
                    let offset = cursor.offset(len)?;
                    set(&mut fields.offset, offset)?;
                }
                Token::OffsetOrUtc => {
                    if cursor.eat('Z') {
                        set(&mut fields.offset, UtcOffset::UTC)?;
                    } else if cursor.rest.starts_with(['+', '-']) {
                        let offset = cursor.offset(3)?;
                        set(&mut fields.offset, offset)?;
                    }
                }
                Token::Era => {
                    if !(cursor.eat_ignore_case("A.D.") || cursor.eat_ignore_case("AD")) {
                        return None;
                    }
                }
                Token::Literal(ch) => {
                    if cursor.eat(ch) {
                        continue;
                    }
                    // A '.' before an optional fraction may be omitted along with the fraction.
                    match tokens.peek() {
                        Some(Token::Fraction { optional: true, .. }) if ch == '.' => {
                            tokens.next();
                        }
                        _ => return None,
                    }
                }
            }
        }

        if !cursor.rest.chars().all(|ch| ch == '\0') {
            return None;
        }
        Some(fields)
    }
}

/// Parses `input` against each `|`-separated pattern in order; the first exact match wins.
pub fn parse_with_formats(input: &str, formats: &str) -> Result<PrimitiveDateTime, Error> {
    parse_with_formats_on(input, formats, OffsetDateTime::now_utc().date())
}

pub fn parse_with_formats_on(
    input: &str,
    formats: &str,
    today: Date,
) -> Result<PrimitiveDateTime, Error> {
    for format in formats.split(FORMAT_SEPARATOR) {
        let pattern = match DatePattern::parse(format) {
            Ok(pattern) => pattern,
            Err(err) => {
                debug!(format, error = %err, "skipping unusable date format");
                continue;
            }
        };
        if let Ok(value) = pattern.parse_exact_on(input, today) {
            return Ok(value);
        }
    }
    Err(Error::parse("input matches none of the date formats")
        .with_hint(format!("Formats tried: {formats}"))
        .with_input(input))
}

#[derive(Debug, Default)]
struct Fields {
    year: Option<i32>,
    month: Option<u32>,
    day: Option<u32>,
    hour: Option<u32>,
    minute: Option<u32>,
    second: Option<u32>,
    nanos: Option<u32>,
    pm: Option<bool>,
    twelve_hour: bool,
    offset: Option<UtcOffset>,
    weekday: Option<Weekday>,
}

impl Fields {
    fn resolve(&self, today: Date) -> Option<PrimitiveDateTime> {
        let (year, month, day) = match (self.year, self.month, self.day) {
            (None, None, None) => (today.year(), u8::from(today.month()) as u32, today.day() as u32),
            (year, month, day) => (
                year.unwrap_or(today.year()),
                month.unwrap_or(1),
                day.unwrap_or(1),
            ),
        };
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return None;
        }
        let month = Month::try_from(u8::try_from(month).ok()?).ok()?;
        let date = Date::from_calendar_date(year, month, u8::try_from(day).ok()?).ok()?;
        if self.weekday.is_some_and(|weekday| weekday != date.weekday()) {
            return None;
        }

        let mut hour = self.hour.unwrap_or(0);
        let pm = match self.pm {
            Some(pm) => Some(pm),
            None if self.twelve_hour => Some(false),
            None => None,
        };
        match pm {
            Some(false) => {
                if hour > 12 {
                    return None;
                }
                if hour == 12 {
                    hour = 0;
                }
            }
            Some(true) => {
                if hour > 23 {
                    return None;
                }
                if hour < 12 {
                    hour += 12;
                }
            }
            None => {}
        }

        let time = Time::from_hms_nano(
            u8::try_from(hour).ok()?,
            u8::try_from(self.minute.unwrap_or(0)).ok()?,
            u8::try_from(self.second.unwrap_or(0)).ok()?,
            self.nanos.unwrap_or(0),
        )
        .ok()?;
        let local = PrimitiveDateTime::new(date, time);
        match self.offset {
            Some(offset) => local.checked_sub(Duration::seconds(i64::from(offset.whole_seconds()))),
            None => Some(local),
        }
    }
}

/// Records a parsed component; a second, conflicting value for the same component fails.
fn set<T: Copy + PartialEq>(slot: &mut Option<T>, value: T) -> Option<()> {
    match *slot {
        Some(existing) if existing != value => None,
        _ => {
            *slot = Some(value);
            Some(())
        }
    }
}

fn to_four_digit_year(year: i32) -> i32 {
    if year >= 100 {
        return year;
    }
    let century = TWO_DIGIT_YEAR_MAX / 100 * 100;
    let candidate = century + year;
    if candidate > TWO_DIGIT_YEAR_MAX {
        candidate - 100
    } else {
        candidate
    }
}

struct Cursor<'a> {
    rest: &'a str,
}

impl Cursor<'_> {
    fn eat(&mut self, ch: char) -> bool {
        match self.rest.strip_prefix(ch) {
            Some(rest) => {
                self.rest = rest;
                true
            }
            None => false,
        }
    }

    fn eat_ignore_case(&mut self, word: &str) -> bool {
        let matched = self
            .rest
            .get(..word.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(word));
        if matched {
            self.rest = &self.rest[word.len()..];
        }
        matched
    }

    /// Between `min` and `max` ASCII digits, greedily.
    fn digits(&mut self, min: usize, max: usize) -> Option<u32> {
        let count = self
            .rest
            .bytes()
            .take(max)
            .take_while(u8::is_ascii_digit)
            .count();
        if count < min {
            return None;
        }
        let (digits, rest) = self.rest.split_at(count);
        self.rest = rest;
        digits.parse().ok()
    }

    /// A one-letter specifier takes one or two digits; a doubled one takes exactly two.
    fn digits_for(&mut self, len: usize) -> Option<u32> {
        if len == 1 {
            self.digits(1, 2)
        } else {
            self.digits(2, 2)
        }
    }

    fn fraction(&mut self, len: usize, optional: bool) -> Option<u32> {
        let count = self
            .rest
            .bytes()
            .take(len)
            .take_while(u8::is_ascii_digit)
            .count();
        if !optional && count < len {
            return None;
        }
        let (digits, rest) = self.rest.split_at(count);
        self.rest = rest;
        if digits.is_empty() {
            return Some(0);
        }
        let value: u32 = digits.parse().ok()?;
        Some(value * 10u32.pow((9 - count) as u32))
    }

    fn name_index<'n>(&mut self, names: impl Iterator<Item = &'n str>) -> Option<usize> {
        let (index, len) = names
            .enumerate()
            .filter(|(_, name)| {
                self.rest
                    .get(..name.len())
                    .is_some_and(|head| head.eq_ignore_ascii_case(name))
            })
            .map(|(index, name)| (index, name.len()))
            .max_by_key(|(_, len)| *len)?;
        self.rest = &self.rest[len..];
        Some(index)
    }

    /// `t` takes the designator's first letter, `tt` the whole `AM`/`PM`.
    fn designator(&mut self, len: usize) -> Option<bool> {
        if len == 1 {
            if self.eat('A') {
                Some(false)
            } else if self.eat('P') {
                Some(true)
            } else {
                None
            }
        } else if self.eat_ignore_case("AM") {
            Some(false)
        } else if self.eat_ignore_case("PM") {
            Some(true)
        } else {
            None
        }
    }

    fn offset(&mut self, len: usize) -> Option<UtcOffset> {
        let negative = if self.eat('+') {
            false
        } else if self.eat('-') {
            true
        } else {
            return None;
        };
        let (hours, minutes) = match len {
            1 | 2 => (self.digits_for(len)?, 0),
            _ => {
                let hours = self.digits(1, 2)?;
                self.eat(':');
                (hours, self.digits(2, 2)?)
            }
        };
        if hours > MAX_OFFSET_HOURS || minutes > 59 {
            return None;
        }
        let seconds = (hours * 3600 + minutes * 60) as i32;
        UtcOffset::from_whole_seconds(if negative { -seconds } else { seconds }).ok()
    }
}

fn tokenize(pattern: &str) -> Result<Vec<Token>, Error> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut tokens = Vec::new();
    let mut index = 0;

    while index < chars.len() {
        let ch = chars[index];
        match ch {
            '\'' | '"' => {
                index += 1;
                loop {
                    match chars.get(index) {
                        None => return Err(pattern_error(pattern, "unterminated quoted literal")),
                        Some(&quote) if quote == ch => break,
                        Some('\\') => {
                            let escaped = chars.get(index + 1).ok_or_else(|| {
                                pattern_error(pattern, "trailing escape in quoted literal")
                            })?;
                            tokens.push(Token::Literal(*escaped));
                            index += 2;
                        }
                        Some(&literal) => {
                            tokens.push(Token::Literal(literal));
                            index += 1;
                        }
                    }
                }
                index += 1;
            }
            '\\' => {
                let escaped = chars
                    .get(index + 1)
                    .ok_or_else(|| pattern_error(pattern, "trailing escape character"))?;
                tokens.push(Token::Literal(*escaped));
                index += 2;
            }
            '%' => match chars.get(index + 1) {
                None | Some('%') => {
                    return Err(pattern_error(pattern, "`%` must precede a format specifier"));
                }
                Some(&next) => {
                    tokens.push(specifier(next, 1, pattern)?.unwrap_or(Token::Literal(next)));
                    index += 2;
                }
            },
            _ => {
                let run = chars[index..].iter().take_while(|&&c| c == ch).count();
                match specifier(ch, run, pattern)? {
                    Some(token) => {
                        tokens.push(token);
                        index += if ch == 'K' { 1 } else { run };
                    }
                    None => {
                        tokens.push(Token::Literal(ch));
                        index += 1;
                    }
                }
            }
        }
    }
    Ok(tokens)
}

fn specifier(ch: char, run: usize, pattern: &str) -> Result<Option<Token>, Error> {
    let token = match ch {
        'y' => Token::Year(run),
        'M' => Token::Month(run.min(4)),
        'd' => Token::Day(run.min(4)),
        'h' => Token::Hour {
            len: run.min(2),
            twelve: true,
        },
        'H' => Token::Hour {
            len: run.min(2),
            twelve: false,
        },
        'm' => Token::Minute(run.min(2)),
        's' => Token::Second(run.min(2)),
        'f' | 'F' => {
            if run > MAX_FRACTION_DIGITS {
                return Err(pattern_error(pattern, "at most seven fraction digits"));
            }
            Token::Fraction {
                len: run,
                optional: ch == 'F',
            }
        }
        't' => Token::Designator(run.min(2)),
        'z' => Token::Offset(run.min(3)),
        'K' => Token::OffsetOrUtc,
        'g' => Token::Era,
        _ => return Ok(None),
    };
    Ok(Some(token))
}

fn standard_pattern(specifier: char) -> Option<&'static str> {
    let pattern = match specifier {
        'd' => "MM/dd/yyyy",
        'D' => "dddd, dd MMMM yyyy",
        'f' => "dddd, dd MMMM yyyy HH:mm",
        'F' | 'U' => "dddd, dd MMMM yyyy HH:mm:ss",
        'g' => "MM/dd/yyyy HH:mm",
        'G' => "MM/dd/yyyy HH:mm:ss",
        'm' | 'M' => "MMMM dd",
        'o' | 'O' => "yyyy'-'MM'-'dd'T'HH':'mm':'ss'.'fffffffK",
        'r' | 'R' => "ddd, dd MMM yyyy HH':'mm':'ss 'GMT'",
        's' => "yyyy'-'MM'-'dd'T'HH':'mm':'ss",
        't' => "HH:mm",
        'T' => "HH:mm:ss",
        'u' => "yyyy'-'MM'-'dd HH':'mm':'ss'Z'",
        'y' | 'Y' => "yyyy MMMM",
        _ => return None,
    };
    Some(pattern)
}

fn pattern_error(pattern: &str, message: &str) -> Error {
    Error::new(ErrorKind::Usage)
        .with_message(format!("invalid date format pattern: {message}"))
        .with_input(pattern)
}
