//! Purpose: Compare two text values as a runtime-selected numeric type or as dates.
//! Exports: `TypeTag`, `NumericValue`, `compare_vals`, `try_compare_vals`, `date_compare`,
//! `try_date_compare`.
//! Role: Parse step is per type; ordering always goes through `core::compare::compare`.
//! Invariants: Both operands are parsed before the result is decided.
//! Invariants: Boolean variants never surface errors; `try_*` variants report the kind.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use time::PrimitiveDateTime;
use tracing::debug;

use crate::core::compare::{CompareOp, OrderedFloat, compare};
use crate::core::datetime::parse_with_formats;
use crate::core::error::{Error, ErrorKind};
use crate::core::number::{ParseNumber, parse_number};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum TypeTag {
    Int,
    Uint,
    Byte,
    Sbyte,
    Short,
    Ushort,
    Long,
    Ulong,
    Float,
    Double,
    Decimal,
}

impl TypeTag {
    pub const ALL: [TypeTag; 11] = [
        TypeTag::Int,
        TypeTag::Uint,
        TypeTag::Byte,
        TypeTag::Sbyte,
        TypeTag::Short,
        TypeTag::Ushort,
        TypeTag::Long,
        TypeTag::Ulong,
        TypeTag::Float,
        TypeTag::Double,
        TypeTag::Decimal,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TypeTag::Int => "int",
            TypeTag::Uint => "uint",
            TypeTag::Byte => "byte",
            TypeTag::Sbyte => "sbyte",
            TypeTag::Short => "short",
            TypeTag::Ushort => "ushort",
            TypeTag::Long => "long",
            TypeTag::Ulong => "ulong",
            TypeTag::Float => "float",
            TypeTag::Double => "double",
            TypeTag::Decimal => "decimal",
        }
    }

    /// Parses with the type's default number style, which is stricter than `ANY`.
    pub fn parse_value(self, input: &str) -> Result<NumericValue, Error> {
        Ok(match self {
            TypeTag::Int => NumericValue::Int(default_parse(input)?),
            TypeTag::Uint => NumericValue::Uint(default_parse(input)?),
            TypeTag::Byte => NumericValue::Byte(default_parse(input)?),
            TypeTag::Sbyte => NumericValue::Sbyte(default_parse(input)?),
            TypeTag::Short => NumericValue::Short(default_parse(input)?),
            TypeTag::Ushort => NumericValue::Ushort(default_parse(input)?),
            TypeTag::Long => NumericValue::Long(default_parse(input)?),
            TypeTag::Ulong => NumericValue::Ulong(default_parse(input)?),
            TypeTag::Float => NumericValue::Float(OrderedFloat(default_parse(input)?)),
            TypeTag::Double => NumericValue::Double(OrderedFloat(default_parse(input)?)),
            TypeTag::Decimal => NumericValue::Decimal(default_parse(input)?),
        })
    }
}

fn default_parse<T: ParseNumber>(input: &str) -> Result<T, Error> {
    parse_number(input, T::DEFAULT_STYLES)
}

impl FromStr for TypeTag {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        TypeTag::ALL
            .into_iter()
            .find(|tag| tag.as_str() == input)
            .ok_or_else(|| {
                Error::new(ErrorKind::UnsupportedType)
                    .with_message("unknown type tag")
                    .with_hint(
                        "Use one of int, uint, byte, sbyte, short, ushort, long, ulong, float, double, decimal.",
                    )
                    .with_input(input)
            })
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed operand; values only order against the same variant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NumericValue {
    Int(i32),
    Uint(u32),
    Byte(u8),
    Sbyte(i8),
    Short(i16),
    Ushort(u16),
    Long(i64),
    Ulong(u64),
    Float(OrderedFloat<f32>),
    Double(OrderedFloat<f64>),
    Decimal(Decimal),
}

impl NumericValue {
    pub fn tag(&self) -> TypeTag {
        match self {
            NumericValue::Int(_) => TypeTag::Int,
            NumericValue::Uint(_) => TypeTag::Uint,
            NumericValue::Byte(_) => TypeTag::Byte,
            NumericValue::Sbyte(_) => TypeTag::Sbyte,
            NumericValue::Short(_) => TypeTag::Short,
            NumericValue::Ushort(_) => TypeTag::Ushort,
            NumericValue::Long(_) => TypeTag::Long,
            NumericValue::Ulong(_) => TypeTag::Ulong,
            NumericValue::Float(_) => TypeTag::Float,
            NumericValue::Double(_) => TypeTag::Double,
            NumericValue::Decimal(_) => TypeTag::Decimal,
        }
    }

    /// `None` when the operands carry different types.
    pub fn compare(&self, op: CompareOp, other: &NumericValue) -> Option<bool> {
        use NumericValue as V;
        Some(match (self, other) {
            (V::Int(lhs), V::Int(rhs)) => compare(op, lhs, rhs),
            (V::Uint(lhs), V::Uint(rhs)) => compare(op, lhs, rhs),
            (V::Byte(lhs), V::Byte(rhs)) => compare(op, lhs, rhs),
            (V::Sbyte(lhs), V::Sbyte(rhs)) => compare(op, lhs, rhs),
            (V::Short(lhs), V::Short(rhs)) => compare(op, lhs, rhs),
            (V::Ushort(lhs), V::Ushort(rhs)) => compare(op, lhs, rhs),
            (V::Long(lhs), V::Long(rhs)) => compare(op, lhs, rhs),
            (V::Ulong(lhs), V::Ulong(rhs)) => compare(op, lhs, rhs),
            (V::Float(lhs), V::Float(rhs)) => compare(op, lhs, rhs),
            (V::Double(lhs), V::Double(rhs)) => compare(op, lhs, rhs),
            (V::Decimal(lhs), V::Decimal(rhs)) => compare(op, lhs, rhs),
            _ => return None,
        })
    }
}

pub fn try_compare_vals(value1: &str, op: &str, value2: &str, type_tag: &str) -> Result<bool, Error> {
    let tag: TypeTag = type_tag.parse()?;
    let op: CompareOp = op.parse()?;
    let lhs = tag.parse_value(value1);
    let rhs = tag.parse_value(value2);
    let (lhs, rhs) = (lhs?, rhs?);
    lhs.compare(op, &rhs).ok_or_else(|| {
        Error::new(ErrorKind::Internal).with_message("operands parsed to different types")
    })
}

/// `false` for unknown tags, unknown operators, or any operand that fails to parse.
pub fn compare_vals(value1: &str, op: &str, value2: &str, type_tag: &str) -> bool {
    try_compare_vals(value1, op, value2, type_tag).unwrap_or_else(|err| {
        debug!(type_tag, op, error = %err, "comparison not applicable");
        false
    })
}

pub fn try_date_compare(value1: &str, formats: &str, op: &str, value2: &str) -> Result<bool, Error> {
    let op: CompareOp = op.parse()?;
    let lhs = parse_dated(value1, formats)?;
    let rhs = parse_dated(value2, formats)?;
    Ok(compare(op, &lhs, &rhs))
}

/// `false` unless both values parse under the formats with a year after 1.
pub fn date_compare(value1: &str, formats: &str, op: &str, value2: &str) -> bool {
    try_date_compare(value1, formats, op, value2).unwrap_or_else(|err| {
        debug!(formats, op, error = %err, "date comparison not applicable");
        false
    })
}

/// Year 1 is the zero-value sentinel and never takes part in a comparison.
fn parse_dated(input: &str, formats: &str) -> Result<PrimitiveDateTime, Error> {
    let value = parse_with_formats(input, formats)?;
    if value.year() <= 1 {
        return Err(Error::parse("date must fall after year 1").with_input(input));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_tag_orders_small_integers() {
        for tag in TypeTag::ALL {
            assert!(compare_vals("5", ">", "4", tag.as_str()), "{tag}");
            assert!(!compare_vals("5", "<", "4", tag.as_str()), "{tag}");
            assert!(compare_vals("4", "<>", "5", tag.as_str()), "{tag}");
            assert!(compare_vals("4", "=", "4", tag.as_str()), "{tag}");
        }
    }

    #[test]
    fn comparator_uses_default_styles() {
        assert!(!compare_vals("1,000", ">", "5", "int"));
        assert!(compare_vals("1,000.5", ">", "5", "double"));
        assert!(compare_vals("1e3", ">", "5", "float"));
        assert!(!compare_vals("1e3", ">", "5", "decimal"));
        assert!(compare_vals("5-", "<", "0", "decimal"));
        assert!(compare_vals(" -7 ", "<", "0", "long"));
    }

    #[test]
    fn errors_surface_only_in_strict_variant() {
        let err = try_compare_vals("5", ">", "4", "money").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedType);
        let err = try_compare_vals("5", "=>", "4", "int").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedOperator);
        let err = try_compare_vals("5", ">", "four", "int").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseFailure);

        assert!(!compare_vals("5", ">", "4", "money"));
        assert!(!compare_vals("5", "=>", "4", "int"));
        assert!(!compare_vals("five", ">", "4", "int"));
        assert!(!compare_vals("300", ">", "4", "byte"));
    }

    #[test]
    fn float_nan_orders_below_numbers() {
        assert!(compare_vals("NaN", "<", "-Infinity", "double"));
        assert!(compare_vals("NaN", "=", "nan", "float"));
        assert!(compare_vals("-0", "=", "0", "double"));
    }

    #[test]
    fn parsed_values_report_their_tag() {
        for tag in TypeTag::ALL {
            assert_eq!(tag.parse_value("1").unwrap().tag(), tag);
            assert_eq!(tag.as_str().parse::<TypeTag>().unwrap(), tag);
        }
        let int = TypeTag::Int.parse_value("1").unwrap();
        let long = TypeTag::Long.parse_value("1").unwrap();
        assert_eq!(int.compare(CompareOp::Eq, &long), None);
    }

    #[test]
    fn dates_compare_through_format_list() {
        assert!(date_compare("20170801", "yyyymmdd", ">", "20110101"));
        assert!(!date_compare("20170801", "yyyymmdd", "<", "20110101"));
        assert!(date_compare("01/08/2017", "yyyyMMdd|dd/MM/yyyy", ">=", "20170801"));
        assert!(!date_compare("20170801", "yyyymmdd", "!", "20110101"));
        assert!(!date_compare("20170801", "yyyymmdd", ">", "2011-01-01"));
        assert_eq!(
            try_date_compare("20170801", "yyyymmdd", "??", "20110101").unwrap_err().kind(),
            ErrorKind::UnsupportedOperator
        );
    }

    #[test]
    fn year_one_never_compares() {
        assert!(!date_compare("0001-05-05", "yyyy-MM-dd", "<", "2020-01-01"));
        assert!(!date_compare("2020-01-01", "yyyy-MM-dd", ">", "0001-05-05"));
        assert!(date_compare("0002-05-05", "yyyy-MM-dd", "<", "2020-01-01"));
    }
}
