//! Purpose: Define the stable public Rust API boundary for sqlval.
//! Exports: Validators, comparators, the row counter and the function registry.
//! Role: Public, additive-only surface; hides the parsing engines in `core`.
//! Invariants: Boolean functions are total; strict `try_*` functions return `Error`.
//! Invariants: Internal modules remain private and are not directly exposed.

mod comparator;
mod counter;
mod registry;
mod validate;

pub use crate::core::compare::{CompareOp, OrderedFloat};
pub use crate::core::datetime::{DatePattern, parse_with_formats};
pub use crate::core::duration::{parse_iso8601_duration, parse_native_duration};
#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::number::{NumberStyles, ParseNumber, parse_number};
pub use comparator::{
    NumericValue, TypeTag, compare_vals, date_compare, try_compare_vals, try_date_compare,
};
pub use counter::RowCounter;
pub use registry::{FunctionRegistry, ScalarFunction, ScalarValue};
pub use validate::{
    date_is_valid, is_bool, is_byte, is_char, is_decimal, is_double, is_float, is_guid, is_int,
    is_iso8601_duration, is_long, is_native_duration, is_negative_int, is_non_negative_int,
    is_non_positive_int, is_positive_int, is_sbyte, is_short, is_uint, is_ulong, is_uri,
    is_ushort, new_guid, regex_is_match,
};
