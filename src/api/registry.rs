//! Purpose: Name every scalar function so a host engine can register and call it dynamically.
//! Exports: `FunctionRegistry`, `ScalarFunction`, `ScalarValue`.
//! Role: Single dispatch point shared by the C ABI, the CLI and batch evaluation.
//! Invariants: Names are unique ignoring ASCII case; lookups are case-insensitive.
//! Invariants: Arity is checked before any argument is parsed.
//! Invariants: Only `GetGuid` and `GetRowNumber` are non-deterministic.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use super::comparator::{compare_vals, date_compare};
use super::counter::RowCounter;
use super::validate;
use crate::core::error::{Error, ErrorKind};

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Bool(value) => write!(f, "{value}"),
            ScalarValue::Int(value) => write!(f, "{value}"),
            ScalarValue::Text(value) => f.write_str(value),
        }
    }
}

#[derive(Clone, Copy)]
enum Callable {
    Unary(fn(&str) -> bool),
    Binary(fn(&str, &str) -> bool),
    Quaternary(fn(&str, &str, &str, &str) -> bool),
    Guid,
    RowNumber,
}

#[derive(Clone, Copy)]
pub struct ScalarFunction {
    name: &'static str,
    params: &'static [&'static str],
    callable: Callable,
}

impl ScalarFunction {
    const fn unary(name: &'static str, predicate: fn(&str) -> bool) -> Self {
        Self {
            name,
            params: &["value"],
            callable: Callable::Unary(predicate),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn params(&self) -> &'static [&'static str] {
        self.params
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Whether identical arguments always give identical results.
    pub fn is_deterministic(&self) -> bool {
        !matches!(self.callable, Callable::Guid | Callable::RowNumber)
    }

    pub fn call(&self, args: &[&str], counter: &RowCounter) -> Result<ScalarValue, Error> {
        if args.len() != self.arity() {
            return Err(Error::new(ErrorKind::Usage)
                .with_message(format!(
                    "{} expects {} argument(s), got {}",
                    self.name,
                    self.arity(),
                    args.len()
                ))
                .with_hint(format!("Usage: {}", self.signature())));
        }
        Ok(match (self.callable, args) {
            (Callable::Unary(predicate), [value]) => ScalarValue::Bool(predicate(value)),
            (Callable::Binary(predicate), [value, extra]) => {
                ScalarValue::Bool(predicate(value, extra))
            }
            (Callable::Quaternary(predicate), [a, b, c, d]) => {
                ScalarValue::Bool(predicate(a, b, c, d))
            }
            (Callable::Guid, []) => ScalarValue::Text(validate::new_guid().to_string()),
            (Callable::RowNumber, [key]) => {
                let next = counter.next(key);
                ScalarValue::Int(i64::try_from(next).map_err(|_| {
                    Error::new(ErrorKind::Internal)
                        .with_message("row number exceeds the integer range")
                        .with_input(*key)
                })?)
            }
            _ => {
                return Err(Error::new(ErrorKind::Internal)
                    .with_message(format!("{} has a mismatched parameter list", self.name)));
            }
        })
    }

    /// `Name(param, ...)`.
    pub fn signature(&self) -> String {
        format!("{}({})", self.name, self.params.join(", "))
    }
}

impl fmt::Debug for ScalarFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScalarFunction")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish()
    }
}

static FUNCTIONS: &[ScalarFunction] = &[
    ScalarFunction::unary("IsInt", validate::is_int),
    ScalarFunction::unary("IsUint", validate::is_uint),
    ScalarFunction::unary("IsByte", validate::is_byte),
    ScalarFunction::unary("IsSbyte", validate::is_sbyte),
    ScalarFunction::unary("IsShort", validate::is_short),
    ScalarFunction::unary("IsUshort", validate::is_ushort),
    ScalarFunction::unary("IsLong", validate::is_long),
    ScalarFunction::unary("IsUlong", validate::is_ulong),
    ScalarFunction::unary("IsFloat", validate::is_float),
    ScalarFunction::unary("IsDouble", validate::is_double),
    ScalarFunction::unary("IsDecimal", validate::is_decimal),
    ScalarFunction::unary("IsBool", validate::is_bool),
    ScalarFunction::unary("IsChar", validate::is_char),
    ScalarFunction::unary("IsGuid", validate::is_guid),
    ScalarFunction {
        name: "DateIsValid",
        params: &["value", "formats"],
        callable: Callable::Binary(validate::date_is_valid),
    },
    ScalarFunction {
        name: "IsUri",
        params: &["value", "schemes"],
        callable: Callable::Binary(validate::is_uri),
    },
    ScalarFunction {
        name: "DateCompare",
        params: &["value1", "formats", "op", "value2"],
        callable: Callable::Quaternary(date_compare),
    },
    ScalarFunction {
        name: "CompareVals",
        params: &["value1", "op", "value2", "type"],
        callable: Callable::Quaternary(compare_vals),
    },
    ScalarFunction::unary("IsNonPositiveInt", validate::is_non_positive_int),
    ScalarFunction::unary("IsNonNegativeInt", validate::is_non_negative_int),
    ScalarFunction::unary("IsPositiveInt", validate::is_positive_int),
    ScalarFunction::unary("IsNegativeInt", validate::is_negative_int),
    ScalarFunction {
        name: "RegexIsMatch",
        params: &["value", "pattern"],
        callable: Callable::Binary(validate::regex_is_match),
    },
    ScalarFunction::unary("IsISO8601Timespan", validate::is_iso8601_duration),
    ScalarFunction::unary("IsDotNetTimespan", validate::is_native_duration),
    ScalarFunction {
        name: "GetGuid",
        params: &[],
        callable: Callable::Guid,
    },
    ScalarFunction {
        name: "GetRowNumber",
        params: &["key"],
        callable: Callable::RowNumber,
    },
];

/// Function table plus the row counter its stateful entries share.
#[derive(Clone, Debug, Default)]
pub struct FunctionRegistry {
    counter: Arc<RowCounter>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_counter(counter: Arc<RowCounter>) -> Self {
        Self { counter }
    }

    pub fn counter(&self) -> &RowCounter {
        &self.counter
    }

    pub fn functions(&self) -> &'static [ScalarFunction] {
        FUNCTIONS
    }

    pub fn lookup(&self, name: &str) -> Result<&'static ScalarFunction, Error> {
        FUNCTIONS
            .iter()
            .find(|function| function.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                Error::new(ErrorKind::Usage)
                    .with_message("unknown function")
                    .with_hint("Run `sqlval functions` to list the available names.")
                    .with_input(name)
            })
    }

    pub fn invoke(&self, name: &str, args: &[&str]) -> Result<ScalarValue, Error> {
        self.lookup(name)?.call(args, &self.counter)
    }
}

#[cfg(test)]
mod tests {
    use super::{FunctionRegistry, ScalarValue};
    use crate::core::error::ErrorKind;
    use std::collections::HashSet;

    #[test]
    fn names_are_unique_ignoring_case() {
        let registry = FunctionRegistry::new();
        let names: HashSet<String> = registry
            .functions()
            .iter()
            .map(|function| function.name().to_ascii_lowercase())
            .collect();
        assert_eq!(names.len(), registry.functions().len());
        assert_eq!(names.len(), 27);
    }

    #[test]
    fn invoke_dispatches_by_name() {
        let registry = FunctionRegistry::new();
        assert_eq!(
            registry.invoke("isint", &["2,147,483,647"]).unwrap(),
            ScalarValue::Bool(true)
        );
        assert_eq!(
            registry.invoke("CompareVals", &["5", ">", "4", "ushort"]).unwrap(),
            ScalarValue::Bool(true)
        );
        assert_eq!(
            registry
                .invoke("DateIsValid", &["20170821", "yyyymmdd|dd/mm/yyyy"])
                .unwrap(),
            ScalarValue::Bool(true)
        );
        assert_eq!(
            registry
                .invoke("DateCompare", &["20170801", "yyyymmdd", "<", "20110101"])
                .unwrap(),
            ScalarValue::Bool(false)
        );
    }

    #[test]
    fn stateful_functions_use_the_shared_counter() {
        let registry = FunctionRegistry::new();
        assert_eq!(registry.invoke("GetRowNumber", &["a"]).unwrap(), ScalarValue::Int(1));
        assert_eq!(registry.invoke("GetRowNumber", &["a"]).unwrap(), ScalarValue::Int(2));
        assert_eq!(registry.counter().current("a"), 2);

        let ScalarValue::Text(guid) = registry.invoke("GetGuid", &[]).unwrap() else {
            panic!("GetGuid returns text");
        };
        assert_eq!(registry.invoke("IsGuid", &[guid.as_str()]).unwrap(), ScalarValue::Bool(true));
        assert!(!registry.lookup("GetGuid").unwrap().is_deterministic());
        assert!(registry.lookup("IsUri").unwrap().is_deterministic());
    }

    #[test]
    fn arity_and_name_errors_are_usage() {
        let registry = FunctionRegistry::new();
        let err = registry.invoke("IsUri", &["http://x"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert_eq!(err.hint(), Some("Usage: IsUri(value, schemes)"));
        let err = registry.invoke("IsMoney", &["1"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn scalar_values_serialize_as_plain_json() {
        assert_eq!(serde_json::to_string(&ScalarValue::Bool(true)).unwrap(), "true");
        assert_eq!(serde_json::to_string(&ScalarValue::Int(3)).unwrap(), "3");
        assert_eq!(
            serde_json::to_string(&ScalarValue::Text("x".into())).unwrap(),
            "\"x\""
        );
    }
}
