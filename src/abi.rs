//! Purpose: C ABI bridge for hosts that register sqlval functions natively (libsqlval).
//! Exports: C-callable validator/comparator predicates, row-counter handle, error helpers.
//! Role: Stable ABI surface for SQLite extensions and other non-Rust bindings.
//! Invariants: Predicates return 1 (true), 0 (false) or -1 (usage error, details in `out_err`).
//! Invariants: Strings are NUL-terminated UTF-8; opaque handles have explicit free functions.
//! Invariants: Error kinds map 1:1 with core error kinds.
#![allow(non_camel_case_types, clippy::not_unsafe_ptr_arg_deref)]

use crate::api::{
    FunctionRegistry, RowCounter, ScalarValue, compare_vals, date_compare, date_is_valid, is_uri,
    new_guid, regex_is_match,
};
use crate::core::error::{Error, ErrorKind, to_exit_code};
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

#[repr(C)]
pub struct sqlval_counter {
    counter: RowCounter,
}

#[repr(C)]
pub struct sqlval_error {
    kind: i32,
    message: *mut c_char,
    input: *mut c_char,
}

/// Runs a single-argument validator. `name` is a registry name (`IsInt`) or the
/// type it checks (`int`, `guid`, `PositiveInt`), matched case-insensitively.
#[unsafe(no_mangle)]
pub extern "C" fn sqlval_is_valid(
    name: *const c_char,
    value: *const c_char,
    out_err: *mut *mut sqlval_error,
) -> i32 {
    let name = match read_str(name, "name", out_err) {
        Ok(name) => name,
        Err(code) => return code,
    };
    let value = match read_str(value, "value", out_err) {
        Ok(value) => value,
        Err(code) => return code,
    };
    let registry = FunctionRegistry::new();
    let function = registry
        .lookup(name)
        .or_else(|_| registry.lookup(&format!("Is{name}")))
        .ok()
        .filter(|function| function.arity() == 1 && function.is_deterministic());
    let Some(function) = function else {
        return fail(
            out_err,
            Error::new(ErrorKind::Usage)
                .with_message("unknown validator")
                .with_input(name),
        );
    };
    match function.call(&[value], registry.counter()) {
        Ok(ScalarValue::Bool(valid)) => flag(valid),
        Ok(_) => flag(false),
        Err(err) => fail(out_err, err),
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn sqlval_compare_vals(
    value1: *const c_char,
    op: *const c_char,
    value2: *const c_char,
    type_tag: *const c_char,
    out_err: *mut *mut sqlval_error,
) -> i32 {
    let args = match read_args(
        [(value1, "value1"), (op, "op"), (value2, "value2"), (type_tag, "type_tag")],
        out_err,
    ) {
        Ok(args) => args,
        Err(code) => return code,
    };
    let [value1, op, value2, type_tag] = args;
    flag(compare_vals(value1, op, value2, type_tag))
}

#[unsafe(no_mangle)]
pub extern "C" fn sqlval_date_is_valid(
    value: *const c_char,
    formats: *const c_char,
    out_err: *mut *mut sqlval_error,
) -> i32 {
    match read_args([(value, "value"), (formats, "formats")], out_err) {
        Ok([value, formats]) => flag(date_is_valid(value, formats)),
        Err(code) => code,
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn sqlval_date_compare(
    value1: *const c_char,
    formats: *const c_char,
    op: *const c_char,
    value2: *const c_char,
    out_err: *mut *mut sqlval_error,
) -> i32 {
    let args = match read_args(
        [(value1, "value1"), (formats, "formats"), (op, "op"), (value2, "value2")],
        out_err,
    ) {
        Ok(args) => args,
        Err(code) => return code,
    };
    let [value1, formats, op, value2] = args;
    flag(date_compare(value1, formats, op, value2))
}

#[unsafe(no_mangle)]
pub extern "C" fn sqlval_is_uri(
    value: *const c_char,
    schemes: *const c_char,
    out_err: *mut *mut sqlval_error,
) -> i32 {
    match read_args([(value, "value"), (schemes, "schemes")], out_err) {
        Ok([value, schemes]) => flag(is_uri(value, schemes)),
        Err(code) => code,
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn sqlval_regex_is_match(
    value: *const c_char,
    pattern: *const c_char,
    out_err: *mut *mut sqlval_error,
) -> i32 {
    match read_args([(value, "value"), (pattern, "pattern")], out_err) {
        Ok([value, pattern]) => flag(regex_is_match(value, pattern)),
        Err(code) => code,
    }
}

/// Writes a new hyphenated UUID plus NUL into `out_buf`, which must hold 37 bytes.
#[unsafe(no_mangle)]
pub extern "C" fn sqlval_new_guid(
    out_buf: *mut c_char,
    len: usize,
    out_err: *mut *mut sqlval_error,
) -> i32 {
    let text = new_guid().hyphenated().to_string();
    if out_buf.is_null() || len <= text.len() {
        return fail(
            out_err,
            Error::new(ErrorKind::Usage)
                .with_message(format!("out_buf must hold at least {} bytes", text.len() + 1)),
        );
    }
    unsafe {
        ptr::copy_nonoverlapping(text.as_ptr().cast::<c_char>(), out_buf, text.len());
        *out_buf.add(text.len()) = 0;
    }
    0
}

#[unsafe(no_mangle)]
pub extern "C" fn sqlval_counter_new() -> *mut sqlval_counter {
    Box::into_raw(Box::new(sqlval_counter {
        counter: RowCounter::new(),
    }))
}

#[unsafe(no_mangle)]
pub extern "C" fn sqlval_counter_next(
    counter: *mut sqlval_counter,
    key: *const c_char,
    out_value: *mut u64,
    out_err: *mut *mut sqlval_error,
) -> i32 {
    if counter.is_null() || out_value.is_null() {
        return fail(
            out_err,
            Error::new(ErrorKind::Usage).with_message("counter or out_value is null"),
        );
    }
    let key = match read_str(key, "key", out_err) {
        Ok(key) => key,
        Err(code) => return code,
    };
    let counter = unsafe { &*counter };
    unsafe {
        *out_value = counter.counter.next(key);
    }
    0
}

#[unsafe(no_mangle)]
pub extern "C" fn sqlval_counter_reset(counter: *mut sqlval_counter) {
    if counter.is_null() {
        return;
    }
    unsafe { &*counter }.counter.reset();
}

#[unsafe(no_mangle)]
pub extern "C" fn sqlval_counter_free(counter: *mut sqlval_counter) {
    if counter.is_null() {
        return;
    }
    unsafe {
        drop(Box::from_raw(counter));
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn sqlval_error_free(err: *mut sqlval_error) {
    if err.is_null() {
        return;
    }
    unsafe {
        let err = Box::from_raw(err);
        if !err.message.is_null() {
            drop(CString::from_raw(err.message));
        }
        if !err.input.is_null() {
            drop(CString::from_raw(err.input));
        }
    }
}

fn flag(value: bool) -> i32 {
    i32::from(value)
}

fn read_str<'a>(
    input: *const c_char,
    name: &str,
    out_err: *mut *mut sqlval_error,
) -> Result<&'a str, i32> {
    if input.is_null() {
        return Err(fail(
            out_err,
            Error::new(ErrorKind::Usage).with_message(format!("{name} is null")),
        ));
    }
    unsafe { CStr::from_ptr(input) }.to_str().map_err(|_| {
        fail(
            out_err,
            Error::new(ErrorKind::Usage).with_message(format!("{name} is not valid UTF-8")),
        )
    })
}

fn read_args<'a, const N: usize>(
    inputs: [(*const c_char, &str); N],
    out_err: *mut *mut sqlval_error,
) -> Result<[&'a str; N], i32> {
    let mut args = [""; N];
    for (slot, (input, name)) in args.iter_mut().zip(inputs) {
        *slot = read_str(input, name, out_err)?;
    }
    Ok(args)
}

fn fail(out_err: *mut *mut sqlval_error, err: Error) -> i32 {
    if out_err.is_null() {
        return -1;
    }
    let error = Box::new(sqlval_error {
        kind: to_exit_code(err.kind()),
        message: to_c_string(err.message().unwrap_or("")),
        input: err.input().map(to_c_string).unwrap_or(ptr::null_mut()),
    });
    unsafe {
        *out_err = Box::into_raw(error);
    }
    -1
}

fn to_c_string(input: &str) -> *mut c_char {
    CString::new(input)
        .map(|s| s.into_raw())
        .unwrap_or(ptr::null_mut())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(input: &str) -> CString {
        CString::new(input).expect("cstring")
    }

    fn take_error(err: *mut sqlval_error) -> (i32, String) {
        assert!(!err.is_null());
        let summary = unsafe {
            let error = &*err;
            (
                error.kind,
                CStr::from_ptr(error.message).to_string_lossy().into_owned(),
            )
        };
        sqlval_error_free(err);
        summary
    }

    #[test]
    fn is_valid_accepts_registry_and_type_names() {
        let value = c("2,147,483,647");
        for name in ["IsInt", "int", "INT"] {
            let name = c(name);
            assert_eq!(sqlval_is_valid(name.as_ptr(), value.as_ptr(), ptr::null_mut()), 1);
        }
        let name = c("byte");
        assert_eq!(sqlval_is_valid(name.as_ptr(), value.as_ptr(), ptr::null_mut()), 0);
    }

    #[test]
    fn is_valid_rejects_unknown_and_stateful_names() {
        let value = c("k");
        for name in ["money", "GetRowNumber", "IsUri"] {
            let name = c(name);
            let mut err = ptr::null_mut();
            assert_eq!(sqlval_is_valid(name.as_ptr(), value.as_ptr(), &mut err), -1);
            let (kind, message) = take_error(err);
            assert_eq!(kind, 2);
            assert_eq!(message, "unknown validator");
        }
    }

    #[test]
    fn null_arguments_are_usage_errors() {
        let formats = c("yyyyMMdd");
        let mut err = ptr::null_mut();
        assert_eq!(sqlval_date_is_valid(ptr::null(), formats.as_ptr(), &mut err), -1);
        let (kind, message) = take_error(err);
        assert_eq!(kind, 2);
        assert_eq!(message, "value is null");
        assert_eq!(sqlval_date_is_valid(ptr::null(), formats.as_ptr(), ptr::null_mut()), -1);
    }

    #[test]
    fn comparators_and_collaborators() {
        let (five, four) = (c("5"), c("4"));
        let (gt, tag) = (c(">"), c("decimal"));
        assert_eq!(
            sqlval_compare_vals(five.as_ptr(), gt.as_ptr(), four.as_ptr(), tag.as_ptr(), ptr::null_mut()),
            1
        );
        let (lhs, rhs, formats) = (c("20170801"), c("20110101"), c("yyyymmdd"));
        assert_eq!(
            sqlval_date_compare(lhs.as_ptr(), formats.as_ptr(), gt.as_ptr(), rhs.as_ptr(), ptr::null_mut()),
            1
        );
        let (uri, schemes) = (c("http://www.cint.io"), c("mailto|uuid"));
        assert_eq!(sqlval_is_uri(uri.as_ptr(), schemes.as_ptr(), ptr::null_mut()), 0);
        let (text, pattern) = (c("12345"), c(r"\d{5}"));
        assert_eq!(sqlval_regex_is_match(text.as_ptr(), pattern.as_ptr(), ptr::null_mut()), 1);
    }

    #[test]
    fn guid_buffer_must_fit() {
        let mut buf = [0 as c_char; 37];
        assert_eq!(sqlval_new_guid(buf.as_mut_ptr(), buf.len(), ptr::null_mut()), 0);
        let text = unsafe { CStr::from_ptr(buf.as_ptr()) }.to_str().expect("utf8");
        assert!(crate::api::is_guid(text));
        assert_eq!(sqlval_new_guid(buf.as_mut_ptr(), 36, ptr::null_mut()), -1);
    }

    #[test]
    fn counter_handle_counts_per_key() {
        let counter = sqlval_counter_new();
        let key = c("rows");
        let mut value = 0u64;
        for expected in 1..=3 {
            assert_eq!(sqlval_counter_next(counter, key.as_ptr(), &mut value, ptr::null_mut()), 0);
            assert_eq!(value, expected);
        }
        sqlval_counter_reset(counter);
        assert_eq!(sqlval_counter_next(counter, key.as_ptr(), &mut value, ptr::null_mut()), 0);
        assert_eq!(value, 1);
        sqlval_counter_free(counter);
    }
}
