//! Purpose: Library crate behind the `sqlval` CLI and the `libsqlval` C ABI.
//! Exports: `api` (validators, comparators, registry), `abi` (C bindings), `core` (parsers).
//! Role: Host engines register the functions in `api`; `core` holds the parsing engines.
//! Invariants: Boolean entry points never panic and never surface errors.
//! Invariants: The only state is the caller-owned `RowCounter`.
pub mod abi;
pub mod api;
pub mod core;
