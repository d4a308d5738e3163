//! Purpose: Evaluate JSON Lines call records for `sqlval batch`.
//! Exports: `ErrorPolicy`, `BatchConfig`, `BatchOutcome`, `BatchFailure`, `CallResult`, `run_batch`.
//! Role: Streaming evaluation engine used by the CLI; isolates record handling from main.
//! Invariants: One record per non-blank line: `{"fn": "IsInt", "args": ["12"], "id": any}`.
//! Invariants: Skip mode only continues at line boundaries; stop mode fails on the first bad record.
//! Invariants: No unbounded buffering; records above `max_record_bytes` are rejected unparsed.
use std::io::{self, BufRead, BufReader, Read};

use serde::Deserialize;
use serde_json::Value;
use sqlval::api::{Error, ErrorKind, FunctionRegistry, ScalarValue};
use tracing::debug;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ErrorPolicy {
    Stop,
    Skip,
}

#[derive(Copy, Clone, Debug)]
pub struct BatchConfig {
    pub errors: ErrorPolicy,
    pub max_record_bytes: usize,
    pub max_snippet_bytes: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            errors: ErrorPolicy::Stop,
            max_record_bytes: 1024 * 1024,
            max_snippet_bytes: 120,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct BatchOutcome {
    pub records_total: u64,
    pub ok: u64,
    pub failed: u64,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CallRecord {
    #[serde(rename = "fn")]
    function: String,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    id: Option<Value>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CallResult {
    pub index: u64,
    pub id: Option<Value>,
    pub function: String,
    pub value: ScalarValue,
}

#[derive(Clone, Debug)]
pub struct BatchFailure {
    pub index: u64,
    pub line: u64,
    pub message: String,
    pub error_kind: String,
    pub snippet: Option<String>,
}

fn io_error(err: io::Error, message: &str) -> Error {
    Error::new(ErrorKind::Io)
        .with_message(message)
        .with_source(err)
}

pub fn run_batch<R, F, N>(
    reader: R,
    registry: &FunctionRegistry,
    config: BatchConfig,
    mut on_result: F,
    mut on_failure: N,
) -> Result<BatchOutcome, Error>
where
    R: Read,
    F: FnMut(CallResult) -> Result<(), Error>,
    N: FnMut(BatchFailure),
{
    let mut outcome = BatchOutcome::default();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();
    let mut line_no = 0u64;

    loop {
        line.clear();
        let read = reader
            .read_line(&mut line)
            .map_err(|err| io_error(err, "failed to read batch input"))?;
        if read == 0 {
            break;
        }
        line_no += 1;
        let trimmed = line.trim_end_matches(['\n', '\r']);
        if trimmed.trim().is_empty() {
            continue;
        }
        outcome.records_total += 1;
        let index = outcome.records_total;

        match evaluate(trimmed, registry, &config) {
            Ok((record, value)) => {
                on_result(CallResult {
                    index,
                    id: record.id,
                    function: record.function,
                    value,
                })?;
                outcome.ok += 1;
            }
            Err((err, error_kind)) => {
                debug!(index, line = line_no, error = %err, "batch record failed");
                match config.errors {
                    ErrorPolicy::Stop => {
                        let message =
                            format!("record {index} (line {line_no}): {}", err_message(&err));
                        let err = if err.hint().is_none() {
                            err.with_hint("Use --errors skip to continue past bad records.")
                        } else {
                            err
                        };
                        return Err(err.with_message(message));
                    }
                    ErrorPolicy::Skip => {
                        outcome.failed += 1;
                        on_failure(BatchFailure {
                            index,
                            line: line_no,
                            message: err_message(&err),
                            error_kind: error_kind.to_string(),
                            snippet: Some(truncate_snippet(trimmed, config.max_snippet_bytes)),
                        });
                    }
                }
            }
        }
    }

    Ok(outcome)
}

fn evaluate(
    text: &str,
    registry: &FunctionRegistry,
    config: &BatchConfig,
) -> Result<(CallRecord, ScalarValue), (Error, &'static str)> {
    if text.len() > config.max_record_bytes {
        return Err((
            Error::new(ErrorKind::Usage).with_message("record exceeds size limit"),
            "Oversize",
        ));
    }
    let record: CallRecord = serde_json::from_str(text).map_err(|err| {
        (
            Error::new(ErrorKind::Usage)
                .with_message(format!("invalid call record: {err}"))
                .with_hint(r#"Records look like {"fn": "IsInt", "args": ["12"]}."#),
            "Parse",
        )
    })?;
    let args: Vec<&str> = record.args.iter().map(String::as_str).collect();
    let value = registry
        .invoke(&record.function, &args)
        .map_err(|err| (err, "Call"))?;
    Ok((record, value))
}

fn err_message(err: &Error) -> String {
    err.message().unwrap_or("record failed").to_string()
}

fn truncate_snippet(input: &str, max: usize) -> String {
    if input.len() <= max {
        return input.to_string();
    }
    let suffix = "...";
    let budget = max.saturating_sub(suffix.len());
    let end = input
        .char_indices()
        .map(|(idx, ch)| idx + ch.len_utf8())
        .take_while(|end| *end <= budget)
        .last()
        .unwrap_or(0);
    format!("{}{suffix}", &input[..end])
}

#[cfg(test)]
mod tests {
    use super::{BatchConfig, BatchFailure, CallResult, ErrorPolicy, run_batch, truncate_snippet};
    use serde_json::json;
    use sqlval::api::{ErrorKind, FunctionRegistry, ScalarValue};

    fn run(
        input: &str,
        errors: ErrorPolicy,
    ) -> (
        Result<super::BatchOutcome, sqlval::api::Error>,
        Vec<CallResult>,
        Vec<BatchFailure>,
    ) {
        let registry = FunctionRegistry::new();
        let mut results = Vec::new();
        let mut failures = Vec::new();
        let config = BatchConfig {
            errors,
            max_record_bytes: 256,
            ..BatchConfig::default()
        };
        let outcome = run_batch(
            input.as_bytes(),
            &registry,
            config,
            |result| {
                results.push(result);
                Ok(())
            },
            |failure| failures.push(failure),
        );
        (outcome, results, failures)
    }

    #[test]
    fn evaluates_records_in_order() {
        let input = concat!(
            r#"{"fn":"IsInt","args":["2,147,483,647"],"id":7}"#,
            "\n\n",
            r#"{"fn":"GetRowNumber","args":["k"]}"#,
            "\r\n",
            r#"{"fn":"getrownumber","args":["k"]}"#,
            "\n",
        );
        let (outcome, results, failures) = run(input, ErrorPolicy::Stop);
        let outcome = outcome.expect("batch");
        assert_eq!(outcome.records_total, 3);
        assert_eq!(outcome.ok, 3);
        assert!(failures.is_empty());
        assert_eq!(results[0].id, Some(json!(7)));
        assert_eq!(results[0].value, ScalarValue::Bool(true));
        assert_eq!(results[1].value, ScalarValue::Int(1));
        assert_eq!(results[2].value, ScalarValue::Int(2));
    }

    #[test]
    fn skip_reports_bad_records_and_continues() {
        let input = concat!(
            "not-json\n",
            r#"{"fn":"IsMoney","args":["1"]}"#,
            "\n",
            r#"{"fn":"IsUri","args":["x"]}"#,
            "\n",
            r#"{"fn":"IsBool","args":["1"]}"#,
            "\n",
        );
        let (outcome, results, failures) = run(input, ErrorPolicy::Skip);
        let outcome = outcome.expect("batch");
        assert_eq!(outcome.failed, 3);
        assert_eq!(outcome.ok, 1);
        assert_eq!(results[0].index, 4);
        assert_eq!(failures[0].error_kind, "Parse");
        assert_eq!(failures[1].error_kind, "Call");
        assert_eq!(failures[2].line, 3);
        assert_eq!(failures[2].message, "IsUri expects 2 argument(s), got 1");
    }

    #[test]
    fn stop_fails_on_first_bad_record() {
        let input = "{\"fn\":\"IsInt\",\"args\":[\"1\"]}\n{\"fn\":\"IsInt\"}\n";
        let (outcome, results, _) = run(input, ErrorPolicy::Stop);
        let err = outcome.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert!(err.message().unwrap().starts_with("record 2 (line 2):"));
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn oversize_records_are_rejected_unparsed() {
        let long = format!("{{\"fn\":\"IsInt\",\"args\":[\"{}\"]}}\n", "1".repeat(300));
        let (outcome, _, failures) = run(&long, ErrorPolicy::Skip);
        assert_eq!(outcome.expect("batch").failed, 1);
        assert_eq!(failures[0].error_kind, "Oversize");
        assert_eq!(failures[0].snippet.as_deref().map(str::len), Some(120));
    }

    #[test]
    fn snippets_respect_char_boundaries() {
        assert_eq!(truncate_snippet("abc", 10), "abc");
        assert_eq!(truncate_snippet("abcdefgh", 6), "abc...");
        assert_eq!(truncate_snippet("ééééé", 7), "éé...");
    }
}
