//! Purpose: Hold top-level CLI command dispatch for `sqlval`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Boolean answers print as JSON; `--strict` turns non-answers into errors.
//! Invariants: Helpers in `main.rs` remain the source of output formatting.

use super::*;
use batch::{BatchConfig, ErrorPolicy, run_batch};
use sqlval::api::{FunctionRegistry, parse_with_formats, try_compare_vals, try_date_compare};
use std::fs::File;
use time::macros::format_description;

pub(super) fn dispatch_command(command: Command, color_mode: ColorMode) -> Result<RunOutcome, Error> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "sqlval", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Version => {
            emit_version_output();
            Ok(RunOutcome::ok())
        }
        Command::Call { name, args } => {
            let registry = FunctionRegistry::new();
            let function = registry.lookup(&name)?;
            let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
            let result = function.call(&arg_refs, registry.counter())?;
            emit_json(json!({
                "fn": function.name(),
                "args": args,
                "result": result,
            }));
            Ok(RunOutcome::ok())
        }
        Command::Compare {
            value1,
            op,
            value2,
            type_tag,
            formats,
            strict,
        } => {
            let outcome = match (&type_tag, &formats) {
                (Some(type_tag), _) => try_compare_vals(&value1, &op, &value2, type_tag),
                (None, Some(formats)) => try_date_compare(&value1, formats, &op, &value2),
                (None, None) => {
                    return Err(Error::new(ErrorKind::Usage)
                        .with_message("compare needs --type or --formats")
                        .with_hint("Use `sqlval compare 5 '>' 4 --type int`."));
                }
            };
            let result = match outcome {
                Ok(result) => result,
                Err(err) if strict => return Err(err),
                Err(err) => {
                    tracing::debug!(error = %err, "comparison reduced to false");
                    false
                }
            };
            emit_json(json!({ "result": result }));
            Ok(RunOutcome::ok())
        }
        Command::Date {
            value,
            formats,
            strict,
        } => {
            match parse_with_formats(&value, &formats) {
                Ok(parsed) => {
                    let rendered = parsed
                        .format(format_description!(
                            "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:7]"
                        ))
                        .map_err(|err| {
                            Error::new(ErrorKind::Internal)
                                .with_message("date format failed")
                                .with_source(err)
                        })?;
                    emit_json(json!({ "valid": true, "value": rendered }));
                }
                Err(err) if strict => return Err(err),
                Err(_) => emit_json(json!({ "valid": false })),
            }
            Ok(RunOutcome::ok())
        }
        Command::Batch { file, errors } => {
            let config = BatchConfig {
                errors: match errors {
                    ErrorPolicyCli::Stop => ErrorPolicy::Stop,
                    ErrorPolicyCli::Skip => ErrorPolicy::Skip,
                },
                ..BatchConfig::default()
            };
            let registry = FunctionRegistry::new();
            let on_result = |result: batch::CallResult| {
                let mut line = Map::new();
                line.insert("index".to_string(), json!(result.index));
                if let Some(id) = result.id {
                    line.insert("id".to_string(), id);
                }
                line.insert("fn".to_string(), json!(result.function));
                line.insert("result".to_string(), json!(result.value));
                emit_json_line(&Value::Object(line));
                Ok(())
            };
            let on_failure = |failure: BatchFailure| emit_batch_failure(&failure, color_mode);
            let outcome = match file {
                Some(path) => {
                    let reader = File::open(&path).map_err(|err| {
                        Error::new(ErrorKind::Io)
                            .with_message("failed to open batch file")
                            .with_hint("Check the path passed to --file.")
                            .with_input(path.display().to_string())
                            .with_source(err)
                    })?;
                    run_batch(reader, &registry, config, on_result, on_failure)?
                }
                None => run_batch(io::stdin().lock(), &registry, config, on_result, on_failure)?,
            };
            emit_batch_summary(&outcome, color_mode);
            Ok(RunOutcome::ok())
        }
        Command::Functions { json } => {
            let registry = FunctionRegistry::new();
            if json || !io::stdout().is_terminal() {
                let functions = registry
                    .functions()
                    .iter()
                    .map(|function| {
                        json!({
                            "name": function.name(),
                            "params": function.params(),
                            "deterministic": function.is_deterministic(),
                        })
                    })
                    .collect::<Vec<_>>();
                emit_json(json!({ "functions": functions }));
            } else {
                let rows = registry
                    .functions()
                    .iter()
                    .map(|function| {
                        vec![
                            function.name().to_string(),
                            function.params().join(", "),
                            if function.is_deterministic() { "yes" } else { "no" }.to_string(),
                        ]
                    })
                    .collect::<Vec<_>>();
                println!("{}", render_table(&["NAME", "PARAMS", "DETERMINISTIC"], &rows));
            }
            Ok(RunOutcome::ok())
        }
    }
}
