//! Purpose: `sqlval` CLI entry point; runs registered scalar functions from the shell.
//! Role: Binary crate root; parses args, runs commands, emits JSON on stdout.
//! Invariants: Commands emit stable stdout formats (human on a TTY where noted, JSON otherwise).
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
//! Invariants: Every function call goes through `api::FunctionRegistry`.
use std::io::{self, IsTerminal};
use std::path::PathBuf;

use clap::error::ErrorKind as ClapErrorKind;
use clap::{ArgGroup, CommandFactory, Parser, Subcommand, ValueEnum, ValueHint};
use clap_complete::aot::Shell;
use serde_json::{Map, Value, json};
use std::error::Error as StdError;
use tracing_subscriber::EnvFilter;

mod batch;
mod command_dispatch;

use batch::{BatchFailure, BatchOutcome};
use sqlval::api::{Error, ErrorKind, to_exit_code};

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    init_tracing();
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err((err, color_mode)) => {
            emit_error(&err, color_mode);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn run() -> Result<RunOutcome, (Error, ColorMode)> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    (
                        Error::new(ErrorKind::Io)
                            .with_message("failed to write help")
                            .with_source(io_err),
                        ColorMode::Auto,
                    )
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                let message = clap_error_summary(&err);
                let hint = clap_error_hint(&err);
                return Err((
                    Error::new(ErrorKind::Usage)
                        .with_message(message)
                        .with_hint(hint),
                    ColorMode::Auto,
                ));
            }
        },
    };

    let color_mode = cli.color;
    command_dispatch::dispatch_command(cli.command, color_mode).map_err(|err| (err, color_mode))
}

#[derive(Parser)]
#[command(
    name = "sqlval",
    version,
    about = "Culture-invariant validators and typed comparators for SQL scalar functions",
    help_template = r#"{about-with-newline}
{before-help}USAGE
  {usage}

COMMANDS
{subcommands}

OPTIONS
{options}

{after-help}
"#,
    long_about = None,
    before_help = r#"Every function answers with a boolean; malformed input is simply `false`.

Mental model:
  - `call` runs any registered function by name
  - `compare` orders two values as a numeric type or as dates
  - `batch` evaluates JSON Lines call records
"#,
    after_help = r#"EXAMPLES
  $ sqlval call IsInt "2,147,483,647"
  $ sqlval call DateIsValid 20170821 "yyyymmdd|dd/mm/yyyy"
  $ sqlval compare 5 '>' 4 --type decimal
  $ sqlval compare 20170801 '>' 20110101 --formats yyyymmdd
  $ echo '{"fn":"IsUri","args":["http://www.cint.io","http"]}' | sqlval batch

LEARN MORE
  $ sqlval functions
  $ sqlval <command> --help"#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(
        long,
        default_value = "auto",
        value_enum,
        help = "Colorize stderr diagnostics: auto|always|never"
    )]
    color: ColorMode,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn use_color(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, ValueEnum)]
enum ErrorPolicyCli {
    Stop,
    Skip,
}

#[derive(Subcommand)]
enum Command {
    #[command(
        about = "Run one registered function",
        long_about = r#"Run one registered function by name (case-insensitive) and print its result.

Arguments are passed as text, exactly as a SQL host would pass them."#,
        after_help = r#"EXAMPLES
  $ sqlval call IsGuid 6f9619ff-8b86-d011-b42d-00c04fc964ff
  $ sqlval call isuri http://www.cint.io "mailto|uuid"
  $ sqlval call GetGuid"#
    )]
    Call {
        #[arg(help = "Function name, e.g. IsInt or CompareVals")]
        name: String,
        #[arg(allow_hyphen_values = true, help = "Function arguments, in order")]
        args: Vec<String>,
    },
    #[command(
        about = "Compare two values as a numeric type or as dates",
        after_help = r#"OPERATORS
  >  >=  <  <=  =  <>

TYPES
  int uint byte sbyte short ushort long ulong float double decimal

NOTES
  - Without --strict, anything that cannot be compared prints false.
  - With --strict, parse failures, unknown types and unknown operators exit non-zero."#
    )]
    #[command(group(ArgGroup::new("kind").required(true).args(["type_tag", "formats"])))]
    Compare {
        #[arg(allow_hyphen_values = true)]
        value1: String,
        op: String,
        #[arg(allow_hyphen_values = true)]
        value2: String,
        #[arg(long = "type", help = "Numeric type tag")]
        type_tag: Option<String>,
        #[arg(long, help = "Piped list of exact date formats, e.g. 'yyyyMMdd|dd/MM/yyyy'")]
        formats: Option<String>,
        #[arg(long, help = "Report why a comparison is not possible")]
        strict: bool,
    },
    #[command(
        about = "Check a date against a piped list of exact formats",
        after_help = r#"NOTES
  - Formats are tried left to right; the first exact match wins.
  - `mm` is minutes and `MM` is months."#
    )]
    Date {
        value: String,
        #[arg(long, short = 'f')]
        formats: String,
        #[arg(long, help = "Exit non-zero when no format matches")]
        strict: bool,
    },
    #[command(
        about = "Evaluate JSON Lines call records",
        long_about = r#"Evaluate one call per line: {"fn": "IsInt", "args": ["12"], "id": 1}.

Results are printed as JSON Lines in input order; `id` is echoed back."#
    )]
    Batch {
        #[arg(short = 'f', long, value_hint = ValueHint::FilePath, help = "Read records from FILE instead of stdin")]
        file: Option<PathBuf>,
        #[arg(long, value_enum, default_value = "stop", help = "What to do with a bad record")]
        errors: ErrorPolicyCli,
    },
    #[command(about = "List registered functions")]
    Functions {
        #[arg(long, help = "Emit JSON even on a terminal")]
        json: bool,
    },
    #[command(about = "Generate shell completions")]
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
    #[command(about = "Print version info")]
    Version,
}

fn emit_json(value: Value) {
    let json = if io::stdout().is_terminal() {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    }
    .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string());
    println!("{json}");
}

fn emit_json_line(value: &Value) {
    let json = serde_json::to_string(value)
        .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string());
    println!("{json}");
}

fn emit_version_output() {
    if io::stdout().is_terminal() {
        println!("sqlval {}", env!("CARGO_PKG_VERSION"));
    } else {
        emit_json(json!({
            "name": "sqlval",
            "version": env!("CARGO_PKG_VERSION"),
        }));
    }
}

#[derive(Copy, Clone, Debug)]
enum AnsiColor {
    Red,
    Yellow,
}

fn colorize_label(label: &str, enabled: bool, color: AnsiColor) -> String {
    if !enabled {
        return label.to_string();
    }
    let code = match color {
        AnsiColor::Red => "31",
        AnsiColor::Yellow => "33",
    };
    format!("\u{1b}[{code}m{label}\u{1b}[0m")
}

fn emit_error(err: &Error, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("{}", error_text(err, color_mode.use_color(is_tty)));
        return;
    }

    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn emit_batch_failure(failure: &BatchFailure, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        let label = colorize_label("notice:", color_mode.use_color(is_tty), AnsiColor::Yellow);
        eprintln!(
            "{label} skipped record {} (line {}): {}",
            failure.index, failure.line, failure.message
        );
        return;
    }
    let mut details = Map::new();
    details.insert("kind".to_string(), json!("batch_skip"));
    details.insert("index".to_string(), json!(failure.index));
    details.insert("line".to_string(), json!(failure.line));
    details.insert("error_kind".to_string(), json!(failure.error_kind));
    details.insert("message".to_string(), json!(failure.message));
    if let Some(snippet) = &failure.snippet {
        details.insert("snippet".to_string(), json!(snippet));
    }
    eprintln!("{}", json!({ "notice": details }));
}

fn emit_batch_summary(outcome: &BatchOutcome, color_mode: ColorMode) {
    if outcome.failed == 0 {
        return;
    }
    let message = format!(
        "Finished with {} skipped record{}.",
        outcome.failed,
        if outcome.failed == 1 { "" } else { "s" }
    );
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        let label = colorize_label("notice:", color_mode.use_color(is_tty), AnsiColor::Yellow);
        eprintln!("{label} {message}");
        return;
    }
    eprintln!(
        "{}",
        json!({
            "notice": {
                "kind": "batch_summary",
                "message": message,
                "total": outcome.records_total,
                "ok": outcome.ok,
                "failed": outcome.failed,
            }
        })
    );
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::ParseFailure => "value does not parse".to_string(),
        ErrorKind::UnsupportedType => "unsupported type".to_string(),
        ErrorKind::UnsupportedOperator => "unsupported operator".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
    }
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(input) = err.input() {
        inner.insert("input".to_string(), json!(input));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error, use_color: bool) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "{} {}",
        colorize_label("error:", use_color, AnsiColor::Red),
        error_message(err)
    ));

    if let Some(hint) = err.hint() {
        lines.push(format!(
            "{} {hint}",
            colorize_label("hint:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(input) = err.input() {
        lines.push(format!(
            "{} {input:?}",
            colorize_label("input:", use_color, AnsiColor::Yellow)
        ));
    }

    let causes = error_causes(err);
    if let Some(cause) = causes.first() {
        lines.push(format!(
            "{} {cause}",
            colorize_label("caused by:", use_color, AnsiColor::Yellow)
        ));
    }

    lines.join("\n")
}

fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths = headers
        .iter()
        .map(|header| header.chars().count())
        .collect::<Vec<_>>();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let header_row = headers.iter().map(|header| header.to_string()).collect::<Vec<_>>();
    std::iter::once(&header_row)
        .chain(rows)
        .map(|row| format_table_line(row, &widths))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_table_line(cells: &[String], widths: &[usize]) -> String {
    let mut line = String::new();
    for (idx, width) in widths.iter().enumerate() {
        if idx > 0 {
            line.push_str("  ");
        }
        let cell = cells.get(idx).map(String::as_str).unwrap_or("");
        line.push_str(cell);
        let cell_len = cell.chars().count();
        if *width > cell_len && idx + 1 < widths.len() {
            line.push_str(&" ".repeat(*width - cell_len));
        }
    }
    line
}

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        return trimmed.to_string();
    }
    "invalid arguments".to_string()
}

fn clap_error_hint(err: &clap::Error) -> String {
    let rendered = err.to_string();
    let usage = rendered
        .lines()
        .find_map(|line| line.trim().strip_prefix("Usage: "))
        .map(str::trim);
    let subcommand = usage.and_then(|usage| {
        let mut tokens = usage.split_whitespace().skip_while(|token| *token != "sqlval");
        tokens.next()?;
        tokens.next().filter(|token| {
            !(token.starts_with('-') || token.starts_with('<') || token.starts_with('['))
        })
    });
    match subcommand {
        Some(subcommand) => format!("Try `sqlval {subcommand} --help`."),
        None => "Try `sqlval --help`.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command, error_json, render_table};
    use clap::{CommandFactory, Parser};
    use serde_json::json;
    use sqlval::api::{Error, ErrorKind};

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn compare_requires_type_or_formats() {
        assert!(Cli::try_parse_from(["sqlval", "compare", "5", ">", "4"]).is_err());
        assert!(
            Cli::try_parse_from(["sqlval", "compare", "5", ">", "4", "--type", "int", "--formats", "x"])
                .is_err()
        );
        let cli = Cli::try_parse_from(["sqlval", "compare", "-5", "<", "4", "--type", "int"])
            .expect("parse");
        match cli.command {
            Command::Compare { value1, type_tag, .. } => {
                assert_eq!(value1, "-5");
                assert_eq!(type_tag.as_deref(), Some("int"));
            }
            _ => panic!("expected compare"),
        }
    }

    #[test]
    fn error_json_carries_kind_hint_and_input() {
        let err = Error::new(ErrorKind::UnsupportedType)
            .with_message("unknown type tag")
            .with_hint("Use int.")
            .with_input("money");
        assert_eq!(
            error_json(&err),
            json!({"error": {
                "kind": "UnsupportedType",
                "message": "unknown type tag",
                "hint": "Use int.",
                "input": "money",
            }})
        );
    }

    #[test]
    fn table_pads_all_but_last_column() {
        let rows = vec![vec!["IsInt".to_string(), "value".to_string()]];
        assert_eq!(
            render_table(&["NAME", "PARAMS"], &rows),
            "NAME   PARAMS\nIsInt  value"
        );
    }
}
