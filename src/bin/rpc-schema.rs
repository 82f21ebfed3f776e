//! RPC Schema CLI
//!
//! Command-line interface for exporting, exercising and linting method
//! declarations.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use rpc_schema::{lint, load_json, load_service, CallArgs, FileStatus, Service, Severity};
use serde_json::{json, Value};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter (e.g. `debug`).
const LOG_ENV: &str = "RPC_SCHEMA_LOG";

#[derive(Parser)]
#[command(name = "rpc-schema")]
#[command(about = "Resolve, export and exercise RPC method argument schemas")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the JSON Schema of every method (or one method)
    Schema {
        /// Declaration source: file path or URL (http:// or https://)
        declarations: String,

        /// Only this method
        #[arg(long, short)]
        method: Option<String>,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Bind a payload of call arguments to a method's schemas
    Validate {
        /// Declaration source: file path or URL (http:// or https://)
        declarations: String,

        /// Method to bind against (e.g. pool.create)
        #[arg(long, short)]
        method: String,

        /// Payload file: a JSON array (positional) or object (keyword)
        payload: PathBuf,

        /// Output results as JSON (for automation)
        #[arg(long)]
        json: bool,
    },

    /// Lint declaration files (syntax, structure, resolution)
    Lint {
        /// File or directory to lint
        path: PathBuf,

        /// Output format: text (default) or json
        #[arg(long, default_value = "text")]
        format: String,

        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,

        /// Suppress progress output, only show errors
        #[arg(long, short)]
        quiet: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Schema {
            declarations,
            method,
            output,
            pretty,
        } => run_schema(&declarations, method.as_deref(), output, pretty),

        Commands::Validate {
            declarations,
            method,
            payload,
            json,
        } => run_validate(&declarations, &method, &payload, json),

        Commands::Lint {
            path,
            format,
            strict,
            quiet,
        } => run_lint(&path, &format, strict, quiet),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn load(source: &str, json_output: bool) -> Result<Service, u8> {
    load_service(source).map_err(|e| {
        report_error(json_output, &format!("loading declarations: {}", e));
        e.exit_code() as u8
    })
}

fn run_schema(
    source: &str,
    method: Option<&str>,
    output: Option<PathBuf>,
    pretty: bool,
) -> Result<(), u8> {
    let service = load(source, false)?;

    let schema = match method {
        Some(name) => {
            let accepts = service.method(name).ok_or_else(|| {
                eprintln!("Error: unknown method {}", name);
                2u8
            })?;
            Value::Array(accepts.json_schema())
        }
        None => service.json_schema(),
    };

    let json_output = if pretty {
        serde_json::to_string_pretty(&schema)
    } else {
        serde_json::to_string(&schema)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    match output {
        Some(path) => {
            std::fs::write(&path, &json_output).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", json_output);
        }
    }

    Ok(())
}

fn run_validate(source: &str, method: &str, payload_path: &Path, json_output: bool) -> Result<(), u8> {
    let payload = load_json(payload_path).map_err(|e| {
        report_error(json_output, &format!("loading payload: {}", e));
        e.exit_code() as u8
    })?;

    let args = CallArgs::from_params(payload).ok_or_else(|| {
        report_error(
            json_output,
            "payload must be an array (positional) or an object (keyword)",
        );
        2u8
    })?;

    let service = load(source, json_output)?;
    let accepts = service.method(method).ok_or_else(|| {
        report_error(json_output, &format!("unknown method {}", method));
        2u8
    })?;

    let positional = Value::Array(accepts.dump_args(&args.positional));
    let keyword = Value::Object(accepts.dump_kwargs(&args.keyword));
    debug!(method, args = %positional, kwargs = %keyword, "binding payload");

    match accepts.bind(&args) {
        Ok(params) => {
            if json_output {
                println!("{}", json!({"valid": true, "params": params}));
            } else {
                println!("Valid");
                println!("{}", Value::Array(accepts.dump_args(&params)));
            }
            Ok(())
        }
        Err(errors) => {
            if json_output {
                println!(
                    "{}",
                    json!({
                        "valid": false,
                        "errors": errors.iter().collect::<Vec<_>>(),
                        "wire": errors.to_wire(),
                    })
                );
            } else {
                eprintln!("Validation failed:");
                for error in &errors {
                    eprintln!("  {}", error);
                }
            }
            Err(1)
        }
    }
}

/// Output an error message in plain text or JSON format.
fn report_error(json_output: bool, msg: &str) {
    if json_output {
        println!("{}", json!({"valid": false, "error": msg}));
    } else {
        eprintln!("Error: {}", msg);
    }
}

fn run_lint(path: &Path, format: &str, strict: bool, quiet: bool) -> Result<(), u8> {
    if !path.exists() {
        eprintln!("Error: path not found: {}", path.display());
        return Err(2);
    }

    let result = lint(path, strict);

    if format == "json" {
        let rendered = serde_json::to_string_pretty(&result).map_err(|e| {
            eprintln!("Error serializing output: {}", e);
            2u8
        })?;
        println!("{}", rendered);
    } else {
        if !quiet {
            println!("Linting {} ...\n", path.display());
        }

        for file_result in &result.results {
            let status_icon = match file_result.status {
                FileStatus::Ok => "\x1b[32m✓\x1b[0m",
                FileStatus::Warning => "\x1b[33m⚠\x1b[0m",
                FileStatus::Error => "\x1b[31m✗\x1b[0m",
            };

            if !quiet || file_result.status != FileStatus::Ok {
                println!("  {} {}", status_icon, file_result.file.display());
            }

            for diag in &file_result.diagnostics {
                let (color, label) = match diag.severity {
                    Severity::Error => ("\x1b[31m", "error"),
                    Severity::Warning => ("\x1b[33m", "warning"),
                };
                if !quiet || diag.severity == Severity::Error {
                    println!(
                        "    {}{}[{}]\x1b[0m: {} - {}",
                        color, label, diag.code, diag.path, diag.message
                    );
                }
            }
        }

        println!();
        if result.is_ok() && (!strict || result.warnings == 0) {
            println!(
                "\x1b[32m✓ {} files checked, all passed\x1b[0m",
                result.files_checked
            );
        } else {
            println!(
                "\x1b[31m✗ {} files checked: {} passed, {} failed ({} errors, {} warnings)\x1b[0m",
                result.files_checked, result.passed, result.failed, result.errors, result.warnings
            );
        }
    }

    if result.is_ok() && (!strict || result.warnings == 0) {
        Ok(())
    } else {
        Err(1)
    }
}
