use std::ffi::OsString;
use std::path::Path;

use clap::Parser;
use hs_api::{run_pre_request_script, run_test_script};
use hs_core::{EnvironmentSet, Request, Response, SandboxError};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

mod cli_args;
mod error_map;
mod source_loader;
mod suite;

pub(crate) use cli_args::{Cli, Mode, PreRequestArgs, SuiteArgs, TestArgs};
pub(crate) use error_map::{emit_error, map_cli_input_invalid, map_cli_source_read, map_cli_suite};
pub(crate) use source_loader::{read_json, read_json_or_default, read_text};

pub fn run_cli_from_args<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => {
            let _ = error.print();
            return error.exit_code();
        }
    };
    init_logging(cli.verbose);
    match run(cli) {
        Ok(code) => code,
        Err(error) => emit_error(error),
    }
}

/// Logs go to stderr so stdout stays machine-readable. `RUST_LOG` wins over `--verbose`.
fn init_logging(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run(cli: Cli) -> Result<i32, SandboxError> {
    match cli.command {
        Mode::PreRequest(args) => run_pre_request(args),
        Mode::Test(args) => run_test(args),
        Mode::Suite(args) => run_suite(args),
    }
}

fn emit_json<T: Serialize + ?Sized>(label: &str, value: &T) {
    println!(
        "{}:{}",
        label,
        serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
    );
}

fn run_pre_request(args: PreRequestArgs) -> Result<i32, SandboxError> {
    let script = read_text(Path::new(&args.script))?;
    let envs: EnvironmentSet = read_json_or_default(args.envs.as_deref())?;
    let request: Request = read_json_or_default(args.request.as_deref())?;
    let result = run_pre_request_script(&script, &envs, &request, &args.sandbox.options())?;

    println!("RESULT:OK");
    emit_json("ENVS_JSON", &result.envs);
    emit_json("REQUEST_JSON", &result.request);
    emit_json("CONSOLE_JSON", &result.console);
    Ok(0)
}

fn run_test(args: TestArgs) -> Result<i32, SandboxError> {
    let script = read_text(Path::new(&args.script))?;
    let envs: EnvironmentSet = read_json_or_default(args.envs.as_deref())?;
    let request: Request = read_json_or_default(args.request.as_deref())?;
    let response: Response = read_json(Path::new(&args.response))?;
    let result = run_test_script(&script, &envs, &request, &response, &args.sandbox.options())?;

    let tally = result.tests.tally();
    println!("RESULT:OK");
    emit_json("ENVS_JSON", &result.envs);
    emit_json("TESTS_JSON", &result.tests);
    emit_json("CONSOLE_JSON", &result.console);
    println!(
        "TALLY:passed={} failed={} skipped={}",
        tally.passed, tally.failed, tally.skipped
    );
    Ok(0)
}

fn run_suite(args: SuiteArgs) -> Result<i32, SandboxError> {
    let report = suite::run_suite(Path::new(&args.cases_dir), &args.sandbox.options())
        .map_err(map_cli_suite)?;
    for name in &report.passed {
        println!("CASE:OK|{}", name);
    }
    for (name, reason) in &report.failed {
        println!("CASE:FAIL|{}|{}", name, reason);
    }
    println!(
        "SUITE:passed={} failed={}",
        report.passed.len(),
        report.failed.len()
    );
    Ok(if report.failed.is_empty() { 0 } else { 1 })
}

#[cfg(test)]
mod tests;
