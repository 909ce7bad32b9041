use super::*;
use serde_json::json;
use std::path::PathBuf;

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("hs-cli-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("temp dir");
    dir
}

fn write(dir: &Path, name: &str, contents: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("write fixture");
    path.to_string_lossy().to_string()
}

#[test]
fn invalid_arguments_return_clap_exit_code() {
    assert_eq!(run_cli_from_args(["hs-cli", "bogus"]), 2);
    assert_eq!(run_cli_from_args(["hs-cli", "test", "--script", "a.js"]), 2);
}

#[test]
fn unknown_backend_is_rejected_by_the_parser() {
    let code = run_cli_from_args([
        "hs-cli",
        "pre-request",
        "--script",
        "a.js",
        "--backend",
        "wasm",
    ]);
    assert_eq!(code, 2);
}

#[test]
fn sandbox_flags_map_onto_options() {
    let cli = Cli::try_parse_from([
        "hs-cli",
        "suite",
        "--cases-dir",
        "cases",
        "--backend",
        "isolated",
        "--timeout-ms",
        "250",
        "--max-operations",
        "1000",
        "--max-console-lines",
        "5",
    ])
    .expect("args should parse");
    let Mode::Suite(args) = cli.command else {
        panic!("expected suite mode");
    };
    let options = args.sandbox.options();
    assert_eq!(options.backend(), hs_api::BackendKind::Isolated);
    assert_eq!(options.limits().timeout.as_millis(), 250);
    assert_eq!(options.limits().max_operations, 1000);
    assert_eq!(options.limits().max_console_lines, 5);
    assert_eq!(
        options.limits().max_console_bytes,
        hs_runtime::DEFAULT_MAX_CONSOLE_BYTES
    );
}

#[test]
fn missing_script_file_reports_not_found() {
    let error = read_text(Path::new("/definitely/not/here.js")).expect_err("missing");
    assert_eq!(error.code, "CLI_SOURCE_NOT_FOUND");
    assert_eq!(
        run_cli_from_args(["hs-cli", "pre-request", "--script", "/definitely/not/here.js"]),
        1
    );
}

#[test]
fn malformed_json_input_reports_invalid_input() {
    let dir = temp_dir("bad-json");
    let envs = write(&dir, "envs.json", "{not json");
    let error = read_json_or_default::<EnvironmentSet>(Some(&envs)).expect_err("bad json");
    assert_eq!(error.code, "CLI_INPUT_INVALID");
}

#[test]
fn pre_request_mode_runs_script_with_defaults() {
    let dir = temp_dir("pre-request");
    let script = write(&dir, "pre.js", "pw.env.set(\"token\", \"abc\");");
    assert_eq!(
        run_cli_from_args(["hs-cli", "pre-request", "--script", script.as_str()]),
        0
    );
}

#[test]
fn test_mode_succeeds_even_when_expectations_fail() {
    let dir = temp_dir("test-mode");
    let script = write(
        &dir,
        "test.js",
        "pw.test(\"status\", || { pw.expect(pw.response.status).toBe(201); });",
    );
    let response = write(
        &dir,
        "response.json",
        &json!({"status": 200, "body": "{}"}).to_string(),
    );
    let code = run_cli_from_args([
        "hs-cli",
        "test",
        "--script",
        script.as_str(),
        "--response",
        response.as_str(),
    ]);
    assert_eq!(code, 0);
}

#[test]
fn script_errors_exit_non_zero() {
    let dir = temp_dir("script-error");
    let script = write(&dir, "bad.js", "let x = ;");
    assert_eq!(
        run_cli_from_args(["hs-cli", "pre-request", "--script", script.as_str()]),
        1
    );
}

#[test]
fn suite_mode_reports_failures_through_exit_code() {
    let dir = temp_dir("suite-mode");
    write(
        &dir,
        "ok.case.json",
        &json!({
            "schemaVersion": "hs-case.v1",
            "kind": "pre-request",
            "script": "pw.env.set(\"a\", \"b\");",
            "expected": {"envs": {"global": [], "selected": [
                {"key": "a", "initialValue": "b", "currentValue": "b"}
            ]}}
        })
        .to_string(),
    );
    let cases = dir.to_string_lossy().to_string();
    assert_eq!(
        run_cli_from_args(["hs-cli", "suite", "--cases-dir", cases.as_str()]),
        0
    );

    write(
        &dir,
        "wrong.case.json",
        &json!({
            "schemaVersion": "hs-case.v1",
            "kind": "pre-request",
            "script": "pw.env.set(\"a\", \"b\");",
            "expected": {"console": ["never printed"]}
        })
        .to_string(),
    );
    assert_eq!(
        run_cli_from_args(["hs-cli", "suite", "--cases-dir", cases.as_str()]),
        1
    );
}

#[test]
fn empty_suite_directory_is_an_error() {
    let dir = temp_dir("suite-empty");
    let cases = dir.to_string_lossy().to_string();
    assert_eq!(
        run_cli_from_args(["hs-cli", "suite", "--cases-dir", cases.as_str()]),
        1
    );
}
