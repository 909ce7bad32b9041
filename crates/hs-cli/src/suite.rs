use std::path::{Path, PathBuf};

use hs_api::{run_pre_request_script, run_test_script};
use hs_core::{EnvironmentSet, Request, Response, SandboxError};
use hs_runtime::{SandboxOptions, ScriptKind};
use serde::Deserialize;
use thiserror::Error;
use walkdir::WalkDir;

pub(crate) const CASE_SCHEMA_V1: &str = "hs-case.v1";
const CASE_SUFFIX: &str = ".case.json";

#[derive(Debug, Error)]
pub(crate) enum SuiteError {
    #[error("Failed to read file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse case {path}: {source}")]
    ParseCase {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Invalid case schema version \"{found}\", expected \"{expected}\".")]
    InvalidSchemaVersion { expected: String, found: String },
    #[error("No *.case.json files under {path}.")]
    Empty { path: PathBuf },
    #[error("Failed to scan {path}: {source}")]
    Scan {
        path: PathBuf,
        source: walkdir::Error,
    },
    #[error("Test scripts need a response.")]
    MissingResponse,
    #[error("Expected success, got {0}")]
    UnexpectedError(SandboxError),
    #[error("Expected error \"{expected}\", script succeeded.")]
    UnexpectedSuccess { expected: String },
    #[error("{field} mismatch. expected={expected} actual={actual}")]
    Mismatch {
        field: &'static str,
        expected: String,
        actual: String,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SuiteCase {
    pub(crate) schema_version: String,
    pub(crate) kind: ScriptKind,
    pub(crate) script: String,
    #[serde(default)]
    pub(crate) envs: EnvironmentSet,
    #[serde(default)]
    pub(crate) request: Request,
    #[serde(default)]
    pub(crate) response: Option<Response>,
    #[serde(default)]
    pub(crate) expected: ExpectedOutcome,
}

/// Only the listed fields are compared.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ExpectedOutcome {
    #[serde(default)]
    pub(crate) error_message: Option<String>,
    #[serde(default)]
    pub(crate) tests: Option<serde_json::Value>,
    #[serde(default)]
    pub(crate) envs: Option<EnvironmentSet>,
    #[serde(default)]
    pub(crate) request: Option<Request>,
    #[serde(default)]
    pub(crate) console: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct SuiteReport {
    pub(crate) passed: Vec<String>,
    pub(crate) failed: Vec<(String, String)>,
}

pub(crate) fn discover_cases(root: &Path) -> Result<Vec<PathBuf>, SuiteError> {
    let mut cases = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|source| SuiteError::Scan {
            path: root.to_path_buf(),
            source,
        })?;
        let is_case = entry.file_type().is_file()
            && entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.ends_with(CASE_SUFFIX));
        if is_case {
            cases.push(entry.into_path());
        }
    }
    if cases.is_empty() {
        return Err(SuiteError::Empty {
            path: root.to_path_buf(),
        });
    }
    Ok(cases)
}

pub(crate) fn read_case(path: &Path) -> Result<SuiteCase, SuiteError> {
    let raw = std::fs::read_to_string(path).map_err(|source| SuiteError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    let case: SuiteCase = serde_json::from_str(&raw).map_err(|source| SuiteError::ParseCase {
        path: path.to_path_buf(),
        source,
    })?;
    if case.schema_version != CASE_SCHEMA_V1 {
        return Err(SuiteError::InvalidSchemaVersion {
            expected: CASE_SCHEMA_V1.to_string(),
            found: case.schema_version,
        });
    }
    Ok(case)
}

struct Observed {
    envs: EnvironmentSet,
    request: Option<Request>,
    tests: Option<serde_json::Value>,
    console: Vec<String>,
}

fn execute_case(case: &SuiteCase, options: &SandboxOptions) -> Result<Observed, SuiteError> {
    let result = match case.kind {
        ScriptKind::PreRequest => {
            run_pre_request_script(&case.script, &case.envs, &case.request, options).map(
                |outcome| Observed {
                    envs: outcome.envs,
                    request: Some(outcome.request),
                    tests: None,
                    console: outcome.console,
                },
            )
        }
        ScriptKind::Test => {
            let response = case.response.as_ref().ok_or(SuiteError::MissingResponse)?;
            run_test_script(&case.script, &case.envs, &case.request, response, options).map(
                |outcome| Observed {
                    envs: outcome.envs,
                    request: None,
                    tests: serde_json::to_value(&outcome.tests).ok(),
                    console: outcome.console,
                },
            )
        }
    };

    match (result, &case.expected.error_message) {
        (Ok(_), Some(expected)) => Err(SuiteError::UnexpectedSuccess {
            expected: expected.clone(),
        }),
        (Ok(observed), None) => Ok(observed),
        (Err(error), Some(expected)) if &error.message == expected => Ok(Observed {
            envs: case.envs.clone(),
            request: None,
            tests: None,
            console: Vec::new(),
        }),
        (Err(error), Some(expected)) => Err(mismatch("errorMessage", expected, &error.message)),
        (Err(error), None) => Err(SuiteError::UnexpectedError(error)),
    }
}

fn mismatch<T: serde::Serialize + ?Sized>(
    field: &'static str,
    expected: &T,
    actual: &T,
) -> SuiteError {
    SuiteError::Mismatch {
        field,
        expected: serde_json::to_string(expected).unwrap_or_default(),
        actual: serde_json::to_string(actual).unwrap_or_default(),
    }
}

pub(crate) fn assert_case(case: &SuiteCase, options: &SandboxOptions) -> Result<(), SuiteError> {
    let observed = execute_case(case, options)?;
    if case.expected.error_message.is_some() {
        return Ok(());
    }
    let expected = &case.expected;
    if let Some(tests) = &expected.tests {
        let actual = observed.tests.unwrap_or(serde_json::Value::Null);
        if tests != &actual {
            return Err(mismatch("tests", tests, &actual));
        }
    }
    if let Some(envs) = &expected.envs {
        if envs != &observed.envs {
            return Err(mismatch("envs", envs, &observed.envs));
        }
    }
    if let (Some(request), Some(actual)) = (&expected.request, &observed.request) {
        if request != actual {
            return Err(mismatch("request", request, actual));
        }
    }
    if let Some(console) = &expected.console {
        if console != &observed.console {
            return Err(mismatch("console", console, &observed.console));
        }
    }
    Ok(())
}

fn case_name(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .trim_end_matches(CASE_SUFFIX)
        .to_string()
}

pub(crate) fn run_suite(root: &Path, options: &SandboxOptions) -> Result<SuiteReport, SuiteError> {
    let mut report = SuiteReport::default();
    for path in discover_cases(root)? {
        let name = case_name(root, &path);
        let verdict = read_case(&path).and_then(|case| assert_case(&case, options));
        match verdict {
            Ok(()) => {
                tracing::debug!(case = %name, "case passed");
                report.passed.push(name);
            }
            Err(error) => {
                tracing::warn!(case = %name, %error, "case failed");
                report.failed.push((name, error.to_string()));
            }
        }
    }
    Ok(report)
}
