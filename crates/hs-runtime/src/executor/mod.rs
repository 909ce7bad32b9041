//! Sandbox execution: one `SandboxExecutor` contract, two backends.
//!
//! `CageExecutor` runs the interpreter on the calling thread behind the capability table.
//! `IsolatedVmExecutor` additionally moves every run onto its own worker thread with a
//! freshly built engine, so the host can walk away from a stuck script. Both go through
//! the same session code and must return identical results for identical jobs.

mod cage;
mod isolated;
mod session;

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use hs_core::{EnvironmentSet, Request, Response, SandboxError, TestDescriptor};
use serde::{Deserialize, Serialize};

pub use cage::CageExecutor;
pub use isolated::IsolatedVmExecutor;

pub const DEFAULT_MAX_OPERATIONS: u64 = 2_000_000;
pub const DEFAULT_MAX_CALL_LEVELS: usize = 64;
pub const DEFAULT_MAX_STRING_SIZE: usize = 1024 * 1024;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_ARRAY_SIZE: usize = 100_000;
pub const DEFAULT_MAX_MAP_SIZE: usize = 10_000;
pub const DEFAULT_MAX_CONSOLE_LINES: usize = 1_000;
pub const DEFAULT_MAX_CONSOLE_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScriptKind {
    PreRequest,
    Test,
}

/// Everything one run needs. Deep-copied into the sandbox; the caller's values are never touched.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptJob {
    pub kind: ScriptKind,
    pub script: String,
    pub envs: EnvironmentSet,
    pub request: Request,
    pub response: Option<Response>,
}

impl ScriptJob {
    pub fn new(
        kind: ScriptKind,
        script: impl Into<String>,
        envs: EnvironmentSet,
        request: Request,
    ) -> Self {
        Self {
            kind,
            script: script.into(),
            envs,
            request,
            response: None,
        }
    }

    pub fn with_response(mut self, response: Response) -> Self {
        self.response = Some(response);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScriptOutcome {
    pub envs: EnvironmentSet,
    pub request: Request,
    pub tests: TestDescriptor,
    pub console: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Cage,
    Isolated,
}

impl BackendKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Cage => "cage",
            Self::Isolated => "isolated",
        }
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "cage" => Ok(Self::Cage),
            "isolated" => Ok(Self::Isolated),
            other => Err(format!(
                "unknown backend \"{}\", expected \"cage\" or \"isolated\"",
                other
            )),
        }
    }
}

/// Out-of-band stop signal. Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationHandle {
    flag: Arc<AtomicBool>,
}

impl CancellationHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SandboxOptions {
    pub backend: Option<BackendKind>,
    pub max_operations: Option<u64>,
    pub max_call_levels: Option<usize>,
    pub max_string_size: Option<usize>,
    pub max_array_size: Option<usize>,
    pub max_map_size: Option<usize>,
    pub max_console_lines: Option<usize>,
    pub max_console_bytes: Option<usize>,
    pub timeout: Option<Duration>,
    pub cancel: Option<CancellationHandle>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SandboxLimits {
    pub max_operations: u64,
    pub max_call_levels: usize,
    pub max_string_size: usize,
    pub max_array_size: usize,
    pub max_map_size: usize,
    /// Console output the host keeps for one run. Going past either cap is a `RangeError`.
    pub max_console_lines: usize,
    pub max_console_bytes: usize,
    pub timeout: Duration,
}

impl Default for SandboxLimits {
    fn default() -> Self {
        Self {
            max_operations: DEFAULT_MAX_OPERATIONS,
            max_call_levels: DEFAULT_MAX_CALL_LEVELS,
            max_string_size: DEFAULT_MAX_STRING_SIZE,
            max_array_size: DEFAULT_MAX_ARRAY_SIZE,
            max_map_size: DEFAULT_MAX_MAP_SIZE,
            max_console_lines: DEFAULT_MAX_CONSOLE_LINES,
            max_console_bytes: DEFAULT_MAX_CONSOLE_BYTES,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl SandboxOptions {
    pub fn backend(&self) -> BackendKind {
        self.backend.unwrap_or_default()
    }

    pub fn limits(&self) -> SandboxLimits {
        let defaults = SandboxLimits::default();
        SandboxLimits {
            max_operations: self.max_operations.unwrap_or(defaults.max_operations),
            max_call_levels: self.max_call_levels.unwrap_or(defaults.max_call_levels),
            max_string_size: self.max_string_size.unwrap_or(defaults.max_string_size),
            max_array_size: self.max_array_size.unwrap_or(defaults.max_array_size),
            max_map_size: self.max_map_size.unwrap_or(defaults.max_map_size),
            max_console_lines: self
                .max_console_lines
                .unwrap_or(defaults.max_console_lines),
            max_console_bytes: self
                .max_console_bytes
                .unwrap_or(defaults.max_console_bytes),
            timeout: self.timeout.unwrap_or(defaults.timeout),
        }
    }

    pub fn cancellation(&self) -> CancellationHandle {
        self.cancel.clone().unwrap_or_default()
    }
}

pub trait SandboxExecutor {
    fn name(&self) -> &'static str;

    /// Runs one job to completion. Only a successful return carries mutated state.
    fn execute(
        &self,
        job: ScriptJob,
        cancel: &CancellationHandle,
    ) -> Result<ScriptOutcome, SandboxError>;
}

pub fn executor_for(options: &SandboxOptions) -> Box<dyn SandboxExecutor> {
    let limits = options.limits();
    match options.backend() {
        BackendKind::Cage => Box::new(CageExecutor::new(limits)),
        BackendKind::Isolated => Box::new(IsolatedVmExecutor::new(limits)),
    }
}
