//! Script sandbox runtime: the Rhai bridge, the `pw`/`hopp`/`pm` capability table,
//! assertion chains, test-tree aggregation and the two interchangeable executors.

mod assertion;
pub mod executor;
mod helpers;
mod namespace;
mod report;
mod state;

pub use executor::{
    executor_for, BackendKind, CageExecutor, CancellationHandle, IsolatedVmExecutor,
    SandboxExecutor, SandboxLimits, SandboxOptions, ScriptJob, ScriptKind, ScriptOutcome,
    DEFAULT_MAX_ARRAY_SIZE, DEFAULT_MAX_CALL_LEVELS, DEFAULT_MAX_CONSOLE_BYTES,
    DEFAULT_MAX_CONSOLE_LINES, DEFAULT_MAX_MAP_SIZE, DEFAULT_MAX_OPERATIONS,
    DEFAULT_MAX_STRING_SIZE, DEFAULT_TIMEOUT,
};
