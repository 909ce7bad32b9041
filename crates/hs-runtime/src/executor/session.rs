use std::time::Instant;

use hs_core::SandboxError;
use rhai::module_resolvers::DummyModuleResolver;
use rhai::{Dynamic, Engine, EvalAltResult};

use super::{CancellationHandle, SandboxLimits, ScriptJob, ScriptOutcome};
use crate::helpers::keyword_rewrite::rewrite_keyword_properties;
use crate::helpers::rhai_bridge::describe_error;
use crate::namespace::{build_scope, capture_console, register_namespaces, resolve_global};
use crate::state::{ScriptState, SharedState};

const TIMEOUT_TOKEN: &str = "timeout";
const CANCELLED_TOKEN: &str = "cancelled";
const CONSOLE_TOKEN: &str = "console";
const DEADLINE_CHECK_INTERVAL: u64 = 1024;

pub(super) fn timeout_error(limits: &SandboxLimits) -> SandboxError {
    SandboxError::new(
        "SANDBOX_TIMEOUT",
        format!(
            "Script execution failed: TimeoutError: script exceeded the {} ms time limit",
            limits.timeout.as_millis()
        ),
    )
}

pub(super) fn cancelled_error() -> SandboxError {
    SandboxError::new(
        "SANDBOX_CANCELLED",
        "Script execution failed: AbortError: script execution was cancelled",
    )
}

fn build_engine(
    state: &SharedState,
    limits: &SandboxLimits,
    signals: Vec<CancellationHandle>,
) -> Engine {
    let mut engine = Engine::new();
    engine.set_strict_variables(true);
    engine.set_max_operations(limits.max_operations);
    engine.set_max_call_levels(limits.max_call_levels);
    engine.set_max_string_size(limits.max_string_size);
    engine.set_max_array_size(limits.max_array_size);
    engine.set_max_map_size(limits.max_map_size);
    engine.set_module_resolver(DummyModuleResolver::new());
    engine.disable_symbol("eval");

    let print_state = state.clone();
    // Overflow from `print`/`debug` cannot be raised here; the progress hook stops the run.
    engine.on_print(move |text| {
        let _ = capture_console(&print_state, "log", text.to_string());
    });
    let debug_state = state.clone();
    engine.on_debug(move |text, _source, _position| {
        let _ = capture_console(&debug_state, "debug", text.to_string());
    });

    let deadline = Instant::now() + limits.timeout;
    let progress_state = state.clone();
    engine.on_progress(move |operations| {
        if signals.iter().any(CancellationHandle::is_cancelled) {
            return Some(Dynamic::from(CANCELLED_TOKEN.to_string()));
        }
        if progress_state.borrow().console.overflow().is_some() {
            return Some(Dynamic::from(CONSOLE_TOKEN.to_string()));
        }
        if operations % DEADLINE_CHECK_INTERVAL == 0 && Instant::now() >= deadline {
            return Some(Dynamic::from(TIMEOUT_TOKEN.to_string()));
        }
        None
    });

    let globals_state = state.clone();
    #[allow(deprecated)]
    engine.on_var(move |name, _index, _context| Ok(resolve_global(&globals_state, name)));

    register_namespaces(&mut engine);
    engine
}

fn script_failure(state: &SharedState, name: &str, message: &str) -> SandboxError {
    SandboxError::new(
        "SANDBOX_RUNTIME",
        format!("Script execution failed: {}: {}", name, message),
    )
    .with_partial_tests(state.borrow().tests.clone().finish())
}

fn console_overflow(state: &SharedState) -> Option<String> {
    state.borrow().console.overflow().map(str::to_string)
}

fn runtime_failure(
    error: &EvalAltResult,
    state: &SharedState,
    limits: &SandboxLimits,
) -> SandboxError {
    if let EvalAltResult::ErrorTerminated(token, _) = error.unwrap_inner() {
        return match token.clone().into_string() {
            Ok(token) if token == CANCELLED_TOKEN => cancelled_error(),
            Ok(token) if token == CONSOLE_TOKEN => {
                let message = console_overflow(state).unwrap_or_default();
                script_failure(state, "RangeError", &message)
            }
            _ => timeout_error(limits),
        };
    }
    let info = describe_error(error);
    script_failure(state, &info.name, &info.message)
}

/// Parses, then executes. Nothing leaves the session unless the whole script completes.
pub(super) fn run_session(
    backend: &'static str,
    job: &ScriptJob,
    limits: &SandboxLimits,
    signals: Vec<CancellationHandle>,
) -> Result<ScriptOutcome, SandboxError> {
    tracing::debug!(
        backend,
        kind = ?job.kind,
        script_len = job.script.len(),
        "sandbox run started"
    );
    if signals.iter().any(CancellationHandle::is_cancelled) {
        tracing::warn!(backend, "sandbox run cancelled before start");
        return Err(cancelled_error());
    }

    let state = ScriptState::shared_with_limits(job, limits);
    let engine = build_engine(&state, limits, signals);
    let mut scope = build_scope(&state);
    let source = rewrite_keyword_properties(&job.script);

    let ast = engine.compile_with_scope(&scope, &source).map_err(|error| {
        let info = describe_error(&EvalAltResult::from(error));
        tracing::debug!(backend, error = %info.message, "script rejected at parse time");
        SandboxError::new(
            "SANDBOX_SYNTAX",
            format!("Script execution failed: {}: {}", info.name, info.message),
        )
    })?;

    if let Err(error) = engine.run_ast_with_scope(&mut scope, &ast) {
        let failure = runtime_failure(&error, &state, limits);
        match failure.code.as_str() {
            "SANDBOX_TIMEOUT" | "SANDBOX_CANCELLED" => {
                tracing::warn!(backend, code = %failure.code, "sandbox run stopped")
            }
            _ => tracing::debug!(backend, error = %failure.message, "sandbox run failed"),
        }
        return Err(failure);
    }
    if let Some(message) = console_overflow(&state) {
        tracing::debug!(backend, error = %message, "sandbox run failed");
        return Err(script_failure(&state, "RangeError", &message));
    }

    let state = state.borrow();
    let outcome = ScriptOutcome {
        envs: state.envs.clone(),
        request: state.request.clone(),
        tests: state.tests.clone().finish(),
        console: state.console.lines().to_vec(),
    };
    tracing::debug!(
        backend,
        tests = outcome.tests.children.len(),
        console_lines = outcome.console.len(),
        "sandbox run finished"
    );
    Ok(outcome)
}
