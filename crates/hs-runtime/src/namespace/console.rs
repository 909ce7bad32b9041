use rhai::{Dynamic, Engine};

use crate::helpers::rhai_bridge::{dynamic_to_value, script_error, ScriptResult};
use crate::state::SharedState;

/// `console.log` and friends. Output is captured, never written to the host streams.
#[derive(Debug, Clone)]
pub(crate) struct ConsoleApi {
    state: SharedState,
}

impl ConsoleApi {
    pub(crate) fn new(state: SharedState) -> Self {
        Self { state }
    }

    fn write(&self, level: &str, parts: Vec<Dynamic>) -> ScriptResult<()> {
        let text = parts
            .into_iter()
            .map(|part| dynamic_to_value(part).to_text())
            .collect::<Vec<_>>()
            .join(" ");
        capture_console(&self.state, level, text)
            .map_err(|message| script_error("RangeError", message))
    }
}

/// Appends one console line. `log` lines carry no level prefix.
pub(crate) fn capture_console(
    state: &SharedState,
    level: &str,
    text: String,
) -> Result<(), String> {
    tracing::debug!(stream = level, %text, "script console");
    let line = if level == "log" {
        text
    } else {
        format!("[{}] {}", level, text)
    };
    state.borrow_mut().console.push(line)
}

pub(crate) fn register_console(engine: &mut Engine) {
    engine.register_type_with_name::<ConsoleApi>("Console");
    for level in ["log", "info", "warn", "error", "debug"] {
        engine.register_fn(level, move |console: &mut ConsoleApi, a: Dynamic| {
            console.write(level, vec![a])
        });
        engine.register_fn(
            level,
            move |console: &mut ConsoleApi, a: Dynamic, b: Dynamic| console.write(level, vec![a, b]),
        );
        engine.register_fn(
            level,
            move |console: &mut ConsoleApi, a: Dynamic, b: Dynamic, c: Dynamic| {
                console.write(level, vec![a, b, c])
            },
        );
    }
}
