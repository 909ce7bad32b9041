//! The capability table handed to scripts: `pw`, `hopp`, `pm` and `console`.
//! Nothing else from the host is reachable.

mod console;
mod env_api;
mod request_api;
mod response_api;
mod testing;

use hs_core::{EnvScope, EnvSource};
use rhai::{Dynamic, Engine, Scope};

use crate::assertion::{register_chai, register_expectation, ChaiChain, Expectation};
use crate::helpers::rhai_bridge::dynamic_to_value;
use crate::state::SharedState;

pub(crate) use console::capture_console;
use console::ConsoleApi;
use env_api::{HoppEnv, PmScope, PmVariables, PwEnv};
use request_api::RequestApi;
use response_api::{current_response, pw_response, HoppResponse, PmResponse};
use testing::{register_testing, ScriptNamespace};

macro_rules! namespace {
    ($name:ident, $label:literal) => {
        #[derive(Debug, Clone)]
        pub(crate) struct $name {
            state: SharedState,
        }

        impl ScriptNamespace for $name {
            fn state(&self) -> &SharedState {
                &self.state
            }
        }

        impl $name {
            const LABEL: &'static str = $label;
        }
    };
}

namespace!(PwNamespace, "pw");
namespace!(HoppNamespace, "hopp");
namespace!(PmNamespace, "pm");

pub(crate) fn register_namespaces(engine: &mut Engine) {
    register_expectation(engine);
    register_chai(engine);
    env_api::register_env_api(engine);
    request_api::register_request_api(engine);
    response_api::register_response_api(engine);
    console::register_console(engine);

    engine.register_type_with_name::<PwNamespace>(PwNamespace::LABEL);
    register_testing::<PwNamespace>(engine);
    engine.register_fn("expect", |pw: &mut PwNamespace, value: Dynamic| {
        Expectation::new(dynamic_to_value(value), pw.state.clone())
    });
    engine.register_get("env", |pw: &mut PwNamespace| PwEnv::new(pw.state.clone()));
    engine.register_get("response", |pw: &mut PwNamespace| pw_response(&pw.state));

    engine.register_type_with_name::<HoppNamespace>(HoppNamespace::LABEL);
    register_testing::<HoppNamespace>(engine);
    engine.register_fn("expect", |hopp: &mut HoppNamespace, value: Dynamic| {
        ChaiChain::new(value, hopp.state.clone())
    });
    engine.register_get("env", |hopp: &mut HoppNamespace| {
        HoppEnv::new(hopp.state.clone(), EnvSource::All)
    });
    engine.register_get("request", |hopp: &mut HoppNamespace| {
        RequestApi::new(hopp.state.clone())
    });
    engine.register_get("response", |hopp: &mut HoppNamespace| {
        current_response(&hopp.state).map(HoppResponse::new)
    });

    engine.register_type_with_name::<PmNamespace>(PmNamespace::LABEL);
    register_testing::<PmNamespace>(engine);
    engine.register_fn("expect", |pm: &mut PmNamespace, value: Dynamic| {
        ChaiChain::new(value, pm.state.clone())
    });
    engine.register_get("environment", |pm: &mut PmNamespace| {
        PmScope::new(pm.state.clone(), EnvScope::Selected)
    });
    engine.register_get("globals", |pm: &mut PmNamespace| {
        PmScope::new(pm.state.clone(), EnvScope::Global)
    });
    engine.register_get("variables", |pm: &mut PmNamespace| {
        PmVariables::new(pm.state.clone())
    });
    engine.register_get("request", |pm: &mut PmNamespace| RequestApi::new(pm.state.clone()));
    engine.register_get("response", |pm: &mut PmNamespace| {
        current_response(&pm.state).map(|response| PmResponse::new(response, pm.state.clone()))
    });
}

const CONSOLE_LABEL: &str = "console";
const GLOBAL_LABELS: [&str; 4] = [
    PwNamespace::LABEL,
    HoppNamespace::LABEL,
    PmNamespace::LABEL,
    CONSOLE_LABEL,
];

/// A fresh handle for a namespace global, or `None` for any other name.
///
/// Handles only wrap the shared run state, so every read may build a new one. Serving reads
/// this way keeps closures from capturing the globals as shared variables, which the engine
/// would lock for the length of a `test` call and then refuse inside the body.
pub(crate) fn resolve_global(state: &SharedState, name: &str) -> Option<Dynamic> {
    let state = state.clone();
    let handle = match name {
        PwNamespace::LABEL => Dynamic::from(PwNamespace { state }),
        HoppNamespace::LABEL => Dynamic::from(HoppNamespace { state }),
        PmNamespace::LABEL => Dynamic::from(PmNamespace { state }),
        CONSOLE_LABEL => Dynamic::from(ConsoleApi::new(state)),
        _ => return None,
    };
    Some(handle)
}

/// The only globals a script sees. Compilation checks names against this scope; reads at run
/// time go through [`resolve_global`].
pub(crate) fn build_scope(state: &SharedState) -> Scope<'static> {
    let mut scope = Scope::new();
    for label in GLOBAL_LABELS {
        if let Some(handle) = resolve_global(state, label) {
            scope.push_dynamic(label, handle);
        }
    }
    scope
}
