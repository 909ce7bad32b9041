use std::sync::OnceLock;

use hs_core::{EnvScope, EnvSource, ScriptValue};
use regex::{Captures, Regex};
use rhai::{Dynamic, Engine, Map};

use crate::helpers::rhai_bridge::{dynamic_to_value, require_string, ScriptResult};
use crate::state::SharedState;

fn optional_string(value: Option<String>) -> Dynamic {
    value.map(Dynamic::from).unwrap_or(Dynamic::UNIT)
}

/// `pw.env`: the legacy surface.
#[derive(Debug, Clone)]
pub(crate) struct PwEnv {
    state: SharedState,
}

impl PwEnv {
    pub(crate) fn new(state: SharedState) -> Self {
        Self { state }
    }

    fn get(&self, key: Dynamic) -> ScriptResult<Dynamic> {
        let key = require_string(key, "key")?;
        let state = self.state.borrow();
        Ok(optional_string(
            state.envs.get(&key).map(|lookup| lookup.value().to_string()),
        ))
    }

    fn get_resolve(&self, key: Dynamic) -> ScriptResult<Dynamic> {
        let key = require_string(key, "key")?;
        Ok(optional_string(self.state.borrow().envs.get_resolve(&key)))
    }

    fn set(&self, key: Dynamic, value: Dynamic) -> ScriptResult<()> {
        let key = require_string(key, "key")?;
        let value = require_string(value, "value")?;
        self.state.borrow_mut().envs.set(&key, &value);
        Ok(())
    }

    fn unset(&self, key: Dynamic) -> ScriptResult<()> {
        let key = require_string(key, "key")?;
        self.state.borrow_mut().envs.unset(&key, EnvSource::All);
        Ok(())
    }

    fn resolve(&self, template: Dynamic) -> ScriptResult<String> {
        let template = require_string(template, "template")?;
        Ok(self.state.borrow().envs.resolve(&template))
    }
}

/// `hopp.env`, `hopp.env.active` and `hopp.env.global`. Values must be strings.
#[derive(Debug, Clone)]
pub(crate) struct HoppEnv {
    state: SharedState,
    source: EnvSource,
}

impl HoppEnv {
    pub(crate) fn new(state: SharedState, source: EnvSource) -> Self {
        Self { state, source }
    }

    fn get(&self, key: Dynamic) -> ScriptResult<Dynamic> {
        let key = require_string(key, "key")?;
        Ok(optional_string(
            self.state.borrow().envs.get_resolve_from(&key, self.source),
        ))
    }

    fn get_raw(&self, key: Dynamic) -> ScriptResult<Dynamic> {
        let key = require_string(key, "key")?;
        let state = self.state.borrow();
        Ok(optional_string(
            state
                .envs
                .get_from(&key, self.source)
                .map(|lookup| lookup.value().to_string()),
        ))
    }

    fn get_initial_raw(&self, key: Dynamic) -> ScriptResult<Dynamic> {
        let key = require_string(key, "key")?;
        let state = self.state.borrow();
        Ok(optional_string(
            state.envs.get_initial(&key, self.source).map(str::to_string),
        ))
    }

    fn set(&self, key: Dynamic, value: Dynamic) -> ScriptResult<()> {
        let key = require_string(key, "key")?;
        let value = require_string(value, "value")?;
        self.state.borrow_mut().envs.set_in(&key, &value, self.source);
        Ok(())
    }

    fn set_initial(&self, key: Dynamic, value: Dynamic) -> ScriptResult<()> {
        let key = require_string(key, "key")?;
        let value = require_string(value, "value")?;
        self.state
            .borrow_mut()
            .envs
            .set_initial(&key, &value, self.source);
        Ok(())
    }

    fn delete(&self, key: Dynamic) -> ScriptResult<()> {
        let key = require_string(key, "key")?;
        self.state.borrow_mut().envs.unset(&key, self.source);
        Ok(())
    }

    fn reset(&self, key: Dynamic) -> ScriptResult<()> {
        let key = require_string(key, "key")?;
        self.state.borrow_mut().envs.reset(&key, self.source);
        Ok(())
    }
}

/// Stores non-string values as their JSON text, as `pm` scripts expect.
fn pm_value(value: Dynamic) -> String {
    match dynamic_to_value(value) {
        ScriptValue::String(text) => text,
        other => other.to_json_text(),
    }
}

/// `pm.environment` (selected scope) and `pm.globals` (global scope).
#[derive(Debug, Clone)]
pub(crate) struct PmScope {
    state: SharedState,
    scope: EnvScope,
}

impl PmScope {
    pub(crate) fn new(state: SharedState, scope: EnvScope) -> Self {
        Self { state, scope }
    }

    fn source(&self) -> EnvSource {
        match self.scope {
            EnvScope::Selected => EnvSource::Active,
            EnvScope::Global => EnvSource::Global,
        }
    }

    fn get(&self, key: Dynamic) -> ScriptResult<Dynamic> {
        let key = require_string(key, "key")?;
        let state = self.state.borrow();
        Ok(optional_string(
            state
                .envs
                .get_from(&key, self.source())
                .map(|lookup| lookup.value().to_string()),
        ))
    }

    fn set(&self, key: Dynamic, value: Dynamic) -> ScriptResult<()> {
        let key = require_string(key, "key")?;
        let value = pm_value(value);
        self.state
            .borrow_mut()
            .envs
            .set_in(&key, &value, self.source());
        Ok(())
    }

    fn unset(&self, key: Dynamic) -> ScriptResult<()> {
        let key = require_string(key, "key")?;
        self.state.borrow_mut().envs.unset(&key, self.source());
        Ok(())
    }

    fn has(&self, key: Dynamic) -> ScriptResult<bool> {
        let key = require_string(key, "key")?;
        Ok(self.state.borrow().envs.get_from(&key, self.source()).is_some())
    }

    fn clear(&self) {
        let mut state = self.state.borrow_mut();
        match self.scope {
            EnvScope::Selected => state.envs.selected.clear(),
            EnvScope::Global => state.envs.global.clear(),
        }
    }

    fn to_object(&self) -> Map {
        let state = self.state.borrow();
        state
            .envs
            .scope(self.scope)
            .iter()
            .map(|variable| {
                (
                    variable.key.as_str().into(),
                    Dynamic::from(variable.current_value.clone()),
                )
            })
            .collect()
    }
}

fn mustache() -> &'static Regex {
    static MUSTACHE: OnceLock<Regex> = OnceLock::new();
    MUSTACHE.get_or_init(|| {
        Regex::new(r"\{\{([^{}]*)\}\}").expect("mustache pattern should compile")
    })
}

/// `pm.variables`: reads through both scopes with selected precedence.
#[derive(Debug, Clone)]
pub(crate) struct PmVariables {
    state: SharedState,
}

impl PmVariables {
    pub(crate) fn new(state: SharedState) -> Self {
        Self { state }
    }

    fn get(&self, key: Dynamic) -> ScriptResult<Dynamic> {
        let key = require_string(key, "key")?;
        let state = self.state.borrow();
        Ok(optional_string(
            state.envs.get(&key).map(|lookup| lookup.value().to_string()),
        ))
    }

    fn set(&self, key: Dynamic, value: Dynamic) -> ScriptResult<()> {
        let key = require_string(key, "key")?;
        let value = pm_value(value);
        self.state.borrow_mut().envs.set(&key, &value);
        Ok(())
    }

    fn has(&self, key: Dynamic) -> ScriptResult<bool> {
        let key = require_string(key, "key")?;
        Ok(self.state.borrow().envs.get(&key).is_some())
    }

    /// Substitutes `{{name}}` for known names and leaves unknown placeholders in place.
    fn replace_in(&self, template: Dynamic) -> ScriptResult<String> {
        let template = require_string(template, "template")?;
        let state = self.state.borrow();
        Ok(mustache()
            .replace_all(&template, |captures: &Captures<'_>| {
                let name = captures.get(1).map(|found| found.as_str().trim()).unwrap_or("");
                state
                    .envs
                    .get_resolve(name)
                    .unwrap_or_else(|| captures[0].to_string())
            })
            .into_owned())
    }
}

pub(crate) fn register_env_api(engine: &mut Engine) {
    engine.register_type_with_name::<PwEnv>("PwEnv");
    engine.register_fn("get", |env: &mut PwEnv, key: Dynamic| env.get(key));
    engine.register_fn("getResolve", |env: &mut PwEnv, key: Dynamic| env.get_resolve(key));
    engine.register_fn("set", |env: &mut PwEnv, key: Dynamic, value: Dynamic| env.set(key, value));
    engine.register_fn("unset", |env: &mut PwEnv, key: Dynamic| env.unset(key));
    engine.register_fn("resolve", |env: &mut PwEnv, template: Dynamic| env.resolve(template));

    engine.register_type_with_name::<HoppEnv>("HoppEnv");
    engine.register_get("active", |env: &mut HoppEnv| {
        HoppEnv::new(env.state.clone(), EnvSource::Active)
    });
    engine.register_get("global_", |env: &mut HoppEnv| {
        HoppEnv::new(env.state.clone(), EnvSource::Global)
    });
    engine.register_fn("get", |env: &mut HoppEnv, key: Dynamic| env.get(key));
    engine.register_fn("getRaw", |env: &mut HoppEnv, key: Dynamic| env.get_raw(key));
    engine.register_fn("getInitialRaw", |env: &mut HoppEnv, key: Dynamic| {
        env.get_initial_raw(key)
    });
    engine.register_fn("set", |env: &mut HoppEnv, key: Dynamic, value: Dynamic| {
        env.set(key, value)
    });
    engine.register_fn("setInitial", |env: &mut HoppEnv, key: Dynamic, value: Dynamic| {
        env.set_initial(key, value)
    });
    engine.register_fn("delete", |env: &mut HoppEnv, key: Dynamic| env.delete(key));
    engine.register_fn("reset", |env: &mut HoppEnv, key: Dynamic| env.reset(key));

    engine.register_type_with_name::<PmScope>("PmScope");
    engine.register_fn("get", |env: &mut PmScope, key: Dynamic| env.get(key));
    engine.register_fn("set", |env: &mut PmScope, key: Dynamic, value: Dynamic| env.set(key, value));
    engine.register_fn("unset", |env: &mut PmScope, key: Dynamic| env.unset(key));
    engine.register_fn("has", |env: &mut PmScope, key: Dynamic| env.has(key));
    engine.register_fn("clear", |env: &mut PmScope| env.clear());
    engine.register_fn("toObject", |env: &mut PmScope| env.to_object());

    engine.register_type_with_name::<PmVariables>("PmVariables");
    engine.register_fn("get", |vars: &mut PmVariables, key: Dynamic| vars.get(key));
    engine.register_fn("set", |vars: &mut PmVariables, key: Dynamic, value: Dynamic| {
        vars.set(key, value)
    });
    engine.register_fn("has", |vars: &mut PmVariables, key: Dynamic| vars.has(key));
    engine.register_fn("replaceIn", |vars: &mut PmVariables, template: Dynamic| {
        vars.replace_in(template)
    });
}

#[cfg(test)]
mod env_api_tests {
    use super::*;
    use crate::executor::{ScriptJob, ScriptKind};
    use crate::helpers::rhai_bridge::describe_error;
    use crate::state::ScriptState;
    use hs_core::{EnvironmentSet, EnvironmentVariable, Request};

    fn state() -> SharedState {
        let envs = EnvironmentSet::new(
            vec![EnvironmentVariable::new("host", "example.com")],
            vec![
                EnvironmentVariable::new("a", "b"),
                EnvironmentVariable::new("url", "https://<<host>>/v1"),
            ],
        );
        ScriptState::shared(&ScriptJob::new(ScriptKind::Test, "", envs, Request::default()))
    }

    #[test]
    fn pw_env_validates_before_mutating() {
        let state = state();
        let env = PwEnv::new(state.clone());
        let error = env
            .set(Dynamic::from_int(5), Dynamic::from("c"))
            .expect_err("non-string key should fail");
        assert_eq!(describe_error(&error).message, "Expected key to be a string");
        assert!(env.set(Dynamic::from("a"), Dynamic::from_int(1)).is_err());
        assert_eq!(state.borrow().envs.get("a").map(|l| l.value().to_string()), Some("b".to_string()));

        env.set(Dynamic::from("a"), Dynamic::from("c")).expect("set should work");
        let resolved = env.get_resolve(Dynamic::from("url")).expect("getResolve should work");
        assert_eq!(resolved.into_string().expect("string"), "https://example.com/v1");
        assert!(env.get(Dynamic::from("missing")).expect("get should work").is_unit());
    }

    #[test]
    fn hopp_env_sources_target_their_scope() {
        let state = state();
        let global = HoppEnv::new(state.clone(), EnvSource::Global);
        global
            .set(Dynamic::from("fresh"), Dynamic::from("1"))
            .expect("set should work");
        assert_eq!(state.borrow().envs.global.len(), 2);

        let active = HoppEnv::new(state.clone(), EnvSource::Active);
        assert!(active.get_raw(Dynamic::from("host")).expect("getRaw").is_unit());
        active
            .set_initial(Dynamic::from("a"), Dynamic::from("init"))
            .expect("setInitial should work");
        active.reset(Dynamic::from("a")).expect("reset should work");
        let raw = active.get_raw(Dynamic::from("a")).expect("getRaw");
        assert_eq!(raw.into_string().expect("string"), "init");
        assert!(active.set(Dynamic::from("a"), Dynamic::from_bool(true)).is_err());
    }

    #[test]
    fn pm_scopes_stringify_and_replace() {
        let state = state();
        let environment = PmScope::new(state.clone(), EnvScope::Selected);
        environment
            .set(Dynamic::from("count"), Dynamic::from_int(3))
            .expect("set should work");
        let count = environment.get(Dynamic::from("count")).expect("get");
        assert_eq!(count.into_string().expect("string"), "3");
        assert!(environment.has(Dynamic::from("count")).expect("has"));
        assert!(environment.to_object().contains_key("url"));

        let variables = PmVariables::new(state.clone());
        let text = variables
            .replace_in(Dynamic::from("{{a}} at {{host}} / {{nope}}"))
            .expect("replaceIn should work");
        assert_eq!(text, "b at example.com / {{nope}}");

        PmScope::new(state.clone(), EnvScope::Global).clear();
        assert!(state.borrow().envs.global.is_empty());
    }
}
