use serde::{Deserialize, Serialize};

use crate::template::resolve_variable;
use crate::types::{EnvironmentSet, EnvironmentVariable};

/// Which scopes an environment operation may read or write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvSource {
    #[default]
    All,
    Active,
    Global,
}

impl EnvSource {
    fn reads_selected(self) -> bool {
        matches!(self, Self::All | Self::Active)
    }

    fn reads_global(self) -> bool {
        matches!(self, Self::All | Self::Global)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvScope {
    Selected,
    Global,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvLookup<'a> {
    pub variable: &'a EnvironmentVariable,
    pub scope: EnvScope,
}

impl<'a> EnvLookup<'a> {
    /// Borrows from the environment set, not from the lookup itself.
    pub fn value(&self) -> &'a str {
        &self.variable.current_value
    }
}

#[derive(Debug, Clone, Copy)]
enum EnvField {
    Current,
    Initial,
}

impl EnvironmentSet {
    pub fn new(global: Vec<EnvironmentVariable>, selected: Vec<EnvironmentVariable>) -> Self {
        Self { global, selected }
    }

    pub fn get(&self, key: &str) -> Option<EnvLookup<'_>> {
        self.get_from(key, EnvSource::All)
    }

    pub fn get_from(&self, key: &str, source: EnvSource) -> Option<EnvLookup<'_>> {
        if source.reads_selected() {
            if let Some(variable) = find(&self.selected, key) {
                return Some(EnvLookup {
                    variable,
                    scope: EnvScope::Selected,
                });
            }
        }
        if source.reads_global() {
            if let Some(variable) = find(&self.global, key) {
                return Some(EnvLookup {
                    variable,
                    scope: EnvScope::Global,
                });
            }
        }
        None
    }

    pub fn get_initial(&self, key: &str, source: EnvSource) -> Option<&str> {
        self.get_from(key, source)
            .map(|lookup| lookup.variable.initial_value.as_str())
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.set_in(key, value, EnvSource::All);
    }

    /// Updates `currentValue` where the key lives, else creates it in the source's home scope.
    pub fn set_in(&mut self, key: &str, value: &str, source: EnvSource) {
        self.write(key, value, source, EnvField::Current);
    }

    pub fn set_initial(&mut self, key: &str, value: &str, source: EnvSource) {
        self.write(key, value, source, EnvField::Initial);
    }

    /// Removes the key from the first scope holding it. Returns whether anything was removed.
    pub fn unset(&mut self, key: &str, source: EnvSource) -> bool {
        let Some(scope) = self.get_from(key, source).map(|lookup| lookup.scope) else {
            return false;
        };
        let variables = self.scope_mut(scope);
        let before = variables.len();
        variables.retain(|variable| variable.key != key);
        before != variables.len()
    }

    /// Restores `currentValue` from `initialValue`.
    pub fn reset(&mut self, key: &str, source: EnvSource) -> bool {
        let Some(scope) = self.get_from(key, source).map(|lookup| lookup.scope) else {
            return false;
        };
        match find_mut(self.scope_mut(scope), key) {
            Some(variable) => {
                variable.current_value = variable.initial_value.clone();
                true
            }
            None => false,
        }
    }

    pub fn resolve(&self, template: &str) -> String {
        crate::template::resolve_template(template, self)
    }

    pub fn get_resolve(&self, key: &str) -> Option<String> {
        self.get_resolve_from(key, EnvSource::All)
    }

    pub fn get_resolve_from(&self, key: &str, source: EnvSource) -> Option<String> {
        self.get_from(key, source)
            .map(|lookup| resolve_variable(key, lookup.value(), self, source))
    }

    pub fn scope(&self, scope: EnvScope) -> &[EnvironmentVariable] {
        match scope {
            EnvScope::Selected => &self.selected,
            EnvScope::Global => &self.global,
        }
    }

    fn scope_mut(&mut self, scope: EnvScope) -> &mut Vec<EnvironmentVariable> {
        match scope {
            EnvScope::Selected => &mut self.selected,
            EnvScope::Global => &mut self.global,
        }
    }

    fn write(&mut self, key: &str, value: &str, source: EnvSource, field: EnvField) {
        let existing = self.get_from(key, source).map(|lookup| lookup.scope);
        let home = match source {
            EnvSource::Global => EnvScope::Global,
            EnvSource::All | EnvSource::Active => EnvScope::Selected,
        };
        let variables = self.scope_mut(existing.unwrap_or(home));
        match find_mut(variables, key) {
            Some(variable) => match field {
                EnvField::Current => variable.current_value = value.to_string(),
                EnvField::Initial => variable.initial_value = value.to_string(),
            },
            None => variables.push(EnvironmentVariable::new(key, value)),
        }
    }
}

fn find<'a>(variables: &'a [EnvironmentVariable], key: &str) -> Option<&'a EnvironmentVariable> {
    variables.iter().find(|variable| variable.key == key)
}

fn find_mut<'a>(
    variables: &'a mut [EnvironmentVariable],
    key: &str,
) -> Option<&'a mut EnvironmentVariable> {
    variables.iter_mut().find(|variable| variable.key == key)
}

#[cfg(test)]
mod env_tests {
    use super::*;

    fn var(key: &str, initial: &str, current: &str) -> EnvironmentVariable {
        EnvironmentVariable {
            key: key.to_string(),
            initial_value: initial.to_string(),
            current_value: current.to_string(),
            secret: false,
        }
    }

    fn sample() -> EnvironmentSet {
        EnvironmentSet::new(
            vec![var("shared", "g0", "g"), var("only_global", "o0", "o")],
            vec![var("shared", "s0", "s"), var("a", "b", "b")],
        )
    }

    #[test]
    fn get_prefers_selected_scope() {
        let envs = sample();
        let lookup = envs.get("shared").expect("shared should exist");
        assert_eq!(lookup.value(), "s");
        assert_eq!(lookup.scope, EnvScope::Selected);
        assert_eq!(
            envs.get("only_global").map(|lookup| lookup.scope),
            Some(EnvScope::Global)
        );
        assert!(envs.get("missing").is_none());
        assert_eq!(
            envs.get_from("shared", EnvSource::Global)
                .map(|lookup| lookup.value()),
            Some("g")
        );
        assert!(envs.get_from("only_global", EnvSource::Active).is_none());
    }

    #[test]
    fn looked_up_values_outlive_the_lookup() {
        let envs = sample();
        let values = ["shared", "only_global", "missing"]
            .iter()
            .filter_map(|key| envs.get(key).map(|lookup| lookup.value()))
            .collect::<Vec<_>>();
        assert_eq!(values, vec!["s", "o"]);
    }

    #[test]
    fn set_updates_current_and_preserves_initial() {
        let mut envs = sample();
        envs.set("a", "c");
        assert_eq!(envs.selected[1], var("a", "b", "c"));

        envs.set("only_global", "changed");
        assert_eq!(envs.global[1], var("only_global", "o0", "changed"));
        assert_eq!(envs.selected.len(), 2);
    }

    #[test]
    fn set_creates_missing_key_in_home_scope() {
        let mut envs = sample();
        envs.set("fresh", "v");
        assert_eq!(envs.selected.last(), Some(&var("fresh", "v", "v")));

        envs.set_in("fresh_global", "g", EnvSource::Global);
        assert_eq!(envs.global.last(), Some(&var("fresh_global", "g", "g")));

        envs.set_in("shared", "active-only", EnvSource::Global);
        assert_eq!(envs.global[0].current_value, "active-only");
        assert_eq!(envs.selected[0].current_value, "s");
    }

    #[test]
    fn set_initial_touches_only_initial_value() {
        let mut envs = sample();
        envs.set_initial("a", "new-initial", EnvSource::All);
        assert_eq!(envs.selected[1], var("a", "new-initial", "b"));
        assert_eq!(
            envs.get_initial("a", EnvSource::All),
            Some("new-initial")
        );
        envs.set_initial("brand_new", "x", EnvSource::Active);
        assert_eq!(envs.selected.last(), Some(&var("brand_new", "x", "x")));
    }

    #[test]
    fn unset_and_reset_target_first_matching_scope() {
        let mut envs = sample();
        assert!(envs.unset("shared", EnvSource::All));
        assert_eq!(envs.get("shared").map(|lookup| lookup.value()), Some("g"));
        assert!(!envs.unset("missing", EnvSource::All));

        envs.set("a", "changed");
        assert!(envs.reset("a", EnvSource::All));
        assert_eq!(envs.get("a").map(|lookup| lookup.value()), Some("b"));
        assert!(!envs.reset("a", EnvSource::Global));
    }

    #[test]
    fn get_resolve_expands_placeholders() {
        let mut envs = sample();
        envs.set("url", "https://<<only_global>>/x");
        assert_eq!(envs.get_resolve("url").as_deref(), Some("https://o/x"));
        assert_eq!(envs.get_resolve("nope"), None);
        envs.set("self", "x<<self>>");
        assert_eq!(envs.get_resolve("self").as_deref(), Some("x<<self>>"));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn set_then_get_round_trips(key in "[a-z]{1,8}", value in ".{0,16}") {
                let mut envs = sample();
                let initial_before = envs.get(&key).map(|lookup| lookup.variable.initial_value.clone());
                envs.set(&key, &value);
                let lookup = envs.get(&key).expect("key should exist after set");
                prop_assert_eq!(lookup.value(), value.as_str());
                match initial_before {
                    Some(initial) => prop_assert_eq!(&lookup.variable.initial_value, &initial),
                    None => prop_assert_eq!(&lookup.variable.initial_value, &value),
                }
            }

            #[test]
            fn selected_shadows_global(key in "[a-z]{1,8}", selected in "[a-z]{0,8}", global in "[a-z]{0,8}") {
                let envs = EnvironmentSet::new(
                    vec![EnvironmentVariable::new(key.clone(), global)],
                    vec![EnvironmentVariable::new(key.clone(), selected.clone())],
                );
                prop_assert_eq!(envs.get(&key).map(|lookup| lookup.value().to_string()), Some(selected.clone()));
                prop_assert_eq!(envs.resolve(&format!("<<{}>>", key)), selected);
            }
        }
    }
}
