use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::env::EnvSource;
use crate::types::EnvironmentSet;

const MAX_EXPAND_DEPTH: usize = 15;

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"<<([^<>]*)>>|\{\{([^{}]*)\}\}").expect("placeholder regex must compile")
    })
}

/// Marks a placeholder whose expansion re-entered its own chain or ran too deep.
struct ExpansionLoop;

pub fn resolve_template(template: &str, envs: &EnvironmentSet) -> String {
    resolve_template_from(template, envs, EnvSource::All)
}

/// Substitutes `<<name>>` and `{{name}}` recursively. Unknown names become empty,
/// looping placeholders stay as written.
pub fn resolve_template_from(template: &str, envs: &EnvironmentSet, source: EnvSource) -> String {
    let mut chain = Vec::new();
    expand_text(template, envs, source, &mut chain)
}

pub(crate) fn resolve_variable(
    key: &str,
    raw: &str,
    envs: &EnvironmentSet,
    source: EnvSource,
) -> String {
    let mut chain = vec![key.to_string()];
    expand_text(raw, envs, source, &mut chain)
}

fn expand_text(
    text: &str,
    envs: &EnvironmentSet,
    source: EnvSource,
    chain: &mut Vec<String>,
) -> String {
    let mut output = String::with_capacity(text.len());
    let mut last_index = 0usize;
    for captures in placeholder_regex().captures_iter(text) {
        let Some(full) = captures.get(0) else {
            continue;
        };
        output.push_str(&text[last_index..full.start()]);
        match expand_placeholder(&captures, envs, source, chain) {
            Ok(value) => output.push_str(&value),
            Err(ExpansionLoop) => output.push_str(full.as_str()),
        }
        last_index = full.end();
    }
    output.push_str(&text[last_index..]);
    output
}

fn expand_placeholder(
    captures: &Captures<'_>,
    envs: &EnvironmentSet,
    source: EnvSource,
    chain: &mut Vec<String>,
) -> Result<String, ExpansionLoop> {
    let name = captures
        .get(1)
        .or_else(|| captures.get(2))
        .map(|name| name.as_str().trim())
        .unwrap_or_default();
    if chain.iter().any(|entry| entry == name) || chain.len() >= MAX_EXPAND_DEPTH {
        return Err(ExpansionLoop);
    }
    let Some(lookup) = envs.get_from(name, source) else {
        return Ok(String::new());
    };
    chain.push(name.to_string());
    let expanded = expand_nested(lookup.value(), envs, source, chain);
    chain.pop();
    expanded
}

/// Like `expand_text`, but a loop anywhere below aborts the whole placeholder.
fn expand_nested(
    text: &str,
    envs: &EnvironmentSet,
    source: EnvSource,
    chain: &mut Vec<String>,
) -> Result<String, ExpansionLoop> {
    let mut output = String::with_capacity(text.len());
    let mut last_index = 0usize;
    for captures in placeholder_regex().captures_iter(text) {
        let Some(full) = captures.get(0) else {
            continue;
        };
        output.push_str(&text[last_index..full.start()]);
        output.push_str(&expand_placeholder(&captures, envs, source, chain)?);
        last_index = full.end();
    }
    output.push_str(&text[last_index..]);
    Ok(output)
}
