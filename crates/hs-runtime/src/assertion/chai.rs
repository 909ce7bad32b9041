use std::rc::Rc;

use hs_core::{ExpectResult, Response, ScriptValue};
use regex::RegexBuilder;
use rhai::{Dynamic, Engine, EvalAltResult, FnPtr, NativeCallContext};

use crate::assertion::expectation::{register_legacy_assertions, Expectation, LegacyAssertions};
use crate::helpers::rhai_bridge::{
    describe_error, dynamic_to_value, value_to_dynamic, ScriptResult,
};
use crate::helpers::value_path::{lookup_path, parse_nested_path, PathSegment};
use crate::state::{record_result, SharedState};

/// Getter name registered in Rhai, and the word it contributes to messages.
const LANGUAGE_CHAINS: &[(&str, &str)] = &[
    ("to", "to"),
    ("be", "be"),
    ("been", "been"),
    ("is_", "is"),
    ("that", "that"),
    ("which", "which"),
    ("and", "and"),
    ("has", "has"),
    ("have", "have"),
    ("with_", "with"),
    ("at", "at"),
    ("of", "of"),
    ("same", "same"),
    ("but", "but"),
    ("does", "does"),
    ("still", "still"),
    ("also", "also"),
];

const TYPE_WORDS: &[&str] = &["array", "object", "number", "string", "boolean", "function"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ChainFlags {
    negated: bool,
    deep: bool,
    nested: bool,
    own: bool,
    any: bool,
    all: bool,
    include: bool,
    length: bool,
}

/// One link of a chai-style assertion chain. Every link is a fresh value.
#[derive(Debug, Clone)]
pub(crate) struct ChaiChain {
    subject: ScriptValue,
    callable: Option<FnPtr>,
    label: Option<String>,
    response: Option<Rc<Response>>,
    words: Vec<String>,
    flags: ChainFlags,
    sink: SharedState,
}

impl LegacyAssertions for ChaiChain {
    fn expectation(&self) -> Expectation {
        Expectation::with_negation(self.subject.clone(), self.flags.negated, self.sink.clone())
    }
}

impl ChaiChain {
    pub(crate) fn new(subject: Dynamic, sink: SharedState) -> Self {
        let callable = subject.clone().try_cast::<FnPtr>();
        Self {
            subject: dynamic_to_value(subject),
            callable,
            label: None,
            response: None,
            words: Vec::new(),
            flags: ChainFlags::default(),
            sink,
        }
    }

    /// `pm.response.to`: the subject is the response view, messages name it "response".
    pub(crate) fn for_response(response: Rc<Response>, view: ScriptValue, sink: SharedState) -> Self {
        Self {
            subject: view,
            callable: None,
            label: Some("response".to_string()),
            response: Some(response),
            words: vec!["to".to_string()],
            flags: ChainFlags::default(),
            sink,
        }
    }

    fn link(&self, word: &str) -> Self {
        let mut next = self.clone();
        next.words.push(word.to_string());
        next
    }

    fn flagged(&self, word: &str, set: impl FnOnce(&mut ChainFlags)) -> Self {
        let mut next = self.link(word);
        set(&mut next.flags);
        next
    }

    fn display(&self) -> String {
        self.label.clone().unwrap_or_else(|| self.subject.inspect())
    }

    fn message(&self, assertion: &str, args: &str) -> String {
        let modifiers = clean_modifiers(&self.words);
        let mut message = format!("Expected {} {}", self.display(), modifiers.join(" "));
        let (first, rest) = assertion.split_once(' ').unwrap_or((assertion, ""));
        if modifiers.last().map(String::as_str) == Some(first) {
            if !rest.is_empty() {
                message.push(' ');
                message.push_str(rest);
            }
        } else {
            message.push(' ');
            message.push_str(assertion);
        }
        message.push_str(args);
        message
    }

    /// Records one outcome. Negation is applied here and nowhere else.
    fn assert(&self, holds: bool, assertion: &str, args: &str) -> Self {
        record_result(
            &self.sink,
            ExpectResult::from_outcome(holds != self.flags.negated, self.message(assertion, args)),
        );
        let mut next = self.clone();
        next.words.push(format!("{}{}", assertion, args));
        next
    }

    fn measured(&self) -> Option<f64> {
        if self.flags.length {
            return self.subject.length().map(|length| length as f64);
        }
        self.subject.as_number()
    }

    fn compare(&self, bound: &ScriptValue, assertion: &str, test: impl Fn(f64, f64) -> bool) -> Self {
        let holds = match (self.measured(), bound.as_number()) {
            (Some(actual), Some(bound)) => test(actual, bound),
            _ => false,
        };
        self.assert(holds, assertion, &format!(" {}", bound.inspect()))
    }

    pub(crate) fn equal(&self, expected: &ScriptValue, assertion: &str) -> Self {
        self.assert(
            self.subject.strict_equals(expected),
            assertion,
            &format!(" {}", expected.inspect()),
        )
    }

    pub(crate) fn within(&self, start: &ScriptValue, end: &ScriptValue) -> Self {
        let holds = match (self.measured(), start.as_number(), end.as_number()) {
            (Some(actual), Some(start), Some(end)) => actual >= start && actual <= end,
            _ => false,
        };
        self.assert(
            holds,
            "within",
            &format!(" {}, {}", start.inspect(), end.inspect()),
        )
    }

    pub(crate) fn close_to(&self, expected: &ScriptValue, delta: &ScriptValue, assertion: &str) -> Self {
        let holds = match (self.subject.as_number(), expected.as_number(), delta.as_number()) {
            (Some(actual), Some(expected), Some(delta)) => (actual - expected).abs() <= delta,
            _ => false,
        };
        self.assert(
            holds,
            assertion,
            &format!(" {}, {}", expected.inspect(), delta.inspect()),
        )
    }

    pub(crate) fn type_of(&self, article: &str, expected: &ScriptValue) -> Self {
        let expected = expected.to_text().to_lowercase();
        let holds = self.subject.kind_name() == expected
            || (expected == "null" && self.subject == ScriptValue::Unit);
        self.assert(holds, &format!("{} {}", article, expected), "")
    }

    pub(crate) fn include(&self, needle: &ScriptValue) -> Self {
        let holds = match (&self.subject, needle) {
            (ScriptValue::String(text), ScriptValue::String(needle)) => text.contains(needle.as_str()),
            (ScriptValue::Array(items), needle) => items.iter().any(|item| item == needle),
            (ScriptValue::Map(entries), ScriptValue::Map(subset)) => subset
                .iter()
                .all(|(key, value)| entries.get(key) == Some(value)),
            _ => false,
        };
        self.assert(holds, "include", &format!(" {}", needle.inspect()))
    }

    pub(crate) fn property(&self, name: &str, expected: Option<&ScriptValue>, assertion: &str) -> Self {
        let path = if self.flags.nested {
            parse_nested_path(name)
        } else {
            vec![PathSegment::Key(name.to_string())]
        };
        let found = lookup_path(&self.subject, &path).cloned();
        let holds = match (&found, expected) {
            (Some(found), Some(expected)) => found == expected,
            (Some(_), None) => true,
            (None, _) => false,
        };
        let args = expected
            .map(|expected| format!(", {}", expected.inspect()))
            .unwrap_or_default();
        let asserted = self.assert(holds, &format!("{} '{}'", assertion, name), &args);
        match found {
            Some(found) if !self.flags.negated => self.narrowed(found),
            _ => asserted,
        }
    }

    /// Continues the chain on a new subject, as `.property(..)` does.
    fn narrowed(&self, subject: ScriptValue) -> Self {
        Self {
            callable: None,
            label: None,
            response: None,
            words: Vec::new(),
            flags: ChainFlags::default(),
            sink: self.sink.clone(),
            subject,
        }
    }

    pub(crate) fn length_of(&self, expected: &ScriptValue, assertion: &str) -> Self {
        let holds = match (self.subject.length(), expected.as_number()) {
            (Some(length), Some(expected)) => length as f64 == expected,
            _ => false,
        };
        self.assert(holds, assertion, &format!(" {}", expected.inspect()))
    }

    pub(crate) fn keys(&self, expected: Vec<ScriptValue>) -> Self {
        let expected = expected
            .into_iter()
            .flat_map(|value| match value {
                ScriptValue::Array(values) => values,
                other => vec![other],
            })
            .map(|value| value.to_text())
            .collect::<Vec<_>>();
        let actual = match &self.subject {
            ScriptValue::Map(entries) => entries.keys().cloned().collect::<Vec<_>>(),
            _ => Vec::new(),
        };
        let present = |key: &String| actual.contains(key);
        let holds = if expected.is_empty() {
            false
        } else if self.flags.any {
            expected.iter().any(present)
        } else if self.flags.include {
            expected.iter().all(present)
        } else {
            expected.iter().all(present) && expected.len() == actual.len()
        };
        let rendered = expected
            .iter()
            .map(|key| format!("'{}'", key))
            .collect::<Vec<_>>()
            .join(", ");
        self.assert(holds, "keys", &format!(" {}", rendered))
    }

    pub(crate) fn members(&self, expected: &ScriptValue) -> Self {
        let holds = match (&self.subject, expected) {
            (ScriptValue::Array(actual), ScriptValue::Array(expected)) => {
                if self.flags.include {
                    expected.iter().all(|member| actual.contains(member))
                } else {
                    same_members(actual, expected)
                }
            }
            _ => false,
        };
        self.assert(holds, "members", &format!(" {}", expected.inspect()))
    }

    pub(crate) fn one_of(&self, list: &ScriptValue) -> Self {
        let holds = match list {
            ScriptValue::Array(options) => options.contains(&self.subject),
            _ => false,
        };
        self.assert(holds, "oneOf", &format!(" {}", list.inspect()))
    }

    pub(crate) fn matches(&self, pattern: &str) -> Self {
        let (source, flags) = split_regex_literal(pattern);
        let text = self.subject.to_text();
        let matched = RegexBuilder::new(source)
            .case_insensitive(flags.contains('i'))
            .multi_line(flags.contains('m'))
            .dot_matches_new_line(flags.contains('s'))
            .build()
            .map(|regex| regex.is_match(&text))
            .unwrap_or(false);
        let not = if self.flags.negated { " not" } else { "" };
        record_result(
            &self.sink,
            ExpectResult::from_outcome(
                matched != self.flags.negated,
                format!("Expected '{}' to{} match /{}/{}", text, not, source, flags),
            ),
        );
        self.link(&format!("match /{}/{}", source, flags))
    }

    pub(crate) fn contains_string(&self, needle: &str) -> Self {
        let holds = self
            .subject
            .as_str()
            .map(|text| text.contains(needle))
            .unwrap_or(false);
        self.assert(holds, "have string", &format!(" '{}'", needle))
    }

    pub(crate) fn throws(&self, context: &NativeCallContext, expected: Option<&ScriptValue>) -> ScriptResult<Self> {
        let Some(callable) = &self.callable else {
            return Ok(self.assert(false, "throw", &render_optional(expected)));
        };
        let thrown = match callable.call_within_context::<Dynamic>(context, ()) {
            Ok(_) => None,
            Err(error) if is_fatal(&error) => return Err(error),
            Err(error) => Some(describe_error(&error)),
        };
        let holds = match (&thrown, expected.and_then(ScriptValue::as_str)) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(info), Some(expected)) if looks_like_error_name(expected) => info.name == expected,
            (Some(info), Some(expected)) => info.message.contains(expected),
        };
        Ok(self.assert(holds, "throw", &render_optional(expected)))
    }

    pub(crate) fn satisfy(&self, context: &NativeCallContext, matcher: &FnPtr) -> ScriptResult<Self> {
        let verdict = matcher.call_within_context::<Dynamic>(context, (value_to_dynamic(&self.subject),))?;
        Ok(self.assert(dynamic_to_value(verdict).is_truthy(), "satisfy", ""))
    }

    pub(crate) fn status(&self, expected: &ScriptValue) -> Self {
        let holds = match (&self.response, expected.as_number()) {
            (Some(response), Some(expected)) => f64::from(response.status) == expected,
            _ => false,
        };
        self.assert(holds, "status", &format!(" {}", expected.inspect()))
    }

    pub(crate) fn header(&self, name: &str, expected: Option<&ScriptValue>) -> Self {
        let actual = self
            .response
            .as_ref()
            .and_then(|response| response.header(name).map(str::to_string));
        let holds = match (actual, expected) {
            (Some(actual), Some(expected)) => actual == expected.to_text(),
            (Some(_), None) => true,
            (None, _) => false,
        };
        let args = expected
            .map(|expected| format!(", {}", expected.inspect()))
            .unwrap_or_default();
        self.assert(holds, &format!("header '{}'", name), &args)
    }

    fn terminal(&self, name: &str) -> Self {
        let subject = &self.subject;
        let holds = match name {
            "ok" => match &self.response {
                Some(response) => (200..300).contains(&response.status),
                None => subject.is_truthy(),
            },
            "true" => *subject == ScriptValue::Bool(true),
            "false" => *subject == ScriptValue::Bool(false),
            "null" | "undefined" => *subject == ScriptValue::Unit,
            "exist" => *subject != ScriptValue::Unit,
            "empty" => match subject {
                ScriptValue::String(text) => text.is_empty(),
                ScriptValue::Array(values) => values.is_empty(),
                ScriptValue::Map(entries) => entries.is_empty(),
                _ => false,
            },
            "NaN" => subject.as_number().map(f64::is_nan).unwrap_or(false),
            "finite" => subject.as_number().map(f64::is_finite).unwrap_or(false),
            _ => false,
        };
        self.assert(holds, name, "")
    }
}

fn same_members(actual: &[ScriptValue], expected: &[ScriptValue]) -> bool {
    if actual.len() != expected.len() {
        return false;
    }
    let mut remaining = actual.to_vec();
    for member in expected {
        match remaining.iter().position(|candidate| candidate == member) {
            Some(index) => {
                remaining.swap_remove(index);
            }
            None => return false,
        }
    }
    true
}

fn split_regex_literal(pattern: &str) -> (&str, &str) {
    if let Some(body) = pattern.strip_prefix('/') {
        if let Some(close) = body.rfind('/') {
            return (&body[..close], &body[close + 1..]);
        }
    }
    (pattern, "")
}

fn looks_like_error_name(text: &str) -> bool {
    text == "Error"
        || (text.ends_with("Error")
            && text.chars().next().is_some_and(|ch| ch.is_ascii_uppercase())
            && !text.contains(' '))
}

fn render_optional(value: Option<&ScriptValue>) -> String {
    value
        .map(|value| format!(" {}", value.inspect()))
        .unwrap_or_default()
}

/// Errors a `throws` probe must not swallow: limits and cancellation.
fn is_fatal(error: &EvalAltResult) -> bool {
    matches!(
        error.unwrap_inner(),
        EvalAltResult::ErrorTerminated(..)
            | EvalAltResult::ErrorTooManyOperations(..)
            | EvalAltResult::ErrorStackOverflow(..)
            | EvalAltResult::ErrorDataTooLarge(..)
    )
}

/// Normalizes chain words for messages: drops filler, maps `is`/`has`, collapses repeats.
fn clean_modifiers(words: &[String]) -> Vec<String> {
    let tokens = words
        .iter()
        .flat_map(|word| word.split_whitespace())
        .collect::<Vec<_>>();
    let mut out: Vec<String> = Vec::new();
    let mut index = 0usize;
    while index < tokens.len() {
        let token = tokens[index];
        let next = tokens.get(index + 1).copied();
        match (token, next) {
            ("that", Some("has")) => {
                let typed = out
                    .last()
                    .is_some_and(|last| TYPE_WORDS.contains(&last.as_str()));
                if typed {
                    out.push("that".to_string());
                    out.push("has".to_string());
                } else {
                    out.push("have".to_string());
                }
                index += 2;
                continue;
            }
            ("that", Some("does")) => {
                index += 2;
                continue;
            }
            ("to" | "which" | "does" | "but", _) => {}
            ("that", _) if out.is_empty() => {}
            ("is", _) => out.push("be".to_string()),
            ("has", _) => out.push("have".to_string()),
            (other, _) => out.push(other.to_string()),
        }
        index += 1;
    }
    out.dedup();
    out.insert(0, "to".to_string());
    out
}

fn arg(value: Dynamic) -> ScriptValue {
    dynamic_to_value(value)
}

pub(crate) fn register_chai(engine: &mut Engine) {
    engine.register_type_with_name::<ChaiChain>("Assertion");
    register_legacy_assertions::<ChaiChain>(engine);

    for (getter, word) in LANGUAGE_CHAINS {
        engine.register_get(*getter, move |chain: &mut ChaiChain| chain.link(word));
    }
    engine.register_get("not", |chain: &mut ChaiChain| {
        chain.flagged("not", |flags| flags.negated = true)
    });
    engine.register_get("deep", |chain: &mut ChaiChain| {
        chain.flagged("deep", |flags| flags.deep = true)
    });
    engine.register_get("nested", |chain: &mut ChaiChain| {
        chain.flagged("nested", |flags| flags.nested = true)
    });
    engine.register_get("own", |chain: &mut ChaiChain| {
        chain.flagged("own", |flags| flags.own = true)
    });
    engine.register_get("any", |chain: &mut ChaiChain| {
        chain.flagged("any", |flags| flags.any = true)
    });
    engine.register_get("all", |chain: &mut ChaiChain| {
        chain.flagged("all", |flags| flags.all = true)
    });
    for name in ["include", "contain", "includes", "contains"] {
        engine.register_get(name, |chain: &mut ChaiChain| {
            chain.flagged("include", |flags| flags.include = true)
        });
    }
    engine.register_get("length", |chain: &mut ChaiChain| {
        chain.flagged("length", |flags| flags.length = true)
    });

    for (getter, name) in [
        ("ok", "ok"),
        ("true_", "true"),
        ("false_", "false"),
        ("null_", "null"),
        ("undefined", "undefined"),
        ("exist", "exist"),
        ("empty", "empty"),
        ("NaN", "NaN"),
        ("finite", "finite"),
    ] {
        engine.register_get(getter, move |chain: &mut ChaiChain| chain.terminal(name));
    }

    for name in ["equal", "equals", "eq"] {
        engine.register_fn(name, |chain: &mut ChaiChain, expected: Dynamic| {
            chain.equal(&arg(expected), "equal")
        });
    }
    for name in ["eql", "eqls"] {
        engine.register_fn(name, |chain: &mut ChaiChain, expected: Dynamic| {
            chain.equal(&arg(expected), "eql")
        });
    }
    for name in ["above", "gt", "greaterThan"] {
        engine.register_fn(name, |chain: &mut ChaiChain, bound: Dynamic| {
            chain.compare(&arg(bound), "above", |actual, bound| actual > bound)
        });
    }
    for name in ["below", "lt", "lessThan"] {
        engine.register_fn(name, |chain: &mut ChaiChain, bound: Dynamic| {
            chain.compare(&arg(bound), "below", |actual, bound| actual < bound)
        });
    }
    for name in ["least", "gte"] {
        engine.register_fn(name, |chain: &mut ChaiChain, bound: Dynamic| {
            chain.compare(&arg(bound), "at least", |actual, bound| actual >= bound)
        });
    }
    for name in ["most", "lte"] {
        engine.register_fn(name, |chain: &mut ChaiChain, bound: Dynamic| {
            chain.compare(&arg(bound), "at most", |actual, bound| actual <= bound)
        });
    }
    engine.register_fn(
        "within",
        |chain: &mut ChaiChain, start: Dynamic, end: Dynamic| chain.within(&arg(start), &arg(end)),
    );
    for name in ["closeTo", "approximately"] {
        engine.register_fn(
            name,
            move |chain: &mut ChaiChain, expected: Dynamic, delta: Dynamic| {
                chain.close_to(&arg(expected), &arg(delta), name)
            },
        );
    }
    for article in ["a", "an"] {
        engine.register_fn(article, move |chain: &mut ChaiChain, expected: Dynamic| {
            chain.type_of(article, &arg(expected))
        });
    }
    for name in ["include", "includes", "contain", "contains"] {
        engine.register_fn(name, |chain: &mut ChaiChain, needle: Dynamic| {
            chain.include(&arg(needle))
        });
    }
    engine.register_fn("property", |chain: &mut ChaiChain, name: Dynamic| {
        chain.property(&arg(name).to_text(), None, "property")
    });
    engine.register_fn(
        "property",
        |chain: &mut ChaiChain, name: Dynamic, expected: Dynamic| {
            chain.property(&arg(name).to_text(), Some(&arg(expected)), "property")
        },
    );
    for name in ["ownProperty", "haveOwnProperty"] {
        engine.register_fn(name, |chain: &mut ChaiChain, property: Dynamic| {
            chain.property(&arg(property).to_text(), None, "own property")
        });
        engine.register_fn(
            name,
            |chain: &mut ChaiChain, property: Dynamic, expected: Dynamic| {
                chain.property(&arg(property).to_text(), Some(&arg(expected)), "own property")
            },
        );
    }
    for name in ["lengthOf", "length"] {
        engine.register_fn(name, move |chain: &mut ChaiChain, expected: Dynamic| {
            chain.length_of(&arg(expected), name)
        });
    }
    for name in ["keys", "key"] {
        engine.register_fn(name, |chain: &mut ChaiChain, a: Dynamic| chain.keys(vec![arg(a)]));
        engine.register_fn(name, |chain: &mut ChaiChain, a: Dynamic, b: Dynamic| {
            chain.keys(vec![arg(a), arg(b)])
        });
        engine.register_fn(
            name,
            |chain: &mut ChaiChain, a: Dynamic, b: Dynamic, c: Dynamic| {
                chain.keys(vec![arg(a), arg(b), arg(c)])
            },
        );
        engine.register_fn(
            name,
            |chain: &mut ChaiChain, a: Dynamic, b: Dynamic, c: Dynamic, d: Dynamic| {
                chain.keys(vec![arg(a), arg(b), arg(c), arg(d)])
            },
        );
    }
    engine.register_fn("members", |chain: &mut ChaiChain, expected: Dynamic| {
        chain.members(&arg(expected))
    });
    engine.register_fn("oneOf", |chain: &mut ChaiChain, list: Dynamic| {
        chain.one_of(&arg(list))
    });
    engine.register_fn("matches", |chain: &mut ChaiChain, pattern: Dynamic| {
        chain.matches(&arg(pattern).to_text())
    });
    engine.register_fn("string", |chain: &mut ChaiChain, needle: Dynamic| {
        chain.contains_string(&arg(needle).to_text())
    });
    engine.register_fn(
        "throws",
        |context: NativeCallContext, chain: &mut ChaiChain| chain.throws(&context, None),
    );
    engine.register_fn(
        "throws",
        |context: NativeCallContext, chain: &mut ChaiChain, expected: Dynamic| {
            chain.throws(&context, Some(&arg(expected)))
        },
    );
    engine.register_fn(
        "satisfy",
        |context: NativeCallContext, chain: &mut ChaiChain, matcher: FnPtr| {
            chain.satisfy(&context, &matcher)
        },
    );
    engine.register_fn("status", |chain: &mut ChaiChain, expected: Dynamic| {
        chain.status(&arg(expected))
    });
    engine.register_fn("header", |chain: &mut ChaiChain, name: Dynamic| {
        chain.header(&arg(name).to_text(), None)
    });
    engine.register_fn(
        "header",
        |chain: &mut ChaiChain, name: Dynamic, expected: Dynamic| {
            chain.header(&arg(name).to_text(), Some(&arg(expected)))
        },
    );
}

#[cfg(test)]
mod chai_tests {
    use super::*;
    use crate::executor::{ScriptJob, ScriptKind};
    use crate::state::ScriptState;
    use hs_core::{ExpectStatus, Request};

    fn sink() -> SharedState {
        ScriptState::shared(&ScriptJob::new(ScriptKind::Test, "", Default::default(), Request::default()))
    }

    fn chain(value: serde_json::Value, sink: &SharedState) -> ChaiChain {
        ChaiChain::new(value_to_dynamic(&ScriptValue::from_json(&value)), sink.clone())
    }

    fn last(sink: &SharedState) -> (ExpectStatus, String) {
        let root = sink.borrow().tests.clone().finish();
        let result = root.expect_results.last().cloned().expect("a result should be recorded");
        (result.status, result.message)
    }

    fn words(chain: &ChaiChain, words: &[&str]) -> ChaiChain {
        words.iter().fold(chain.clone(), |chain, word| chain.link(word))
    }

    #[test]
    fn equality_messages_follow_chain_words() {
        let sink = sink();
        words(&chain(serde_json::json!(42), &sink), &["to"]).equal(&42.0.into(), "equal");
        assert_eq!(last(&sink), (ExpectStatus::Pass, "Expected 42 to equal 42".to_string()));

        let object = serde_json::json!({"a": 1});
        words(&chain(object.clone(), &sink), &["to"]).equal(&ScriptValue::from_json(&object), "eql");
        assert_eq!(last(&sink).1, "Expected {a: 1} to eql {a: 1}");

        words(&chain(object.clone(), &sink), &["to", "deep"]).equal(&ScriptValue::from_json(&object), "equal");
        assert_eq!(last(&sink).1, "Expected {a: 1} to deep equal {a: 1}");

        words(&chain(serde_json::json!(1), &sink), &["to"])
            .flagged("not", |flags| flags.negated = true)
            .equal(&2.0.into(), "equal");
        assert_eq!(last(&sink), (ExpectStatus::Pass, "Expected 1 to not equal 2".to_string()));
    }

    #[test]
    fn modifiers_are_normalized() {
        let words = |items: &[&str]| items.iter().map(|item| item.to_string()).collect::<Vec<_>>();
        assert_eq!(clean_modifiers(&words(&["not", "to", "be"])), vec!["to", "not", "be"]);
        assert_eq!(clean_modifiers(&words(&["to", "is", "be"])), vec!["to", "be"]);
        assert_eq!(clean_modifiers(&words(&["that", "has"])), vec!["to", "have"]);
        assert_eq!(
            clean_modifiers(&words(&["to", "be", "an object", "that", "has"])),
            vec!["to", "be", "an", "object", "that", "has"]
        );
        assert_eq!(clean_modifiers(&words(&["which", "does", "but"])), vec!["to"]);
        assert_eq!(clean_modifiers(&words(&["that"])), vec!["to"]);
    }

    #[test]
    fn type_and_terminal_assertions() {
        let sink = sink();
        let be = |value| words(&chain(value, &sink), &["to", "be"]);
        be(serde_json::json!("foo")).type_of("a", &"string".into());
        assert_eq!(last(&sink), (ExpectStatus::Pass, "Expected 'foo' to be a string".to_string()));
        be(serde_json::json!([1, 2, 3])).type_of("an", &"array".into());
        assert_eq!(last(&sink).1, "Expected [1, 2, 3] to be an array");
        be(serde_json::json!(1)).terminal("ok");
        assert_eq!(last(&sink).1, "Expected 1 to be ok");
        be(serde_json::json!([])).terminal("empty");
        assert_eq!(last(&sink), (ExpectStatus::Pass, "Expected [] to be empty".to_string()));
        be(serde_json::json!(null)).terminal("null");
        assert_eq!(last(&sink), (ExpectStatus::Pass, "Expected undefined to be null".to_string()));
        words(&chain(serde_json::json!({}), &sink), &["to"]).terminal("exist");
        assert_eq!(last(&sink), (ExpectStatus::Pass, "Expected {} to exist".to_string()));
        be(serde_json::json!(false)).terminal("true");
        assert_eq!(last(&sink).0, ExpectStatus::Fail);
    }

    #[test]
    fn comparisons_support_length_flag_and_at_prefix() {
        let sink = sink();
        words(&chain(serde_json::json!(5), &sink), &["to", "be"]).compare(&3.0.into(), "above", |a, b| a > b);
        assert_eq!(last(&sink), (ExpectStatus::Pass, "Expected 5 to be above 3".to_string()));
        words(&chain(serde_json::json!(5), &sink), &["to", "be", "at"]).compare(&5.0.into(), "at least", |a, b| a >= b);
        assert_eq!(last(&sink).1, "Expected 5 to be at least 5");
        words(&chain(serde_json::json!([1, 2]), &sink), &["to", "have"])
            .flagged("length", |flags| flags.length = true)
            .compare(&1.0.into(), "above", |a, b| a > b);
        assert_eq!(last(&sink), (ExpectStatus::Pass, "Expected [1, 2] to have length above 1".to_string()));
        words(&chain(serde_json::json!(5), &sink), &["to", "be"]).within(&1.0.into(), &10.0.into());
        assert_eq!(last(&sink).1, "Expected 5 to be within 1, 10");
        words(&chain(serde_json::json!("x"), &sink), &["to", "be"]).compare(&1.0.into(), "below", |a, b| a < b);
        assert_eq!(last(&sink).0, ExpectStatus::Fail);
    }

    #[test]
    fn include_property_and_length() {
        let sink = sink();
        words(&chain(serde_json::json!([1, 2, 3]), &sink), &["to"]).include(&2.0.into());
        assert_eq!(last(&sink), (ExpectStatus::Pass, "Expected [1, 2, 3] to include 2".to_string()));
        words(&chain(serde_json::json!("hoppscotch"), &sink), &["to"]).include(&"hopp".into());
        assert_eq!(last(&sink).1, "Expected 'hoppscotch' to include 'hopp'");
        words(&chain(serde_json::json!({"a": 1, "b": 2}), &sink), &["to"])
            .include(&ScriptValue::from_json(&serde_json::json!({"a": 1})));
        assert_eq!(last(&sink).0, ExpectStatus::Pass);

        let narrowed = words(&chain(serde_json::json!({"a": 1}), &sink), &["to", "have"])
            .property("a", None, "property");
        assert_eq!(last(&sink), (ExpectStatus::Pass, "Expected {a: 1} to have property 'a'".to_string()));
        narrowed.link("that").equal(&1.0.into(), "equal");
        assert_eq!(last(&sink), (ExpectStatus::Pass, "Expected 1 to equal 1".to_string()));

        words(&chain(serde_json::json!({"a": 1}), &sink), &["to", "have"]).property("a", Some(&1.0.into()), "property");
        assert_eq!(last(&sink).1, "Expected {a: 1} to have property 'a', 1");
        words(&chain(serde_json::json!({"a": 1}), &sink), &["to", "have"]).property("a", None, "own property");
        assert_eq!(last(&sink).1, "Expected {a: 1} to have own property 'a'");
        words(&chain(serde_json::json!({"x": {"y": [5]}}), &sink), &["to", "have"])
            .flagged("nested", |flags| flags.nested = true)
            .property("x.y[0]", Some(&5.0.into()), "property");
        assert_eq!(last(&sink).0, ExpectStatus::Pass);

        words(&chain(serde_json::json!([1, 2, 3]), &sink), &["to", "have"]).length_of(&3.0.into(), "lengthOf");
        assert_eq!(last(&sink), (ExpectStatus::Pass, "Expected [1, 2, 3] to have lengthOf 3".to_string()));
    }

    #[test]
    fn keys_and_members_respect_flags() {
        let sink = sink();
        let object = || chain(serde_json::json!({"a": 1, "b": 2}), &sink);
        words(&object(), &["to", "have"]).keys(vec!["a".into(), "b".into()]);
        assert_eq!(last(&sink), (ExpectStatus::Pass, "Expected {a: 1, b: 2} to have keys 'a', 'b'".to_string()));
        words(&object(), &["to", "have"])
            .flagged("all", |flags| flags.all = true)
            .keys(vec!["a".into()]);
        assert_eq!(last(&sink), (ExpectStatus::Fail, "Expected {a: 1, b: 2} to have all keys 'a'".to_string()));
        words(&object(), &["to", "have"])
            .flagged("any", |flags| flags.any = true)
            .keys(vec![ScriptValue::Array(vec!["z".into(), "b".into()])]);
        assert_eq!(last(&sink).0, ExpectStatus::Pass);
        words(&object(), &["to"])
            .flagged("include", |flags| flags.include = true)
            .keys(vec!["a".into()]);
        assert_eq!(last(&sink).0, ExpectStatus::Pass);

        let array = || chain(serde_json::json!([1, 2, 3]), &sink);
        let members = ScriptValue::from_json(&serde_json::json!([3, 2, 1]));
        words(&array(), &["to", "have"]).members(&members);
        assert_eq!(last(&sink), (ExpectStatus::Pass, "Expected [1, 2, 3] to have members [3, 2, 1]".to_string()));
        words(&array(), &["to"])
            .flagged("include", |flags| flags.include = true)
            .members(&ScriptValue::from_json(&serde_json::json!([2])));
        assert_eq!(last(&sink), (ExpectStatus::Pass, "Expected [1, 2, 3] to include members [2]".to_string()));
        words(&array(), &["to", "have"]).members(&ScriptValue::from_json(&serde_json::json!([1, 2])));
        assert_eq!(last(&sink).0, ExpectStatus::Fail);
    }

    #[test]
    fn matching_and_string_helpers() {
        let sink = sink();
        words(&chain(serde_json::json!("Hello"), &sink), &["to"]).matches("/^hel/i");
        assert_eq!(last(&sink), (ExpectStatus::Pass, "Expected 'Hello' to match /^hel/i".to_string()));
        words(&chain(serde_json::json!("abc"), &sink), &["to"])
            .flagged("not", |flags| flags.negated = true)
            .matches("b");
        assert_eq!(last(&sink), (ExpectStatus::Fail, "Expected 'abc' to not match /b/".to_string()));
        words(&chain(serde_json::json!("foobar"), &sink), &["to", "have"]).contains_string("bar");
        assert_eq!(last(&sink), (ExpectStatus::Pass, "Expected 'foobar' to have string 'bar'".to_string()));
        words(&chain(serde_json::json!(2), &sink), &["to", "be"]).one_of(&ScriptValue::from_json(&serde_json::json!([1, 2])));
        assert_eq!(last(&sink), (ExpectStatus::Pass, "Expected 2 to be oneOf [1, 2]".to_string()));
        words(&chain(serde_json::json!(1.4), &sink), &["to", "be"]).close_to(&1.5.into(), &0.2.into(), "closeTo");
        assert_eq!(last(&sink), (ExpectStatus::Pass, "Expected 1.4 to be closeTo 1.5, 0.2".to_string()));
    }

    #[test]
    fn response_chains_check_status_and_headers() {
        let sink = sink();
        let mut response = Response::new(404, serde_json::json!(null));
        response.headers.push(hs_core::KeyValue::new("Content-Type", "text/plain"));
        let response = Rc::new(response);
        let chain = ChaiChain::for_response(response, ScriptValue::Unit, sink.clone());
        words(&chain, &["to", "have"]).status(&404.0.into());
        assert_eq!(last(&sink), (ExpectStatus::Pass, "Expected response to have status 404".to_string()));
        words(&chain, &["to", "have"]).header("content-type", Some(&"text/plain".into()));
        assert_eq!(
            last(&sink),
            (ExpectStatus::Pass, "Expected response to have header 'content-type', 'text/plain'".to_string())
        );
        words(&chain, &["to", "have"]).header("x-missing", None);
        assert_eq!(last(&sink).0, ExpectStatus::Fail);
    }

    #[test]
    fn legacy_methods_inherit_negation() {
        let sink = sink();
        let negated = chain(serde_json::json!(200), &sink).flagged("not", |flags| flags.negated = true);
        negated.expectation().to_be(&200.0.into());
        assert_eq!(last(&sink), (ExpectStatus::Fail, "Expected '200' to not be '200'".to_string()));
    }

    #[test]
    fn errors_name_detection() {
        assert!(looks_like_error_name("TypeError"));
        assert!(looks_like_error_name("Error"));
        assert!(!looks_like_error_name("boom Error"));
        assert!(!looks_like_error_name("oops"));
        assert_eq!(split_regex_literal("/a+/g"), ("a+", "g"));
        assert_eq!(split_regex_literal("plain"), ("plain", ""));
    }
}
