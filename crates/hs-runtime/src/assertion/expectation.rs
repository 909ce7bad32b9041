use hs_core::{format_number, ExpectResult, ScriptValue};
use rhai::{Dynamic, Engine};

use crate::helpers::rhai_bridge::dynamic_to_value;
use crate::state::{record_result, SharedState};

const TYPE_ARGUMENT_MESSAGE: &str = "Argument for toBeType should be \"string\", \"boolean\", \"number\", \"object\", \"undefined\", \"bigint\", \"symbol\" or \"function\"";

const KNOWN_TYPES: &[&str] = &[
    "string",
    "boolean",
    "number",
    "object",
    "undefined",
    "bigint",
    "symbol",
    "function",
];

/// `expect(value)` with the `toBe*` family. `.not` yields a copy with `negated` flipped.
#[derive(Debug, Clone)]
pub(crate) struct Expectation {
    subject: ScriptValue,
    negated: bool,
    sink: SharedState,
}

impl Expectation {
    pub(crate) fn new(subject: ScriptValue, sink: SharedState) -> Self {
        Self::with_negation(subject, false, sink)
    }

    pub(crate) fn with_negation(subject: ScriptValue, negated: bool, sink: SharedState) -> Self {
        Self {
            subject,
            negated,
            sink,
        }
    }

    pub(crate) fn not(&self) -> Self {
        Self::with_negation(self.subject.clone(), !self.negated, self.sink.clone())
    }

    fn satisfies(&self, holds: bool, describe: impl FnOnce(&str) -> String) {
        let not = if self.negated { " not" } else { "" };
        record_result(
            &self.sink,
            ExpectResult::from_outcome(holds != self.negated, describe(not)),
        );
    }

    fn reject(&self, message: impl Into<String>) {
        record_result(&self.sink, ExpectResult::fail(message));
    }

    pub(crate) fn to_be(&self, expected: &ScriptValue) {
        self.satisfies(self.subject.strict_equals(expected), |not| {
            format!(
                "Expected '{}' to{} be '{}'",
                self.subject.to_text(),
                not,
                expected.to_text()
            )
        });
    }

    pub(crate) fn to_be_level(&self, base: i64) {
        let Some(status) = parse_leading_int(&self.subject.to_text()) else {
            return self.reject(format!(
                "Expected {}-level status but could not parse value '{}'",
                base,
                self.subject.to_text()
            ));
        };
        self.satisfies((base..base + 100).contains(&status), |not| {
            format!("Expected '{}' to{} be {}-level status", status, not, base)
        });
    }

    pub(crate) fn to_be_type(&self, expected: &ScriptValue) {
        let Some(expected) = expected.as_str().filter(|name| KNOWN_TYPES.contains(name)) else {
            return self.reject(TYPE_ARGUMENT_MESSAGE);
        };
        self.satisfies(self.subject.type_of() == expected, |not| {
            format!(
                "Expected '{}' to{} be type '{}'",
                self.subject.to_text(),
                not,
                expected
            )
        });
    }

    pub(crate) fn to_have_length(&self, expected: &ScriptValue) {
        let Some(length) = self.subject.length() else {
            return self.reject("Expected toHaveLength to be called for an array or string");
        };
        let Some(expected) = expected.as_number().filter(|number| !number.is_nan()) else {
            return self.reject("Argument for toHaveLength should be a number");
        };
        self.satisfies(length as f64 == expected, |not| {
            format!(
                "Expected the array to{} be of length '{}'",
                not,
                format_number(expected)
            )
        });
    }

    pub(crate) fn to_include(&self, needle: &ScriptValue) {
        let holds = match (&self.subject, needle) {
            (ScriptValue::Array(_) | ScriptValue::String(_), ScriptValue::Unit) => {
                return self.reject("Argument for toInclude should not be undefined");
            }
            (ScriptValue::Array(items), needle) => {
                items.iter().any(|item| item.strict_equals(needle))
            }
            (ScriptValue::String(text), needle) => text.contains(&needle.to_text()),
            _ => return self.reject("Expected toInclude to be called for an array or string"),
        };
        self.satisfies(holds, |not| {
            format!(
                "Expected {} to{} include {}",
                self.subject.to_json_text(),
                not,
                needle.to_json_text()
            )
        });
    }
}

/// `parseInt` over the value's text: optional sign then leading digits.
fn parse_leading_int(text: &str) -> Option<i64> {
    let trimmed = text.trim_start();
    let (sign, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let end = digits
        .find(|ch: char| !ch.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().ok().map(|value| sign * value)
}

/// Types exposing the `toBe*` family. Chai chains share it so `hopp.expect(x).toBe(..)` works.
pub(crate) trait LegacyAssertions: Clone + 'static {
    fn expectation(&self) -> Expectation;
}

impl LegacyAssertions for Expectation {
    fn expectation(&self) -> Expectation {
        self.clone()
    }
}

pub(crate) fn register_legacy_assertions<T: LegacyAssertions>(engine: &mut Engine) {
    engine.register_fn("toBe", |target: &mut T, expected: Dynamic| {
        target.expectation().to_be(&dynamic_to_value(expected))
    });
    for (name, base) in [
        ("toBeLevel2xx", 200),
        ("toBeLevel3xx", 300),
        ("toBeLevel4xx", 400),
        ("toBeLevel5xx", 500),
    ] {
        engine.register_fn(name, move |target: &mut T| {
            target.expectation().to_be_level(base)
        });
    }
    engine.register_fn("toBeType", |target: &mut T, expected: Dynamic| {
        target.expectation().to_be_type(&dynamic_to_value(expected))
    });
    engine.register_fn("toHaveLength", |target: &mut T, expected: Dynamic| {
        target.expectation().to_have_length(&dynamic_to_value(expected))
    });
    engine.register_fn("toInclude", |target: &mut T, needle: Dynamic| {
        target.expectation().to_include(&dynamic_to_value(needle))
    });
}

pub(crate) fn register_expectation(engine: &mut Engine) {
    engine.register_type_with_name::<Expectation>("Expectation");
    engine.register_get("not", |expectation: &mut Expectation| expectation.not());
    register_legacy_assertions::<Expectation>(engine);
}
