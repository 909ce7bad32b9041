use std::collections::BTreeMap;

use hs_core::ScriptValue;
use rhai::{Array, Dynamic, EvalAltResult, FnPtr, Map, ParseErrorType, Position, FLOAT, INT};

pub(crate) type ScriptResult<T> = Result<T, Box<EvalAltResult>>;

const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

pub(crate) fn value_to_dynamic(value: &ScriptValue) -> Dynamic {
    match value {
        ScriptValue::Unit => Dynamic::UNIT,
        ScriptValue::Bool(value) => Dynamic::from_bool(*value),
        ScriptValue::Number(value) => {
            if value.fract() == 0.0 && value.abs() <= MAX_SAFE_INTEGER {
                Dynamic::from_int(*value as INT)
            } else {
                Dynamic::from_float(*value as FLOAT)
            }
        }
        ScriptValue::String(value) => Dynamic::from(value.clone()),
        ScriptValue::Array(values) => {
            Dynamic::from_array(values.iter().map(value_to_dynamic).collect::<Array>())
        }
        ScriptValue::Map(values) => {
            let mut map = Map::new();
            for (key, value) in values {
                map.insert(key.as_str().into(), value_to_dynamic(value));
            }
            Dynamic::from_map(map)
        }
        ScriptValue::Function(name) => FnPtr::new(name.as_str())
            .map(Dynamic::from)
            .unwrap_or(Dynamic::UNIT),
    }
}

pub(crate) fn dynamic_to_value(value: Dynamic) -> ScriptValue {
    let value = value.flatten();
    if value.is_unit() {
        return ScriptValue::Unit;
    }
    if let Ok(value) = value.as_bool() {
        return ScriptValue::Bool(value);
    }
    if let Ok(value) = value.as_int() {
        return ScriptValue::Number(value as f64);
    }
    if let Ok(value) = value.as_float() {
        return ScriptValue::Number(value);
    }
    if let Ok(value) = value.as_char() {
        return ScriptValue::String(value.to_string());
    }
    if value.is_string() {
        return ScriptValue::String(value.into_string().unwrap_or_default());
    }
    if value.is_array() {
        let array = value.into_array().unwrap_or_default();
        return ScriptValue::Array(array.into_iter().map(dynamic_to_value).collect());
    }
    if value.is_map() {
        let map = value.try_cast::<Map>().unwrap_or_default();
        let mut out = BTreeMap::new();
        for (key, value) in map {
            out.insert(key.to_string(), dynamic_to_value(value));
        }
        return ScriptValue::Map(out);
    }
    if let Some(pointer) = value.clone().try_cast::<FnPtr>() {
        return ScriptValue::Function(pointer.fn_name().to_string());
    }
    ScriptValue::Map(BTreeMap::new())
}

pub(crate) fn json_to_dynamic(value: &serde_json::Value) -> Dynamic {
    value_to_dynamic(&ScriptValue::from_json(value))
}

/// Builds a catchable script error carrying `#{ name, message }`.
pub(crate) fn script_error(name: &str, message: impl Into<String>) -> Box<EvalAltResult> {
    let mut error = Map::new();
    error.insert("name".into(), Dynamic::from(name.to_string()));
    error.insert("message".into(), Dynamic::from(message.into()));
    Box::new(EvalAltResult::ErrorRuntime(
        Dynamic::from_map(error),
        Position::NONE,
    ))
}

pub(crate) fn type_error(message: impl Into<String>) -> Box<EvalAltResult> {
    script_error("TypeError", message)
}

pub(crate) fn require_string(value: Dynamic, what: &str) -> ScriptResult<String> {
    let value = value.flatten();
    if value.is_string() {
        return value
            .into_string()
            .map_err(|_| type_error(format!("Expected {} to be a string", what)));
    }
    Err(type_error(format!("Expected {} to be a string", what)))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ErrorInfo {
    pub(crate) name: String,
    pub(crate) message: String,
}

impl ErrorInfo {
    fn new(name: &str, message: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            message: message.into(),
        }
    }
}

/// Maps an evaluation failure onto a JS-style error name and message.
pub(crate) fn describe_error(error: &EvalAltResult) -> ErrorInfo {
    match error.unwrap_inner() {
        EvalAltResult::ErrorParsing(ParseErrorType::VariableUndefined(name), _)
        | EvalAltResult::ErrorVariableNotFound(name, _) => {
            ErrorInfo::new("ReferenceError", format!("{} is not defined", name))
        }
        EvalAltResult::ErrorParsing(kind, _) => ErrorInfo::new("SyntaxError", kind.to_string()),
        EvalAltResult::ErrorFunctionNotFound(signature, _) => {
            let name = signature.split(" (").next().unwrap_or(signature);
            ErrorInfo::new("TypeError", format!("{} is not a function", name))
        }
        EvalAltResult::ErrorPropertyNotFound(name, _) => {
            ErrorInfo::new("TypeError", format!("Cannot read property '{}'", name))
        }
        EvalAltResult::ErrorRuntime(value, _) => describe_thrown(value),
        inner @ (EvalAltResult::ErrorMismatchDataType(..)
        | EvalAltResult::ErrorMismatchOutputType(..)
        | EvalAltResult::ErrorIndexingType(..)
        | EvalAltResult::ErrorDotExpr(..)
        | EvalAltResult::ErrorFor(..)
        | EvalAltResult::ErrorUnboundThis(..)
        | EvalAltResult::ErrorAssignmentToConstant(..)
        | EvalAltResult::ErrorNonPureMethodCallOnConstant(..)) => {
            ErrorInfo::new("TypeError", strip_position(inner))
        }
        inner @ (EvalAltResult::ErrorArrayBounds(..)
        | EvalAltResult::ErrorStringBounds(..)
        | EvalAltResult::ErrorBitFieldBounds(..)
        | EvalAltResult::ErrorArithmetic(..)
        | EvalAltResult::ErrorTooManyOperations(..)
        | EvalAltResult::ErrorTooManyVariables(..)
        | EvalAltResult::ErrorStackOverflow(..)
        | EvalAltResult::ErrorDataTooLarge(..)) => {
            ErrorInfo::new("RangeError", strip_position(inner))
        }
        inner => ErrorInfo::new("Error", strip_position(inner)),
    }
}

fn describe_thrown(value: &Dynamic) -> ErrorInfo {
    if let Some(map) = value.read_lock::<Map>() {
        let field = |key: &str| {
            map.get(key)
                .map(|value| dynamic_to_value(value.clone()).to_text())
        };
        if let Some(message) = field("message") {
            return ErrorInfo::new(
                field("name").as_deref().unwrap_or("Error"),
                message,
            );
        }
    }
    ErrorInfo::new("Error", dynamic_to_value(value.clone()).to_text())
}

fn strip_position(error: &EvalAltResult) -> String {
    let text = error.to_string();
    match text.rfind(" (line ") {
        Some(index) => text[..index].to_string(),
        None => text,
    }
}
