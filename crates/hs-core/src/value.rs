use std::collections::BTreeMap;

/// Value crossing the script boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptValue {
    Unit,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<ScriptValue>),
    Map(BTreeMap<String, ScriptValue>),
    Function(String),
}

impl ScriptValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    /// `typeof`-style name.
    pub fn type_of(&self) -> &'static str {
        match self {
            Self::Unit => "undefined",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Array(_) | Self::Map(_) => "object",
            Self::Function(_) => "function",
        }
    }

    /// Finer type name used by `.a(..)` chains: arrays are `array`, not `object`.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Array(_) => "array",
            other => other.type_of(),
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Unit => false,
            Self::Bool(value) => *value,
            Self::Number(value) => *value != 0.0 && !value.is_nan(),
            Self::String(value) => !value.is_empty(),
            Self::Array(_) | Self::Map(_) | Self::Function(_) => true,
        }
    }

    /// Numbers compare numerically, containers structurally, mixed types never match.
    pub fn strict_equals(&self, other: &ScriptValue) -> bool {
        self == other
    }

    pub fn length(&self) -> Option<usize> {
        match self {
            Self::String(value) => Some(value.chars().count()),
            Self::Array(values) => Some(values.len()),
            _ => None,
        }
    }

    /// `String(value)` rendering.
    pub fn to_text(&self) -> String {
        match self {
            Self::Unit => "undefined".to_string(),
            Self::Bool(value) => value.to_string(),
            Self::Number(value) => format_number(*value),
            Self::String(value) => value.clone(),
            Self::Array(values) => values
                .iter()
                .map(|value| match value {
                    Self::Unit => String::new(),
                    other => other.to_text(),
                })
                .collect::<Vec<_>>()
                .join(","),
            Self::Map(_) => "[object Object]".to_string(),
            Self::Function(name) => format!("function {}() {{ [native code] }}", name),
        }
    }

    /// Inspector rendering used in assertion messages: `'str'`, `[1, 2]`, `{a: 1}`.
    pub fn inspect(&self) -> String {
        match self {
            Self::Unit => "undefined".to_string(),
            Self::Bool(value) => value.to_string(),
            Self::Number(value) => format_number(*value),
            Self::String(value) => format!("'{}'", value),
            Self::Array(values) => format!(
                "[{}]",
                values
                    .iter()
                    .map(ScriptValue::inspect)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Self::Map(values) if values.is_empty() => "{}".to_string(),
            Self::Map(values) => format!(
                "{{{}}}",
                values
                    .iter()
                    .map(|(key, value)| format!("{}: {}", key, value.inspect()))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Self::Function(_) => "[Function]".to_string(),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Unit | Self::Function(_) => serde_json::Value::Null,
            Self::Bool(value) => serde_json::Value::Bool(*value),
            Self::Number(value) => number_to_json(*value),
            Self::String(value) => serde_json::Value::String(value.clone()),
            Self::Array(values) => {
                serde_json::Value::Array(values.iter().map(ScriptValue::to_json).collect())
            }
            Self::Map(values) => serde_json::Value::Object(
                values
                    .iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
        }
    }

    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Unit,
            serde_json::Value::Bool(value) => Self::Bool(*value),
            serde_json::Value::Number(value) => Self::Number(value.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(value) => Self::String(value.clone()),
            serde_json::Value::Array(values) => {
                Self::Array(values.iter().map(ScriptValue::from_json).collect())
            }
            serde_json::Value::Object(values) => Self::Map(
                values
                    .iter()
                    .map(|(key, value)| (key.clone(), ScriptValue::from_json(value)))
                    .collect(),
            ),
        }
    }

    /// `JSON.stringify` rendering; unit stays `undefined` so messages stay readable.
    pub fn to_json_text(&self) -> String {
        match self {
            Self::Unit => "undefined".to_string(),
            other => other.to_json().to_string(),
        }
    }
}

impl From<&str> for ScriptValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ScriptValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<f64> for ScriptValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for ScriptValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return (value as i64).to_string();
    }
    value.to_string()
}

fn number_to_json(value: f64) -> serde_json::Value {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return serde_json::Value::from(value as i64);
    }
    serde_json::Number::from_f64(value)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}
