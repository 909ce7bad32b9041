use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentVariable {
    pub key: String,
    pub initial_value: String,
    pub current_value: String,
    #[serde(default)]
    pub secret: bool,
}

impl EnvironmentVariable {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            key: key.into(),
            initial_value: value.clone(),
            current_value: value,
            secret: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentSet {
    #[serde(default)]
    pub global: Vec<EnvironmentVariable>,
    #[serde(default)]
    pub selected: Vec<EnvironmentVariable>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            active: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestBody {
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ApiKeyPlacement {
    #[default]
    Headers,
    QueryParams,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "authType", rename_all = "kebab-case")]
pub enum RequestAuth {
    #[default]
    None,
    Inherit,
    Basic {
        username: String,
        password: String,
    },
    Bearer {
        token: String,
    },
    ApiKey {
        key: String,
        value: String,
        #[serde(rename = "addTo", default)]
        add_to: ApiKeyPlacement,
    },
}

impl RequestAuth {
    pub fn auth_type(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Inherit => "inherit",
            Self::Basic { .. } => "basic",
            Self::Bearer { .. } => "bearer",
            Self::ApiKey { .. } => "api-key",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub endpoint: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub headers: Vec<KeyValue>,
    #[serde(default)]
    pub params: Vec<KeyValue>,
    #[serde(default)]
    pub body: RequestBody,
    #[serde(default)]
    pub auth: RequestAuth,
}

fn default_method() -> String {
    "GET".to_string()
}

impl Default for Request {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            method: default_method(),
            headers: Vec::new(),
            params: Vec::new(),
            body: RequestBody::default(),
            auth: RequestAuth::default(),
        }
    }
}

impl Request {
    pub fn new(method: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            method: method.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub status: u16,
    #[serde(default)]
    pub status_text: Option<String>,
    #[serde(default)]
    pub headers: Vec<KeyValue>,
    /// A JSON string is the raw body text; any other JSON value is a parsed body.
    #[serde(default)]
    pub body: serde_json::Value,
}

impl Response {
    pub fn new(status: u16, body: serde_json::Value) -> Self {
        Self {
            status,
            status_text: None,
            headers: Vec::new(),
            body,
        }
    }

    pub fn status_text(&self) -> String {
        self.status_text
            .clone()
            .unwrap_or_else(|| reason_phrase(self.status).to_string())
    }

    pub fn body_text(&self) -> String {
        match &self.body {
            serde_json::Value::String(text) => text.clone(),
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        }
    }

    /// Parsed body, or `None` when the raw text is not JSON.
    pub fn body_json(&self) -> Option<serde_json::Value> {
        match &self.body {
            serde_json::Value::String(text) => serde_json::from_str(text).ok(),
            other => Some(other.clone()),
        }
    }

    /// Header lookup is case-insensitive, first match wins.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|header| header.key.eq_ignore_ascii_case(name))
            .map(|header| header.value.as_str())
    }
}

pub fn reason_phrase(status: u16) -> &'static str {
    match status {
        100 => "Continue",
        101 => "Switching Protocols",
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        206 => "Partial Content",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        304 => "Not Modified",
        307 => "Temporary Redirect",
        308 => "Permanent Redirect",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        409 => "Conflict",
        415 => "Unsupported Media Type",
        422 => "Unprocessable Entity",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpectStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectResult {
    pub status: ExpectStatus,
    pub message: String,
}

impl ExpectResult {
    pub fn pass(message: impl Into<String>) -> Self {
        Self {
            status: ExpectStatus::Pass,
            message: message.into(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            status: ExpectStatus::Fail,
            message: message.into(),
        }
    }

    pub fn skipped(message: impl Into<String>) -> Self {
        Self {
            status: ExpectStatus::Skipped,
            message: message.into(),
        }
    }

    pub fn from_outcome(passed: bool, message: impl Into<String>) -> Self {
        if passed {
            Self::pass(message)
        } else {
            Self::fail(message)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestDescriptor {
    pub descriptor: String,
    pub expect_results: Vec<ExpectResult>,
    pub children: Vec<TestDescriptor>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestTally {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl TestDescriptor {
    pub const ROOT: &'static str = "root";

    pub fn new(descriptor: impl Into<String>) -> Self {
        Self {
            descriptor: descriptor.into(),
            expect_results: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn root() -> Self {
        Self::new(Self::ROOT)
    }

    pub fn tally(&self) -> TestTally {
        let mut tally = TestTally::default();
        self.accumulate(&mut tally);
        tally
    }

    fn accumulate(&self, tally: &mut TestTally) {
        for result in &self.expect_results {
            match result.status {
                ExpectStatus::Pass => tally.passed += 1,
                ExpectStatus::Fail => tally.failed += 1,
                ExpectStatus::Skipped => tally.skipped += 1,
            }
        }
        for child in &self.children {
            child.accumulate(tally);
        }
    }

    pub fn child(&self, descriptor: &str) -> Option<&TestDescriptor> {
        self.children
            .iter()
            .find(|child| child.descriptor == descriptor)
    }
}
