use hs_core::{KeyValue, Request, RequestAuth, RequestBody};
use rhai::{Dynamic, Engine};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::executor::ScriptKind;
use crate::helpers::rhai_bridge::{
    dynamic_to_value, json_to_dynamic, require_string, type_error, ScriptResult,
};
use crate::state::SharedState;

/// `hopp.request` and `pm.request`. Reads always work, writes only before the request is sent.
#[derive(Debug, Clone)]
pub(crate) struct RequestApi {
    state: SharedState,
}

fn to_dynamic<T: Serialize>(value: &T) -> Dynamic {
    serde_json::to_value(value)
        .map(|json| json_to_dynamic(&json))
        .unwrap_or(Dynamic::UNIT)
}

fn from_dynamic<T: DeserializeOwned>(value: Dynamic, what: &str) -> ScriptResult<T> {
    serde_json::from_value(dynamic_to_value(value).to_json())
        .map_err(|error| type_error(format!("Invalid {}: {}", what, error)))
}

fn upsert(pairs: &mut Vec<KeyValue>, key: String, value: String, ignore_case: bool) {
    let existing = pairs.iter_mut().find(|pair| {
        if ignore_case {
            pair.key.eq_ignore_ascii_case(&key)
        } else {
            pair.key == key
        }
    });
    match existing {
        Some(pair) => pair.value = value,
        None => pairs.push(KeyValue::new(key, value)),
    }
}

fn remove(pairs: &mut Vec<KeyValue>, key: &str, ignore_case: bool) {
    pairs.retain(|pair| {
        if ignore_case {
            !pair.key.eq_ignore_ascii_case(key)
        } else {
            pair.key != key
        }
    });
}

/// Accepts `#{ contentType, body }`. A non-string body is stored as its JSON text.
fn parse_body(value: Dynamic) -> ScriptResult<RequestBody> {
    let json = dynamic_to_value(value).to_json();
    let serde_json::Value::Object(fields) = json else {
        return Err(type_error("Expected body to be an object with contentType and body"));
    };
    let content_type = match fields.get("contentType") {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(text)) => Some(text.clone()),
        Some(_) => return Err(type_error("Expected contentType to be a string or null")),
    };
    let body = match fields.get("body") {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(text)) => Some(text.clone()),
        Some(other) => Some(other.to_string()),
    };
    Ok(RequestBody { content_type, body })
}

impl RequestApi {
    pub(crate) fn new(state: SharedState) -> Self {
        Self { state }
    }

    fn read<R>(&self, view: impl FnOnce(&Request) -> R) -> R {
        view(&self.state.borrow().request)
    }

    fn mutate(&self, change: impl FnOnce(&mut Request)) -> ScriptResult<()> {
        let mut state = self.state.borrow_mut();
        if state.kind != ScriptKind::PreRequest {
            return Err(type_error(
                "Request mutation is only allowed in pre-request scripts",
            ));
        }
        change(&mut state.request);
        Ok(())
    }

    fn set_url(&self, url: Dynamic) -> ScriptResult<()> {
        let url = require_string(url, "url")?;
        self.mutate(|request| request.endpoint = url)
    }

    fn set_method(&self, method: Dynamic) -> ScriptResult<()> {
        let method = require_string(method, "method")?;
        if method.trim().is_empty() {
            return Err(type_error("Expected method to be a non-empty string"));
        }
        self.mutate(|request| request.method = method.trim().to_uppercase())
    }

    fn set_header(&self, name: Dynamic, value: Dynamic) -> ScriptResult<()> {
        let name = require_string(name, "header name")?;
        let value = require_string(value, "header value")?;
        self.mutate(|request| upsert(&mut request.headers, name, value, true))
    }

    fn set_headers(&self, headers: Dynamic) -> ScriptResult<()> {
        let headers: Vec<KeyValue> = from_dynamic(headers, "headers")?;
        self.mutate(|request| request.headers = headers)
    }

    fn remove_header(&self, name: Dynamic) -> ScriptResult<()> {
        let name = require_string(name, "header name")?;
        self.mutate(|request| remove(&mut request.headers, &name, true))
    }

    fn set_param(&self, name: Dynamic, value: Dynamic) -> ScriptResult<()> {
        let name = require_string(name, "param name")?;
        let value = require_string(value, "param value")?;
        self.mutate(|request| upsert(&mut request.params, name, value, false))
    }

    fn set_params(&self, params: Dynamic) -> ScriptResult<()> {
        let params: Vec<KeyValue> = from_dynamic(params, "params")?;
        self.mutate(|request| request.params = params)
    }

    fn remove_param(&self, name: Dynamic) -> ScriptResult<()> {
        let name = require_string(name, "param name")?;
        self.mutate(|request| remove(&mut request.params, &name, false))
    }

    fn set_body(&self, body: Dynamic) -> ScriptResult<()> {
        let body = parse_body(body)?;
        self.mutate(|request| request.body = body)
    }

    fn set_auth(&self, auth: Dynamic) -> ScriptResult<()> {
        let auth: RequestAuth = from_dynamic(auth, "auth")?;
        self.mutate(|request| request.auth = auth)
    }
}

pub(crate) fn register_request_api(engine: &mut Engine) {
    engine.register_type_with_name::<RequestApi>("Request");
    engine.register_get("url", |api: &mut RequestApi| api.read(|r| r.endpoint.clone()));
    engine.register_get("method", |api: &mut RequestApi| api.read(|r| r.method.clone()));
    engine.register_get("headers", |api: &mut RequestApi| api.read(|r| to_dynamic(&r.headers)));
    engine.register_get("params", |api: &mut RequestApi| api.read(|r| to_dynamic(&r.params)));
    engine.register_get("body", |api: &mut RequestApi| api.read(|r| to_dynamic(&r.body)));
    engine.register_get("auth", |api: &mut RequestApi| api.read(|r| to_dynamic(&r.auth)));

    engine.register_fn("setUrl", |api: &mut RequestApi, url: Dynamic| api.set_url(url));
    engine.register_fn("setMethod", |api: &mut RequestApi, method: Dynamic| {
        api.set_method(method)
    });
    engine.register_fn(
        "setHeader",
        |api: &mut RequestApi, name: Dynamic, value: Dynamic| api.set_header(name, value),
    );
    engine.register_fn("setHeaders", |api: &mut RequestApi, headers: Dynamic| {
        api.set_headers(headers)
    });
    engine.register_fn("removeHeader", |api: &mut RequestApi, name: Dynamic| {
        api.remove_header(name)
    });
    engine.register_fn(
        "setParam",
        |api: &mut RequestApi, name: Dynamic, value: Dynamic| api.set_param(name, value),
    );
    engine.register_fn("setParams", |api: &mut RequestApi, params: Dynamic| {
        api.set_params(params)
    });
    engine.register_fn("removeParam", |api: &mut RequestApi, name: Dynamic| {
        api.remove_param(name)
    });
    engine.register_fn("setBody", |api: &mut RequestApi, body: Dynamic| api.set_body(body));
    engine.register_fn("setAuth", |api: &mut RequestApi, auth: Dynamic| api.set_auth(auth));
}
