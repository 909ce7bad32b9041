use std::rc::Rc;

use hs_core::{Response, ScriptValue};
use rhai::{Dynamic, Engine, Map};

use crate::assertion::ChaiChain;
use crate::helpers::rhai_bridge::{
    json_to_dynamic, script_error, type_error, value_to_dynamic, ScriptResult,
};
use crate::state::SharedState;

/// The body as scripts see it: parsed JSON when possible, else the raw text.
fn body_view(response: &Response) -> serde_json::Value {
    response
        .body_json()
        .unwrap_or_else(|| serde_json::Value::String(response.body_text()))
}

fn headers_view(response: &Response) -> serde_json::Value {
    serde_json::to_value(&response.headers).unwrap_or(serde_json::Value::Null)
}

/// `#{ status, headers, body }` for `pw.response`.
fn response_view(response: &Response) -> ScriptValue {
    ScriptValue::from_json(&serde_json::json!({
        "status": response.status,
        "headers": headers_view(response),
        "body": body_view(response),
    }))
}

pub(crate) fn current_response(state: &SharedState) -> ScriptResult<Rc<Response>> {
    state
        .borrow()
        .response
        .clone()
        .ok_or_else(|| type_error("Response is only available in test scripts"))
}

pub(crate) fn pw_response(state: &SharedState) -> ScriptResult<Map> {
    let response = current_response(state)?;
    Ok(value_to_dynamic(&response_view(&response))
        .try_cast::<Map>()
        .unwrap_or_default())
}

/// `hopp.response`.
#[derive(Debug, Clone)]
pub(crate) struct HoppResponse {
    response: Rc<Response>,
}

impl HoppResponse {
    pub(crate) fn new(response: Rc<Response>) -> Self {
        Self { response }
    }
}

/// `hopp.response.body`.
#[derive(Debug, Clone)]
pub(crate) struct ResponseBody {
    response: Rc<Response>,
}

fn parse_json_body(response: &Response) -> ScriptResult<Dynamic> {
    response
        .body_json()
        .map(|json| json_to_dynamic(&json))
        .ok_or_else(|| script_error("SyntaxError", "Response body is not valid JSON"))
}

/// `pm.response`.
#[derive(Debug, Clone)]
pub(crate) struct PmResponse {
    response: Rc<Response>,
    state: SharedState,
}

impl PmResponse {
    pub(crate) fn new(response: Rc<Response>, state: SharedState) -> Self {
        Self { response, state }
    }
}

pub(crate) fn register_response_api(engine: &mut Engine) {
    engine.register_type_with_name::<HoppResponse>("HoppResponse");
    engine.register_get("statusCode", |view: &mut HoppResponse| {
        i64::from(view.response.status)
    });
    engine.register_get("statusText", |view: &mut HoppResponse| {
        view.response.status_text()
    });
    engine.register_get("headers", |view: &mut HoppResponse| {
        json_to_dynamic(&headers_view(&view.response))
    });
    engine.register_get("body", |view: &mut HoppResponse| ResponseBody {
        response: view.response.clone(),
    });

    engine.register_type_with_name::<ResponseBody>("ResponseBody");
    engine.register_fn("asText", |body: &mut ResponseBody| body.response.body_text());
    engine.register_fn("asJSON", |body: &mut ResponseBody| parse_json_body(&body.response));

    engine.register_type_with_name::<PmResponse>("PmResponse");
    engine.register_get("code", |view: &mut PmResponse| i64::from(view.response.status));
    engine.register_get("status", |view: &mut PmResponse| view.response.status_text());
    engine.register_get("headers", |view: &mut PmResponse| {
        json_to_dynamic(&headers_view(&view.response))
    });
    engine.register_fn("json", |view: &mut PmResponse| parse_json_body(&view.response));
    engine.register_fn("text", |view: &mut PmResponse| view.response.body_text());
    engine.register_get("to", |view: &mut PmResponse| {
        ChaiChain::for_response(
            view.response.clone(),
            response_view(&view.response),
            view.state.clone(),
        )
    });
}
