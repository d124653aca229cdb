//! Shared utilities for the web crate
//!
//! Console logging and the conversions between `serde_json` values and
//! JavaScript values. Conversions go through `JSON` so that what crosses the
//! boundary is exactly what would cross `postMessage`.

use serde::Serialize;
use serde_json::Value;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

#[wasm_bindgen]
extern "C" {
    /// Console.log binding for WASM
    #[wasm_bindgen(js_namespace = console)]
    pub fn log(s: &str);
}

/// Serialize a Rust value into a plain JavaScript value.
///
/// Returns `null` if the value cannot be represented as JSON.
pub fn to_js<T: Serialize + ?Sized>(value: &T) -> JsValue {
    serde_json::to_string(value)
        .ok()
        .and_then(|text| js_sys::JSON::parse(&text).ok())
        .unwrap_or(JsValue::NULL)
}

/// Convert a JavaScript value into a JSON value.
///
/// `undefined` maps to `null`; functions and cyclic structures are rejected.
pub fn from_js(value: &JsValue) -> Result<Value, String> {
    if value.is_undefined() {
        return Ok(Value::Null);
    }
    let text = js_sys::JSON::stringify(value).map_err(|e| describe(&e))?;
    let text = String::from(text);
    serde_json::from_str(&text).map_err(|e| e.to_string())
}

/// Best-effort human readable form of a thrown JavaScript value.
pub fn describe(value: &JsValue) -> String {
    if let Some(text) = value.as_string() {
        return text;
    }
    if let Some(error) = value.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    format!("{:?}", value)
}

/// Build a JavaScript `Error` carrying `message`.
pub fn js_error(message: impl std::fmt::Display) -> JsValue {
    js_sys::Error::new(&message.to_string()).into()
}
