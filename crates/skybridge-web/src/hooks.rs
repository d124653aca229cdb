//! UI hooks implemented by a JavaScript object

use skybridge_gate::ProviderMetadata;
use skybridge_session::UiHooks;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use crate::constants::LOG_PREFIX;
use crate::util::{describe, log, to_js};

/// Forwards UI hooks to methods of a JavaScript object.
///
/// Every method is optional:
///
/// ```js
/// {
///   onFetching() {}, onBridgeError() {}, onNotLoaded() {},
///   onLoaded(metadata) {}, onConnected(metadata, identity) {},
///   onError(message) {}, lockInteraction() {}, unlockInteraction() {},
/// }
/// ```
pub struct JsHooks {
    target: JsValue,
}

impl JsHooks {
    pub fn new(target: JsValue) -> Self {
        Self { target }
    }

    fn invoke(&self, name: &str, args: &[JsValue]) {
        if !self.target.is_object() {
            return;
        }
        let callback = js_sys::Reflect::get(&self.target, &name.into())
            .ok()
            .and_then(|value| value.dyn_into::<js_sys::Function>().ok());
        let Some(callback) = callback else {
            return;
        };

        let args: js_sys::Array = args.iter().collect();
        if let Err(e) = callback.apply(&self.target, &args) {
            log(&format!("{} Hook {} threw: {}", LOG_PREFIX, name, describe(&e)));
        }
    }
}

impl UiHooks for JsHooks {
    fn on_fetching(&self) {
        self.invoke("onFetching", &[]);
    }

    fn on_bridge_error(&self) {
        self.invoke("onBridgeError", &[]);
    }

    fn on_not_loaded(&self) {
        self.invoke("onNotLoaded", &[]);
    }

    fn on_loaded(&self, metadata: &ProviderMetadata) {
        self.invoke("onLoaded", &[to_js(metadata)]);
    }

    fn on_connected(&self, metadata: &ProviderMetadata, identity: &str) {
        self.invoke("onConnected", &[to_js(metadata), JsValue::from_str(identity)]);
    }

    fn on_error(&self, message: &str) {
        self.invoke("onError", &[JsValue::from_str(message)]);
    }

    fn lock_interaction(&self) {
        self.invoke("lockInteraction", &[]);
    }

    fn unlock_interaction(&self) {
        self.invoke("unlockInteraction", &[]);
    }
}
