//! JavaScript entry point
//!
//! ```js
//! const client = new BridgeClient({ bridgeUrl: "bridge.example" }, "my-skapp", hooks);
//! await client.loginSilent();
//! loginButton.onclick = () => client.login();
//! ```

use std::rc::Rc;

use js_sys::Promise;
use serde_json::json;
use skybridge_gate::{Gate, GateConfig, ProviderStatus, SkappInfo};
use skybridge_session::{SkappSession, UiState};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

use crate::constants::LOG_PREFIX;
use crate::hooks::JsHooks;
use crate::platform::WebPlatform;
use crate::util::{from_js, js_error, log, to_js};

type WebSession = SkappSession<WebPlatform, JsHooks>;

/// Identity bridge client for one skapp.
///
/// Action methods return promises that always resolve; outcomes are
/// reported through the hooks object.
#[wasm_bindgen]
pub struct BridgeClient {
    session: Rc<WebSession>,
}

#[wasm_bindgen]
impl BridgeClient {
    /// Create the client and open the bridge frame.
    ///
    /// `config` is either a bridge URL string or a `GateConfig` object
    /// (`{ bridgeUrl, handshake: { maxAttempts, retryIntervalMs }, popupPollIntervalMs }`).
    /// The skapp domain is the page's host name.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue, skapp_name: &str, hooks: JsValue) -> Result<BridgeClient, JsValue> {
        // Set up panic hook for better error messages
        #[cfg(feature = "console_error_panic_hook")]
        console_error_panic_hook::set_once();

        let config = match config.as_string() {
            Some(bridge_url) => GateConfig::new(&bridge_url),
            None => {
                let value = from_js(&config).map_err(js_error)?;
                GateConfig::from_json(&value.to_string()).map_err(js_error)?
            }
        };

        let platform = Rc::new(WebPlatform::new().map_err(js_error)?);
        let skapp = SkappInfo::new(skapp_name, &platform.hostname());
        log(&format!(
            "{} Creating client for {} ({}) with bridge {}",
            LOG_PREFIX, skapp.name, skapp.domain, config.bridge_url
        ));

        let gate = Gate::new(platform, config).map_err(js_error)?;
        gate.start().map_err(js_error)?;

        Ok(Self {
            session: Rc::new(SkappSession::new(Rc::new(gate), skapp, JsHooks::new(hooks))),
        })
    }

    /// Interpret the stored provider without opening any window.
    #[wasm_bindgen(js_name = loginSilent)]
    pub fn login_silent(&self) -> Promise {
        let session = self.session.clone();
        future_to_promise(async move {
            session.login_silent().await;
            Ok(JsValue::UNDEFINED)
        })
    }

    /// Load a provider if needed, then connect it.
    pub fn login(&self) -> Promise {
        let session = self.session.clone();
        future_to_promise(async move {
            session.login().await;
            Ok(JsValue::UNDEFINED)
        })
    }

    pub fn logout(&self) -> Promise {
        let session = self.session.clone();
        future_to_promise(async move {
            session.logout().await;
            Ok(JsValue::UNDEFINED)
        })
    }

    #[wasm_bindgen(js_name = loadNewProvider)]
    pub fn load_new_provider(&self) -> Promise {
        let session = self.session.clone();
        future_to_promise(async move {
            session.load_new_provider().await;
            Ok(JsValue::UNDEFINED)
        })
    }

    #[wasm_bindgen(js_name = connectProvider)]
    pub fn connect_provider(&self) -> Promise {
        let session = self.session.clone();
        future_to_promise(async move {
            session.connect_provider().await;
            Ok(JsValue::UNDEFINED)
        })
    }

    #[wasm_bindgen(js_name = disconnectProvider)]
    pub fn disconnect_provider(&self) -> Promise {
        let session = self.session.clone();
        future_to_promise(async move {
            session.disconnect_provider().await;
            Ok(JsValue::UNDEFINED)
        })
    }

    /// Tear the bridge down and bring it back up.
    pub fn restart(&self) -> Promise {
        let session = self.session.clone();
        future_to_promise(async move {
            session.restart().await;
            Ok(JsValue::UNDEFINED)
        })
    }

    #[wasm_bindgen(js_name = dismissError)]
    pub fn dismiss_error(&self) -> Promise {
        let session = self.session.clone();
        future_to_promise(async move {
            session.dismiss_error().await;
            Ok(JsValue::UNDEFINED)
        })
    }

    /// Call a method of the connected provider's interface.
    ///
    /// Unlike the actions above, this rejects on failure.
    #[wasm_bindgen(js_name = callInterface)]
    pub fn call_interface(&self, method: String) -> Promise {
        let session = self.session.clone();
        future_to_promise(async move {
            match session.gate().call_interface(&method).await {
                Ok(value) => Ok(to_js(&value)),
                Err(e) => Err(js_error(e)),
            }
        })
    }

    /// Current UI state as `{ state, metadata?, identity?, message? }`.
    #[wasm_bindgen(getter)]
    pub fn state(&self) -> JsValue {
        to_js(&state_json(&self.session.state()))
    }

    /// Last provider status reported by the bridge.
    #[wasm_bindgen(getter, js_name = providerStatus)]
    pub fn provider_status(&self) -> JsValue {
        to_js(&status_json(&self.session.gate().status()))
    }
}

fn state_json(state: &UiState) -> serde_json::Value {
    match state {
        UiState::Fetching => json!({ "state": "fetching" }),
        UiState::BridgeError => json!({ "state": "bridgeError" }),
        UiState::NotLoaded => json!({ "state": "notLoaded" }),
        UiState::Loaded { metadata } => json!({ "state": "loaded", "metadata": metadata }),
        UiState::Connected { metadata, identity } => json!({
            "state": "connected",
            "metadata": metadata,
            "identity": identity,
        }),
        UiState::Error(message) => json!({ "state": "error", "message": message }),
    }
}

fn status_json(status: &ProviderStatus) -> serde_json::Value {
    serde_json::to_value(status).unwrap_or(serde_json::Value::Null)
}
