//! Shared fixtures for gate integration tests

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::{json, Value};
use skybridge_gate::{Gate, GateConfig, SkappInfo};
use skybridge_hal_mock::{MockPlatform, ScriptedEndpoint};

pub const BRIDGE_URL: &str = "bridge.example";

pub fn skapp() -> SkappInfo {
    SkappInfo::new("test-skapp", "app.example")
}

pub fn bridge_metadata() -> Value {
    json!({
        "name": "Test Bridge",
        "domain": "bridge.example",
        "relativeRouterUrl": "/router.html",
        "routerName": "Select a provider",
        "routerW": 500,
        "routerH": 600,
        "minimumInterface": {"identity": []}
    })
}

pub fn provider_metadata() -> Value {
    json!({
        "name": "Demo Provider",
        "url": "provider.example",
        "relativeConnectorPath": "connector.html",
        "connectorName": "Connect to Demo",
        "connectorW": 400,
        "connectorH": 550
    })
}

pub fn not_loaded() -> Value {
    json!({
        "isProviderLoaded": false,
        "isProviderConnected": false,
        "providerInterface": null,
        "metadata": null
    })
}

pub fn loaded() -> Value {
    json!({
        "isProviderLoaded": true,
        "isProviderConnected": false,
        "providerInterface": null,
        "metadata": provider_metadata()
    })
}

pub fn connected() -> Value {
    json!({
        "isProviderLoaded": true,
        "isProviderConnected": true,
        "providerInterface": {
            "identity": [],
            "getJSON": ["dataKey", {"name": "customOptions", "type": "object", "optional": true}]
        },
        "metadata": provider_metadata()
    })
}

/// A mock page whose bridge keeps a provider status the way a real bridge does.
pub struct Fixture {
    pub platform: Rc<MockPlatform>,
    pub bridge: Rc<ScriptedEndpoint>,
    pub remote_status: Rc<RefCell<Value>>,
}

impl Fixture {
    pub fn new() -> Self {
        let bridge = ScriptedEndpoint::new();
        let remote_status = Rc::new(RefCell::new(not_loaded()));
        bridge.respond("getBridgeMetadata", bridge_metadata());

        for method in ["getProviderStatus", "fetchStoredProvider", "connectProvider"] {
            let status = remote_status.clone();
            bridge.on(method, move |_, _| Ok(status.borrow().clone()));
        }
        let status = remote_status.clone();
        bridge.on("loadNewProvider", move |_, _| {
            *status.borrow_mut() = loaded();
            Ok(loaded())
        });
        let status = remote_status.clone();
        bridge.on("unloadProvider", move |_, _| {
            *status.borrow_mut() = not_loaded();
            Ok(not_loaded())
        });
        let status = remote_status.clone();
        bridge.on("disconnectProvider", move |_, _| {
            *status.borrow_mut() = loaded();
            Ok(loaded())
        });
        bridge.on("callInterface", |args, _| match args[0].as_str() {
            Some("identity") => Ok(json!("user-123")),
            other => Err(format!("Error: Unknown interface method {:?}", other)),
        });

        let platform = Rc::new(MockPlatform::with_bridge(bridge.clone()));
        Self {
            platform,
            bridge,
            remote_status,
        }
    }

    pub fn set_remote_status(&self, status: Value) {
        *self.remote_status.borrow_mut() = status;
    }

    /// A started gate on this fixture's platform.
    pub fn gate(&self) -> Gate<MockPlatform> {
        let gate = Gate::new(self.platform.clone(), GateConfig::new(BRIDGE_URL)).unwrap();
        gate.start().unwrap();
        gate
    }
}

/// Router page that reports `outcome` once told the bridge frame name.
pub fn router(outcome: &'static str) -> Rc<ScriptedEndpoint> {
    let router = ScriptedEndpoint::new();
    router.on("setFrameName", move |_, events| {
        events.emit("result", json!(outcome));
        Ok(Value::Null)
    });
    router
}

/// Connector page that reports `outcome` right after connecting. On success
/// the bridge announces `status` through `connectionComplete`.
pub fn connector(
    bridge: &Rc<ScriptedEndpoint>,
    outcome: &'static str,
    status: Value,
) -> Rc<ScriptedEndpoint> {
    let connector = ScriptedEndpoint::new();
    let bridge = bridge.clone();
    connector.on_connect(move |events| {
        if outcome == "success" {
            if let Some(bridge_events) = bridge.events() {
                bridge_events.emit("connectionComplete", status.clone());
            }
        }
        events.emit("result", json!(outcome));
    });
    connector
}
