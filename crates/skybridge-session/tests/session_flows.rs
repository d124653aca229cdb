//! Session flow tests
//!
//! Drives `SkappSession` end to end against the mock platform and records
//! every UI hook call.

use std::cell::RefCell;
use std::rc::Rc;

use futures::executor::block_on;
use serde_json::{json, Value};
use skybridge_gate::{Gate, GateConfig, HandshakeOptions, ProviderMetadata, SkappInfo};
use skybridge_hal_mock::{MockPlatform, PopupScript, ScriptedEndpoint};
use skybridge_session::{SkappSession, UiHooks, UiState};

// ============================================================================
// Recording hooks
// ============================================================================

#[derive(Default)]
struct RecordingHooks {
    events: RefCell<Vec<String>>,
}

impl RecordingHooks {
    fn push(&self, event: String) {
        self.events.borrow_mut().push(event);
    }

    fn events(&self) -> Vec<String> {
        self.events.borrow().clone()
    }

    fn count(&self, event: &str) -> usize {
        self.events.borrow().iter().filter(|e| *e == event).count()
    }

    fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl UiHooks for RecordingHooks {
    fn on_fetching(&self) {
        self.push("fetching".to_string());
    }

    fn on_bridge_error(&self) {
        self.push("bridge-error".to_string());
    }

    fn on_not_loaded(&self) {
        self.push("not-loaded".to_string());
    }

    fn on_loaded(&self, metadata: &ProviderMetadata) {
        self.push(format!("loaded:{}", metadata.name));
    }

    fn on_connected(&self, _metadata: &ProviderMetadata, identity: &str) {
        self.push(format!("connected:{}", identity));
    }

    fn on_error(&self, message: &str) {
        self.push(format!("error:{}", message));
    }

    fn lock_interaction(&self) {
        self.push("lock".to_string());
    }

    fn unlock_interaction(&self) {
        self.push("unlock".to_string());
    }
}

// ============================================================================
// Fixture
// ============================================================================

fn provider_metadata() -> Value {
    json!({
        "name": "Demo Provider",
        "url": "provider.example",
        "relativeConnectorPath": "connector.html",
        "connectorName": "Connect",
        "connectorW": 400,
        "connectorH": 500
    })
}

fn not_loaded() -> Value {
    json!({"isProviderLoaded": false, "isProviderConnected": false})
}

fn loaded() -> Value {
    json!({"isProviderLoaded": true, "isProviderConnected": false, "metadata": provider_metadata()})
}

fn connected() -> Value {
    json!({
        "isProviderLoaded": true,
        "isProviderConnected": true,
        "providerInterface": {"identity": []},
        "metadata": provider_metadata()
    })
}

type Session = SkappSession<MockPlatform, Rc<RecordingHooks>>;

struct Fixture {
    platform: Rc<MockPlatform>,
    bridge: Rc<ScriptedEndpoint>,
    remote_status: Rc<RefCell<Value>>,
    hooks: Rc<RecordingHooks>,
}

impl Fixture {
    fn new() -> Self {
        let bridge = ScriptedEndpoint::new();
        let remote_status = Rc::new(RefCell::new(not_loaded()));

        bridge.respond(
            "getBridgeMetadata",
            json!({
                "name": "Test Bridge",
                "relativeRouterUrl": "router.html",
                "routerName": "Select a provider",
                "routerW": 500,
                "routerH": 600
            }),
        );
        for method in ["getProviderStatus", "fetchStoredProvider", "connectProvider"] {
            let status = remote_status.clone();
            bridge.on(method, move |_, _| Ok(status.borrow().clone()));
        }
        for (method, next) in [
            ("loadNewProvider", loaded()),
            ("disconnectProvider", loaded()),
            ("unloadProvider", not_loaded()),
        ] {
            let status = remote_status.clone();
            bridge.on(method, move |_, _| {
                *status.borrow_mut() = next.clone();
                Ok(next.clone())
            });
        }
        bridge.respond("callInterface", json!("user-123"));

        Self {
            platform: Rc::new(MockPlatform::with_bridge(bridge.clone())),
            bridge,
            remote_status,
            hooks: Rc::new(RecordingHooks::default()),
        }
    }

    fn set_remote_status(&self, status: Value) {
        *self.remote_status.borrow_mut() = status;
    }

    fn session_with(&self, config: GateConfig) -> Session {
        let gate = Gate::new(self.platform.clone(), config).unwrap();
        gate.start().unwrap();
        SkappSession::new(
            Rc::new(gate),
            SkappInfo::new("test-skapp", "app.example"),
            self.hooks.clone(),
        )
    }

    fn session(&self) -> Session {
        self.session_with(GateConfig::new("bridge.example"))
    }

    /// Router page answering `outcome`.
    fn push_router(&self, outcome: &'static str) {
        let router = ScriptedEndpoint::new();
        router.on("setFrameName", move |_, events| {
            events.emit("result", json!(outcome));
            Ok(Value::Null)
        });
        self.platform.push_popup(PopupScript::answering(router));
    }

    /// Connector page that completes the connection.
    fn push_connector(&self) {
        let connector = ScriptedEndpoint::new();
        let bridge = self.bridge.clone();
        let status = self.remote_status.clone();
        connector.on_connect(move |events| {
            *status.borrow_mut() = connected();
            if let Some(bridge_events) = bridge.events() {
                bridge_events.emit("connectionComplete", connected());
            }
            events.emit("result", json!("success"));
        });
        self.platform.push_popup(PopupScript::answering(connector));
    }
}

fn is_loaded(state: &UiState) -> bool {
    matches!(state, UiState::Loaded { .. })
}

// ============================================================================
// login_silent
// ============================================================================

#[test]
fn test_login_silent_with_stored_connected_provider() {
    let fixture = Fixture::new();
    fixture.set_remote_status(connected());
    let session = fixture.session();

    block_on(session.login_silent());

    assert_eq!(
        fixture.hooks.events(),
        vec!["fetching".to_string(), "connected:user-123".to_string()]
    );
    assert!(matches!(
        session.state(),
        UiState::Connected { ref identity, .. } if identity == "user-123"
    ));
}

#[test]
fn test_login_silent_without_stored_provider() {
    let fixture = Fixture::new();
    let session = fixture.session();

    block_on(session.login_silent());

    assert_eq!(session.state(), UiState::NotLoaded);
    assert_eq!(fixture.hooks.count("lock"), 0);
}

#[test]
fn test_bridge_never_answers() {
    let fixture = Fixture::new();
    fixture.bridge.refuse_handshakes();
    let mut config = GateConfig::new("bridge.example");
    config.handshake = HandshakeOptions {
        max_attempts: 3,
        retry_interval_ms: 10,
    };
    let session = fixture.session_with(config);

    block_on(session.login_silent());

    assert_eq!(session.state(), UiState::BridgeError);
    assert_eq!(fixture.bridge.handshake_count(), 3);

    fixture.hooks.clear();
    block_on(session.login());

    assert_eq!(
        fixture.hooks.events(),
        vec![
            "lock".to_string(),
            "bridge-error".to_string(),
            "unlock".to_string()
        ]
    );
}

// ============================================================================
// login
// ============================================================================

#[test]
fn test_login_loads_then_connects() {
    let fixture = Fixture::new();
    fixture.push_router("success");
    fixture.push_connector();
    let session = fixture.session();
    block_on(session.login_silent());
    fixture.hooks.clear();

    block_on(session.login());

    assert_eq!(
        fixture.hooks.events(),
        vec![
            "lock".to_string(),
            "connected:user-123".to_string(),
            "unlock".to_string()
        ]
    );
    assert!(fixture.bridge.was_called("loadNewProvider"));
    assert!(fixture.bridge.was_called("connectProvider"));
    assert_eq!(fixture.platform.popups().len(), 2);
}

#[test]
fn test_login_router_closed_restores_prior_state() {
    let fixture = Fixture::new();
    fixture.push_router("closed");
    let session = fixture.session();
    block_on(session.login_silent());
    fixture.hooks.clear();

    block_on(session.login());

    assert_eq!(session.state(), UiState::NotLoaded);
    assert_eq!(fixture.hooks.count("unlock"), 1);
    assert!(!fixture.hooks.events().iter().any(|e| e.starts_with("error:")));
    assert!(!fixture.bridge.was_called("connectProvider"));
}

#[test]
fn test_login_error_prefix_stripped() {
    let fixture = Fixture::new();
    fixture.push_router("Error: no provider chosen");
    let session = fixture.session();

    block_on(session.login());

    assert_eq!(session.state(), UiState::Error("no provider chosen".to_string()));
    assert_eq!(fixture.hooks.count("lock"), 1);
    assert_eq!(fixture.hooks.count("unlock"), 1);
}

#[test]
fn test_login_popup_blocked() {
    let fixture = Fixture::new();
    fixture.platform.set_popup_blocked(true);
    let session = fixture.session();

    block_on(session.login());

    assert_eq!(
        session.state(),
        UiState::Error("Could not open window, it may have been blocked by the browser".to_string())
    );
    assert_eq!(fixture.hooks.count("unlock"), 1);
}

#[test]
fn test_identity_not_a_string_falls_back_to_loaded() {
    let fixture = Fixture::new();
    fixture.set_remote_status(loaded());
    fixture.bridge.respond("callInterface", json!(42));
    let session = fixture.session();
    block_on(session.login_silent());
    assert!(is_loaded(&session.state()));

    fixture.set_remote_status(connected());
    block_on(session.login());

    assert!(is_loaded(&session.state()));
    assert!(fixture.bridge.was_called("disconnectProvider"));
    assert!(!session.gate().status().is_provider_connected());
    assert!(fixture.platform.has_log_containing("Identity is not a string: 42"));
}

#[test]
fn test_identity_served_without_interface_entry() {
    let fixture = Fixture::new();
    let mut status = connected();
    status["providerInterface"] = json!({});
    fixture.set_remote_status(status);
    let session = fixture.session();

    block_on(session.login_silent());

    assert!(matches!(
        session.state(),
        UiState::Connected { ref identity, .. } if identity == "user-123"
    ));
    assert!(!fixture.bridge.was_called("disconnectProvider"));
}

// ============================================================================
// logout
// ============================================================================

#[test]
fn test_logout_disconnects() {
    let fixture = Fixture::new();
    fixture.set_remote_status(connected());
    let session = fixture.session();
    block_on(session.login_silent());

    block_on(session.logout());

    assert!(is_loaded(&session.state()));
    assert_eq!(fixture.hooks.count("lock"), 1);
    assert_eq!(fixture.hooks.count("unlock"), 1);
}

#[test]
fn test_logout_failure_forces_unload() {
    let fixture = Fixture::new();
    fixture.set_remote_status(connected());
    let session = fixture.session();
    block_on(session.login_silent());
    fixture.bridge.reject("disconnectProvider", "Error: provider crashed");

    block_on(session.logout());

    assert!(fixture.bridge.was_called("unloadProvider"));
    assert_eq!(session.state(), UiState::Error("provider crashed".to_string()));
    assert!(!session.gate().status().is_provider_loaded());
    assert_eq!(fixture.hooks.count("unlock"), 1);
}

// ============================================================================
// restart and error dismissal
// ============================================================================

#[test]
fn test_restart_reopens_bridge_and_fetches() {
    let fixture = Fixture::new();
    fixture.set_remote_status(loaded());
    let session = fixture.session();
    block_on(session.login_silent());

    block_on(session.restart());

    assert_eq!(fixture.platform.embedded().len(), 2);
    assert!(fixture.bridge.was_called("unloadProvider"));
    // The bridge forgot the provider during teardown
    assert_eq!(session.state(), UiState::NotLoaded);
    assert_eq!(fixture.bridge.handshake_count(), 2);
}

#[test]
fn test_dismiss_error_shows_cached_status() {
    let fixture = Fixture::new();
    fixture.set_remote_status(loaded());
    fixture.push_router("Error: router crashed");
    let session = fixture.session();
    block_on(session.login_silent());
    block_on(session.load_new_provider());
    assert_eq!(session.state(), UiState::Error("router crashed".to_string()));

    block_on(session.dismiss_error());

    assert!(is_loaded(&session.state()));
}
