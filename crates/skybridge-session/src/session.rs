//! Skapp-facing actions

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Value;
use skybridge_gate::constants::IDENTITY_METHOD;
use skybridge_gate::{ErrorKind, Gate, GateError, ProviderStatus, SkappInfo};
use skybridge_hal::Platform;

use crate::ui::{InteractionLock, UiHooks, UiState};

/// Maps gate outcomes to UI states for one skapp.
///
/// Every user-triggered action holds the interaction lock for its whole
/// duration. Errors never escape: they end up as [`UiState::BridgeError`] or
/// [`UiState::Error`].
pub struct SkappSession<P: Platform, H: UiHooks> {
    gate: Rc<Gate<P>>,
    skapp: SkappInfo,
    hooks: H,
    state: RefCell<UiState>,
}

impl<P: Platform, H: UiHooks> SkappSession<P, H> {
    pub fn new(gate: Rc<Gate<P>>, skapp: SkappInfo, hooks: H) -> Self {
        Self {
            gate,
            skapp,
            hooks,
            state: RefCell::new(UiState::Fetching),
        }
    }

    pub fn gate(&self) -> &Rc<Gate<P>> {
        &self.gate
    }

    pub fn skapp(&self) -> &SkappInfo {
        &self.skapp
    }

    /// Current UI state.
    pub fn state(&self) -> UiState {
        self.state.borrow().clone()
    }

    fn log(&self, msg: &str) {
        self.gate
            .platform()
            .debug_write(&format!("[session] {}", msg));
    }

    fn set_state(&self, state: UiState) {
        self.log(&format!("UI state -> {:?}", state));
        *self.state.borrow_mut() = state.clone();
        state.render(&self.hooks);
    }

    // =========================================================================
    // Actions
    // =========================================================================

    /// Startup login: load and interpret the stored provider without any
    /// popup.
    pub async fn login_silent(&self) {
        self.fetch_stored_provider().await
    }

    /// Show `Fetching`, wait for the bridge and interpret the stored provider.
    ///
    /// A failed handshake shows `BridgeError` but the fetch is still attempted.
    pub async fn fetch_stored_provider(&self) {
        self.set_state(UiState::Fetching);

        if let Err(e) = self.gate.ready().await {
            self.log(&format!("Bridge not ready: {}", e));
            self.set_state(UiState::BridgeError);
        }

        match self.gate.fetch_stored_provider(&self.skapp).await {
            Ok(status) => self.change_state(status).await,
            Err(e) => self.set_error_state(&e),
        }
    }

    /// Load a provider if none is loaded, then connect it.
    pub async fn login(&self) {
        let _lock = InteractionLock::acquire(&self.hooks);
        let result = self.connect_or_load().await;
        self.finish(result).await;
    }

    async fn connect_or_load(&self) -> Result<ProviderStatus, GateError> {
        if self.gate.status().is_provider_loaded() {
            return self.gate.connect_provider(&self.skapp).await;
        }
        let status = self.gate.load_new_provider(&self.skapp).await?;
        if !status.is_provider_loaded() {
            return Ok(status);
        }
        self.gate.connect_provider(&self.skapp).await
    }

    /// Pick a provider in the router popup.
    pub async fn load_new_provider(&self) {
        let _lock = InteractionLock::acquire(&self.hooks);
        let result = self.gate.load_new_provider(&self.skapp).await;
        self.finish(result).await;
    }

    /// Connect the loaded provider.
    pub async fn connect_provider(&self) {
        let _lock = InteractionLock::acquire(&self.hooks);
        let result = self.gate.connect_provider(&self.skapp).await;
        self.finish(result).await;
    }

    pub async fn disconnect_provider(&self) {
        let _lock = InteractionLock::acquire(&self.hooks);
        let result = self.gate.disconnect_provider().await;
        self.finish(result).await;
    }

    /// Disconnect the provider; if that fails, unload it so no stale
    /// connected state survives, and show the disconnect error.
    pub async fn logout(&self) {
        let _lock = InteractionLock::acquire(&self.hooks);
        match self.gate.disconnect_provider().await {
            Ok(status) => self.change_state(status).await,
            Err(e) => {
                self.log(&format!("Disconnect failed, unloading provider: {}", e));
                if let Err(unload) = self.gate.unload_provider().await {
                    self.log(&format!("Unload failed: {}", unload));
                }
                self.set_error_state(&e);
            }
        }
    }

    /// Restart the bridge and fetch the stored provider again.
    pub async fn restart(&self) {
        if let Err(e) = self.gate.restart_bridge().await {
            self.set_error_state(&e);
            return;
        }
        self.login_silent().await
    }

    /// Leave the error state by showing the last known provider status.
    pub async fn dismiss_error(&self) {
        self.change_state(self.gate.status()).await
    }

    // =========================================================================
    // Interpretation
    // =========================================================================

    async fn finish(&self, result: Result<ProviderStatus, GateError>) {
        match result {
            Ok(status) => self.change_state(status).await,
            Err(e) => self.set_error_state(&e),
        }
    }

    async fn change_state(&self, status: ProviderStatus) {
        match status {
            ProviderStatus::NotLoaded => self.set_state(UiState::NotLoaded),
            ProviderStatus::Loaded { metadata } => self.set_state(UiState::Loaded { metadata }),
            ProviderStatus::Connected { metadata, .. } => {
                match self.gate.call_interface(IDENTITY_METHOD).await {
                    Ok(Value::String(identity)) => {
                        self.set_state(UiState::Connected { metadata, identity })
                    }
                    other => {
                        match other {
                            Ok(value) => self.log(&format!("Identity is not a string: {}", value)),
                            Err(e) => self.log(&format!("Identity unavailable: {}", e)),
                        }
                        // The provider cannot fulfil the minimum interface
                        if let Err(e) = self.gate.disconnect_provider().await {
                            self.log(&format!("Disconnect failed: {}", e));
                        }
                        self.set_state(UiState::Loaded { metadata });
                    }
                }
            }
        }
    }

    fn set_error_state(&self, error: &GateError) {
        if error.kind() == ErrorKind::Handshake {
            self.set_state(UiState::BridgeError);
            return;
        }
        let message = error.to_string();
        let message = message.strip_prefix("Error: ").unwrap_or(&message).to_string();
        self.set_state(UiState::Error(message));
    }
}
