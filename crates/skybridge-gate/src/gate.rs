//! Bridge lifecycle and provider negotiation

use std::cell::RefCell;
use std::rc::Rc;

use futures::future::{LocalBoxFuture, Shared};
use futures::FutureExt;
use serde_json::{json, Value};
use skybridge_channel::{ChannelError, Connection};
use skybridge_hal::{ensure_scheme, join_url, ChildContextFactory, Platform};
use url::Url;

use crate::config::GateConfig;
use crate::constants::*;
use crate::error::GateError;
use crate::negotiate::{run_popup, PopupOutcome, PopupRequest};
use crate::status::ProviderStatus;
use crate::types::{BridgeMetadata, ProviderMetadata, SkappInfo};

type BridgeConnection<P> = Connection<<P as ChildContextFactory>::Messenger>;
type SharedResult<T> = Shared<LocalBoxFuture<'static, Result<T, GateError>>>;

/// Lifecycle phase of the bridge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GatePhase {
    /// `start()` not called yet
    Uninitialized,
    /// Bridge frame open, handshake not completed
    Connecting,
    /// Handshake completed
    Ready,
    /// Handshake exhausted its attempts
    Failed,
    /// Torn down; `start()` opens a fresh bridge
    Destroyed,
}

struct Bridge<P: Platform> {
    child: P::Child,
    frame_name: String,
    connection: SharedResult<BridgeConnection<P>>,
    metadata: SharedResult<BridgeMetadata>,
}

enum BridgeSlot<P: Platform> {
    Uninitialized,
    Active(Rc<Bridge<P>>),
    Destroyed,
}

/// Owns the bridge frame and its channel, and caches the provider status.
///
/// All operations take `&self`; the gate is shared as `Rc<Gate<P>>` by the
/// session layer.
pub struct Gate<P: Platform> {
    platform: Rc<P>,
    config: GateConfig,
    bridge: RefCell<BridgeSlot<P>>,
    status: RefCell<ProviderStatus>,
}

impl<P: Platform> Gate<P> {
    /// Create a gate. The bridge is not opened until [`Gate::start`].
    pub fn new(platform: Rc<P>, mut config: GateConfig) -> Result<Self, GateError> {
        config.bridge_url = ensure_scheme(&config.bridge_url);
        Url::parse(&config.bridge_url)
            .map_err(|e| GateError::InvalidUrl(format!("{}: {}", config.bridge_url, e)))?;

        Ok(Self {
            platform,
            config,
            bridge: RefCell::new(BridgeSlot::Uninitialized),
            status: RefCell::new(ProviderStatus::NotLoaded),
        })
    }

    fn log(&self, msg: &str) {
        self.platform.debug_write(&format!("[gate] {}", msg));
    }

    pub fn platform(&self) -> &Rc<P> {
        &self.platform
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn phase(&self) -> GatePhase {
        match &*self.bridge.borrow() {
            BridgeSlot::Uninitialized => GatePhase::Uninitialized,
            BridgeSlot::Destroyed => GatePhase::Destroyed,
            BridgeSlot::Active(bridge) => match bridge.connection.peek() {
                None => GatePhase::Connecting,
                Some(Ok(_)) => GatePhase::Ready,
                Some(Err(_)) => GatePhase::Failed,
            },
        }
    }

    /// Last status reported by the bridge.
    pub fn status(&self) -> ProviderStatus {
        self.status.borrow().clone()
    }

    fn set_status(&self, status: ProviderStatus) {
        *self.status.borrow_mut() = status;
    }

    /// Name of the current bridge frame, handed to routers and connectors.
    pub fn frame_name(&self) -> Option<String> {
        match &*self.bridge.borrow() {
            BridgeSlot::Active(bridge) => Some(bridge.frame_name.clone()),
            _ => None,
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Open the bridge frame and arm its handshake and metadata fetch.
    ///
    /// Both are shared futures driven by the first operation awaiting them.
    /// Does nothing while a bridge is already active.
    pub fn start(&self) -> Result<(), GateError> {
        if matches!(&*self.bridge.borrow(), BridgeSlot::Active(_)) {
            return Ok(());
        }

        let frame_name = format!("{}{}", BRIDGE_FRAME_PREFIX, uuid::Uuid::new_v4());
        let child = self
            .platform
            .open_embedded(&self.config.bridge_url, &frame_name)?;

        let platform = self.platform.clone();
        let frame = child.clone();
        let handshake = self.config.handshake;
        let connection: LocalBoxFuture<'static, Result<BridgeConnection<P>, GateError>> =
            async move {
                let messenger = platform.messenger(&frame)?;
                Ok::<_, GateError>(Connection::establish(platform, messenger, handshake).await?)
            }
            .boxed_local();
        let connection = connection.shared();

        let pending = connection.clone();
        let metadata: LocalBoxFuture<'static, Result<BridgeMetadata, GateError>> = async move {
            let conn = pending.await?;
            let value = conn.call(METHOD_GET_BRIDGE_METADATA, vec![]).await?;
            serde_json::from_value::<BridgeMetadata>(value)
                .map_err(|e| GateError::InvalidResponse(e.to_string()))
        }
        .boxed_local();

        self.log(&format!(
            "Starting bridge {} at {}",
            frame_name, self.config.bridge_url
        ));
        *self.bridge.borrow_mut() = BridgeSlot::Active(Rc::new(Bridge {
            child,
            frame_name,
            connection,
            metadata: metadata.shared(),
        }));
        self.set_status(ProviderStatus::NotLoaded);
        Ok(())
    }

    fn active_bridge(&self) -> Result<Rc<Bridge<P>>, GateError> {
        match &*self.bridge.borrow() {
            BridgeSlot::Active(bridge) => Ok(bridge.clone()),
            BridgeSlot::Uninitialized => Err(GateError::NotStarted),
            BridgeSlot::Destroyed => Err(GateError::Channel(ChannelError::Closed)),
        }
    }

    async fn connection(&self) -> Result<BridgeConnection<P>, GateError> {
        let bridge = self.active_bridge()?;
        bridge.connection.clone().await
    }

    /// Wait for the bridge handshake.
    pub async fn ready(&self) -> Result<(), GateError> {
        self.connection().await.map(|_| ())
    }

    /// Bridge metadata, fetched once per bridge session.
    pub async fn bridge_metadata(&self) -> Result<BridgeMetadata, GateError> {
        let bridge = self.active_bridge()?;
        bridge.metadata.clone().await
    }

    /// Tear down the bridge.
    ///
    /// Unloads a loaded provider first; a failing unload is logged and
    /// teardown continues. Never fails.
    pub async fn destroy_bridge(&self) {
        let slot = std::mem::replace(&mut *self.bridge.borrow_mut(), BridgeSlot::Destroyed);
        let bridge = match slot {
            BridgeSlot::Active(bridge) => bridge,
            _ => {
                self.set_status(ProviderStatus::NotLoaded);
                return;
            }
        };

        let established = bridge
            .connection
            .peek()
            .and_then(|result| result.as_ref().ok())
            .cloned();

        if let Some(conn) = &established {
            if self.status().is_provider_loaded() {
                if let Err(e) = conn.call(METHOD_UNLOAD_PROVIDER, vec![]).await {
                    self.log(&format!("Unload during teardown failed: {}", e));
                }
            }
            conn.close();
        }
        self.set_status(ProviderStatus::NotLoaded);
        self.platform.remove_child(&bridge.child);
        self.log(&format!("Destroyed bridge {}", bridge.frame_name));
    }

    /// `destroy_bridge()` followed by `start()`.
    pub async fn restart_bridge(&self) -> Result<(), GateError> {
        self.destroy_bridge().await;
        self.start()
    }

    // =========================================================================
    // Bridge calls
    // =========================================================================

    async fn call_bridge(&self, method: &str, args: Vec<Value>) -> Result<Value, GateError> {
        let conn = self.connection().await?;
        Ok(conn.call(method, args).await?)
    }

    async fn status_call(
        &self,
        method: &str,
        args: Vec<Value>,
    ) -> Result<ProviderStatus, GateError> {
        let value = self.call_bridge(method, args).await?;
        let status = ProviderStatus::from_value(value)?;
        self.set_status(status.clone());
        Ok(status)
    }

    pub async fn get_provider_status(&self) -> Result<ProviderStatus, GateError> {
        self.status_call(METHOD_GET_PROVIDER_STATUS, vec![]).await
    }

    /// Load the provider previously chosen for this skapp, if any.
    pub async fn fetch_stored_provider(
        &self,
        skapp: &SkappInfo,
    ) -> Result<ProviderStatus, GateError> {
        let value = self
            .call_bridge(METHOD_FETCH_STORED_PROVIDER, vec![skapp.to_value()])
            .await?;
        let status = if value.is_null() {
            ProviderStatus::NotLoaded
        } else {
            ProviderStatus::from_value(value)?
        };
        self.set_status(status.clone());
        Ok(status)
    }

    pub async fn disconnect_provider(&self) -> Result<ProviderStatus, GateError> {
        self.status_call(METHOD_DISCONNECT_PROVIDER, vec![]).await
    }

    pub async fn unload_provider(&self) -> Result<ProviderStatus, GateError> {
        self.status_call(METHOD_UNLOAD_PROVIDER, vec![]).await
    }

    /// Invoke a method of the connected provider's interface.
    ///
    /// The call is forwarded whether or not the cached interface lists
    /// `method`; the provider decides. The result is returned as-is and
    /// callers check its shape.
    pub async fn call_interface(&self, method: &str) -> Result<Value, GateError> {
        let status = self.status();
        if !status.is_provider_connected() {
            return Err(GateError::NotConnected);
        }
        if status.provider_interface().is_none() {
            return Err(GateError::InterfaceMissing {
                method: method.to_string(),
            });
        }
        self.call_bridge(METHOD_CALL_INTERFACE, vec![json!(method)])
            .await
    }

    // =========================================================================
    // Popup negotiations
    // =========================================================================

    /// Let the user pick a provider in the router popup and load it.
    ///
    /// A router closed by the user returns the unchanged status.
    pub async fn load_new_provider(&self, skapp: &SkappInfo) -> Result<ProviderStatus, GateError> {
        let bridge = self.active_bridge()?;
        let metadata = bridge.metadata.clone().await?;
        let router_url = join_url(&self.config.bridge_url, &metadata.relative_router_url);

        let outcome = run_popup(
            &self.platform,
            &self.config,
            PopupRequest {
                url: &router_url,
                title: &metadata.router_name,
                width: metadata.router_w,
                height: metadata.router_h,
                frame_name: Some(&bridge.frame_name),
            },
        )
        .await?;

        match outcome {
            PopupOutcome::Closed => {
                self.log("Router closed, provider unchanged");
                Ok(self.status())
            }
            PopupOutcome::Failed(message) => Err(GateError::ProviderSelection(message)),
            PopupOutcome::Success => {
                self.status_call(METHOD_LOAD_NEW_PROVIDER, vec![skapp.to_value()])
                    .await
            }
        }
    }

    /// Connect the loaded provider to this skapp.
    ///
    /// The bridge is first asked to connect silently. When that is not
    /// enough the provider's connector popup is opened and the final status
    /// arrives with the bridge's `connectionComplete` event.
    pub async fn connect_provider(&self, skapp: &SkappInfo) -> Result<ProviderStatus, GateError> {
        if !self.status().is_provider_loaded() {
            return Err(GateError::ProviderNotLoaded);
        }
        let bridge = self.active_bridge()?;
        let conn = bridge.connection.clone().await?;

        let value = conn
            .call(METHOD_CONNECT_PROVIDER, vec![skapp.to_value()])
            .await?;
        let silent = ProviderStatus::from_value(value)?;
        self.set_status(silent.clone());
        let metadata = match &silent {
            ProviderStatus::Connected { .. } => return Ok(silent),
            ProviderStatus::Loaded { metadata } => metadata.clone(),
            ProviderStatus::NotLoaded => return Err(GateError::ProviderNotLoaded),
        };

        let launch = metadata
            .connector()
            .ok_or_else(|| GateError::ConnectorMetadataMissing {
                provider: metadata.name.clone(),
            })?;
        let connector_url = connector_url(&metadata, &bridge.frame_name, skapp)?;
        let completion = conn.once(EVENT_CONNECTION_COMPLETE);
        let outcome = run_popup(
            &self.platform,
            &self.config,
            PopupRequest {
                url: &connector_url,
                title: launch.title,
                width: launch.width,
                height: launch.height,
                frame_name: None,
            },
        )
        .await?;

        match outcome {
            PopupOutcome::Closed => {
                self.log("Connector closed, provider unchanged");
                Ok(self.status())
            }
            PopupOutcome::Failed(message) => Err(GateError::ProviderSelection(message)),
            PopupOutcome::Success => {
                let status = ProviderStatus::from_value(completion.await?)?;
                self.set_status(status.clone());
                Ok(status)
            }
        }
    }
}

/// Connector launch URL: the provider's connector page with the bridge frame
/// and skapp identity in the query.
pub fn connector_url(
    metadata: &ProviderMetadata,
    frame_name: &str,
    skapp: &SkappInfo,
) -> Result<String, GateError> {
    let launch = metadata
        .connector()
        .ok_or_else(|| GateError::ConnectorMetadataMissing {
            provider: metadata.name.clone(),
        })?;
    let base = join_url(&ensure_scheme(&metadata.url), launch.path);
    let mut url =
        Url::parse(&base).map_err(|e| GateError::InvalidUrl(format!("{}: {}", base, e)))?;
    url.query_pairs_mut()
        .append_pair(QUERY_BRIDGE_FRAME_NAME, frame_name)
        .append_pair(QUERY_SKAPP_NAME, &skapp.name)
        .append_pair(QUERY_SKAPP_DOMAIN, &skapp.domain);
    Ok(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(url: &str, path: &str) -> ProviderMetadata {
        ProviderMetadata {
            name: "Demo".to_string(),
            url: url.to_string(),
            relative_connector_path: Some(path.to_string()),
            connector_name: Some("Connect".to_string()),
            connector_w: Some(400),
            connector_h: Some(500),
        }
    }

    #[test]
    fn test_connector_url_query() {
        let skapp = SkappInfo::new("test skapp", "app.example");
        let url = connector_url(
            &metadata("provider.example/", "/connector.html"),
            "skybridge-1",
            &skapp,
        )
        .unwrap();
        assert_eq!(
            url,
            "https://provider.example/connector.html?bridgeFrameName=skybridge-1&skappName=test+skapp&skappDomain=app.example"
        );
    }

    #[test]
    fn test_connector_url_invalid() {
        let skapp = SkappInfo::new("a", "b");
        let err = connector_url(&metadata("https://[bad", "connector.html"), "f", &skapp)
            .unwrap_err();
        assert!(matches!(err, GateError::InvalidUrl(_)));
    }

    #[test]
    fn test_connector_url_without_path() {
        let skapp = SkappInfo::new("a", "b");
        let err = connector_url(&metadata("provider.example", ""), "f", &skapp).unwrap_err();
        assert_eq!(
            err,
            GateError::ConnectorMetadataMissing {
                provider: "Demo".to_string()
            }
        );
    }
}
