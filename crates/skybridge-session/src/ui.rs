//! Abstract UI states and the hooks that render them

use std::rc::Rc;

use skybridge_gate::ProviderMetadata;

/// What the skapp should show.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UiState {
    /// Waiting for the bridge
    Fetching,
    /// The bridge never answered; offer a restart
    BridgeError,
    NotLoaded,
    Loaded {
        metadata: ProviderMetadata,
    },
    Connected {
        metadata: ProviderMetadata,
        identity: String,
    },
    /// Unexpected failure, message ready for display
    Error(String),
}

impl UiState {
    pub(crate) fn render<H: UiHooks + ?Sized>(&self, hooks: &H) {
        match self {
            UiState::Fetching => hooks.on_fetching(),
            UiState::BridgeError => hooks.on_bridge_error(),
            UiState::NotLoaded => hooks.on_not_loaded(),
            UiState::Loaded { metadata } => hooks.on_loaded(metadata),
            UiState::Connected { metadata, identity } => hooks.on_connected(metadata, identity),
            UiState::Error(message) => hooks.on_error(message),
        }
    }
}

/// Rendering collaborator driven by [`SkappSession`](crate::SkappSession).
pub trait UiHooks {
    fn on_fetching(&self);
    fn on_bridge_error(&self);
    fn on_not_loaded(&self);
    fn on_loaded(&self, metadata: &ProviderMetadata);
    fn on_connected(&self, metadata: &ProviderMetadata, identity: &str);
    fn on_error(&self, message: &str);

    /// Disable user-triggered actions
    fn lock_interaction(&self);
    /// Re-enable user-triggered actions
    fn unlock_interaction(&self);
}

impl<T: UiHooks + ?Sized> UiHooks for Rc<T> {
    fn on_fetching(&self) {
        (**self).on_fetching()
    }

    fn on_bridge_error(&self) {
        (**self).on_bridge_error()
    }

    fn on_not_loaded(&self) {
        (**self).on_not_loaded()
    }

    fn on_loaded(&self, metadata: &ProviderMetadata) {
        (**self).on_loaded(metadata)
    }

    fn on_connected(&self, metadata: &ProviderMetadata, identity: &str) {
        (**self).on_connected(metadata, identity)
    }

    fn on_error(&self, message: &str) {
        (**self).on_error(message)
    }

    fn lock_interaction(&self) {
        (**self).lock_interaction()
    }

    fn unlock_interaction(&self) {
        (**self).unlock_interaction()
    }
}

/// Holds the interaction lock; releases it exactly once when dropped.
pub(crate) struct InteractionLock<'a, H: UiHooks> {
    hooks: &'a H,
}

impl<'a, H: UiHooks> InteractionLock<'a, H> {
    pub(crate) fn acquire(hooks: &'a H) -> Self {
        hooks.lock_interaction();
        Self { hooks }
    }
}

impl<H: UiHooks> Drop for InteractionLock<'_, H> {
    fn drop(&mut self) {
        self.hooks.unlock_interaction();
    }
}
