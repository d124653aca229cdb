//! Transient popup negotiations
//!
//! Router and connector popups follow the same exchange: handshake with the
//! page, optionally tell it the bridge frame name, then wait for a single
//! `result` event. The popup is watched while the exchange runs so a window
//! the user closes resolves as [`PopupOutcome::Closed`] instead of hanging.

use std::pin::pin;
use std::rc::Rc;

use futures::future::{select, Either};
use serde_json::{json, Value};
use skybridge_channel::{ChannelError, Connection};
use skybridge_hal::Platform;

use crate::config::GateConfig;
use crate::constants::{EVENT_RESULT, METHOD_SET_FRAME_NAME, OUTCOME_CLOSED, OUTCOME_SUCCESS};
use crate::error::GateError;

/// How a popup negotiation ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PopupOutcome {
    Success,
    /// The user dismissed the popup; not an error
    Closed,
    /// The popup reported a failure message
    Failed(String),
}

impl PopupOutcome {
    pub fn from_value(value: &Value) -> Self {
        match value.as_str() {
            Some(OUTCOME_SUCCESS) => PopupOutcome::Success,
            Some(OUTCOME_CLOSED) => PopupOutcome::Closed,
            Some(message) => PopupOutcome::Failed(message.to_string()),
            None => PopupOutcome::Failed(value.to_string()),
        }
    }
}

/// Window parameters of a popup.
pub(crate) struct PopupRequest<'a> {
    pub url: &'a str,
    pub title: &'a str,
    pub width: u32,
    pub height: u32,
    /// Sent through `setFrameName` once the popup is connected
    pub frame_name: Option<&'a str>,
}

/// Open a popup, run the exchange and close it again.
pub(crate) async fn run_popup<P: Platform>(
    platform: &Rc<P>,
    config: &GateConfig,
    request: PopupRequest<'_>,
) -> Result<PopupOutcome, GateError> {
    let child = platform.open_popup(request.url, request.title, request.width, request.height)?;
    platform.debug_write(&format!("[gate] Opened popup '{}' at {}", request.title, request.url));

    let exchange = pin!(exchange(
        platform.clone(),
        child.clone(),
        config,
        request.frame_name.map(str::to_string),
    ));
    let watcher = pin!(watch_closed(
        platform.clone(),
        child.clone(),
        config.popup_poll_interval_ms,
    ));
    let outcome = match select(exchange, watcher).await {
        Either::Left((outcome, _)) => outcome,
        Either::Right(((), _)) => Ok(PopupOutcome::Closed),
    };
    platform.remove_child(&child);

    match outcome {
        // A popup page that never answers is a failed selection, not a bridge failure
        Err(GateError::Channel(err @ ChannelError::Handshake { .. })) => {
            Ok(PopupOutcome::Failed(format!("Could not connect to popup: {}", err)))
        }
        other => {
            if let Ok(outcome) = &other {
                platform.debug_write(&format!("[gate] Popup '{}' ended: {:?}", request.title, outcome));
            }
            other
        }
    }
}

async fn exchange<P: Platform>(
    platform: Rc<P>,
    child: P::Child,
    config: &GateConfig,
    frame_name: Option<String>,
) -> Result<PopupOutcome, GateError> {
    let messenger = platform.messenger(&child)?;
    let conn = Connection::establish(platform, messenger, config.handshake).await?;
    let result = conn.once(EVENT_RESULT);

    if let Some(name) = frame_name {
        if let Err(e) = conn.call(METHOD_SET_FRAME_NAME, vec![json!(name)]).await {
            conn.close();
            return Err(e.into());
        }
    }

    let value = result.await;
    conn.close();
    Ok(PopupOutcome::from_value(&value?))
}

/// Resolve once the popup is gone.
async fn watch_closed<P: Platform>(platform: Rc<P>, child: P::Child, interval_ms: u32) {
    loop {
        if platform.is_closed(&child) {
            return;
        }
        platform.sleep(interval_ms).await;
    }
}
