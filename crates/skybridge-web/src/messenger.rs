//! `postMessage` transport between the page and one child window

use std::cell::RefCell;

use serde_json::Value;
use skybridge_hal::{MessageHandler, Messenger, TransportError};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{HtmlIFrameElement, MessageEvent, Window};

use crate::constants::{LOG_PREFIX, MESSAGE_EVENT, TARGET_ORIGIN};
use crate::util::{describe, from_js, log, to_js};

/// The window on the other side of a messenger.
#[derive(Clone, Debug)]
pub enum RemoteTarget {
    /// Resolved through `contentWindow` at every use; a frame waiting for
    /// `DOMContentLoaded` has no window yet
    Frame(HtmlIFrameElement),
    Popup(Window),
}

impl RemoteTarget {
    fn window(&self) -> Option<Window> {
        match self {
            RemoteTarget::Frame(frame) => frame.content_window(),
            RemoteTarget::Popup(popup) => Some(popup.clone()),
        }
    }

    /// Whether `event` was sent by this remote.
    fn sent(&self, event: &MessageEvent) -> bool {
        match (event.source(), self.window()) {
            (Some(source), Some(window)) => js_sys::Object::is(&source, window.as_ref()),
            _ => false,
        }
    }
}

/// Messenger posting to a child window and listening on our own window.
///
/// Every window's `message` event sees traffic from all children, so
/// incoming messages are filtered by `event.source`.
pub struct WindowMessenger {
    window: Window,
    remote: RemoteTarget,
    /// Keeps the listener alive while it is registered
    onmessage_closure: RefCell<Option<Closure<dyn FnMut(MessageEvent)>>>,
}

impl WindowMessenger {
    pub fn new(window: Window, remote: RemoteTarget) -> Self {
        Self {
            window,
            remote,
            onmessage_closure: RefCell::new(None),
        }
    }
}

impl Messenger for WindowMessenger {
    fn post(&self, message: Value) -> Result<(), TransportError> {
        let target = self
            .remote
            .window()
            .ok_or_else(|| TransportError("child window not available yet".to_string()))?;
        target
            .post_message(&to_js(&message), TARGET_ORIGIN)
            .map_err(|e| TransportError(describe(&e)))
    }

    fn listen(&self, mut handler: MessageHandler) {
        self.stop();

        let remote = self.remote.clone();
        let onmessage_closure = Closure::wrap(Box::new(move |event: MessageEvent| {
            if !remote.sent(&event) {
                return;
            }
            match from_js(&event.data()) {
                Ok(value) => handler(value),
                Err(e) => log(&format!("{} Dropping undecodable message: {}", LOG_PREFIX, e)),
            }
        }) as Box<dyn FnMut(MessageEvent)>);

        if let Err(e) = self
            .window
            .add_event_listener_with_callback(MESSAGE_EVENT, onmessage_closure.as_ref().unchecked_ref())
        {
            log(&format!("{} Failed to register listener: {}", LOG_PREFIX, describe(&e)));
            return;
        }
        *self.onmessage_closure.borrow_mut() = Some(onmessage_closure);
    }

    fn stop(&self) {
        let Some(onmessage_closure) = self.onmessage_closure.borrow_mut().take() else {
            return;
        };
        if let Err(e) = self.window.remove_event_listener_with_callback(
            MESSAGE_EVENT,
            onmessage_closure.as_ref().unchecked_ref(),
        ) {
            log(&format!("{} Failed to remove listener: {}", LOG_PREFIX, describe(&e)));
        }
        // The listener may be the one running right now
        wasm_bindgen_futures::spawn_local(async move {
            drop(onmessage_closure);
        });
    }
}

impl Drop for WindowMessenger {
    fn drop(&mut self) {
        self.stop();
    }
}
