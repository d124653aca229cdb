//! In-memory messenger speaking the channel envelope on behalf of a
//! scripted remote.
//!
//! Handshake responses and call responses are delivered synchronously from
//! inside `post`. Events (and responses of endpoints that defer them) are
//! queued on the platform and delivered on the next clock tick, which is how
//! asynchronous pushes from a real child context behave.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use serde_json::{json, Value};
use skybridge_hal::{MessageHandler, Messenger, TransportError};

use crate::endpoint::RemoteEndpoint;
use crate::Shared;

pub(crate) struct MessengerState {
    child_id: u64,
    platform: Weak<Shared>,
    endpoint: Option<Rc<dyn RemoteEndpoint>>,
    listener: RefCell<Option<MessageHandler>>,
    stopped: Cell<bool>,
    delivering: Cell<bool>,
    backlog: RefCell<VecDeque<Value>>,
    posted: RefCell<Vec<Value>>,
}

impl MessengerState {
    fn deliver(&self, message: Value) {
        if self.stopped.get() {
            return;
        }
        // A listener posting from inside its own callback gets its replies
        // after the callback returns, in order.
        self.backlog.borrow_mut().push_back(message);
        if self.delivering.get() {
            return;
        }
        self.delivering.set(true);
        loop {
            let next = self.backlog.borrow_mut().pop_front();
            let Some(message) = next else {
                break;
            };
            if self.stopped.get() {
                self.backlog.borrow_mut().clear();
                break;
            }
            let listener = self.listener.borrow_mut().take();
            if let Some(mut listener) = listener {
                listener(message);
                let mut slot = self.listener.borrow_mut();
                if slot.is_none() && !self.stopped.get() {
                    *slot = Some(listener);
                }
            }
        }
        self.delivering.set(false);
    }

    fn schedule(self: &Rc<Self>, message: Value) {
        let Some(platform) = self.platform.upgrade() else {
            return;
        };
        let target = Rc::downgrade(self);
        platform.defer(Box::new(move || {
            if let Some(state) = target.upgrade() {
                state.deliver(message);
            }
        }));
    }
}

/// Pushes events from a scripted remote to the host side of one channel.
#[derive(Clone)]
pub struct EventSink {
    state: Weak<MessengerState>,
    session_id: String,
}

impl EventSink {
    /// Queue an event for delivery on the next clock tick.
    pub fn emit(&self, name: &str, payload: Value) {
        if let Some(state) = self.state.upgrade() {
            state.schedule(json!({
                "type": "event",
                "sessionId": self.session_id,
                "name": name,
                "payload": payload,
            }));
        }
    }

    /// Deliver an event immediately.
    pub fn emit_now(&self, name: &str, payload: Value) {
        if let Some(state) = self.state.upgrade() {
            state.deliver(json!({
                "type": "event",
                "sessionId": self.session_id,
                "name": name,
                "payload": payload,
            }));
        }
    }

    /// Session id of the channel this sink feeds.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

/// Host-side messenger for a mock child context.
pub struct MockMessenger {
    state: Rc<MessengerState>,
}

impl MockMessenger {
    pub(crate) fn new(
        child_id: u64,
        platform: Weak<Shared>,
        endpoint: Option<Rc<dyn RemoteEndpoint>>,
    ) -> Self {
        Self {
            state: Rc::new(MessengerState {
                child_id,
                platform,
                endpoint,
                listener: RefCell::new(None),
                stopped: Cell::new(false),
                delivering: Cell::new(false),
                backlog: RefCell::new(VecDeque::new()),
                posted: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Id of the child context this messenger talks to.
    pub fn child_id(&self) -> u64 {
        self.state.child_id
    }

    /// Every message posted so far.
    pub fn posted(&self) -> Vec<Value> {
        self.state.posted.borrow().clone()
    }

    /// Deliver a raw message as if the remote had sent it.
    pub fn inject(&self, message: Value) {
        self.state.deliver(message);
    }

    /// Whether `stop` has been called.
    pub fn is_stopped(&self) -> bool {
        self.state.stopped.get()
    }

    fn sink(&self, session_id: &str) -> EventSink {
        EventSink {
            state: Rc::downgrade(&self.state),
            session_id: session_id.to_string(),
        }
    }

    fn handle_handshake(&self, endpoint: &Rc<dyn RemoteEndpoint>, message: &Value) {
        let session_id = message["sessionId"].as_str().unwrap_or_default().to_string();
        if !endpoint.handshake() {
            return;
        }
        self.state.deliver(json!({
            "type": "handshake-response",
            "sessionId": session_id,
        }));
        endpoint.on_handshake(&self.sink(&session_id));
    }

    fn handle_call(&self, endpoint: &Rc<dyn RemoteEndpoint>, message: &Value) {
        let session_id = message["sessionId"].as_str().unwrap_or_default().to_string();
        let request_id = message["requestId"].clone();
        let method = message["method"].as_str().unwrap_or_default().to_string();
        let args = match &message["args"] {
            Value::Array(args) => args.clone(),
            _ => Vec::new(),
        };

        let sink = self.sink(&session_id);
        let response = match endpoint.handle_call(&method, &args, &sink) {
            Ok(result) => json!({
                "type": "response",
                "sessionId": session_id,
                "requestId": request_id,
                "result": result,
            }),
            Err(error) => json!({
                "type": "response",
                "sessionId": session_id,
                "requestId": request_id,
                "error": error,
            }),
        };

        if endpoint.defers_responses() {
            self.state.schedule(response);
        } else {
            self.state.deliver(response);
        }
    }
}

impl Messenger for MockMessenger {
    fn post(&self, message: Value) -> Result<(), TransportError> {
        if self.state.stopped.get() {
            return Err(TransportError("messenger stopped".to_string()));
        }
        self.state.posted.borrow_mut().push(message.clone());

        let Some(endpoint) = self.state.endpoint.clone() else {
            return Ok(());
        };

        match message["type"].as_str() {
            Some("handshake-request") => self.handle_handshake(&endpoint, &message),
            Some("call") => self.handle_call(&endpoint, &message),
            _ => {}
        }
        Ok(())
    }

    fn listen(&self, handler: MessageHandler) {
        *self.state.listener.borrow_mut() = Some(handler);
    }

    fn stop(&self) {
        self.state.stopped.set(true);
        self.state.listener.borrow_mut().take();
    }
}
