//! Scripted remote contexts
//!
//! A [`RemoteEndpoint`] plays the script running inside a child context: it
//! answers handshakes, serves calls and pushes events. [`ScriptedEndpoint`]
//! is the general-purpose implementation tests configure method by method.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value;

use crate::messenger::EventSink;

/// Call handler registered on a [`ScriptedEndpoint`].
pub type CallHandler = Rc<dyn Fn(&[Value], &EventSink) -> Result<Value, String>>;

/// Hook run after a successful handshake.
pub type HandshakeHook = Rc<dyn Fn(&EventSink)>;

/// Behaviour of the script inside a simulated child context.
pub trait RemoteEndpoint {
    /// Called for every handshake request; `false` leaves it unanswered.
    fn handshake(&self) -> bool {
        true
    }

    /// Called once the handshake response has been delivered.
    fn on_handshake(&self, _events: &EventSink) {}

    /// Serve a call. `Err` is delivered as a remote rejection.
    fn handle_call(&self, method: &str, args: &[Value], events: &EventSink)
        -> Result<Value, String>;

    /// Whether responses wait for the next clock tick instead of arriving at once.
    fn defers_responses(&self) -> bool {
        false
    }
}

/// Endpoint configured with per-method closures.
#[derive(Default)]
pub struct ScriptedEndpoint {
    handlers: RefCell<HashMap<String, CallHandler>>,
    handshake_hooks: RefCell<Vec<HandshakeHook>>,
    refuse_handshake: Cell<bool>,
    defer_responses: Cell<bool>,
    handshake_requests: Cell<u32>,
    calls: RefCell<Vec<(String, Vec<Value>)>>,
    sink: RefCell<Option<EventSink>>,
}

impl ScriptedEndpoint {
    /// Create an endpoint that accepts handshakes and knows no methods.
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Serve `method` with `handler`, replacing any previous handler.
    pub fn on<F>(&self, method: &str, handler: F)
    where
        F: Fn(&[Value], &EventSink) -> Result<Value, String> + 'static,
    {
        self.handlers
            .borrow_mut()
            .insert(method.to_string(), Rc::new(handler));
    }

    /// Serve `method` with a fixed value.
    pub fn respond(&self, method: &str, value: Value) {
        self.on(method, move |_, _| Ok(value.clone()));
    }

    /// Reject `method` with a fixed message.
    pub fn reject(&self, method: &str, message: &str) {
        let message = message.to_string();
        self.on(method, move |_, _| Err(message.clone()));
    }

    /// Run `hook` after every accepted handshake.
    pub fn on_connect<F>(&self, hook: F)
    where
        F: Fn(&EventSink) + 'static,
    {
        self.handshake_hooks.borrow_mut().push(Rc::new(hook));
    }

    /// Never answer handshake requests.
    pub fn refuse_handshakes(&self) {
        self.refuse_handshake.set(true);
    }

    /// Hold responses until the next clock tick.
    pub fn defer(&self) {
        self.defer_responses.set(true);
    }

    /// Number of handshake requests received, answered or not.
    pub fn handshake_count(&self) -> u32 {
        self.handshake_requests.get()
    }

    /// All calls received, in order.
    pub fn calls(&self) -> Vec<(String, Vec<Value>)> {
        self.calls.borrow().clone()
    }

    /// Names of the methods called, in order.
    pub fn called_methods(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|(m, _)| m.clone()).collect()
    }

    /// Whether `method` has been called at least once.
    pub fn was_called(&self, method: &str) -> bool {
        self.calls.borrow().iter().any(|(m, _)| m == method)
    }

    /// Event sink of the most recent session, for pushing events from tests.
    pub fn events(&self) -> Option<EventSink> {
        self.sink.borrow().clone()
    }
}

impl RemoteEndpoint for ScriptedEndpoint {
    fn handshake(&self) -> bool {
        self.handshake_requests.set(self.handshake_requests.get() + 1);
        !self.refuse_handshake.get()
    }

    fn on_handshake(&self, events: &EventSink) {
        *self.sink.borrow_mut() = Some(events.clone());
        let hooks: Vec<HandshakeHook> = self.handshake_hooks.borrow().clone();
        for hook in hooks {
            hook(events);
        }
    }

    fn handle_call(
        &self,
        method: &str,
        args: &[Value],
        events: &EventSink,
    ) -> Result<Value, String> {
        self.calls
            .borrow_mut()
            .push((method.to_string(), args.to_vec()));
        let handler = self.handlers.borrow().get(method).cloned();
        match handler {
            Some(handler) => handler(args, events),
            None => Err(format!("Error: Unknown method '{}'", method)),
        }
    }

    fn defers_responses(&self) -> bool {
        self.defer_responses.get()
    }
}

/// What the next popup opened on the mock platform will contain.
#[derive(Clone)]
pub struct PopupScript {
    pub(crate) endpoint: Option<Rc<dyn RemoteEndpoint>>,
    pub(crate) dismissed: bool,
}

impl PopupScript {
    /// A popup whose page runs `endpoint`.
    pub fn answering(endpoint: Rc<dyn RemoteEndpoint>) -> Self {
        Self {
            endpoint: Some(endpoint),
            dismissed: false,
        }
    }

    /// A popup the user closes straight away.
    pub fn dismissed() -> Self {
        Self {
            endpoint: None,
            dismissed: true,
        }
    }

    /// A popup whose page never loads a script.
    pub fn silent() -> Self {
        Self {
            endpoint: None,
            dismissed: false,
        }
    }
}
