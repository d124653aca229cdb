//! Established channel to one child context.

use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll};

use futures::channel::oneshot;
use futures::future::{select, Either};
use futures::FutureExt;
use serde_json::Value;
use skybridge_hal::{Messenger, Platform, TransportError};

use crate::error::ChannelError;
use crate::protocol::{error_message, Envelope};
use crate::HandshakeOptions;

/// Handle returned by [`Connection::add_event_listener`].
pub type ListenerId = u64;

type CallSender = oneshot::Sender<Result<Value, ChannelError>>;

enum Listener {
    Persistent(Rc<dyn Fn(&Value)>),
    Once(oneshot::Sender<Value>),
}

struct ListenerEntry {
    id: ListenerId,
    event: String,
    listener: Listener,
}

#[derive(Default)]
struct State {
    closed: bool,
    next_request_id: u64,
    next_listener_id: ListenerId,
    pending: HashMap<u64, CallSender>,
    listeners: Vec<ListenerEntry>,
    handshake: Option<oneshot::Sender<()>>,
}

struct Inner<M> {
    session_id: String,
    messenger: M,
    log: Box<dyn Fn(&str)>,
    state: RefCell<State>,
}

impl<M: Messenger> Inner<M> {
    fn post(&self, envelope: &Envelope) -> Result<(), TransportError> {
        let message = serde_json::to_value(envelope).map_err(|e| TransportError(e.to_string()))?;
        self.messenger.post(message)
    }

    fn dispatch(&self, message: Value) {
        let envelope = match serde_json::from_value::<Envelope>(message) {
            Ok(envelope) => envelope,
            Err(e) => {
                (self.log)(&format!("[channel] Ignoring malformed message: {}", e));
                return;
            }
        };
        if envelope.session_id() != self.session_id {
            (self.log)(&format!(
                "[channel] Ignoring message for session {}",
                envelope.session_id()
            ));
            return;
        }

        match envelope {
            Envelope::HandshakeResponse { .. } => {
                let waiter = self.state.borrow_mut().handshake.take();
                if let Some(tx) = waiter {
                    let _ = tx.send(());
                }
            }
            Envelope::Response {
                request_id,
                result,
                error,
                ..
            } => {
                let waiter = self.state.borrow_mut().pending.remove(&request_id);
                let Some(tx) = waiter else {
                    (self.log)(&format!(
                        "[channel] Response for unknown request #{}",
                        request_id
                    ));
                    return;
                };
                let outcome = match error {
                    Some(error) => Err(ChannelError::Remote(error_message(&error))),
                    None => Ok(result.unwrap_or(Value::Null)),
                };
                let _ = tx.send(outcome);
            }
            Envelope::Event { name, payload, .. } => self.emit(&name, payload),
            Envelope::HandshakeRequest { .. } | Envelope::Call { .. } => {
                (self.log)("[channel] Ignoring request from remote");
            }
        }
    }

    fn emit(&self, name: &str, payload: Value) {
        // Handlers run with the state released so they may call back into the
        // connection.
        let mut handlers = Vec::new();
        let mut once = Vec::new();
        {
            let mut state = self.state.borrow_mut();
            let mut kept = Vec::with_capacity(state.listeners.len());
            for entry in state.listeners.drain(..) {
                if entry.event != name {
                    kept.push(entry);
                    continue;
                }
                match entry.listener {
                    Listener::Persistent(handler) => {
                        handlers.push(handler.clone());
                        kept.push(ListenerEntry {
                            id: entry.id,
                            event: entry.event,
                            listener: Listener::Persistent(handler),
                        });
                    }
                    Listener::Once(tx) => once.push(tx),
                }
            }
            state.listeners = kept;
        }

        if handlers.is_empty() && once.is_empty() {
            (self.log)(&format!("[channel] No listener for event '{}'", name));
            return;
        }
        for handler in handlers {
            handler(&payload);
        }
        for tx in once {
            let _ = tx.send(payload.clone());
        }
    }
}

/// Established channel to a child context.
///
/// Cheap to clone; all clones share the same session.
pub struct Connection<M: Messenger> {
    inner: Rc<Inner<M>>,
}

impl<M: Messenger> Clone for Connection<M> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<M: Messenger> Connection<M> {
    /// Handshake with the script behind `messenger`.
    ///
    /// Sends a handshake request and waits `retry_interval_ms` for the
    /// answer, up to `max_attempts` times. A fresh session id scopes every
    /// message of the connection.
    pub async fn establish<P: Platform>(
        platform: Rc<P>,
        messenger: M,
        options: HandshakeOptions,
    ) -> Result<Self, ChannelError> {
        let log_platform = platform.clone();
        let inner = Rc::new(Inner {
            session_id: uuid::Uuid::new_v4().to_string(),
            messenger,
            log: Box::new(move |msg| log_platform.debug_write(msg)),
            state: RefCell::new(State::default()),
        });

        let weak: Weak<Inner<M>> = Rc::downgrade(&inner);
        inner.messenger.listen(Box::new(move |message| {
            if let Some(inner) = weak.upgrade() {
                inner.dispatch(message);
            }
        }));

        let request = Envelope::HandshakeRequest {
            session_id: inner.session_id.clone(),
        };
        for attempt in 1..=options.max_attempts {
            let (tx, rx) = oneshot::channel();
            inner.state.borrow_mut().handshake = Some(tx);

            // The remote may not be listening yet; the next attempt retries.
            if let Err(e) = inner.post(&request) {
                (inner.log)(&format!("[channel] Handshake attempt {}: {}", attempt, e));
            }

            let timer = platform.sleep(options.retry_interval_ms);
            if let Either::Left((Ok(()), _)) = select(rx, timer).await {
                (inner.log)(&format!(
                    "[channel] Session {} established after {} attempt(s)",
                    inner.session_id, attempt
                ));
                return Ok(Self { inner });
            }
        }

        inner.state.borrow_mut().handshake = None;
        inner.messenger.stop();
        (inner.log)(&format!(
            "[channel] Handshake failed after {} attempts",
            options.max_attempts
        ));
        Err(ChannelError::Handshake {
            attempts: options.max_attempts,
        })
    }

    /// Session id carried by every message of this connection.
    pub fn session_id(&self) -> &str {
        &self.inner.session_id
    }

    /// Underlying messenger.
    pub fn messenger(&self) -> &M {
        &self.inner.messenger
    }

    pub fn is_closed(&self) -> bool {
        self.inner.state.borrow().closed
    }

    /// Invoke `method` on the remote.
    ///
    /// # Returns
    /// * `Ok(Value)` - The remote's result (`null` when it returned nothing)
    /// * `Err(ChannelError::Remote)` - The remote rejected the call
    /// * `Err(ChannelError::Closed)` - The connection is closed
    pub async fn call(&self, method: &str, args: Vec<Value>) -> Result<Value, ChannelError> {
        let (request_id, rx) = {
            let mut state = self.inner.state.borrow_mut();
            if state.closed {
                return Err(ChannelError::Closed);
            }
            let request_id = state.next_request_id;
            state.next_request_id += 1;
            let (tx, rx) = oneshot::channel();
            state.pending.insert(request_id, tx);
            (request_id, rx)
        };

        let envelope = Envelope::Call {
            session_id: self.inner.session_id.clone(),
            request_id,
            method: method.to_string(),
            args,
        };
        if let Err(e) = self.inner.post(&envelope) {
            self.inner.state.borrow_mut().pending.remove(&request_id);
            return Err(e.into());
        }

        match rx.await {
            Ok(outcome) => outcome,
            Err(oneshot::Canceled) => Err(ChannelError::Closed),
        }
    }

    /// Run `handler` for every `event` pushed by the remote.
    pub fn add_event_listener<F>(&self, event: &str, handler: F) -> ListenerId
    where
        F: Fn(&Value) + 'static,
    {
        self.register(event, Listener::Persistent(Rc::new(handler)))
    }

    pub fn remove_event_listener(&self, id: ListenerId) {
        self.inner
            .state
            .borrow_mut()
            .listeners
            .retain(|entry| entry.id != id);
    }

    /// Resolve with the payload of the next `event`.
    ///
    /// The registration is dropped on the first match. The future fails with
    /// [`ChannelError::Closed`] if the connection closes first.
    pub fn once(&self, event: &str) -> EventFuture {
        if self.is_closed() {
            return EventFuture { receiver: None };
        }
        let (tx, rx) = oneshot::channel();
        self.register(event, Listener::Once(tx));
        EventFuture { receiver: Some(rx) }
    }

    fn register(&self, event: &str, listener: Listener) -> ListenerId {
        let mut state = self.inner.state.borrow_mut();
        // Abandoned one-shot registrations
        state.listeners.retain(|entry| match &entry.listener {
            Listener::Once(tx) => !tx.is_canceled(),
            Listener::Persistent(_) => true,
        });
        let id = state.next_listener_id;
        state.next_listener_id += 1;
        if !state.closed {
            state.listeners.push(ListenerEntry {
                id,
                event: event.to_string(),
                listener,
            });
        }
        id
    }

    /// Stop the messenger and drop every listener.
    ///
    /// Calls still waiting for a response are not settled.
    pub fn close(&self) {
        let listeners = {
            let mut state = self.inner.state.borrow_mut();
            if state.closed {
                return;
            }
            state.closed = true;
            state.handshake = None;
            std::mem::take(&mut state.listeners)
        };
        drop(listeners);
        self.inner.messenger.stop();
        (self.inner.log)(&format!("[channel] Session {} closed", self.inner.session_id));
    }
}

/// One-shot event registration, see [`Connection::once`].
pub struct EventFuture {
    receiver: Option<oneshot::Receiver<Value>>,
}

impl Future for EventFuture {
    type Output = Result<Value, ChannelError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.receiver.as_mut() {
            None => Poll::Ready(Err(ChannelError::Closed)),
            Some(rx) => rx
                .poll_unpin(cx)
                .map(|received| received.map_err(|_| ChannelError::Closed)),
        }
    }
}
