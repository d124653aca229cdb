//! Mock platform implementation for testing Skybridge
//!
//! This provides a mock implementation of the platform traits that can be
//! used for unit testing the channel, gate and session layers without a
//! browser.
//!
//! - Child contexts are records; the bridge frame and each popup can be bound
//!   to a scripted [`RemoteEndpoint`]
//! - Time is virtual: `sleep` advances the clock, delivers queued events and
//!   yields exactly once, so retry loops and popup polling make progress
//!   under `futures::executor::block_on`
//! - Debug output is captured for assertions

mod endpoint;
mod messenger;

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll};

use futures::future::LocalBoxFuture;
use skybridge_hal::{ChildContextError, ChildContextFactory, Platform};

pub use endpoint::{CallHandler, HandshakeHook, PopupScript, RemoteEndpoint, ScriptedEndpoint};
pub use messenger::{EventSink, MockMessenger};

type Deferred = Box<dyn FnOnce()>;

/// Kind of a simulated child context
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChildKind {
    Embedded,
    Popup,
}

/// Handle to a simulated child context
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MockChild {
    pub id: u64,
}

/// Everything the mock platform remembers about a child context
#[derive(Clone, Debug)]
pub struct ChildRecord {
    pub id: u64,
    pub kind: ChildKind,
    pub url: String,
    /// Frame name for embedded contexts, window title for popups
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// Removed by the client (`remove_child`)
    pub removed: bool,
    /// Closed by the simulated user
    pub dismissed: bool,
}

pub(crate) struct Shared {
    now_ms: Cell<u64>,
    debug_log: RefCell<Vec<String>>,
    next_child_id: Cell<u64>,
    children: RefCell<Vec<ChildRecord>>,
    endpoints: RefCell<Vec<(u64, Rc<dyn RemoteEndpoint>)>>,
    bridge: RefCell<Option<Rc<dyn RemoteEndpoint>>>,
    popup_scripts: RefCell<VecDeque<PopupScript>>,
    popup_blocked: Cell<bool>,
    deferred: RefCell<VecDeque<Deferred>>,
}

impl Shared {
    pub(crate) fn defer(&self, task: Deferred) {
        self.deferred.borrow_mut().push_back(task);
    }

    fn flush(&self) {
        loop {
            let next = self.deferred.borrow_mut().pop_front();
            match next {
                Some(task) => task(),
                None => break,
            }
        }
    }

    fn record(&self, id: u64) -> Option<ChildRecord> {
        self.children.borrow().iter().find(|c| c.id == id).cloned()
    }

    fn update(&self, id: u64, f: impl FnOnce(&mut ChildRecord)) {
        if let Some(record) = self.children.borrow_mut().iter_mut().find(|c| c.id == id) {
            f(record);
        }
    }

    fn log(&self, msg: String) {
        self.debug_log.borrow_mut().push(msg);
    }
}

/// Mock platform for unit testing
///
/// Cheap to clone; clones share the same simulated page.
#[derive(Clone)]
pub struct MockPlatform {
    shared: Rc<Shared>,
}

impl MockPlatform {
    /// Create a mock platform with no bridge script and no popup scripts
    pub fn new() -> Self {
        Self {
            shared: Rc::new(Shared {
                now_ms: Cell::new(0),
                debug_log: RefCell::new(Vec::new()),
                next_child_id: Cell::new(1),
                children: RefCell::new(Vec::new()),
                endpoints: RefCell::new(Vec::new()),
                bridge: RefCell::new(None),
                popup_scripts: RefCell::new(VecDeque::new()),
                popup_blocked: Cell::new(false),
                deferred: RefCell::new(VecDeque::new()),
            }),
        }
    }

    /// Create a mock platform whose embedded frames run `bridge`
    pub fn with_bridge(bridge: Rc<dyn RemoteEndpoint>) -> Self {
        let platform = Self::new();
        platform.set_bridge(bridge);
        platform
    }

    /// Script run by every embedded frame opened from now on
    pub fn set_bridge(&self, bridge: Rc<dyn RemoteEndpoint>) {
        *self.shared.bridge.borrow_mut() = Some(bridge);
    }

    /// Queue the contents of the next popup
    pub fn push_popup(&self, script: PopupScript) {
        self.shared.popup_scripts.borrow_mut().push_back(script);
    }

    /// Make `open_popup` fail as if a popup blocker were active
    pub fn set_popup_blocked(&self, blocked: bool) {
        self.shared.popup_blocked.set(blocked);
    }

    /// Simulate the user closing a child window
    pub fn dismiss(&self, id: u64) {
        self.shared.update(id, |record| record.dismissed = true);
    }

    /// Deliver every queued event without advancing the clock
    pub fn flush(&self) {
        self.shared.flush();
    }

    /// Virtual time in milliseconds
    pub fn now_ms(&self) -> u64 {
        self.shared.now_ms.get()
    }

    /// All child contexts ever opened, in order
    pub fn children(&self) -> Vec<ChildRecord> {
        self.shared.children.borrow().clone()
    }

    /// Embedded contexts ever opened, in order
    pub fn embedded(&self) -> Vec<ChildRecord> {
        self.children()
            .into_iter()
            .filter(|c| c.kind == ChildKind::Embedded)
            .collect()
    }

    /// Popups ever opened, in order
    pub fn popups(&self) -> Vec<ChildRecord> {
        self.children()
            .into_iter()
            .filter(|c| c.kind == ChildKind::Popup)
            .collect()
    }

    /// Number of children not yet removed
    pub fn live_child_count(&self) -> usize {
        self.shared
            .children
            .borrow()
            .iter()
            .filter(|c| !c.removed)
            .count()
    }

    /// Get all captured debug messages
    pub fn get_debug_log(&self) -> Vec<String> {
        self.shared.debug_log.borrow().clone()
    }

    /// Check if a specific message was logged
    pub fn has_log_containing(&self, substr: &str) -> bool {
        self.shared
            .debug_log
            .borrow()
            .iter()
            .any(|msg| msg.contains(substr))
    }

    fn open(&self, kind: ChildKind, url: &str, name: &str, width: u32, height: u32) -> MockChild {
        let id = self.shared.next_child_id.get();
        self.shared.next_child_id.set(id + 1);
        self.shared.children.borrow_mut().push(ChildRecord {
            id,
            kind,
            url: url.to_string(),
            name: name.to_string(),
            width,
            height,
            removed: false,
            dismissed: false,
        });
        MockChild { id }
    }
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl ChildContextFactory for MockPlatform {
    type Child = MockChild;
    type Messenger = MockMessenger;

    fn open_embedded(&self, url: &str, name: &str) -> Result<MockChild, ChildContextError> {
        let child = self.open(ChildKind::Embedded, url, name, 0, 0);
        let bridge = self.shared.bridge.borrow().clone();
        if let Some(bridge) = bridge {
            self.shared.endpoints.borrow_mut().push((child.id, bridge));
        }
        self.shared
            .log(format!("[mock-hal] Embedded frame {} '{}' -> {}", child.id, name, url));
        Ok(child)
    }

    fn open_popup(
        &self,
        url: &str,
        title: &str,
        width: u32,
        height: u32,
    ) -> Result<MockChild, ChildContextError> {
        if self.shared.popup_blocked.get() {
            return Err(ChildContextError::Blocked);
        }
        let script = self
            .shared
            .popup_scripts
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(PopupScript::silent);

        let child = self.open(ChildKind::Popup, url, title, width, height);
        if let Some(endpoint) = script.endpoint {
            self.shared.endpoints.borrow_mut().push((child.id, endpoint));
        }
        if script.dismissed {
            self.dismiss(child.id);
        }
        self.shared.log(format!(
            "[mock-hal] Popup {} '{}' {}x{} -> {}",
            child.id, title, width, height, url
        ));
        Ok(child)
    }

    fn remove_child(&self, child: &MockChild) {
        self.shared.update(child.id, |record| record.removed = true);
        self.shared.log(format!("[mock-hal] Removed child {}", child.id));
    }

    fn is_closed(&self, child: &MockChild) -> bool {
        self.shared
            .record(child.id)
            .map(|record| record.removed || record.dismissed)
            .unwrap_or(true)
    }

    fn messenger(&self, child: &MockChild) -> Result<MockMessenger, ChildContextError> {
        match self.shared.record(child.id) {
            Some(record) if !record.removed => {}
            _ => {
                return Err(ChildContextError::Unavailable(format!(
                    "child {} is gone",
                    child.id
                )))
            }
        }
        let endpoint = self
            .shared
            .endpoints
            .borrow()
            .iter()
            .find(|(id, _)| *id == child.id)
            .map(|(_, endpoint)| endpoint.clone());
        Ok(MockMessenger::new(
            child.id,
            Rc::downgrade(&self.shared),
            endpoint,
        ))
    }
}

impl Platform for MockPlatform {
    fn sleep(&self, millis: u32) -> LocalBoxFuture<'static, ()> {
        Box::pin(Tick {
            shared: Rc::downgrade(&self.shared),
            millis,
            fired: false,
        })
    }

    fn debug_write(&self, msg: &str) {
        self.shared.log(msg.to_string());
    }
}

/// Virtual timer: the first poll advances the clock, delivers queued events
/// and yields; the second poll completes.
struct Tick {
    shared: Weak<Shared>,
    millis: u32,
    fired: bool,
}

impl Future for Tick {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.fired {
            return Poll::Ready(());
        }
        self.fired = true;
        if let Some(shared) = self.shared.upgrade() {
            shared.now_ms.set(shared.now_ms.get() + u64::from(self.millis));
            shared.flush();
        }
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use serde_json::{json, Value};
    use skybridge_hal::Messenger;
    use std::cell::RefCell;

    fn collect(messenger: &MockMessenger) -> Rc<RefCell<Vec<Value>>> {
        let received = Rc::new(RefCell::new(Vec::new()));
        let sink = received.clone();
        messenger.listen(Box::new(move |msg| sink.borrow_mut().push(msg)));
        received
    }

    #[test]
    fn test_mock_platform_time() {
        let platform = MockPlatform::new();
        assert_eq!(platform.now_ms(), 0);

        block_on(platform.sleep(100));
        block_on(platform.sleep(250));

        assert_eq!(platform.now_ms(), 350);
    }

    #[test]
    fn test_mock_platform_debug_log() {
        let platform = MockPlatform::new();

        platform.debug_write("Hello");
        platform.debug_write("World");

        let log = platform.get_debug_log();
        assert_eq!(log, vec!["Hello".to_string(), "World".to_string()]);
        assert!(platform.has_log_containing("Hello"));
        assert!(!platform.has_log_containing("Foo"));
    }

    #[test]
    fn test_open_and_remove_children() {
        let platform = MockPlatform::new();

        let frame = platform.open_embedded("https://bridge", "frame-1").unwrap();
        let popup = platform.open_popup("https://router", "Router", 500, 600).unwrap();

        assert_eq!(platform.embedded().len(), 1);
        assert_eq!(platform.popups()[0].width, 500);
        assert_eq!(platform.live_child_count(), 2);
        assert!(!platform.is_closed(&frame));

        platform.remove_child(&popup);
        assert!(platform.is_closed(&popup));
        assert_eq!(platform.live_child_count(), 1);
        assert!(platform.messenger(&popup).is_err());
    }

    #[test]
    fn test_blocked_popup() {
        let platform = MockPlatform::new();
        platform.set_popup_blocked(true);

        assert_eq!(
            platform.open_popup("https://router", "Router", 1, 1),
            Err(ChildContextError::Blocked)
        );
        assert!(platform.popups().is_empty());
    }

    #[test]
    fn test_dismissed_popup_is_closed() {
        let platform = MockPlatform::new();
        platform.push_popup(PopupScript::dismissed());

        let popup = platform.open_popup("https://router", "Router", 1, 1).unwrap();

        assert!(platform.is_closed(&popup));
    }

    #[test]
    fn test_handshake_and_call_are_answered_synchronously() {
        let bridge = ScriptedEndpoint::new();
        bridge.respond("ping", json!("pong"));
        let platform = MockPlatform::with_bridge(bridge.clone());
        let frame = platform.open_embedded("https://bridge", "frame").unwrap();
        let messenger = platform.messenger(&frame).unwrap();
        let received = collect(&messenger);

        messenger
            .post(json!({"type": "handshake-request", "sessionId": "s1"}))
            .unwrap();
        messenger
            .post(json!({"type": "call", "sessionId": "s1", "requestId": 7, "method": "ping", "args": []}))
            .unwrap();

        let received = received.borrow();
        assert_eq!(received.len(), 2);
        assert_eq!(received[0]["type"], "handshake-response");
        assert_eq!(received[1]["requestId"], 7);
        assert_eq!(received[1]["result"], "pong");
        assert_eq!(bridge.called_methods(), vec!["ping".to_string()]);
    }

    #[test]
    fn test_events_wait_for_a_tick() {
        let bridge = ScriptedEndpoint::new();
        bridge.on_connect(|events| events.emit("hello", json!(1)));
        let platform = MockPlatform::with_bridge(bridge);
        let frame = platform.open_embedded("https://bridge", "frame").unwrap();
        let messenger = platform.messenger(&frame).unwrap();
        let received = collect(&messenger);

        messenger
            .post(json!({"type": "handshake-request", "sessionId": "s1"}))
            .unwrap();
        assert_eq!(received.borrow().len(), 1);

        block_on(platform.sleep(10));
        assert_eq!(received.borrow().len(), 2);
        assert_eq!(received.borrow()[1]["name"], "hello");
    }

    #[test]
    fn test_refused_handshake_is_counted_but_unanswered() {
        let bridge = ScriptedEndpoint::new();
        bridge.refuse_handshakes();
        let platform = MockPlatform::with_bridge(bridge.clone());
        let frame = platform.open_embedded("https://bridge", "frame").unwrap();
        let messenger = platform.messenger(&frame).unwrap();
        let received = collect(&messenger);

        messenger
            .post(json!({"type": "handshake-request", "sessionId": "s1"}))
            .unwrap();

        assert!(received.borrow().is_empty());
        assert_eq!(bridge.handshake_count(), 1);
    }

    #[test]
    fn test_stopped_messenger_rejects_posts() {
        let platform = MockPlatform::new();
        let frame = platform.open_embedded("https://bridge", "frame").unwrap();
        let messenger = platform.messenger(&frame).unwrap();

        messenger.stop();

        assert!(messenger.is_stopped());
        assert!(messenger.post(json!({})).is_err());
    }
}
