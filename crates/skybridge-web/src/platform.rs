//! Browser implementation of the platform traits
//!
//! - Embedded contexts are hidden `<iframe>`s appended to `document.body`
//! - Popups are `window.open` windows centered on the opener
//! - Timers are `setTimeout` promises

use futures::future::LocalBoxFuture;
use skybridge_hal::{
    ChildContextError, ChildContextFactory, Platform, PopupGeometry, ScreenMetrics,
};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Document, HtmlIFrameElement, Window};

use crate::constants::{DOM_CONTENT_LOADED_EVENT, IFRAME_TAG, LOG_PREFIX};
use crate::messenger::{RemoteTarget, WindowMessenger};
use crate::util::{describe, log};

/// A child context created by [`WebPlatform`].
#[derive(Clone, Debug)]
pub enum WebChild {
    /// Hidden bridge frame
    Frame(HtmlIFrameElement),
    /// Router or connector window
    Popup(Window),
}

/// Platform backed by the page's `window` and `document`.
pub struct WebPlatform {
    window: Window,
    document: Document,
}

impl WebPlatform {
    /// Bind to the current page.
    ///
    /// Fails outside a window context, or when the browser exposes no web
    /// storage: the bridge persists the chosen provider there, so nothing
    /// would survive a reload.
    pub fn new() -> Result<Self, ChildContextError> {
        let window = web_sys::window()
            .ok_or_else(|| ChildContextError::Unavailable("no window".to_string()))?;
        let document = window
            .document()
            .ok_or_else(|| ChildContextError::Unavailable("no document".to_string()))?;

        match window.local_storage() {
            Ok(Some(_)) => {}
            _ => {
                return Err(ChildContextError::Unavailable(
                    "Browser does not support web storage".to_string(),
                ))
            }
        }

        Ok(Self { window, document })
    }

    /// Host name of the page, used as the skapp domain.
    pub fn hostname(&self) -> String {
        self.window.location().hostname().unwrap_or_default()
    }

    fn screen_metrics(&self) -> ScreenMetrics {
        let window = &self.window;
        let number = |value: Result<JsValue, JsValue>| value.ok().and_then(|v| v.as_f64());
        let screen = window.screen().ok();
        let screen_width = screen
            .as_ref()
            .and_then(|s| s.width().ok())
            .map(f64::from);
        let screen_height = screen
            .as_ref()
            .and_then(|s| s.height().ok())
            .map(f64::from);
        let root = self.document.document_element();

        ScreenMetrics {
            screen_left: number(js_sys::Reflect::get(window, &JsValue::from_str("screenLeft")))
                .or_else(|| number(window.screen_x()))
                .unwrap_or(0.0),
            screen_top: number(js_sys::Reflect::get(window, &JsValue::from_str("screenTop")))
                .or_else(|| number(window.screen_y()))
                .unwrap_or(0.0),
            viewport_width: number(window.inner_width())
                .or_else(|| root.as_ref().map(|r| f64::from(r.client_width())))
                .or(screen_width)
                .unwrap_or(0.0),
            viewport_height: number(window.inner_height())
                .or_else(|| root.as_ref().map(|r| f64::from(r.client_height())))
                .or(screen_height)
                .unwrap_or(0.0),
            avail_width: screen
                .as_ref()
                .and_then(|s| s.avail_width().ok())
                .map(f64::from)
                .unwrap_or(0.0),
        }
    }

    /// Append `frame` to the body now, or once the document has one.
    fn attach(&self, frame: &HtmlIFrameElement) -> Result<(), ChildContextError> {
        if let Some(body) = self.document.body() {
            body.append_child(frame)
                .map_err(|e| ChildContextError::Unavailable(describe(&e)))?;
            return Ok(());
        }

        let document = self.document.clone();
        let frame = frame.clone();
        let on_ready = Closure::once_into_js(move || match document.body() {
            Some(body) => {
                if let Err(e) = body.append_child(&frame) {
                    log(&format!("{} Failed to attach frame: {}", LOG_PREFIX, describe(&e)));
                }
            }
            None => log(&format!("{} Document has no body, frame not attached", LOG_PREFIX)),
        });
        self.document
            .add_event_listener_with_callback(DOM_CONTENT_LOADED_EVENT, on_ready.unchecked_ref())
            .map_err(|e| ChildContextError::Unavailable(describe(&e)))
    }
}

impl ChildContextFactory for WebPlatform {
    type Child = WebChild;
    type Messenger = WindowMessenger;

    fn open_embedded(&self, url: &str, name: &str) -> Result<WebChild, ChildContextError> {
        let frame: HtmlIFrameElement = self
            .document
            .create_element(IFRAME_TAG)
            .map_err(|e| ChildContextError::Unavailable(describe(&e)))?
            .dyn_into()
            .map_err(|_| ChildContextError::Unavailable("not an iframe element".to_string()))?;

        frame.set_src(url);
        frame.set_name(name);
        frame
            .style()
            .set_property("display", "none")
            .map_err(|e| ChildContextError::Unavailable(describe(&e)))?;

        self.attach(&frame)?;
        Ok(WebChild::Frame(frame))
    }

    fn open_popup(
        &self,
        url: &str,
        title: &str,
        width: u32,
        height: u32,
    ) -> Result<WebChild, ChildContextError> {
        let geometry = PopupGeometry::centered(&self.screen_metrics(), width, height);
        let popup = self
            .window
            .open_with_url_and_target_and_features(url, title, &geometry.to_features())
            .map_err(|_| ChildContextError::Blocked)?
            .ok_or(ChildContextError::Blocked)?;

        if let Err(e) = popup.focus() {
            log(&format!("{} Could not focus popup: {}", LOG_PREFIX, describe(&e)));
        }
        Ok(WebChild::Popup(popup))
    }

    fn remove_child(&self, child: &WebChild) {
        match child {
            WebChild::Frame(frame) => frame.remove(),
            WebChild::Popup(popup) => {
                if let Err(e) = popup.close() {
                    log(&format!("{} Could not close popup: {}", LOG_PREFIX, describe(&e)));
                }
            }
        }
    }

    fn is_closed(&self, child: &WebChild) -> bool {
        match child {
            // Frames only go away through remove_child
            WebChild::Frame(_) => false,
            WebChild::Popup(popup) => popup.closed().unwrap_or(true),
        }
    }

    fn messenger(&self, child: &WebChild) -> Result<WindowMessenger, ChildContextError> {
        let remote = match child {
            WebChild::Frame(frame) => RemoteTarget::Frame(frame.clone()),
            WebChild::Popup(popup) => RemoteTarget::Popup(popup.clone()),
        };
        Ok(WindowMessenger::new(self.window.clone(), remote))
    }
}

impl Platform for WebPlatform {
    fn sleep(&self, millis: u32) -> LocalBoxFuture<'static, ()> {
        let window = self.window.clone();
        let timeout = i32::try_from(millis).unwrap_or(i32::MAX);
        Box::pin(async move {
            let promise = js_sys::Promise::new(&mut |resolve, _reject| {
                if let Err(e) =
                    window.set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, timeout)
                {
                    log(&format!("{} setTimeout failed: {}", LOG_PREFIX, describe(&e)));
                    let _ = resolve.call0(&JsValue::NULL);
                }
            });
            let _ = JsFuture::from(promise).await;
        })
    }

    fn debug_write(&self, msg: &str) {
        log(msg);
    }
}
