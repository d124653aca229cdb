//! Browser tests
//!
//! Run with `wasm-pack test --headless --chrome crates/skybridge-web`.

#![cfg(target_arch = "wasm32")]

use serde_json::json;
use skybridge_hal::{ChildContextFactory, Messenger, Platform};
use skybridge_web::{WebChild, WebPlatform};
use wasm_bindgen::JsCast;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

fn document() -> web_sys::Document {
    web_sys::window().unwrap().document().unwrap()
}

#[wasm_bindgen_test]
fn test_embedded_frame_is_hidden_and_named() {
    let platform = WebPlatform::new().unwrap();

    let child = platform
        .open_embedded("https://bridge.example/", "skybridge-test")
        .unwrap();

    let frame = match &child {
        WebChild::Frame(frame) => frame.clone(),
        WebChild::Popup(_) => panic!("expected a frame"),
    };
    assert_eq!(frame.name(), "skybridge-test");
    assert_eq!(frame.style().get_property_value("display").unwrap(), "none");
    let found = document()
        .get_elements_by_name("skybridge-test")
        .get(0)
        .unwrap();
    assert!(found.dyn_ref::<web_sys::HtmlIFrameElement>().is_some());
    assert!(!platform.is_closed(&child));

    platform.remove_child(&child);
    assert!(document().get_elements_by_name("skybridge-test").get(0).is_none());
}

#[wasm_bindgen_test]
async fn test_sleep_resolves() {
    let platform = WebPlatform::new().unwrap();
    platform.sleep(5).await;
}

#[wasm_bindgen_test]
fn test_post_to_attached_frame() {
    let platform = WebPlatform::new().unwrap();
    let child = platform.open_embedded("about:blank", "skybridge-post").unwrap();
    let messenger = platform.messenger(&child).unwrap();

    messenger
        .post(json!({"type": "handshake-request", "sessionId": "s1"}))
        .unwrap();

    messenger.stop();
    platform.remove_child(&child);
}

#[wasm_bindgen_test]
fn test_hostname_is_available() {
    let platform = WebPlatform::new().unwrap();
    assert!(!platform.hostname().is_empty());
}
