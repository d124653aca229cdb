//! Skybridge for the browser
//!
//! Implements the platform traits on top of the DOM and exports
//! [`BridgeClient`] to JavaScript:
//!
//! - [`WebPlatform`]: hidden bridge `<iframe>`, centered `window.open` popups,
//!   `setTimeout` sleeps, `console.log` output
//! - [`WindowMessenger`]: `postMessage` transport filtered by source window
//! - [`JsHooks`]: UI hooks backed by a plain JavaScript object

mod client;
mod constants;
mod hooks;
mod messenger;
mod platform;
mod util;

pub use client::BridgeClient;
pub use hooks::JsHooks;
pub use messenger::{RemoteTarget, WindowMessenger};
pub use platform::{WebChild, WebPlatform};
