//! Skybridge session layer
//!
//! [`SkappSession`] is what a skapp's buttons call: login, logout, restart.
//! It drives the [`Gate`](skybridge_gate::Gate), interprets the resulting
//! provider status and hands one of a fixed set of [`UiState`]s to the
//! skapp's [`UiHooks`].
//!
//! | Provider status | UI state |
//! |-----------------|----------|
//! | not loaded | `NotLoaded` |
//! | loaded | `Loaded` |
//! | connected, `identity` is a string | `Connected` |
//! | connected, `identity` unusable | provider disconnected, `Loaded` |
//! | handshake exhausted | `BridgeError` |
//! | any other failure | `Error(message)` |

mod session;
mod ui;

pub use session::SkappSession;
pub use ui::{UiHooks, UiState};
