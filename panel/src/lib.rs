//! Hypewave chat panel.
//!
//! A Leptos client-side app hosting the trading assistant's chat surface:
//! optimistic submission with a pending placeholder, one-shot history
//! hydration, image attachments from file pick, drag-and-drop or an on-screen
//! snip. The selection and capture core lives in the `snip` crate; this crate
//! supplies state, networking, browser hosts and the UI.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | Build-time configuration |
//! | [`net`] | Chat API client and wire types |
//! | [`state`] | Auth session, conversation log, composer state |
//! | [`chat`] | `ChatSurfaceController`, the submission workflow |
//! | [`host`] | Browser implementations of the snip host traits |
//! | [`components`] | Leptos components |
//! | [`util`] | Markdown, storage and clock helpers |

pub mod app;
pub mod chat;
pub mod components;
pub mod config;
pub mod host;
pub mod net;
pub mod state;
pub mod util;

/// Browser entry point.
#[cfg(feature = "csr")]
#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Debug).is_err() {
        web_sys::console::warn_1(&"logger already initialized".into());
    }
    leptos::mount::mount_to_body(app::App);
}
