//! Browser implementations of the snip host capabilities.
//!
//! SYSTEM CONTEXT
//! ==============
//! `snip` stays browser-free; these adapters plug the DOM into it. The types
//! exist in every build so the app wiring compiles natively, but only `csr`
//! builds touch `web-sys`. Elsewhere the overlay cancels immediately, snapshots
//! fail and no locators are minted.

pub mod dom;
#[cfg(feature = "csr")]
pub mod file;
pub mod locators;
pub mod snapshot;

pub use dom::{DomGuard, DomOverlayHost};
pub use locators::ObjectUrlRegistry;
pub use snapshot::DisplayMediaSnapshotter;

/// Best-effort text for a thrown JS value.
#[cfg(feature = "csr")]
pub(crate) fn describe_js(err: &wasm_bindgen::JsValue) -> String {
    use wasm_bindgen::JsCast;

    if let Some(text) = err.as_string() {
        return text;
    }
    if let Some(error) = err.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    format!("{err:?}")
}
