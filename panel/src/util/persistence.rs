//! Browser localStorage helpers for the persisted auth session.
//!
//! SYSTEM CONTEXT
//! ==============
//! Only the session credentials live here; conversation state is never
//! persisted locally. Native builds see empty storage.

use serde::Serialize;
use serde::de::DeserializeOwned;

#[cfg(feature = "csr")]
fn storage() -> Option<web_sys::Storage> {
    web_sys::window().and_then(|w| w.local_storage().ok().flatten())
}

/// Load a raw string value for `key`.
pub fn load_string(key: &str) -> Option<String> {
    #[cfg(feature = "csr")]
    {
        let raw = storage()?.get_item(key).ok().flatten()?;
        (!raw.trim().is_empty()).then_some(raw)
    }
    #[cfg(not(feature = "csr"))]
    {
        let _ = key;
        None
    }
}

/// Load a JSON value for `key`; malformed JSON reads as absent.
pub fn load_json<T: DeserializeOwned>(key: &str) -> Option<T> {
    let raw = load_string(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("ignoring malformed {key} in storage: {e}");
            None
        }
    }
}

/// Save a raw string value for `key`.
pub fn save_string(key: &str, value: &str) {
    #[cfg(feature = "csr")]
    {
        let Some(storage) = storage() else {
            return;
        };
        if storage.set_item(key, value).is_err() {
            log::warn!("failed to persist {key}");
        }
    }
    #[cfg(not(feature = "csr"))]
    {
        let _ = (key, value);
    }
}

/// Save a JSON value for `key`.
pub fn save_json<T: Serialize>(key: &str, value: &T) {
    match serde_json::to_string(value) {
        Ok(raw) => save_string(key, &raw),
        Err(e) => log::warn!("failed to encode {key}: {e}"),
    }
}

/// Remove `key` from storage.
pub fn remove(key: &str) {
    #[cfg(feature = "csr")]
    {
        if let Some(storage) = storage() {
            if storage.remove_item(key).is_err() {
                log::warn!("failed to remove {key}");
            }
        }
    }
    #[cfg(not(feature = "csr"))]
    {
        let _ = key;
    }
}
