//! Object-URL display locators for staged images.

use std::time::Duration;

use snip::{AttachmentError, ImagePayload, LocatorRegistry};

/// Mints `blob:` URLs and revokes them after the grace delay.
#[derive(Debug, Default, Clone, Copy)]
pub struct ObjectUrlRegistry;

impl LocatorRegistry for ObjectUrlRegistry {
    fn register(&self, payload: &ImagePayload) -> Result<String, AttachmentError> {
        #[cfg(feature = "csr")]
        {
            let blob = crate::util::blob::payload_blob(payload)
                .map_err(|e| AttachmentError::Locator(super::describe_js(&e)))?;
            web_sys::Url::create_object_url_with_blob(&blob)
                .map_err(|e| AttachmentError::Locator(super::describe_js(&e)))
        }
        #[cfg(not(feature = "csr"))]
        {
            Err(AttachmentError::Locator(format!("no browser to preview {}", payload.file_name)))
        }
    }

    fn release_after(&self, locator: String, grace: Duration) {
        #[cfg(feature = "csr")]
        {
            let delay_ms = u32::try_from(grace.as_millis()).unwrap_or(u32::MAX);
            gloo_timers::callback::Timeout::new(delay_ms, move || {
                if web_sys::Url::revoke_object_url(&locator).is_err() {
                    log::warn!("failed to revoke {locator}");
                }
            })
            .forget();
        }
        #[cfg(not(feature = "csr"))]
        {
            let _ = (locator, grace);
        }
    }
}
