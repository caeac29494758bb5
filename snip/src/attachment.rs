//! Image attachments and their display locators.
//!
//! An [`AttachmentHandle`] pairs the binary image with a locator the renderer
//! can paint immediately (an object URL in the browser). Handles are owned by
//! whoever staged them. Once a handle is replaced or consumed, its locator is
//! handed back to the [`LocatorRegistry`] for release after a grace delay, so
//! a frame that is still painting the old preview never sees a dead reference.

#[cfg(test)]
#[path = "attachment_test.rs"]
mod attachment_test;

use std::fmt;
use std::rc::Rc;
use std::time::Duration;

/// Where an attachment came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentSource {
    /// Chosen through the file picker.
    FilePick,
    /// Dropped onto the chat surface.
    DragDrop,
    /// Produced by the capture pipeline.
    Capture,
}

/// Opaque encoded image bytes plus the metadata needed to upload them.
#[derive(Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub bytes: Rc<[u8]>,
    pub mime: String,
    pub file_name: String,
}

impl ImagePayload {
    #[must_use]
    pub fn new(bytes: impl Into<Rc<[u8]>>, mime: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self { bytes: bytes.into(), mime: mime.into(), file_name: file_name.into() }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

// Payloads can be megabytes; keep debug output to the metadata.
impl fmt::Debug for ImagePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImagePayload")
            .field("bytes", &self.bytes.len())
            .field("mime", &self.mime)
            .field("file_name", &self.file_name)
            .finish()
    }
}

/// Failure to mint a display locator for a payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttachmentError {
    #[error("could not create a preview for the image: {0}")]
    Locator(String),
    #[error("{0} is not an image")]
    NotAnImage(String),
}

/// Host capability that turns payloads into renderable locators.
pub trait LocatorRegistry {
    /// Create a locator the renderer can use right away.
    ///
    /// # Errors
    ///
    /// Returns [`AttachmentError::Locator`] when the host cannot allocate one.
    fn register(&self, payload: &ImagePayload) -> Result<String, AttachmentError>;

    /// Invalidate `locator` once `grace` has elapsed.
    fn release_after(&self, locator: String, grace: Duration);
}

/// A staged image: the payload, its source and its display locator.
#[derive(Debug)]
pub struct AttachmentHandle {
    source: AttachmentSource,
    payload: ImagePayload,
    locator: String,
}

impl AttachmentHandle {
    /// Register `payload` with the host and wrap it as a handle.
    ///
    /// # Errors
    ///
    /// Propagates locator allocation failures from the registry.
    pub fn attach(
        source: AttachmentSource,
        payload: ImagePayload,
        registry: &dyn LocatorRegistry,
    ) -> Result<Self, AttachmentError> {
        let locator = registry.register(&payload)?;
        log::debug!("attachment staged: source={source:?} bytes={} locator={locator}", payload.len());
        Ok(Self { source, payload, locator })
    }

    #[must_use]
    pub fn source(&self) -> AttachmentSource {
        self.source
    }

    #[must_use]
    pub fn payload(&self) -> &ImagePayload {
        &self.payload
    }

    /// The display locator. Messages keep a copy of this string, never the bytes.
    #[must_use]
    pub fn locator(&self) -> &str {
        &self.locator
    }

    /// Give the locator back to the registry for deferred release.
    pub fn release(self, registry: &dyn LocatorRegistry, grace: Duration) {
        log::debug!("attachment released: locator={} grace_ms={}", self.locator, grace.as_millis());
        registry.release_after(self.locator, grace);
    }
}
