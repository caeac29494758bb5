//! Composer state: draft text, staged attachment, busy flags and the notice.
//!
//! The controller is the only writer. Renderers read a [`ComposerView`]
//! snapshot so they never hold a borrow on the live state.

#[cfg(test)]
#[path = "composer_test.rs"]
mod composer_test;

use snip::{AttachmentHandle, AttachmentSource};

/// What a notice is about, for styling and tests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeKind {
    /// Snapshot, crop, encode or preview failed. Retrying may help.
    Capture,
    /// The chat or history exchange failed.
    Network,
    /// The selection was cancelled or empty.
    Selection,
    /// A picked or dropped file could not be staged.
    Attachment,
}

/// A dismissible inline message shown above the composer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatNotice {
    pub kind: NoticeKind,
    pub message: String,
}

impl ChatNotice {
    #[must_use]
    pub fn new(kind: NoticeKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }
}

/// Live composer state owned by the controller.
#[derive(Debug, Default)]
pub struct ComposerState {
    pub input: String,
    pub staged: Option<AttachmentHandle>,
    /// A `POST /chat` exchange is outstanding.
    pub in_flight: bool,
    /// History hydration is running; submissions wait for it.
    pub hydrating: bool,
    /// A selection or capture is running.
    pub snipping: bool,
    pub notice: Option<ChatNotice>,
}

impl ComposerState {
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.in_flight || self.hydrating
    }

    #[must_use]
    pub fn can_submit(&self) -> bool {
        !self.is_busy() && !self.input.trim().is_empty()
    }

    #[must_use]
    pub fn view(&self) -> ComposerView {
        ComposerView {
            input: self.input.clone(),
            preview: self.staged.as_ref().map(|h| StagedPreview {
                locator: h.locator().to_owned(),
                file_name: h.payload().file_name.clone(),
                source: h.source(),
            }),
            in_flight: self.in_flight,
            hydrating: self.hydrating,
            snipping: self.snipping,
            can_submit: self.can_submit(),
            notice: self.notice.clone(),
        }
    }
}

/// Display data for the staged attachment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StagedPreview {
    pub locator: String,
    pub file_name: String,
    pub source: AttachmentSource,
}

/// Owned snapshot of [`ComposerState`] for rendering.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ComposerView {
    pub input: String,
    pub preview: Option<StagedPreview>,
    pub in_flight: bool,
    pub hydrating: bool,
    pub snipping: bool,
    pub can_submit: bool,
    pub notice: Option<ChatNotice>,
}
