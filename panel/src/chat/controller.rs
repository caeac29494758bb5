//! Chat surface controller: staging, submission and history hydration.
//!
//! DESIGN
//! ======
//! The controller is the only writer of the conversation log and the composer
//! state. Both live behind `RefCell`s on a single thread; every method takes
//! its borrows in short scopes and releases them before any `.await`, so a
//! render triggered mid-exchange can always read.
//!
//! A submission is a two-phase commit on the log. Phase one (synchronous)
//! appends the user message and the pending placeholder. Phase two runs after
//! the network exchange and either resolves the placeholder or discards it and
//! raises a notice. The placeholder never outlives a finished exchange.
//!
//! A consumed attachment stays registered while its message is in the log, so
//! a re-render can always paint it. Handles are released (with the grace
//! delay) once their message is evicted, cleared or replaced by history.
//!
//! Renderers subscribe with [`ChatSurfaceController::set_on_change`] and pull
//! snapshots; the callback must tolerate being invoked after its owner is gone.

#[cfg(test)]
#[path = "controller_test.rs"]
mod controller_test;

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use snip::{
    AttachmentError, AttachmentHandle, AttachmentSource, CaptureError, CapturePipeline, Cancelled, ImagePayload,
    LocatorRegistry, OverlayHost, SelectionOverlay, SurfaceSnapshotter, consts::RELEASE_GRACE,
};

use crate::net::api::{ApiError, ChatApi};
use crate::net::types::{SessionUser, history_to_messages};
use crate::state::auth::AuthSession;
use crate::state::composer::{ChatNotice, ComposerState, ComposerView, NoticeKind};
use crate::state::conversation::{ConversationStore, Message};
use crate::util::clock;

/// Result of [`ChatSurfaceController::submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Input was empty or whitespace; nothing happened.
    Rejected,
    /// Another exchange or hydration is running; nothing happened.
    Busy,
    /// The placeholder was resolved with the reply.
    Answered,
    /// The exchange failed; the placeholder was discarded and a notice raised.
    Failed(ApiError),
}

/// Result of [`ChatSurfaceController::snip_and_stage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnipOutcome {
    Staged,
    Cancelled(Cancelled),
    Failed(CaptureError),
    /// A selection is already in progress.
    Busy,
}

/// Result of [`ChatSurfaceController::hydrate_history`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HydrateOutcome {
    /// Replaced the log with this many server messages.
    Loaded(usize),
    /// Anonymous session, latch already set, or the session changed mid-fetch.
    Skipped,
    /// A submission or another hydration is running.
    Busy,
    Failed(ApiError),
}

/// Orchestrates the chat surface on top of injected state and host capabilities.
pub struct ChatSurfaceController<A, H, S> {
    api: A,
    session: Rc<RefCell<AuthSession>>,
    store: Rc<RefCell<ConversationStore>>,
    composer: RefCell<ComposerState>,
    shown: RefCell<Vec<AttachmentHandle>>,
    locators: Rc<dyn LocatorRegistry>,
    overlay: SelectionOverlay<H>,
    capture: CapturePipeline<S>,
    release_grace: Duration,
    clock: fn() -> f64,
    on_change: RefCell<Option<Rc<dyn Fn()>>>,
}

impl<A, H, S> ChatSurfaceController<A, H, S>
where
    A: ChatApi,
    H: OverlayHost + 'static,
    H::Guard: 'static,
    S: SurfaceSnapshotter,
{
    pub fn new(
        api: A,
        session: Rc<RefCell<AuthSession>>,
        store: Rc<RefCell<ConversationStore>>,
        locators: Rc<dyn LocatorRegistry>,
        overlay: SelectionOverlay<H>,
        capture: CapturePipeline<S>,
    ) -> Self {
        Self {
            api,
            session,
            store,
            composer: RefCell::new(ComposerState::default()),
            shown: RefCell::new(Vec::new()),
            locators,
            overlay,
            capture,
            release_grace: RELEASE_GRACE,
            clock: clock::now_ms,
            on_change: RefCell::new(None),
        }
    }

    #[must_use]
    pub fn with_release_grace(mut self, grace: Duration) -> Self {
        self.release_grace = grace;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: fn() -> f64) -> Self {
        self.clock = clock;
        self
    }

    /// Register the render callback, replacing any previous one.
    pub fn set_on_change(&self, callback: impl Fn() + 'static) {
        *self.on_change.borrow_mut() = Some(Rc::new(callback));
    }

    fn notify(&self) {
        let callback = self.on_change.borrow().clone();
        if let Some(callback) = callback {
            callback();
        }
    }

    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.store.borrow().messages().to_vec()
    }

    #[must_use]
    pub fn composer_view(&self) -> ComposerView {
        self.composer.borrow().view()
    }

    #[must_use]
    pub fn session(&self) -> &Rc<RefCell<AuthSession>> {
        &self.session
    }

    // =============================================================
    // Composer
    // =============================================================

    pub fn set_input(&self, text: impl Into<String>) {
        self.composer.borrow_mut().input = text.into();
        self.notify();
    }

    pub fn dismiss_error(&self) {
        let had_notice = self.composer.borrow_mut().notice.take().is_some();
        if had_notice {
            self.notify();
        }
    }

    fn raise(&self, notice: ChatNotice) {
        log::warn!("chat notice ({:?}): {}", notice.kind, notice.message);
        self.composer.borrow_mut().notice = Some(notice);
    }

    // =============================================================
    // Attachment staging
    // =============================================================

    /// Stage an image chosen through the file picker.
    ///
    /// # Errors
    ///
    /// Returns the registry failure; a notice is raised as well.
    pub fn stage_file(&self, payload: ImagePayload) -> Result<(), AttachmentError> {
        self.stage_payload(AttachmentSource::FilePick, payload)
    }

    /// Stage an image dropped onto the surface.
    ///
    /// # Errors
    ///
    /// Returns the registry failure; a notice is raised as well.
    pub fn stage_drop(&self, payload: ImagePayload) -> Result<(), AttachmentError> {
        self.stage_payload(AttachmentSource::DragDrop, payload)
    }

    /// Stage a handle produced by the capture pipeline.
    pub fn stage_capture(&self, handle: AttachmentHandle) {
        self.stage(handle);
        self.notify();
    }

    /// Surface a file the host could not turn into a payload.
    pub fn reject_attachment(&self, error: &AttachmentError) {
        self.raise(ChatNotice::new(NoticeKind::Attachment, error.to_string()));
        self.notify();
    }

    /// Drop the staged attachment, if any.
    pub fn unstage(&self) {
        let previous = self.composer.borrow_mut().staged.take();
        if let Some(previous) = previous {
            previous.release(self.locators.as_ref(), self.release_grace);
            self.notify();
        }
    }

    fn stage_payload(&self, source: AttachmentSource, payload: ImagePayload) -> Result<(), AttachmentError> {
        match AttachmentHandle::attach(source, payload, self.locators.as_ref()) {
            Ok(handle) => {
                self.stage(handle);
                self.notify();
                Ok(())
            }
            Err(e) => {
                self.reject_attachment(&e);
                Err(e)
            }
        }
    }

    /// Release every sent attachment whose message has left the log.
    fn release_unshown(&self) {
        let dropped: Vec<AttachmentHandle> = {
            let store = self.store.borrow();
            let in_log = |handle: &AttachmentHandle| {
                store.messages().iter().any(|m| m.attachment.as_deref() == Some(handle.locator()))
            };
            let (kept, dropped): (Vec<_>, Vec<_>) = self.shown.borrow_mut().drain(..).partition(in_log);
            *self.shown.borrow_mut() = kept;
            dropped
        };
        for handle in dropped {
            handle.release(self.locators.as_ref(), self.release_grace);
        }
    }

    fn stage(&self, handle: AttachmentHandle) {
        let previous = self.composer.borrow_mut().staged.replace(handle);
        if let Some(previous) = previous {
            previous.release(self.locators.as_ref(), self.release_grace);
        }
    }

    /// Let the user drag out a region, capture it and stage the result.
    pub async fn snip_and_stage(&self) -> SnipOutcome {
        {
            let mut composer = self.composer.borrow_mut();
            if composer.snipping {
                return SnipOutcome::Busy;
            }
            composer.snipping = true;
            composer.notice = None;
        }
        self.notify();
        let _snipping = SnippingFlag(self);

        match self.overlay.request_selection().await {
            Err(cancelled) => {
                if cancelled == Cancelled::EmptySelection {
                    self.raise(ChatNotice::new(
                        NoticeKind::Selection,
                        "The selection was empty. Drag across the area you want to send.",
                    ));
                }
                SnipOutcome::Cancelled(cancelled)
            }
            Ok(rect) => match self.capture.capture(&rect).await {
                Ok(handle) => {
                    self.stage(handle);
                    SnipOutcome::Staged
                }
                Err(e) => {
                    self.raise(ChatNotice::new(NoticeKind::Capture, format!("Screen capture failed: {e}. Try again.")));
                    SnipOutcome::Failed(e)
                }
            },
        }
    }

    // =============================================================
    // Submission
    // =============================================================

    /// Send the composer's input and staged attachment as one exchange.
    pub async fn submit(&self) -> SubmitOutcome {
        let now = (self.clock)();
        let (input, attachment) = {
            let mut composer = self.composer.borrow_mut();
            let input = composer.input.trim().to_owned();
            if input.is_empty() {
                return SubmitOutcome::Rejected;
            }
            if composer.is_busy() {
                return SubmitOutcome::Busy;
            }
            composer.in_flight = true;
            composer.input.clear();
            composer.notice = None;
            (input, composer.staged.take())
        };

        {
            let mut store = self.store.borrow_mut();
            let locator = attachment.as_ref().map(|h| h.locator().to_owned());
            store.append(Message::user(input.clone(), locator, now));
            if let Err(e) = store.append_pending(now) {
                log::error!("submit with an outstanding placeholder: {e}");
            }
        }
        self.notify();

        let token = self.session.borrow().token().map(str::to_owned);
        let image = attachment.as_ref().map(AttachmentHandle::payload);
        log::debug!("chat submit: chars={} image={} auth={}", input.len(), image.is_some(), token.is_some());
        let result = self.api.send_chat(&input, image, token.as_deref()).await;

        let outcome = match result {
            Ok(reply) => {
                if !self.store.borrow_mut().resolve_pending(reply) {
                    log::debug!("reply arrived after the log was cleared");
                }
                SubmitOutcome::Answered
            }
            Err(e) => {
                self.store.borrow_mut().discard_pending();
                self.raise(ChatNotice::new(NoticeKind::Network, format!("Message failed: {e}")));
                SubmitOutcome::Failed(e)
            }
        };

        if let Some(attachment) = attachment {
            self.shown.borrow_mut().push(attachment);
        }
        self.release_unshown();
        self.composer.borrow_mut().in_flight = false;
        self.notify();
        outcome
    }

    // =============================================================
    // Session and history
    // =============================================================

    /// Replace the log with server history once per authenticated session.
    pub async fn hydrate_history(&self) -> HydrateOutcome {
        let Some(token) = self.hydration_token() else {
            return HydrateOutcome::Skipped;
        };
        {
            let mut composer = self.composer.borrow_mut();
            if composer.is_busy() {
                return HydrateOutcome::Busy;
            }
            composer.hydrating = true;
        }
        self.notify();

        let result = self.api.fetch_history(&token).await;

        let outcome = match result {
            Ok(entries) => {
                let messages = history_to_messages(entries, (self.clock)());
                let mut session = self.session.borrow_mut();
                if session.token() == Some(token.as_str()) {
                    let count = messages.len();
                    let applied = self.store.borrow_mut().hydrate(&mut session.history, messages);
                    drop(session);
                    if applied {
                        self.release_unshown();
                        log::debug!("history hydrated: {count} messages");
                        HydrateOutcome::Loaded(self.store.borrow().len())
                    } else {
                        HydrateOutcome::Skipped
                    }
                } else {
                    log::debug!("session changed during history fetch; dropping result");
                    HydrateOutcome::Skipped
                }
            }
            Err(e) => {
                self.raise(ChatNotice::new(NoticeKind::Network, format!("Could not load chat history: {e}")));
                HydrateOutcome::Failed(e)
            }
        };

        self.composer.borrow_mut().hydrating = false;
        self.notify();
        outcome
    }

    fn hydration_token(&self) -> Option<String> {
        let session = self.session.borrow();
        if session.history.is_set() {
            return None;
        }
        session.token().map(str::to_owned)
    }

    /// Adopt new credentials; the next [`Self::hydrate_history`] reloads the log.
    pub fn sign_in(&self, token: impl Into<String>, user: Option<SessionUser>) {
        self.session.borrow_mut().sign_in(token, user);
        self.store.borrow_mut().clear();
        self.release_unshown();
        self.notify();
    }

    /// Forget credentials and the conversation shown for them.
    pub fn sign_out(&self) {
        self.session.borrow_mut().sign_out();
        self.store.borrow_mut().clear();
        self.release_unshown();
        self.notify();
    }
}

/// Clears `snipping` and announces it when a snip ends or is abandoned.
struct SnippingFlag<'a, A, H, S>(&'a ChatSurfaceController<A, H, S>)
where
    A: ChatApi,
    H: OverlayHost + 'static,
    H::Guard: 'static,
    S: SurfaceSnapshotter;

impl<A, H, S> Drop for SnippingFlag<'_, A, H, S>
where
    A: ChatApi,
    H: OverlayHost + 'static,
    H::Guard: 'static,
    S: SurfaceSnapshotter,
{
    fn drop(&mut self) {
        self.0.composer.borrow_mut().snipping = false;
        self.0.notify();
    }
}
