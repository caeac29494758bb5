//! Selection overlay: the drag-a-rectangle gesture.
//!
//! [`OverlayCore`] is the pure state machine
//! (`Idle -> Armed -> Dragging -> Committed | Cancelled`) and can be driven
//! directly in tests. [`SelectionOverlay`] wraps it for the host: it mounts the
//! overlay, installs the global pointer listeners only while a drag is in
//! progress, and resolves a single future with the final rect.
//!
//! LISTENER LIFETIME
//! =================
//! Every listener the host installs is represented by an [`OverlayHost::Guard`].
//! Guards are owned by the in-flight `request_selection` future and dropped on
//! every exit path: commit, escape, empty selection, or the future itself being
//! dropped. Repeated snips therefore never accumulate listeners.

#[cfg(test)]
#[path = "overlay_test.rs"]
mod overlay_test;

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use futures::channel::oneshot;

use crate::geometry::{Point, SelectionRect};

/// Raw input delivered by the host while the overlay is up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OverlayEvent {
    /// Pointer pressed inside the overlay (viewport coordinates).
    PointerDown(Point),
    /// Pointer moved anywhere on the surface during a drag.
    PointerMove(Point),
    /// Pointer released anywhere on the surface.
    PointerUp(Point),
    /// The user pressed the escape key.
    Escape,
}

/// Why a selection did not produce a rect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Cancelled {
    #[error("selection cancelled")]
    Escape,
    #[error("selection was empty")]
    EmptySelection,
    #[error("selection overlay closed")]
    Closed,
}

/// Current phase of the gesture.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum OverlayPhase {
    #[default]
    Idle,
    /// Overlay visible, waiting for pointer-down.
    Armed,
    /// Pointer is down; the rect follows the pointer.
    Dragging {
        start: Point,
        current: Point,
        /// Scroll offset captured at pointer-down.
        scroll: Point,
    },
    Committed(SelectionRect),
    Cancelled(Cancelled),
}

/// What a single input did to the state machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transition {
    Ignored,
    DragStarted,
    Updated(SelectionRect),
    Finished(Result<SelectionRect, Cancelled>),
}

/// Pure selection state machine.
#[derive(Debug, Clone, Default)]
pub struct OverlayCore {
    phase: OverlayPhase,
}

impl OverlayCore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn phase(&self) -> OverlayPhase {
        self.phase
    }

    /// Show the overlay. Ignored while a drag is already in progress.
    pub fn arm(&mut self) -> bool {
        if matches!(self.phase, OverlayPhase::Dragging { .. }) {
            return false;
        }
        self.phase = OverlayPhase::Armed;
        true
    }

    /// The rect as it would be committed right now, if dragging.
    #[must_use]
    pub fn live_rect(&self) -> Option<SelectionRect> {
        match self.phase {
            OverlayPhase::Dragging { start, current, scroll } => {
                Some(SelectionRect::from_corners(start, current).with_scroll(scroll))
            }
            _ => None,
        }
    }

    pub fn pointer_down(&mut self, at: Point, scroll: Point) -> Transition {
        if self.phase != OverlayPhase::Armed {
            return Transition::Ignored;
        }
        self.phase = OverlayPhase::Dragging { start: at, current: at, scroll };
        Transition::DragStarted
    }

    pub fn pointer_move(&mut self, at: Point) -> Transition {
        let OverlayPhase::Dragging { start, scroll, .. } = self.phase else {
            return Transition::Ignored;
        };
        self.phase = OverlayPhase::Dragging { start, current: at, scroll };
        Transition::Updated(SelectionRect::from_corners(start, at).with_scroll(scroll))
    }

    pub fn pointer_up(&mut self, at: Point) -> Transition {
        let OverlayPhase::Dragging { start, scroll, .. } = self.phase else {
            return Transition::Ignored;
        };
        let rect = SelectionRect::from_corners(start, at).with_scroll(scroll);
        if rect.is_degenerate() {
            self.phase = OverlayPhase::Cancelled(Cancelled::EmptySelection);
            return Transition::Finished(Err(Cancelled::EmptySelection));
        }
        self.phase = OverlayPhase::Committed(rect);
        Transition::Finished(Ok(rect))
    }

    pub fn cancel(&mut self) -> Transition {
        match self.phase {
            OverlayPhase::Armed | OverlayPhase::Dragging { .. } => {
                self.phase = OverlayPhase::Cancelled(Cancelled::Escape);
                Transition::Finished(Err(Cancelled::Escape))
            }
            _ => Transition::Ignored,
        }
    }

    pub fn apply(&mut self, event: OverlayEvent, scroll: Point) -> Transition {
        match event {
            OverlayEvent::PointerDown(at) => self.pointer_down(at, scroll),
            OverlayEvent::PointerMove(at) => self.pointer_move(at),
            OverlayEvent::PointerUp(at) => self.pointer_up(at),
            OverlayEvent::Escape => self.cancel(),
        }
    }
}

/// Callback the host invokes for each overlay event.
pub type EventSink = Rc<dyn Fn(OverlayEvent)>;

/// Event-subscription capability supplied by the host environment.
pub trait OverlayHost {
    /// Detaches whatever was installed when dropped.
    type Guard;

    /// Show the full-surface overlay and deliver pointer-down and escape to `sink`.
    fn mount(&self, sink: EventSink) -> Self::Guard;

    /// Deliver pointer-move and pointer-up from the whole surface to `sink`.
    fn track_pointer(&self, sink: EventSink) -> Self::Guard;

    /// Current document scroll offset.
    fn scroll_offset(&self) -> Point;

    /// Paint (or clear) the live selection marquee.
    fn show_rect(&self, _rect: Option<&SelectionRect>) {}
}

type Reply = oneshot::Sender<Result<SelectionRect, Cancelled>>;

struct DragSession<G> {
    core: OverlayCore,
    reply: Option<Reply>,
    sink: Option<EventSink>,
    pointer_guard: Option<G>,
}

/// Drops the pointer listeners before the overlay itself.
struct Teardown<G> {
    session: Rc<RefCell<DragSession<G>>>,
    mount: Option<G>,
}

impl<G> Drop for Teardown<G> {
    fn drop(&mut self) {
        let pointer_guard = {
            let mut session = self.session.borrow_mut();
            session.sink = None;
            session.pointer_guard.take()
        };
        drop(pointer_guard);
        drop(self.mount.take());
    }
}

/// Host-bound driver for one-shot rectangle selection.
pub struct SelectionOverlay<H> {
    host: Rc<H>,
}

impl<H> SelectionOverlay<H>
where
    H: OverlayHost + 'static,
    H::Guard: 'static,
{
    #[must_use]
    pub fn new(host: Rc<H>) -> Self {
        Self { host }
    }

    #[must_use]
    pub fn host(&self) -> &Rc<H> {
        &self.host
    }

    /// Arm the overlay and wait for the user to commit or cancel a rect.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] on escape, on a zero-area drag, or if the host
    /// goes away before the gesture finishes.
    pub async fn request_selection(&self) -> Result<SelectionRect, Cancelled> {
        let (reply, outcome) = oneshot::channel();
        let mut core = OverlayCore::new();
        core.arm();
        let session = Rc::new(RefCell::new(DragSession { core, reply: Some(reply), sink: None, pointer_guard: None }));

        let sink = event_sink(Rc::downgrade(&session), Rc::clone(&self.host));
        session.borrow_mut().sink = Some(Rc::clone(&sink));
        let mount = self.host.mount(sink);
        let teardown = Teardown { session, mount: Some(mount) };
        log::debug!("selection overlay armed");

        let result = match outcome.await {
            Ok(result) => result,
            Err(oneshot::Canceled) => Err(Cancelled::Closed),
        };
        drop(teardown);
        log::debug!("selection overlay finished: {result:?}");
        result
    }
}

fn event_sink<H>(session: Weak<RefCell<DragSession<H::Guard>>>, host: Rc<H>) -> EventSink
where
    H: OverlayHost + 'static,
    H::Guard: 'static,
{
    Rc::new(move |event| dispatch(&session, host.as_ref(), event))
}

fn dispatch<H: OverlayHost>(session: &Weak<RefCell<DragSession<H::Guard>>>, host: &H, event: OverlayEvent) {
    // The requester already returned; late events have nowhere to go.
    let Some(session) = session.upgrade() else {
        return;
    };

    let transition = session.borrow_mut().core.apply(event, host.scroll_offset());
    match transition {
        Transition::Ignored => {}
        Transition::DragStarted => {
            let sink = session.borrow().sink.clone();
            if let Some(sink) = sink {
                let guard = host.track_pointer(sink);
                session.borrow_mut().pointer_guard = Some(guard);
            }
        }
        Transition::Updated(rect) => host.show_rect(Some(&rect)),
        Transition::Finished(result) => {
            host.show_rect(None);
            let (reply, pointer_guard) = {
                let mut state = session.borrow_mut();
                (state.reply.take(), state.pointer_guard.take())
            };
            drop(pointer_guard);
            if let Some(reply) = reply {
                if reply.send(result).is_err() {
                    log::debug!("selection finished after the requester went away");
                }
            }
        }
    }
}
