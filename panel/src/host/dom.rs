//! DOM overlay host for the selection gesture.
//!
//! `mount` appends a fixed full-viewport layer with a marquee child and
//! listens for pointer-down on it and escape on the window. `track_pointer`
//! adds window-level move/up listeners for the drag only. Every listener is
//! owned by a [`DomGuard`] and removed when the guard drops, so an abandoned
//! selection never leaves handlers behind.

#[cfg(test)]
#[path = "dom_test.rs"]
mod dom_test;

#[cfg(any(test, feature = "csr"))]
use std::cell::RefCell;
#[cfg(any(test, feature = "csr"))]
use std::rc::Rc;

use snip::overlay::EventSink;
use snip::{OverlayEvent, OverlayHost, Point, SelectionRect};

#[cfg(feature = "csr")]
use wasm_bindgen::{JsCast, closure::Closure};

#[cfg(feature = "csr")]
const OVERLAY_STYLE: &str = "position:fixed;inset:0;z-index:2147483647;cursor:crosshair;\
    background:rgba(15,23,42,0.25);touch-action:none;user-select:none;";
#[cfg(feature = "csr")]
const MARQUEE_STYLE: &str = "position:fixed;display:none;pointer-events:none;\
    border:2px solid #38bdf8;background:rgba(56,189,248,0.15);";

#[cfg(feature = "csr")]
struct Listener {
    target: web_sys::EventTarget,
    kind: &'static str,
    callback: Closure<dyn FnMut(web_sys::Event)>,
}

/// Shared slot the host reads while mounted; emptied when its lease drops.
#[cfg(any(test, feature = "csr"))]
struct SlotLease<T>(Rc<RefCell<Option<T>>>);

#[cfg(any(test, feature = "csr"))]
impl<T> SlotLease<T> {
    fn fill(slot: &Rc<RefCell<Option<T>>>, value: T) -> Self {
        *slot.borrow_mut() = Some(value);
        Self(Rc::clone(slot))
    }
}

#[cfg(any(test, feature = "csr"))]
impl<T> Drop for SlotLease<T> {
    fn drop(&mut self) {
        self.0.borrow_mut().take();
    }
}

/// Removes its listeners and element from the page on drop.
#[derive(Default)]
pub struct DomGuard {
    #[cfg(feature = "csr")]
    listeners: Vec<Listener>,
    #[cfg(feature = "csr")]
    element: Option<web_sys::Element>,
    #[cfg(feature = "csr")]
    marquee: Option<SlotLease<web_sys::HtmlElement>>,
}

impl Drop for DomGuard {
    fn drop(&mut self) {
        #[cfg(feature = "csr")]
        {
            for listener in self.listeners.drain(..) {
                let removed = listener
                    .target
                    .remove_event_listener_with_callback(listener.kind, listener.callback.as_ref().unchecked_ref());
                if removed.is_err() {
                    log::warn!("failed to detach {} listener", listener.kind);
                }
            }
            drop(self.marquee.take());
            if let Some(element) = self.element.take() {
                element.remove();
            }
        }
    }
}

#[cfg(feature = "csr")]
impl DomGuard {
    fn listen(
        &mut self,
        target: &web_sys::EventTarget,
        kind: &'static str,
        handler: impl FnMut(web_sys::Event) + 'static,
    ) -> bool {
        let callback = Closure::<dyn FnMut(web_sys::Event)>::new(handler);
        match target.add_event_listener_with_callback(kind, callback.as_ref().unchecked_ref()) {
            Ok(()) => {
                self.listeners.push(Listener { target: target.clone(), kind, callback });
                true
            }
            Err(e) => {
                log::warn!("failed to listen for {kind}: {}", super::describe_js(&e));
                false
            }
        }
    }
}

/// Overlay host drawing into the current document.
#[derive(Default)]
pub struct DomOverlayHost {
    #[cfg(feature = "csr")]
    marquee: Rc<RefCell<Option<web_sys::HtmlElement>>>,
}

impl DomOverlayHost {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(feature = "csr")]
fn pointer_point(event: &web_sys::Event) -> Option<Point> {
    let mouse = event.dyn_ref::<web_sys::MouseEvent>()?;
    Some(Point::new(f64::from(mouse.client_x()), f64::from(mouse.client_y())))
}

#[cfg(feature = "csr")]
fn create_styled(document: &web_sys::Document, style: &str) -> Option<web_sys::HtmlElement> {
    let element = document.create_element("div").ok()?.dyn_into::<web_sys::HtmlElement>().ok()?;
    element.style().set_css_text(style);
    Some(element)
}

#[cfg(feature = "csr")]
impl DomOverlayHost {
    fn try_mount(&self, sink: &EventSink) -> Option<DomGuard> {
        let window = web_sys::window()?;
        let document = window.document()?;
        let body = document.body()?;
        let layer = create_styled(&document, OVERLAY_STYLE)?;
        let marquee = create_styled(&document, MARQUEE_STYLE)?;
        layer.append_child(&marquee).ok()?;
        body.append_child(&layer).ok()?;

        let mut guard = DomGuard { listeners: Vec::new(), element: Some(layer.clone().into()), marquee: None };
        let down_sink = sink.clone();
        let listening = guard.listen(&layer, "pointerdown", move |event| {
            if let Some(at) = pointer_point(&event) {
                event.prevent_default();
                down_sink(OverlayEvent::PointerDown(at));
            }
        });
        let key_sink = sink.clone();
        let listening = listening
            && guard.listen(&window, "keydown", move |event| {
                let is_escape =
                    event.dyn_ref::<web_sys::KeyboardEvent>().is_some_and(|key| key.key() == "Escape");
                if is_escape {
                    event.prevent_default();
                    key_sink(OverlayEvent::Escape);
                }
            });
        if !listening {
            return None;
        }

        guard.marquee = Some(SlotLease::fill(&self.marquee, marquee));
        Some(guard)
    }
}

impl OverlayHost for DomOverlayHost {
    type Guard = DomGuard;

    fn mount(&self, sink: EventSink) -> DomGuard {
        #[cfg(feature = "csr")]
        {
            if let Some(guard) = self.try_mount(&sink) {
                return guard;
            }
            log::warn!("selection overlay could not be mounted");
        }
        sink(OverlayEvent::Escape);
        DomGuard::default()
    }

    fn track_pointer(&self, sink: EventSink) -> DomGuard {
        #[cfg(feature = "csr")]
        {
            let mut guard = DomGuard::default();
            if let Some(window) = web_sys::window() {
                let move_sink = sink.clone();
                guard.listen(&window, "pointermove", move |event| {
                    if let Some(at) = pointer_point(&event) {
                        move_sink(OverlayEvent::PointerMove(at));
                    }
                });
                guard.listen(&window, "pointerup", move |event| {
                    if let Some(at) = pointer_point(&event) {
                        sink(OverlayEvent::PointerUp(at));
                    }
                });
            }
            guard
        }
        #[cfg(not(feature = "csr"))]
        {
            let _ = sink;
            DomGuard::default()
        }
    }

    fn scroll_offset(&self) -> Point {
        #[cfg(feature = "csr")]
        {
            if let Some(window) = web_sys::window() {
                return Point::new(window.scroll_x().unwrap_or(0.0), window.scroll_y().unwrap_or(0.0));
            }
        }
        Point::default()
    }

    fn show_rect(&self, rect: Option<&SelectionRect>) {
        #[cfg(feature = "csr")]
        {
            let marquee = self.marquee.borrow();
            let Some(marquee) = marquee.as_ref() else {
                return;
            };
            let style = marquee.style();
            let applied = match rect {
                Some(rect) => style
                    .set_property("left", &format!("{}px", rect.origin.x))
                    .and_then(|()| style.set_property("top", &format!("{}px", rect.origin.y)))
                    .and_then(|()| style.set_property("width", &format!("{}px", rect.extent.width)))
                    .and_then(|()| style.set_property("height", &format!("{}px", rect.extent.height)))
                    .and_then(|()| style.set_property("display", "block")),
                None => style.set_property("display", "none"),
            };
            if applied.is_err() {
                log::debug!("marquee style update failed");
            }
        }
        #[cfg(not(feature = "csr"))]
        {
            let _ = rect;
        }
    }
}
