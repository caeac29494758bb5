//! Region selection and capture core for the chat surface.
//!
//! This crate owns the "snip" workflow: letting the user drag a rectangle over
//! the visible surface, snapshotting that surface, and cropping the snapshot
//! into an image attachment. It has no browser dependency. Everything the host
//! environment must supply (overlay listeners, raster snapshots, display
//! locators) is a trait, so the whole pipeline runs under plain `cargo test`.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`geometry`] | Points, sizes and the normalized [`geometry::SelectionRect`] |
//! | [`overlay`] | Selection state machine and the async `request_selection` driver |
//! | [`capture`] | Snapshot, scroll-corrected crop and PNG encode |
//! | [`attachment`] | [`attachment::AttachmentHandle`] and display-locator lifecycle |
//! | [`consts`] | Shared constants (grace delay, capture file name) |

pub mod attachment;
pub mod capture;
pub mod consts;
pub mod geometry;
pub mod overlay;

pub use attachment::{AttachmentError, AttachmentHandle, AttachmentSource, ImagePayload, LocatorRegistry};
pub use capture::{CaptureError, CapturePipeline, Snapshot, SurfaceSnapshotter};
pub use geometry::{Point, SelectionRect, Size};
pub use overlay::{Cancelled, OverlayEvent, OverlayHost, SelectionOverlay};
