//! Capture pipeline: snapshot the surface, crop to the selection, encode.
//!
//! COORDINATE POLICY
//! =================
//! A [`SelectionRect`] is anchored to the document using the scroll offset
//! seen at pointer-down. A [`Snapshot`] records the scroll offset in effect
//! when the raster was taken and the device scale between CSS pixels and
//! raster pixels. The crop region is therefore
//! `(rect.origin + rect.scroll - snapshot.scroll) * snapshot.scale`.
//! If the user scrolled far enough between gesture and snapshot that the
//! region left the raster, capture fails with [`CaptureError::OutOfBounds`]
//! instead of silently cropping something else.

#[cfg(test)]
#[path = "capture_test.rs"]
mod capture_test;

use std::io::Cursor;
use std::rc::Rc;

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, RgbaImage};

use crate::attachment::{AttachmentHandle, AttachmentSource, ImagePayload, LocatorRegistry};
use crate::consts::{CAPTURE_FILE_NAME, CAPTURE_MIME};
use crate::geometry::{Point, SelectionRect};

/// Anything that prevents a selection from becoming an attachment.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaptureError {
    #[error("screen capture unavailable: {0}")]
    Snapshot(String),
    #[error("selection is outside the captured area")]
    OutOfBounds,
    #[error("selection is empty")]
    Degenerate,
    #[error("could not encode capture: {0}")]
    Encode(String),
    #[error("could not preview capture: {0}")]
    Locator(String),
}

/// A raster of the visible surface.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub image: RgbaImage,
    /// Raster pixels per CSS pixel.
    pub scale: f64,
    /// Document scroll offset when the raster was taken.
    pub scroll: Point,
}

impl Snapshot {
    /// Wrap raw RGBA bytes as a snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::Snapshot`] when the buffer does not match the
    /// stated dimensions or the scale is not a positive finite number.
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>, scale: f64, scroll: Point) -> Result<Self, CaptureError> {
        let Some(image) = RgbaImage::from_raw(width, height, rgba) else {
            return Err(CaptureError::Snapshot(format!("raster buffer does not match {width}x{height}")));
        };
        if !scale.is_finite() || scale <= 0.0 {
            return Err(CaptureError::Snapshot(format!("invalid raster scale {scale}")));
        }
        Ok(Self { image, scale, scroll })
    }
}

/// Host capability that rasterizes the visible surface.
#[async_trait(?Send)]
pub trait SurfaceSnapshotter {
    /// Take a raster of the whole visible surface.
    async fn snapshot(&self) -> Result<Snapshot, CaptureError>;
}

#[async_trait(?Send)]
impl<T: SurfaceSnapshotter + ?Sized> SurfaceSnapshotter for Rc<T> {
    async fn snapshot(&self) -> Result<Snapshot, CaptureError> {
        (**self).snapshot().await
    }
}

/// Integer crop window inside a raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Translate a selection into raster pixels for a snapshot taken at
/// `snapshot_scroll` with `scale`.
///
/// # Errors
///
/// [`CaptureError::Degenerate`] if the region rounds to zero pixels,
/// [`CaptureError::OutOfBounds`] if any edge falls outside `bounds`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn map_to_snapshot(
    rect: &SelectionRect,
    snapshot_scroll: Point,
    scale: f64,
    bounds: (u32, u32),
) -> Result<PixelRegion, CaptureError> {
    let doc = rect.document_origin();
    let left = ((doc.x - snapshot_scroll.x) * scale).round();
    let top = ((doc.y - snapshot_scroll.y) * scale).round();
    let right = ((doc.x + rect.extent.width - snapshot_scroll.x) * scale).round();
    let bottom = ((doc.y + rect.extent.height - snapshot_scroll.y) * scale).round();

    if ![left, top, right, bottom].iter().all(|v| v.is_finite()) {
        return Err(CaptureError::OutOfBounds);
    }
    if right - left < 1.0 || bottom - top < 1.0 {
        return Err(CaptureError::Degenerate);
    }
    if left < 0.0 || top < 0.0 || right > f64::from(bounds.0) || bottom > f64::from(bounds.1) {
        return Err(CaptureError::OutOfBounds);
    }

    Ok(PixelRegion {
        x: left as u32,
        y: top as u32,
        width: (right - left) as u32,
        height: (bottom - top) as u32,
    })
}

/// Crop `image` to `region` and encode the result as PNG.
///
/// # Errors
///
/// Returns [`CaptureError::Encode`] if the encoder fails.
pub fn crop_to_png(image: &RgbaImage, region: PixelRegion) -> Result<Vec<u8>, CaptureError> {
    let cropped = image::imageops::crop_imm(image, region.x, region.y, region.width, region.height).to_image();
    let mut png = Vec::new();
    DynamicImage::ImageRgba8(cropped)
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| CaptureError::Encode(e.to_string()))?;
    Ok(png)
}

/// Turns a confirmed selection into a staged capture attachment.
pub struct CapturePipeline<S> {
    snapshotter: S,
    locators: Rc<dyn LocatorRegistry>,
}

impl<S: SurfaceSnapshotter> CapturePipeline<S> {
    pub fn new(snapshotter: S, locators: Rc<dyn LocatorRegistry>) -> Self {
        Self { snapshotter, locators }
    }

    /// Snapshot the surface and crop it to `rect`.
    ///
    /// # Errors
    ///
    /// Any [`CaptureError`]; callers surface these as retryable.
    pub async fn capture(&self, rect: &SelectionRect) -> Result<AttachmentHandle, CaptureError> {
        if rect.is_degenerate() {
            return Err(CaptureError::Degenerate);
        }

        let snapshot = self.snapshotter.snapshot().await?;
        let bounds = snapshot.image.dimensions();
        let region = map_to_snapshot(rect, snapshot.scroll, snapshot.scale, bounds)?;
        log::debug!(
            "capture crop: region={region:?} raster={}x{} scale={}",
            bounds.0,
            bounds.1,
            snapshot.scale
        );

        let png = crop_to_png(&snapshot.image, region)?;
        let payload = ImagePayload::new(png, CAPTURE_MIME, CAPTURE_FILE_NAME);
        AttachmentHandle::attach(AttachmentSource::Capture, payload, self.locators.as_ref())
            .map_err(|e| CaptureError::Locator(e.to_string()))
    }
}
