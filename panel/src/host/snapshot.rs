//! Surface snapshots through the screen-capture API.
//!
//! The browser has no direct "rasterize this document" call, so the snapshot
//! asks the user to share the current tab, grabs one video frame and stops the
//! stream right away. The raster scale is the frame width over the viewport
//! width; pixel-exact alignment across displays is not guaranteed.

use async_trait::async_trait;
use snip::{CaptureError, Snapshot, SurfaceSnapshotter};

#[cfg(feature = "csr")]
use snip::Point;
#[cfg(feature = "csr")]
use wasm_bindgen::{JsCast, JsValue};
#[cfg(feature = "csr")]
use wasm_bindgen_futures::JsFuture;

/// Frames to wait for the video to report its size.
#[cfg(feature = "csr")]
const FRAME_WAIT_ATTEMPTS: u32 = 20;
#[cfg(feature = "csr")]
const FRAME_WAIT_MS: u32 = 50;

/// Snapshotter backed by `getDisplayMedia`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisplayMediaSnapshotter;

#[async_trait(?Send)]
impl SurfaceSnapshotter for DisplayMediaSnapshotter {
    async fn snapshot(&self) -> Result<Snapshot, CaptureError> {
        #[cfg(feature = "csr")]
        {
            grab_frame().await
        }
        #[cfg(not(feature = "csr"))]
        {
            Err(CaptureError::Snapshot("screen capture needs a browser".to_owned()))
        }
    }
}

#[cfg(feature = "csr")]
fn snapshot_error(err: &JsValue) -> CaptureError {
    CaptureError::Snapshot(super::describe_js(err))
}

#[cfg(feature = "csr")]
fn missing(what: &str) -> CaptureError {
    CaptureError::Snapshot(format!("{what} unavailable"))
}

/// Stops every track of the shared stream on drop.
#[cfg(feature = "csr")]
struct StreamGuard(web_sys::MediaStream);

#[cfg(feature = "csr")]
impl Drop for StreamGuard {
    fn drop(&mut self) {
        for track in self.0.get_tracks().iter() {
            if let Ok(track) = track.dyn_into::<web_sys::MediaStreamTrack>() {
                track.stop();
            }
        }
    }
}

#[cfg(feature = "csr")]
async fn grab_frame() -> Result<Snapshot, CaptureError> {
    let window = web_sys::window().ok_or_else(|| missing("window"))?;
    let document = window.document().ok_or_else(|| missing("document"))?;
    let devices = window.navigator().media_devices().map_err(|e| snapshot_error(&e))?;

    let constraints = web_sys::DisplayMediaStreamConstraints::new();
    constraints.set_video(&JsValue::TRUE);
    constraints.set_audio(&JsValue::FALSE);
    let promise = devices.get_display_media_with_constraints(&constraints).map_err(|e| snapshot_error(&e))?;
    let stream = JsFuture::from(promise)
        .await
        .map_err(|e| snapshot_error(&e))?
        .dyn_into::<web_sys::MediaStream>()
        .map_err(|e| snapshot_error(&e))?;
    let stream = StreamGuard(stream);

    let video = document
        .create_element("video")
        .map_err(|e| snapshot_error(&e))?
        .dyn_into::<web_sys::HtmlVideoElement>()
        .map_err(|e| snapshot_error(&e))?;
    video.set_muted(true);
    video.set_src_object(Some(&stream.0));
    let playing = video.play().map_err(|e| snapshot_error(&e))?;
    JsFuture::from(playing).await.map_err(|e| snapshot_error(&e))?;

    let mut attempts = 0;
    while video.video_width() == 0 || video.video_height() == 0 {
        attempts += 1;
        if attempts > FRAME_WAIT_ATTEMPTS {
            return Err(missing("video frame"));
        }
        gloo_timers::future::TimeoutFuture::new(FRAME_WAIT_MS).await;
    }
    let (width, height) = (video.video_width(), video.video_height());

    let canvas = document
        .create_element("canvas")
        .map_err(|e| snapshot_error(&e))?
        .dyn_into::<web_sys::HtmlCanvasElement>()
        .map_err(|e| snapshot_error(&e))?;
    canvas.set_width(width);
    canvas.set_height(height);
    let context = canvas
        .get_context("2d")
        .map_err(|e| snapshot_error(&e))?
        .ok_or_else(|| missing("2d context"))?
        .dyn_into::<web_sys::CanvasRenderingContext2d>()
        .map_err(|e| snapshot_error(&e))?;
    context.draw_image_with_html_video_element(&video, 0.0, 0.0).map_err(|e| snapshot_error(&e))?;
    let scroll = Point::new(window.scroll_x().unwrap_or(0.0), window.scroll_y().unwrap_or(0.0));
    drop(stream);

    let pixels = context
        .get_image_data(0.0, 0.0, f64::from(width), f64::from(height))
        .map_err(|e| snapshot_error(&e))?;
    let viewport_width = window.inner_width().ok().and_then(|w| w.as_f64()).filter(|w| *w > 0.0);
    let scale = viewport_width.map_or(1.0, |w| f64::from(width) / w);
    log::debug!("surface snapshot: {width}x{height} scale={scale}");
    Snapshot::from_rgba(width, height, pixels.data().0, scale, scroll)
}
