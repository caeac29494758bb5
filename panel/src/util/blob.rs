//! `Blob` construction from image payloads.

use snip::ImagePayload;
use wasm_bindgen::JsValue;

/// Copy `payload` into a typed browser `Blob`.
///
/// # Errors
///
/// Returns the JS exception when the browser refuses to build the blob.
pub fn payload_blob(payload: &ImagePayload) -> Result<web_sys::Blob, JsValue> {
    let bytes = js_sys::Uint8Array::from(&payload.bytes[..]);
    let parts = js_sys::Array::of1(&bytes);
    let options = web_sys::BlobPropertyBag::new();
    options.set_type(&payload.mime);
    web_sys::Blob::new_with_u8_array_sequence_and_options(&parts, &options)
}
