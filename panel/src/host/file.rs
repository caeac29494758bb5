//! Reading picked or dropped files into image payloads.

use snip::{AttachmentError, ImagePayload};
use wasm_bindgen_futures::JsFuture;

/// Load `file` into memory, refusing anything that is not an image.
///
/// # Errors
///
/// [`AttachmentError::NotAnImage`] for non-image MIME types and
/// [`AttachmentError::Locator`] when the browser cannot read the file.
pub async fn read_image_file(file: &web_sys::File) -> Result<ImagePayload, AttachmentError> {
    let name = file.name();
    let mime = file.type_();
    if !mime.starts_with("image/") {
        return Err(AttachmentError::NotAnImage(name));
    }
    let buffer = JsFuture::from(file.array_buffer())
        .await
        .map_err(|e| AttachmentError::Locator(super::describe_js(&e)))?;
    let bytes = js_sys::Uint8Array::new(&buffer).to_vec();
    Ok(ImagePayload::new(bytes, mime, name))
}

/// First file of a `FileList`, if any.
#[must_use]
pub fn first_file(files: Option<web_sys::FileList>) -> Option<web_sys::File> {
    files.and_then(|list| list.get(0))
}
