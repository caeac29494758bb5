//! HTTP client for the chat backend.
//!
//! Browser builds (`csr`) talk to the API with `gloo-net`. Native builds
//! compile the same types but every call returns [`ApiError::Unavailable`],
//! which keeps the controller and its tests free of browser dependencies.
//!
//! ERROR HANDLING
//! ==============
//! Every failure is a typed [`ApiError`]. The controller turns it into an
//! inline notice; nothing here panics or logs at error level.

#![allow(clippy::unused_async)]

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use std::rc::Rc;

use async_trait::async_trait;
use snip::ImagePayload;

use super::types::HistoryEntry;
#[cfg(any(test, feature = "csr"))]
use super::types::ChatReply;

/// Failures of a single request/response exchange.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),
    #[error("server returned {0}")]
    Status(u16),
    #[error("session expired, sign in again")]
    Unauthenticated,
    #[error("{0}")]
    Server(String),
    #[error("unexpected response: {0}")]
    Malformed(String),
    #[error("chat is not available in this build")]
    Unavailable,
}

/// The two endpoints the chat surface consumes.
#[async_trait(?Send)]
pub trait ChatApi {
    /// `POST /chat`; returns the assistant markdown.
    async fn send_chat(&self, input: &str, image: Option<&ImagePayload>, token: Option<&str>)
    -> Result<String, ApiError>;

    /// `GET /chat/history` for the authenticated user.
    async fn fetch_history(&self, token: &str) -> Result<Vec<HistoryEntry>, ApiError>;
}

#[async_trait(?Send)]
impl<T: ChatApi + ?Sized> ChatApi for Rc<T> {
    async fn send_chat(
        &self,
        input: &str,
        image: Option<&ImagePayload>,
        token: Option<&str>,
    ) -> Result<String, ApiError> {
        (**self).send_chat(input, image, token).await
    }

    async fn fetch_history(&self, token: &str) -> Result<Vec<HistoryEntry>, ApiError> {
        (**self).fetch_history(token).await
    }
}

#[cfg(any(test, feature = "csr"))]
fn chat_endpoint(base_url: &str) -> String {
    format!("{base_url}/chat")
}

#[cfg(any(test, feature = "csr"))]
fn history_endpoint(base_url: &str) -> String {
    format!("{base_url}/chat/history")
}

#[cfg(any(test, feature = "csr"))]
fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

#[cfg(any(test, feature = "csr"))]
fn check_status(status: u16) -> Result<(), ApiError> {
    match status {
        200..=299 => Ok(()),
        401 | 403 => Err(ApiError::Unauthenticated),
        other => Err(ApiError::Status(other)),
    }
}

/// Interpret a `POST /chat` response.
///
/// A failed status still prefers the body's `error` text when it has one.
#[cfg(any(test, feature = "csr"))]
fn parse_chat_reply(status: u16, body: &str) -> Result<String, ApiError> {
    if let Err(e) = check_status(status) {
        let server_error = serde_json::from_str::<ChatReply>(body)
            .ok()
            .and_then(|reply| reply.error)
            .filter(|error| !error.trim().is_empty());
        return Err(server_error.map_or(e, ApiError::Server));
    }
    let reply: ChatReply = serde_json::from_str(body).map_err(|e| ApiError::Malformed(e.to_string()))?;
    match (reply.result, reply.error) {
        (Some(result), _) if !result.trim().is_empty() => Ok(result),
        (_, Some(error)) if !error.trim().is_empty() => Err(ApiError::Server(error)),
        _ => Err(ApiError::Malformed("missing result".to_owned())),
    }
}

/// Interpret a `GET /chat/history` response.
#[cfg(any(test, feature = "csr"))]
fn parse_history(status: u16, body: &str) -> Result<Vec<HistoryEntry>, ApiError> {
    check_status(status)?;
    serde_json::from_str(body).map_err(|e| ApiError::Malformed(e.to_string()))
}

/// Production [`ChatApi`] bound to one backend base URL.
#[derive(Clone, Debug)]
pub struct HttpChatApi {
    base_url: String,
}

impl HttpChatApi {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into() }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[cfg(feature = "csr")]
fn js_error(err: &wasm_bindgen::JsValue) -> ApiError {
    ApiError::Network(err.as_string().unwrap_or_else(|| format!("{err:?}")))
}

#[cfg(feature = "csr")]
fn chat_form(input: &str, image: Option<&ImagePayload>) -> Result<web_sys::FormData, ApiError> {
    let form = web_sys::FormData::new().map_err(|e| js_error(&e))?;
    form.append_with_str("input", input).map_err(|e| js_error(&e))?;
    if let Some(image) = image {
        let blob = crate::util::blob::payload_blob(image).map_err(|e| js_error(&e))?;
        form.append_with_blob_and_filename("image", &blob, &image.file_name)
            .map_err(|e| js_error(&e))?;
    }
    Ok(form)
}

#[async_trait(?Send)]
impl ChatApi for HttpChatApi {
    async fn send_chat(
        &self,
        input: &str,
        image: Option<&ImagePayload>,
        token: Option<&str>,
    ) -> Result<String, ApiError> {
        #[cfg(feature = "csr")]
        {
            let form = chat_form(input, image)?;
            let mut builder = gloo_net::http::Request::post(&chat_endpoint(&self.base_url));
            if let Some(token) = token {
                builder = builder.header("Authorization", &bearer(token));
            }
            let resp = builder
                .body(form)
                .map_err(|e| ApiError::Network(e.to_string()))?
                .send()
                .await
                .map_err(|e| ApiError::Network(e.to_string()))?;
            let status = resp.status();
            let body = resp.text().await.map_err(|e| ApiError::Network(e.to_string()))?;
            log::debug!("chat reply: status={status} bytes={}", body.len());
            parse_chat_reply(status, &body)
        }
        #[cfg(not(feature = "csr"))]
        {
            let _ = (input, image, token);
            Err(ApiError::Unavailable)
        }
    }

    async fn fetch_history(&self, token: &str) -> Result<Vec<HistoryEntry>, ApiError> {
        #[cfg(feature = "csr")]
        {
            let resp = gloo_net::http::Request::get(&history_endpoint(&self.base_url))
                .header("Authorization", &bearer(token))
                .send()
                .await
                .map_err(|e| ApiError::Network(e.to_string()))?;
            let status = resp.status();
            let body = resp.text().await.map_err(|e| ApiError::Network(e.to_string()))?;
            parse_history(status, &body)
        }
        #[cfg(not(feature = "csr"))]
        {
            let _ = token;
            Err(ApiError::Unavailable)
        }
    }
}
