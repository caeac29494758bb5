//! Client-side state containers shared by the chat controller and the UI.

pub mod auth;
pub mod composer;
pub mod conversation;
