//! Networking for the chat backend.
//!
//! SYSTEM CONTEXT
//! ==============
//! `api` performs the HTTP exchanges and `types` defines the wire schema.

pub mod api;
pub mod types;
