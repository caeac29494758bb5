//! Leptos UI components.

pub mod chat_panel;
