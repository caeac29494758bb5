//! Small browser-facing helpers.

#[cfg(feature = "csr")]
pub mod blob;
pub mod clock;
pub mod markdown;
pub mod persistence;
