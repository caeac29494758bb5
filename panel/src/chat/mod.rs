//! Chat surface orchestration.

pub mod controller;
