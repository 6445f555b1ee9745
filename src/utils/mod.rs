//! Utility functions and helpers for the replycache service.
//!
//! # Submodules
//!
//! - `logging`: Tracing initialization and log-safe input previews.
//! - `retry`: Retry with backoff for upstream backend calls.
//!
//! Author: kelexine (<https://github.com/kelexine>)

pub mod logging;
pub mod retry;
