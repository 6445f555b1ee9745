//! Upstream reply producers.
//!
//! The cache never talks to a backend itself; `CachedResponder` does, through
//! the `ResponseBackend` trait defined here. `HttpBackend` is the production
//! implementation.
//!
//! Author: kelexine (<https://github.com/kelexine>)

mod client;
mod models;

pub use client::HttpBackend;
pub use models::{RespondRequest, RespondResponse};

use crate::error::Result;
use serde_json::Value;
use std::future::Future;

/// Something that can produce a reply for an input, usually slowly and at a cost.
pub trait ResponseBackend: Send + Sync {
    fn respond(
        &self,
        input: &str,
        context: Option<&Value>,
    ) -> impl Future<Output = Result<String>> + Send;
}
