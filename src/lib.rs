// replycache - bounded, TTL-aware response cache for a chat assistant backend
// Author: kelexine (https://github.com/kelexine)

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod metrics;
pub mod responder;
pub mod server;
pub mod snapshot;
pub mod upstream;
pub mod utils;
