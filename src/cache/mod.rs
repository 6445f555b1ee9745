// Response cache module
// Author: kelexine (https://github.com/kelexine)

pub mod clock;
pub mod key;
pub mod manager;
pub mod models;
pub mod preload;
pub mod sweeper;

pub use crate::config::CacheConfig;
pub use clock::{Clock, ManualClock, SystemClock};
pub use manager::ResponseCache;
pub use models::{CacheEntry, CacheStats, PersistedConfig, Snapshot, TopEntry};
pub use sweeper::{spawn_sweeper, SweeperHandle};
