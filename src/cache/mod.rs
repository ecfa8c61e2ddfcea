//! In-process response cache.
//!
//! Read paths memoize list and detail payloads under keys built by [`generate_key`];
//! write paths drop a whole namespace with [`ResponseCache::delete_pattern`]. A
//! [`CacheSweeper`] bounds memory held by keys that are never read again.

mod clock;
mod config;
mod keys;
mod lock;
mod store;
mod sweeper;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::CacheConfig;
pub use keys::{KeyPattern, generate_key};
pub use store::{
    METRIC_CACHE_EXPIRED, METRIC_CACHE_HIT, METRIC_CACHE_INVALIDATED, METRIC_CACHE_MISS,
    METRIC_CACHE_SET, ResponseCache,
};
pub use sweeper::CacheSweeper;
