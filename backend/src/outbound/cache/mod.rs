//! Cache adapters implementing the [`KeyValueCache`] port.
//!
//! - [`RedisKeyValueCache`]: shared cache backed by Redis through `bb8-redis`.
//! - [`InMemoryKeyValueCache`]: process-local fallback when no Redis URL is
//!   configured.
//!
//! [`KeyValueCache`]: crate::domain::ports::KeyValueCache

mod memory;
mod redis;

pub use memory::InMemoryKeyValueCache;
pub use redis::{RedisCacheConfig, RedisCacheError, RedisKeyValueCache};
