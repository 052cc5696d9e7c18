mod backend;
#[allow(clippy::module_inception)]
mod cache;

mod macros;

pub use backend::create_redis_client;
pub use backend::{CacheBackend, MemoryBackend, RedisBackend};
pub use cache::{Cache, CacheKey, CacheWriterHandle, DETAILS_TTL, POPULAR_TTL, TRENDING_TTL};
