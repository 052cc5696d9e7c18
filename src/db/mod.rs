pub mod cache;
pub mod memory;
pub mod postgres;
mod repository;

pub use cache::{Cache, CacheKey};
pub use memory::MemoryRepository;
pub use postgres::{create_pool, run_migrations, PgRepository};
pub use repository::Repository;
