pub mod cache_store;
pub mod scheduled_tasks;

pub use cache_store::{CacheError, CacheStore, InMemoryCacheStore, RedisCacheStore};
pub use scheduled_tasks::{InMemoryScheduledTaskStore, PgScheduledTaskStore, ScheduledTaskStore};
