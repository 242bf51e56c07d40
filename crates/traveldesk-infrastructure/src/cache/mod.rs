//! Impersonation token storage (Redis with an in-process fallback)

pub mod redis_store;
pub mod memory_store;
pub mod fallback_store;

pub use redis_store::RedisTokenStore;
pub use memory_store::MemoryTokenStore;
pub use fallback_store::FallbackTokenStore;
