//! Persisted records used by the menu engine.

pub mod cache_key;

pub use cache_key::{CacheKeyRecord, CacheKeyStore, MemoryCacheKeyStore, PgCacheKeyStore};
