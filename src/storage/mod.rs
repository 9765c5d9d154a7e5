//! 存储层模块
//!
//! 提供持久化存储（SurrealDB / 内存）与集合缓存（Redis / 内存）。

#[cfg(feature = "surrealdb")]
pub mod surrealdb;

pub mod cache;
pub mod factory;
pub mod memory;
pub mod repository;

pub use cache::{CacheStore, MemoryCacheStore, RedisCacheStore};
pub use factory::StorageFactory;
pub use memory::MemoryPersonaRepository;
pub use repository::PersonaRepository;
