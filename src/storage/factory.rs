//! 存储工厂模块
//!
//! 根据配置创建持久化存储与缓存实例。

use crate::config::config::{CacheConfig, CacheType, DatabaseConfig, DatabaseType};
use crate::error::{AppError, Result};
use crate::storage::cache::{CacheStore, MemoryCacheStore, RedisCacheStore};
use crate::storage::memory::MemoryPersonaRepository;
use crate::storage::repository::PersonaRepository;
use std::sync::Arc;
use tracing::info;

#[cfg(feature = "surrealdb")]
use crate::storage::repository::SurrealPersonaRepository;
#[cfg(feature = "surrealdb")]
use crate::storage::surrealdb::SurrealPool;

/// 存储工厂
pub struct StorageFactory;

impl StorageFactory {
    /// 根据配置创建持久化存储
    pub async fn create_repository(config: &DatabaseConfig) -> Result<Arc<dyn PersonaRepository>> {
        match config.db_type {
            #[cfg(feature = "surrealdb")]
            DatabaseType::SurrealDB => {
                let pool = SurrealPool::new(config.clone()).await?;
                info!(url = %config.url, "SurrealDB persona store initialized");
                Ok(Arc::new(SurrealPersonaRepository::new(pool)))
            }
            #[cfg(not(feature = "surrealdb"))]
            DatabaseType::SurrealDB => Err(AppError::Config(
                "SurrealDB feature is not enabled. Enable 'surrealdb' feature or use the memory database."
                    .into(),
            )),
            DatabaseType::Memory => {
                info!("In-memory persona store initialized");
                Ok(Arc::new(MemoryPersonaRepository::new()))
            }
        }
    }

    /// 根据配置创建集合缓存
    pub async fn create_cache(config: &CacheConfig) -> Result<Arc<dyn CacheStore>> {
        match config.cache_type {
            CacheType::Redis => {
                if config.redis_url.is_empty() {
                    return Err(AppError::Config("cache.redis_url is not configured".into()));
                }
                let store = RedisCacheStore::connect(&config.redis_url).await?;
                info!(url = %config.redis_url, "Redis cache initialized");
                Ok(Arc::new(store))
            }
            CacheType::Memory => {
                info!("In-memory cache initialized");
                Ok(Arc::new(MemoryCacheStore::new()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_memory_backends() {
        let db = DatabaseConfig {
            db_type: DatabaseType::Memory,
            ..Default::default()
        };
        let repo = StorageFactory::create_repository(&db).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 0);

        let cache = CacheConfig {
            cache_type: CacheType::Memory,
            ..Default::default()
        };
        let cache = StorageFactory::create_cache(&cache).await.unwrap();
        assert!(cache.members("vup_list").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_redis_requires_url() {
        let cache = CacheConfig::default();
        let result = StorageFactory::create_cache(&cache).await;
        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
