use crate::config::config::DatabaseConfig;
use crate::error::{AppError, Result};
use std::time::Duration;
use surrealdb::{
    Surreal,
    engine::any::{Any, connect},
    opt::auth::Root,
};
use tracing::info;

/// 虚拟主播表结构，`vup:<uid>` 为记录 ID
const SCHEMA: &str = "
    DEFINE TABLE IF NOT EXISTS vup SCHEMALESS;
    DEFINE INDEX IF NOT EXISTS vup_room_id ON vup FIELDS room_id;
";

/// SurrealDB 连接池
///
/// `Surreal<Any>` 内部共享同一个连接，克隆开销很小。
#[derive(Clone)]
pub struct SurrealPool {
    db: Surreal<Any>,
}

impl SurrealPool {
    /// 创建新的连接池并确保表结构存在
    pub async fn new(config: DatabaseConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.connection_timeout.max(1));
        let db = tokio::time::timeout(timeout, Self::connect(&config))
            .await
            .map_err(|_| AppError::Timeout(format!("connecting to {}", config.url)))??;

        db.query(SCHEMA).await?.check()?;
        info!(url = %config.url, namespace = %config.namespace, "SurrealDB schema ready");

        Ok(Self { db })
    }

    async fn connect(config: &DatabaseConfig) -> Result<Surreal<Any>> {
        let db: Surreal<Any> = connect(&config.url).await?;

        // 认证（嵌入式引擎无需登录）
        if !config.username.is_empty() {
            db.signin(Root {
                username: &config.username,
                password: &config.password,
            })
            .await?;
        }

        // 选择命名空间和数据库
        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await?;

        Ok(db)
    }

    /// 获取内部数据库实例
    pub fn inner(&self) -> &Surreal<Any> {
        &self.db
    }
}
