use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// 持久化存储类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    /// SurrealDB
    #[default]
    SurrealDB,
    /// 进程内存储（开发 / 测试）
    Memory,
}

/// 缓存存储类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CacheType {
    /// Redis
    #[default]
    Redis,
    /// 进程内存储（开发 / 测试）
    Memory,
}

/// 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    /// 存储类型
    pub db_type: DatabaseType,
    /// SurrealDB 连接地址
    pub url: String,
    /// 命名空间
    pub namespace: String,
    /// 数据库名称
    pub database: String,
    /// 用户名（为空时跳过登录）
    pub username: String,
    /// 密码
    pub password: String,
    /// 连接超时（秒）
    pub connection_timeout: u64,
}

/// 缓存配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CacheConfig {
    /// 缓存类型
    pub cache_type: CacheType,
    /// Redis 地址
    pub redis_url: String,
    /// 已知虚拟主播集合键
    pub vup_list_key: String,
    /// 黑名单集合键
    pub black_list_key: String,
}

/// 上游服务配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct UpstreamConfig {
    /// 监听服务地址（提供直播间列表与直播间资讯）
    pub listening_url: String,
    /// 用户资讯接口地址
    pub user_info_url: String,
    /// 第三方虚拟主播列表地址
    pub vup_list_url: String,
    /// 请求 User-Agent
    pub user_agent: String,
    /// 请求超时（秒）
    pub request_timeout: u64,
}

/// 发现与对账任务配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// 调度间隔（秒）
    pub interval: u64,
    /// 限流冷却时长（秒）
    pub cooldown: u64,
    /// 视为虚拟主播的认证角色
    pub approved_roles: Vec<i32>,
    /// 用户资讯接口的限流响应码
    pub rate_limit_code: i32,
    /// 清理任务相对于其他任务的延迟（秒）
    pub prune_delay: u64,
    /// 同一任务上一次仍在执行时是否跳过本次
    pub skip_if_busy: bool,
    /// 单次 I/O 操作超时（秒）
    pub io_timeout: u64,
}

impl DiscoveryConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown)
    }

    pub fn prune_delay(&self) -> Duration {
        Duration::from_secs(self.prune_delay)
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_secs(self.io_timeout)
    }
}

/// 服务器配置（健康检查 / 指标端点）
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// 服务地址
    pub host: String,
    /// 服务端口
    pub port: u16,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: String,
    /// 结构化日志格式
    pub structured: bool,
    /// 日志文件目录
    pub log_dir: Option<PathBuf>,
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// 数据库配置
    pub database: DatabaseConfig,
    /// 缓存配置
    pub cache: CacheConfig,
    /// 上游服务配置
    pub upstream: UpstreamConfig,
    /// 发现任务配置
    pub discovery: DiscoveryConfig,
    /// 服务器配置
    pub server: ServerConfig,
    /// 日志配置
    pub logging: LoggingConfig,
    /// 应用名称
    pub app_name: String,
    /// 环境
    pub environment: String,
}

impl AppConfig {
    /// 创建开发环境配置
    pub fn development() -> Self {
        Self {
            database: DatabaseConfig {
                db_type: DatabaseType::SurrealDB,
                url: "ws://localhost:8000".into(),
                namespace: "vup_tracker".into(),
                database: "personas".into(),
                username: "root".into(),
                password: "root".into(),
                connection_timeout: 30,
            },
            cache: CacheConfig {
                cache_type: CacheType::Redis,
                redis_url: "redis://localhost:6379".into(),
                vup_list_key: "vup_list".into(),
                black_list_key: "vup_black_list".into(),
            },
            upstream: UpstreamConfig {
                listening_url: "http://localhost:8080".into(),
                user_info_url: "https://api.bilibili.com/x/space/acc/info".into(),
                vup_list_url: "http://localhost:8080/vup_list".into(),
                user_agent: concat!("vup-tracker/", env!("CARGO_PKG_VERSION")).into(),
                request_timeout: 15,
            },
            discovery: DiscoveryConfig {
                interval: 60,
                cooldown: 600,
                approved_roles: vec![1, 2, 3],
                rate_limit_code: -412,
                prune_delay: 5,
                skip_if_busy: false,
                io_timeout: 30,
            },
            server: ServerConfig {
                host: "0.0.0.0".into(),
                port: 8086,
            },
            logging: LoggingConfig {
                level: "debug".into(),
                structured: false,
                log_dir: None,
            },
            app_name: "vup-tracker".into(),
            environment: "development".into(),
        }
    }
}
