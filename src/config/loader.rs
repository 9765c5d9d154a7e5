use crate::config::config::AppConfig;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::PathBuf;

/// 环境变量前缀
pub const ENV_PREFIX: &str = "VUPTRACK_";

/// 配置加载器
pub struct ConfigLoader;

impl ConfigLoader {
    /// 从默认路径加载配置
    ///
    /// 优先级（后者覆盖前者）：
    /// 1. 开发环境默认值
    /// 2. `VUPTRACK_CONFIG` 指定的文件，或 ./config.toml
    /// 3. `VUPTRACK_` 前缀的环境变量（`__` 分隔层级）
    pub fn load() -> Result<AppConfig, figment::Error> {
        let path = std::env::var(format!("{ENV_PREFIX}CONFIG"))
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_config_path());
        Self::load_from(path)
    }

    /// 从指定路径加载配置
    pub fn load_from(path: PathBuf) -> Result<AppConfig, figment::Error> {
        Self::figment(path).extract()
    }

    fn figment(path: PathBuf) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::development()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__").global())
    }

    /// 验证配置
    pub fn validate(config: &AppConfig) -> Result<(), ConfigValidationError> {
        if config.discovery.interval == 0 {
            return Err(ConfigValidationError::InvalidInterval);
        }

        if config.discovery.cooldown == 0 {
            return Err(ConfigValidationError::InvalidCooldown);
        }

        if config.discovery.approved_roles.is_empty() {
            return Err(ConfigValidationError::EmptyApprovedRoles);
        }

        if config.discovery.io_timeout == 0 {
            return Err(ConfigValidationError::InvalidTimeout);
        }

        if config.upstream.listening_url.is_empty() {
            return Err(ConfigValidationError::MissingUpstreamUrl);
        }

        if config.upstream.user_info_url.is_empty() {
            return Err(ConfigValidationError::MissingUserInfoUrl);
        }

        if config.server.port == 0 {
            return Err(ConfigValidationError::InvalidPort);
        }

        Ok(())
    }
}

/// 配置验证错误
#[derive(thiserror::Error, Debug)]
pub enum ConfigValidationError {
    #[error("调度间隔无效，必须大于 0")]
    InvalidInterval,

    #[error("冷却时长无效，必须大于 0")]
    InvalidCooldown,

    #[error("认证角色列表不能为空")]
    EmptyApprovedRoles,

    #[error("I/O 超时无效，必须大于 0")]
    InvalidTimeout,

    #[error("监听服务 URL 未配置")]
    MissingUpstreamUrl,

    #[error("用户资讯接口 URL 未配置")]
    MissingUserInfoUrl,

    #[error("服务端口无效，必须大于 0")]
    InvalidPort,
}

/// 获取默认配置文件路径
pub fn default_config_path() -> PathBuf {
    PathBuf::from("config.toml")
}
