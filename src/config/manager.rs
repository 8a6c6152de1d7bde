//! # 配置管理器
//!
//! 从 TOML 文件加载配置，应用 `GATEWAY_` 前缀的环境变量覆盖，并在返回前完成验证

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::AppConfig;
use crate::error::{Context, GatewayError, Result};
use crate::linfo;
use crate::logging::{LogComponent, LogStage};

const ENV_PREFIX: &str = "GATEWAY_";

/// 配置管理器
#[derive(Debug, Clone)]
pub struct ConfigManager {
    /// 当前配置（只读）
    config: Arc<AppConfig>,
    /// 配置来源文件，`None` 表示使用默认值
    source: Option<PathBuf>,
}

impl ConfigManager {
    /// 按默认规则定位配置文件并加载
    ///
    /// 优先级：显式路径 > `GATEWAY_CONFIG_PATH` > `config/config.{RUST_ENV}.toml`
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_path {
            return Self::from_file(path);
        }
        if let Ok(path) = env::var("GATEWAY_CONFIG_PATH") {
            return Self::from_file(path);
        }

        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        let default_path = PathBuf::from(format!("config/config.{env_name}.toml"));
        if default_path.exists() {
            Self::from_file(default_path)
        } else {
            warn!(
                "配置文件不存在: {}, 使用默认配置与环境变量",
                default_path.display()
            );
            Self::from_config(AppConfig::default(), &Self::collect_env_overrides(env::vars()))
        }
    }

    /// 从指定文件创建配置管理器
    pub fn from_file(config_path: impl AsRef<Path>) -> Result<Self> {
        let config_path = config_path.as_ref();
        let config = Self::load_config_file(config_path)?;
        let overrides = Self::collect_env_overrides(env::vars());

        let mut manager = Self::from_config(config, &overrides)?;
        manager.source = Some(config_path.to_path_buf());
        linfo!(
            "system",
            LogStage::Configuration,
            LogComponent::Config,
            "load_config",
            &format!("配置加载完成: {}", config_path.display())
        );
        Ok(manager)
    }

    /// 基于已有配置与覆盖项构建
    pub fn from_config(mut config: AppConfig, overrides: &HashMap<String, String>) -> Result<Self> {
        Self::apply_env_overrides(&mut config, overrides)?;
        config.validate()?;

        info!(
            "- 认证模式: {}, 环境变量覆盖: {} 个",
            config.auth.verification_mode.as_str(),
            overrides.len()
        );

        Ok(Self {
            config: Arc::new(config),
            source: None,
        })
    }

    /// 获取当前配置
    #[must_use]
    pub fn config(&self) -> Arc<AppConfig> {
        Arc::clone(&self.config)
    }

    /// 配置来源文件
    #[must_use]
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// 加载配置文件
    fn load_config_file(path: &Path) -> Result<AppConfig> {
        if !path.exists() {
            return Err(GatewayError::config(format!(
                "配置文件不存在: {}",
                path.display()
            )));
        }

        let config_content = std::fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))?;

        toml::from_str(&config_content)
            .with_context(|| format!("解析配置文件失败: {}", path.display()))
    }

    /// 收集 `GATEWAY_` 前缀的环境变量，键为去掉前缀后的大写名称
    pub fn collect_env_overrides<I>(vars: I) -> HashMap<String, String>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let overrides: HashMap<String, String> = vars
            .into_iter()
            .filter_map(|(key, value)| {
                key.strip_prefix(ENV_PREFIX)
                    .filter(|rest| *rest != "CONFIG_PATH")
                    .map(|rest| (rest.to_ascii_uppercase(), value))
            })
            .collect();

        debug!("发现 {} 个环境变量覆盖", overrides.len());
        overrides
    }

    /// 应用环境变量覆盖
    fn apply_env_overrides(
        config: &mut AppConfig,
        overrides: &HashMap<String, String>,
    ) -> Result<()> {
        for (key, value) in overrides {
            debug!(
                "应用环境变量覆盖: {} = {}",
                key,
                if key.contains("PASSWORD") || key.contains("KEY") || key.contains("SECRET") {
                    "***"
                } else {
                    value
                }
            );
            Self::apply_override(config, key, value)?;
        }
        Ok(())
    }

    /// 将单个覆盖项写入配置对象
    fn apply_override(config: &mut AppConfig, key: &str, value: &str) -> Result<()> {
        match key {
            "SERVER_HOST" => config.server.host = value.to_string(),
            "SERVER_PORT" => config.server.port = parse_value(key, value)?,
            "UPSTREAM_TIMEOUT_SECS" => config.upstream_timeout_secs = parse_value(key, value)?,
            "MOVIE_SERVICE_EMBEDDED" => config.movie_service.embedded = parse_value(key, value)?,
            "MOVIE_SERVICE_HOST" => config.movie_service.listener.host = value.to_string(),
            "MOVIE_SERVICE_PORT" => config.movie_service.listener.port = parse_value(key, value)?,
            "MOVIE_SERVICE_BASE_URL" => config.movie_service.base_url = value.to_string(),
            "PROVIDER_AUTHORIZATION_URL" => config.provider.authorization_url = value.to_string(),
            "PROVIDER_TOKEN_URL" => config.provider.token_url = value.to_string(),
            "PROVIDER_USERINFO_URL" => config.provider.userinfo_url = value.to_string(),
            "PROVIDER_CLIENT_ID" => config.provider.client_id = value.to_string(),
            "PROVIDER_CLIENT_SECRET" => config.provider.client_secret = value.to_string(),
            "PROVIDER_REDIRECT_URI" => config.provider.redirect_uri = value.to_string(),
            "PROVIDER_SCOPES" => {
                config.provider.scopes = value.split_whitespace().map(str::to_string).collect();
            }
            "PROVIDER_REQUEST_TIMEOUT_SECS" => {
                config.provider.request_timeout_secs = parse_value(key, value)?;
            }
            "LOCAL_AUTH_SIGNING_KEY" => config.local_auth.signing_key = value.to_string(),
            "LOCAL_AUTH_TOKEN_EXPIRY_MINUTES" => {
                config.local_auth.token_expiry_minutes = parse_value(key, value)?;
            }
            "LOCAL_AUTH_USERNAME" => config.local_auth.username = value.to_string(),
            "LOCAL_AUTH_PASSWORD" => config.local_auth.password = value.to_string(),
            "AUTH_VERIFICATION_MODE" => {
                config.auth.verification_mode = value.parse().map_err(GatewayError::config)?;
            }
            "AUTH_VERIFY_RESOURCE_REQUESTS" => {
                config.auth.verify_resource_requests = parse_value(key, value)?;
            }
            "CORS_ENABLED" => config.cors.enabled = parse_value(key, value)?,
            "CORS_ORIGINS" => {
                config.cors.origins = value.split(',').map(|s| s.trim().to_string()).collect();
            }
            _ => warn!("未知的配置项，忽略环境变量覆盖: {ENV_PREFIX}{key}"),
        }
        Ok(())
    }
}

fn parse_value<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value.parse().map_err(|e| {
        GatewayError::config_with_source(format!("无效的配置值: {ENV_PREFIX}{key}={value}"), e)
    })
}
