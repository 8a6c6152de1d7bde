//! # 应用配置结构定义

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

use crate::ensure_config;
use crate::error::Result;

/// 应用主配置结构
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// 网关监听配置
    pub server: ListenerConfig,
    /// 资源（电影）服务配置
    pub movie_service: MovieServiceConfig,
    /// 外部身份提供商配置
    pub provider: ProviderConfig,
    /// 本地令牌签发配置
    pub local_auth: LocalAuthConfig,
    /// 认证模式
    pub auth: AuthSettings,
    /// CORS 配置
    pub cors: CorsConfig,
    /// 转发到资源服务的超时时间（秒）
    pub upstream_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ListenerConfig::default(),
            movie_service: MovieServiceConfig::default(),
            provider: ProviderConfig::default(),
            local_auth: LocalAuthConfig::default(),
            auth: AuthSettings::default(),
            cors: CorsConfig::default(),
            upstream_timeout_secs: 30,
        }
    }
}

/// 监听器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenerConfig {
    /// 监听主机
    pub host: String,
    /// 监听端口
    pub port: u16,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl ListenerConfig {
    /// 获取绑定地址
    pub fn bind_address(&self) -> std::io::Result<SocketAddr> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse().map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("Invalid address '{addr}': {e}"),
            )
        })
    }
}

/// 资源服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MovieServiceConfig {
    /// 是否在网关进程内同时启动电影服务
    pub embedded: bool,
    /// 内嵌电影服务的监听配置
    pub listener: ListenerConfig,
    /// 网关访问电影服务使用的基础URL
    pub base_url: String,
}

impl Default for MovieServiceConfig {
    fn default() -> Self {
        Self {
            embedded: true,
            listener: ListenerConfig {
                host: "127.0.0.1".to_string(),
                port: 8002,
            },
            base_url: "http://127.0.0.1:8002".to_string(),
        }
    }
}

/// 外部身份提供商（OAuth2）配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// 授权页面地址（浏览器跳转目标）
    pub authorization_url: String,
    /// 令牌端点
    pub token_url: String,
    /// 用户信息端点
    pub userinfo_url: String,
    pub client_id: String,
    pub client_secret: String,
    /// 回调地址，必须与提供商处登记的一致
    pub redirect_uri: String,
    /// 申请的权限范围
    pub scopes: Vec<String>,
    /// 单次请求超时时间（秒）
    pub request_timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            authorization_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            userinfo_url: "https://www.googleapis.com/oauth2/v3/userinfo".to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: "http://localhost:8000/auth/callback".to_string(),
            scopes: vec!["email".to_string(), "profile".to_string(), "openid".to_string()],
            request_timeout_secs: 30,
        }
    }
}

impl ProviderConfig {
    /// 请求超时
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// 本地签名令牌配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalAuthConfig {
    /// HS256 对称签名密钥
    pub signing_key: String,
    /// 令牌有效期（分钟）
    pub token_expiry_minutes: i64,
    /// 已知账户用户名
    pub username: String,
    /// 已知账户密码
    pub password: String,
}

impl Default for LocalAuthConfig {
    fn default() -> Self {
        Self {
            signing_key: String::new(),
            token_expiry_minutes: 30,
            username: "test@test.com".to_string(),
            password: "11111111".to_string(),
        }
    }
}

/// 凭据校验方式，启动时选定一次
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationMode {
    /// 转发到身份提供商的用户信息端点
    #[default]
    Delegated,
    /// 本地校验 HS256 签名与过期时间
    Local,
}

impl VerificationMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Delegated => "delegated",
            Self::Local => "local",
        }
    }
}

impl std::str::FromStr for VerificationMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "delegated" => Ok(Self::Delegated),
            "local" => Ok(Self::Local),
            other => Err(format!("unknown verification mode: {other}")),
        }
    }
}

/// 认证设置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub verification_mode: VerificationMode,
    /// 转发资源请求前是否先验证凭据；关闭时网关只检查认证头格式
    pub verify_resource_requests: bool,
}

/// CORS 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub enabled: bool,
    /// 允许的源，`*` 表示任意
    pub origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            origins: vec!["*".to_string()],
        }
    }
}

impl AppConfig {
    /// 资源服务转发超时
    #[must_use]
    pub const fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<()> {
        ensure_config!(self.server.port != 0, "网关端口不能为0");
        ensure_config!(self.upstream_timeout_secs > 0, "upstream_timeout_secs 必须大于0");
        ensure_config!(
            url::Url::parse(&self.movie_service.base_url).is_ok(),
            "movie_service.base_url 不是合法URL: {}",
            self.movie_service.base_url
        );
        if self.movie_service.embedded {
            ensure_config!(self.movie_service.listener.port != 0, "电影服务端口不能为0");
            ensure_config!(
                self.movie_service.listener.port != self.server.port
                    || self.movie_service.listener.host != self.server.host,
                "电影服务与网关不能监听同一地址: {}:{}",
                self.server.host,
                self.server.port
            );
        }

        match self.auth.verification_mode {
            VerificationMode::Delegated => {
                let provider = &self.provider;
                for (name, endpoint) in [
                    ("provider.token_url", &provider.token_url),
                    ("provider.userinfo_url", &provider.userinfo_url),
                    ("provider.authorization_url", &provider.authorization_url),
                ] {
                    ensure_config!(
                        url::Url::parse(endpoint).is_ok(),
                        "{} 不是合法URL: '{}'",
                        name,
                        endpoint
                    );
                }
                ensure_config!(!provider.client_id.is_empty(), "provider.client_id 不能为空");
                ensure_config!(
                    !provider.redirect_uri.is_empty(),
                    "provider.redirect_uri 不能为空"
                );
                ensure_config!(
                    provider.request_timeout_secs > 0,
                    "provider.request_timeout_secs 必须大于0"
                );
            }
            VerificationMode::Local => {
                let local = &self.local_auth;
                ensure_config!(!local.signing_key.is_empty(), "local_auth.signing_key 不能为空");
                ensure_config!(
                    local.token_expiry_minutes > 0,
                    "local_auth.token_expiry_minutes 必须大于0"
                );
                ensure_config!(!local.username.is_empty(), "local_auth.username 不能为空");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delegated_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.provider.client_id = "client-id".to_string();
        config.provider.client_secret = "client-secret".to_string();
        config
    }

    #[test]
    fn test_default_listeners_and_mode() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.movie_service.listener.port, 8002);
        assert_eq!(config.local_auth.token_expiry_minutes, 30);
        assert_eq!(config.auth.verification_mode, VerificationMode::Delegated);
        assert_eq!(config.provider.scopes, vec!["email", "profile", "openid"]);
    }

    #[test]
    fn test_delegated_mode_requires_client_id() {
        let mut config = delegated_config();
        assert!(config.validate().is_ok());

        config.provider.client_id.clear();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("client_id"));
    }

    #[test]
    fn test_local_mode_requires_signing_key() {
        let mut config = delegated_config();
        config.auth.verification_mode = VerificationMode::Local;
        assert!(config.validate().is_err());

        config.local_auth.signing_key = "secret".to_string();
        assert!(config.validate().is_ok());

        config.local_auth.token_expiry_minutes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_endpoints_must_be_urls() {
        let mut config = delegated_config();
        config.provider.token_url = "not a url".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("provider.token_url"));

        let mut config = delegated_config();
        config.movie_service.base_url = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_upstream_timeout_is_rejected() {
        let mut config = delegated_config();
        config.upstream_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_verification_mode_parsing() {
        assert_eq!("LOCAL".parse::<VerificationMode>(), Ok(VerificationMode::Local));
        assert_eq!(
            " delegated ".parse::<VerificationMode>(),
            Ok(VerificationMode::Delegated)
        );
        assert!("jwt".parse::<VerificationMode>().is_err());
    }

    #[test]
    fn test_toml_sections_deserialize() {
        let raw = r#"
            upstream_timeout_secs = 10

            [server]
            host = "127.0.0.1"
            port = 9000

            [auth]
            verification_mode = "local"

            [local_auth]
            signing_key = "k"
        "#;
        let config: AppConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.auth.verification_mode, VerificationMode::Local);
        assert_eq!(config.local_auth.username, "test@test.com");
        assert_eq!(config.upstream_timeout(), Duration::from_secs(10));
    }
}
