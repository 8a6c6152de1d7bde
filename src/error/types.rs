//! # 错误类型定义

use axum::http::StatusCode;
use thiserror::Error;

use super::auth::AuthError;

/// 应用主要错误类型
#[derive(Debug, Error)]
pub enum GatewayError {
    /// 配置相关错误
    #[error("配置错误: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 网络通信错误（上游不可达、超时）
    #[error("网络错误: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 认证和授权错误
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// 资源服务返回的非成功响应，状态码与响应体原样透传
    #[error("上游服务错误: status={status}")]
    Upstream { status: u16, body: String },

    /// IO相关错误
    #[error("IO错误: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// 序列化/反序列化错误
    #[error("序列化错误: {message}")]
    Serialization {
        message: String,
        #[source]
        source: anyhow::Error,
    },

    /// 服务器启动错误
    #[error("服务器启动错误: {message}")]
    ServerStart {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 附加上下文的错误
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<GatewayError>,
    },
}

impl GatewayError {
    /// 将错误转换为HTTP状态码和错误代码
    #[must_use]
    pub fn to_http_response_parts(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Config { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
            Self::Network { .. } => (StatusCode::BAD_GATEWAY, "NETWORK_ERROR"),
            Self::Auth(err) => err.status_and_code(),
            Self::Upstream { status, .. } => (
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY),
                "UPSTREAM_ERROR",
            ),
            Self::Io { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
            Self::Serialization { .. } => (StatusCode::BAD_REQUEST, "SERIALIZATION_ERROR"),
            Self::ServerStart { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "SERVER_START_ERROR"),
            Self::Context { source, .. } => source.to_http_response_parts(),
        }
    }

    /// 上游状态码（若错误来自上游HTTP响应）
    #[must_use]
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            Self::Auth(err) => err.upstream_status(),
            Self::Upstream { status, .. } => Some(*status),
            Self::Context { source, .. } => source.upstream_status(),
            _ => None,
        }
    }

    /// 上游原始响应体（若错误来自上游HTTP响应）
    #[must_use]
    pub fn upstream_body(&self) -> Option<&str> {
        match self {
            Self::Auth(err) => err.upstream_body(),
            Self::Upstream { body, .. } => Some(body.as_str()),
            Self::Context { source, .. } => source.upstream_body(),
            _ => None,
        }
    }

    /// 创建配置错误
    pub fn config<T: Into<String>>(message: T) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    /// 创建带来源的配置错误
    pub fn config_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建带来源的序列化错误（请求体无法解析等）
    pub fn serialization_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Serialization {
            message: message.into(),
            source: source.into(),
        }
    }

    /// 创建带来源的网络错误
    pub fn network_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Network {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建上游透传错误
    pub fn upstream<T: Into<String>>(status: u16, body: T) -> Self {
        Self::Upstream {
            status,
            body: body.into(),
        }
    }

    /// 创建带来源的服务器启动错误
    pub fn server_start_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::ServerStart {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

// 自动转换常见错误类型
impl From<std::io::Error> for GatewayError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: "文件操作失败".to_string(),
            source: err,
        }
    }
}

impl From<toml::de::Error> for GatewayError {
    fn from(err: toml::de::Error) -> Self {
        Self::config_with_source("TOML解析失败", err)
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: "JSON处理失败".to_string(),
            source: err.into(),
        }
    }
}

// Reqwest错误转换
impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        Self::network_with_source("HTTP请求失败", err)
    }
}
