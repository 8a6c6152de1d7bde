//! # 外部身份提供商
//!
//! 身份提供商被建模为两次 HTTP 调用：令牌端点 POST 与用户信息端点 GET。
//! `IdentityProvider` trait 让交换逻辑与验证逻辑不依赖具体的 HTTP 实现，
//! 测试中可以替换为 wiremock 桩服务。

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::time::Duration;

use crate::config::ProviderConfig;
use crate::error::{AuthError, AuthResult, GatewayError, Result};
use crate::logging::{LogComponent, LogStage, sanitize_token_for_logging};
use crate::{ldebug, lwarn};

/// 令牌端点请求参数（`grant_type=authorization_code`）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRequest<'a> {
    pub code: &'a str,
    pub redirect_uri: &'a str,
    pub client_id: &'a str,
    pub client_secret: &'a str,
}

impl<'a> TokenRequest<'a> {
    /// 表单字段，借用的是请求参数本身而不是 `TokenRequest`
    #[must_use]
    pub fn form(&self) -> [(&'static str, &'a str); 5] {
        [
            ("client_id", self.client_id),
            ("client_secret", self.client_secret),
            ("code", self.code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", self.redirect_uri),
        ]
    }
}

/// 身份提供商能力
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// 调用令牌端点，成功时返回原始 JSON 对象
    ///
    /// 非成功状态返回 `UpstreamExchange`，响应体原样保留
    async fn request_token(&self, request: &TokenRequest<'_>) -> AuthResult<Map<String, Value>>;

    /// 以 Bearer 令牌调用用户信息端点
    ///
    /// 非成功状态返回 `UpstreamProfile`，响应体原样保留
    async fn fetch_user_info(&self, access_token: &str) -> AuthResult<Map<String, Value>>;
}

/// 基于 reqwest 的身份提供商客户端
#[derive(Debug, Clone)]
pub struct HttpIdentityProvider {
    http_client: reqwest::Client,
    token_url: String,
    userinfo_url: String,
}

impl HttpIdentityProvider {
    /// 根据提供商配置创建客户端，所有请求都带有超时
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        Self::with_endpoints(
            &config.token_url,
            &config.userinfo_url,
            config.request_timeout(),
        )
    }

    /// 直接指定端点创建客户端
    pub fn with_endpoints(
        token_url: impl Into<String>,
        userinfo_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(concat!("movie-gateway/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GatewayError::config_with_source("创建身份提供商HTTP客户端失败", e))?;

        Ok(Self {
            http_client,
            token_url: token_url.into(),
            userinfo_url: userinfo_url.into(),
        })
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn request_token(&self, request: &TokenRequest<'_>) -> AuthResult<Map<String, Value>> {
        ldebug!(
            "system",
            LogStage::ExternalApi,
            LogComponent::OAuth,
            "request_token",
            "发送令牌交换请求",
            token_url = %self.token_url,
            code = %sanitize_token_for_logging(request.code)
        );

        let response = self
            .http_client
            .post(&self.token_url)
            .header("Accept", "application/json")
            .form(&request.form())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            lwarn!(
                "system",
                LogStage::ExternalApi,
                LogComponent::OAuth,
                "request_token",
                "令牌端点返回非成功状态",
                status = status.as_u16(),
                body = %body
            );
            return Err(AuthError::UpstreamExchange {
                status: status.as_u16(),
                body,
            });
        }

        parse_json_object(&body)
    }

    async fn fetch_user_info(&self, access_token: &str) -> AuthResult<Map<String, Value>> {
        let response = self
            .http_client
            .get(&self.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            ldebug!(
                "system",
                LogStage::ExternalApi,
                LogComponent::OAuth,
                "fetch_user_info",
                "用户信息端点返回非成功状态",
                status = status.as_u16(),
                token = %sanitize_token_for_logging(access_token)
            );
            return Err(AuthError::UpstreamProfile {
                status: status.as_u16(),
                body,
            });
        }

        parse_json_object(&body)
    }
}

/// 解析 JSON 对象，其他形状一律视为格式错误
fn parse_json_object(body: &str) -> AuthResult<Map<String, Value>> {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(AuthError::MalformedUpstreamResponse(format!(
            "expected a JSON object, got: {other}"
        ))),
        Err(e) => Err(AuthError::MalformedUpstreamResponse(e.to_string())),
    }
}
