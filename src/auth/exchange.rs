//! # 授权码交换
//!
//! OAuth 2.0 授权码流程的服务端一段：授权码换取访问令牌，再用访问令牌获取用户资料。
//! 两次调用顺序执行，第二次依赖第一次的结果。本组件不去重，也不重试。

use serde_json::Value;
use std::sync::Arc;

use super::provider::{IdentityProvider, TokenRequest};
use super::types::{AuthorizationUrl, TokenRecord};
use crate::config::ProviderConfig;
use crate::error::{AuthError, AuthResult};
use crate::logging::{LogComponent, LogStage, sanitize_token_for_logging};
use crate::{ldebug, linfo, lwarn};

/// 在身份提供商处登记的客户端信息
#[derive(Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

impl From<&ProviderConfig> for ClientCredentials {
    fn from(config: &ProviderConfig) -> Self {
        Self {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri: config.redirect_uri.clone(),
        }
    }
}

/// 授权码交换器
#[derive(Clone)]
pub struct AuthorizationCodeExchanger {
    provider: Arc<dyn IdentityProvider>,
    client: ClientCredentials,
}

impl AuthorizationCodeExchanger {
    /// 创建交换器
    pub fn new(provider: Arc<dyn IdentityProvider>, client: ClientCredentials) -> Self {
        Self { provider, client }
    }

    /// 使用配置中的客户端信息交换授权码
    pub async fn exchange_code(&self, code: &str) -> AuthResult<TokenRecord> {
        exchange(
            self.provider.as_ref(),
            code,
            &self.client.redirect_uri,
            &self.client.client_id,
            &self.client.client_secret,
        )
        .await
    }
}

impl std::fmt::Debug for AuthorizationCodeExchanger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationCodeExchanger")
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}

/// 构建浏览器跳转的授权地址
///
/// 参数值全部百分号编码，`scope` 以空格连接
#[must_use]
pub fn build_authorization_url(config: &ProviderConfig) -> AuthorizationUrl {
    let scope = config.scopes.join(" ");
    let separator = if config.authorization_url.contains('?') { '&' } else { '?' };
    let authorization_url = format!(
        "{base}{separator}response_type=code&client_id={client_id}&redirect_uri={redirect_uri}\
         &scope={scope}&access_type=offline&prompt=consent",
        base = config.authorization_url,
        client_id = urlencoding::encode(&config.client_id),
        redirect_uri = urlencoding::encode(&config.redirect_uri),
        scope = urlencoding::encode(&scope),
    );
    AuthorizationUrl { authorization_url }
}

/// 交换授权码并获取用户资料
///
/// 1. 向令牌端点提交表单，非成功状态原样返回 `UpstreamExchange`
/// 2. 提取 `access_token`，缺失则返回 `MalformedUpstreamResponse`
/// 3. 以 Bearer 方式调用用户信息端点，非成功状态返回 `UpstreamProfile`
/// 4. 组装 `TokenRecord`
pub async fn exchange(
    provider: &dyn IdentityProvider,
    code: &str,
    redirect_uri: &str,
    client_id: &str,
    client_secret: &str,
) -> AuthResult<TokenRecord> {
    if code.trim().is_empty() {
        return Err(AuthError::InvalidRequest(
            "authorization code must not be empty".to_string(),
        ));
    }

    let request = TokenRequest {
        code,
        redirect_uri,
        client_id,
        client_secret,
    };

    linfo!(
        "system",
        LogStage::ExternalApi,
        LogComponent::OAuth,
        "exchange_code",
        "开始授权码交换",
        code = %sanitize_token_for_logging(code)
    );

    let token_response = provider.request_token(&request).await?;

    let access_token = match token_response.get("access_token") {
        Some(Value::String(token)) if !token.is_empty() => token.clone(),
        _ => {
            lwarn!(
                "system",
                LogStage::ExternalApi,
                LogComponent::OAuth,
                "exchange_code",
                "令牌响应中缺少 access_token"
            );
            return Err(AuthError::MalformedUpstreamResponse(
                "No access token in response".to_string(),
            ));
        }
    };

    let user_info = provider.fetch_user_info(&access_token).await?;

    ldebug!(
        "system",
        LogStage::ExternalApi,
        LogComponent::OAuth,
        "exchange_code",
        "授权码交换完成",
        token = %sanitize_token_for_logging(&access_token),
        profile_fields = user_info.len()
    );

    Ok(TokenRecord::new(access_token, user_info))
}
