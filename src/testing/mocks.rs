//! # 测试 Mock 对象
//!
//! 基于 wiremock 的桩身份提供商，`.expect(n)` 在服务器释放时校验调用次数

use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::auth::{AuthorizationCodeExchanger, ClientCredentials, HttpIdentityProvider, IdentityProvider};
use crate::config::ProviderConfig;

/// 令牌端点路径
pub const TOKEN_PATH: &str = "/token";
/// 用户信息端点路径
pub const USERINFO_PATH: &str = "/userinfo";

/// 桩身份提供商
pub struct StubIdentityProvider {
    server: MockServer,
}

impl StubIdentityProvider {
    /// 启动桩服务器
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// 获取服务器 URI
    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// 指向桩服务器的提供商配置
    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig {
            authorization_url: format!("{}/authorize", self.uri()),
            token_url: format!("{}{TOKEN_PATH}", self.uri()),
            userinfo_url: format!("{}{USERINFO_PATH}", self.uri()),
            client_id: "stub-client".to_string(),
            client_secret: "stub-secret".to_string(),
            redirect_uri: "http://localhost:8000/auth/callback".to_string(),
            request_timeout_secs: 5,
            ..ProviderConfig::default()
        }
    }

    /// 指向桩服务器的 HTTP 客户端
    pub fn http_provider(&self) -> HttpIdentityProvider {
        HttpIdentityProvider::new(&self.provider_config()).expect("stub provider client")
    }

    /// 以 trait 对象形式返回
    pub fn provider(&self) -> Arc<dyn IdentityProvider> {
        Arc::new(self.http_provider())
    }

    /// 使用桩服务器的授权码交换器
    pub fn exchanger(&self) -> AuthorizationCodeExchanger {
        AuthorizationCodeExchanger::new(
            self.provider(),
            ClientCredentials::from(&self.provider_config()),
        )
    }

    /// 令牌端点对指定授权码返回成功
    pub async fn mock_token_success(&self, code: &str, access_token: &str, times: u64) {
        self.mock_token_success_delayed(code, access_token, Duration::ZERO, times)
            .await;
    }

    /// 令牌端点延迟返回成功，用于并发场景
    pub async fn mock_token_success_delayed(
        &self,
        code: &str,
        access_token: &str,
        delay: Duration,
        times: u64,
    ) {
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .and(body_string_contains(format!("code={code}")))
            .and(body_string_contains("grant_type=authorization_code"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({
                        "access_token": access_token,
                        "token_type": "Bearer",
                        "expires_in": 3599,
                        "scope": "openid email profile"
                    }))
                    .set_delay(delay),
            )
            .expect(times)
            .mount(&self.server)
            .await;
    }

    /// 令牌端点返回任意 JSON
    pub async fn mock_token_body(&self, body: Value, times: u64) {
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(times)
            .mount(&self.server)
            .await;
    }

    /// 令牌端点返回错误状态与原始响应体
    pub async fn mock_token_error(&self, status: u16, body: &str, times: u64) {
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .expect(times)
            .mount(&self.server)
            .await;
    }

    /// 用户信息端点对指定令牌返回资料
    pub async fn mock_userinfo(&self, access_token: &str, profile: Value, times: u64) {
        Mock::given(method("GET"))
            .and(path(USERINFO_PATH))
            .and(header("authorization", format!("Bearer {access_token}").as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(profile))
            .expect(times)
            .mount(&self.server)
            .await;
    }

    /// 用户信息端点拒绝指定令牌
    pub async fn mock_userinfo_rejected(&self, access_token: &str, status: u16, times: u64) {
        Mock::given(method("GET"))
            .and(path(USERINFO_PATH))
            .and(header("authorization", format!("Bearer {access_token}").as_str()))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({
                "error": "invalid_token",
                "error_description": "Invalid Credentials"
            })))
            .expect(times)
            .mount(&self.server)
            .await;
    }

    /// 用户信息端点接受任意请求
    pub async fn mock_userinfo_any(&self, times: u64) {
        Mock::given(method("GET"))
            .and(path(USERINFO_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(times)
            .mount(&self.server)
            .await;
    }

    /// 令牌端点收到的请求数
    pub async fn token_requests(&self) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|req| req.url.path() == TOKEN_PATH)
            .count()
    }
}
