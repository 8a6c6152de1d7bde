//! # 测试数据 Fixtures
//!
//! 提供测试用的配置和预设数据

use serde_json::{Map, Value, json};

use crate::auth::TokenRecord;
use crate::config::{AppConfig, ProviderConfig, VerificationMode};

/// 测试签名密钥
pub const TEST_SIGNING_KEY: &str = "test-signing-key-please-rotate";
/// 已知账户
pub const TEST_USERNAME: &str = "test@test.com";
pub const TEST_PASSWORD: &str = "11111111";

/// 本地签名模式的配置，资源服务指向 `movie_base_url`
pub fn local_app_config(movie_base_url: &str) -> AppConfig {
    let mut config = AppConfig::default();
    config.auth.verification_mode = VerificationMode::Local;
    config.local_auth.signing_key = TEST_SIGNING_KEY.to_string();
    config.local_auth.username = TEST_USERNAME.to_string();
    config.local_auth.password = TEST_PASSWORD.to_string();
    config.movie_service.embedded = false;
    config.movie_service.base_url = movie_base_url.to_string();
    config.upstream_timeout_secs = 5;
    config
}

/// 委托验证模式的配置
pub fn delegated_app_config(provider: ProviderConfig, movie_base_url: &str) -> AppConfig {
    let mut config = AppConfig {
        provider,
        ..AppConfig::default()
    };
    config.auth.verification_mode = VerificationMode::Delegated;
    config.movie_service.embedded = false;
    config.movie_service.base_url = movie_base_url.to_string();
    config.upstream_timeout_secs = 5;
    config
}

/// 身份提供商返回的用户资料
pub fn sample_profile() -> Value {
    json!({
        "sub": "110169484474386276334",
        "email": TEST_USERNAME,
        "email_verified": true,
        "name": "Test User",
        "picture": "https://example.com/avatar.png"
    })
}

/// 预设令牌记录
pub fn sample_token_record(access_token: &str) -> TokenRecord {
    let user_info = match sample_profile() {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    TokenRecord::new(access_token, user_info)
}

/// 电影请求体
pub fn movie_json(id: i64, title: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "description": format!("{title} description"),
    })
}
