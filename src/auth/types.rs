//! # 认证核心数据类型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 令牌类型常量，对外响应始终为小写 `bearer`
pub const TOKEN_TYPE_BEARER: &str = "bearer";

/// 授权码交换的结果，创建后不可变
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    /// 身份提供商签发的访问令牌（不透明字符串）
    pub access_token: String,
    /// 固定为 `bearer`
    pub token_type: String,
    /// 用户信息端点返回的原始资料
    pub user_info: Map<String, Value>,
}

impl TokenRecord {
    /// 创建新的令牌记录
    #[must_use]
    pub fn new(access_token: impl Into<String>, user_info: Map<String, Value>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: TOKEN_TYPE_BEARER.to_string(),
            user_info,
        }
    }
}

/// 验证通过后的身份
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Principal {
    /// 委托验证：身份提供商返回的用户资料
    Profile(Map<String, Value>),
    /// 本地验证：签名令牌中的主体
    Subject {
        /// 令牌主体（用户名）
        sub: String,
        /// 过期时间
        expires_at: DateTime<Utc>,
    },
}

impl Principal {
    /// 身份的简短标识，用于日志
    #[must_use]
    pub fn display_name(&self) -> String {
        match self {
            Self::Profile(profile) => profile
                .get("email")
                .or_else(|| profile.get("sub"))
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
            Self::Subject { sub, .. } => sub.clone(),
        }
    }
}

/// 本地签名令牌的声明
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTokenClaims {
    /// 主体（用户名）
    pub sub: String,
    /// 过期时间戳（秒）
    pub exp: i64,
    /// 签发时间戳（秒）
    pub iat: i64,
    /// 令牌唯一标识
    pub jti: String,
}

impl SignedTokenClaims {
    /// 创建有效期为 `window` 的声明
    #[must_use]
    pub fn new(subject: impl Into<String>, window: chrono::Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: subject.into(),
            exp: (now + window).timestamp(),
            iat: now.timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// 是否已过期（`exp <= now`）
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.exp <= Utc::now().timestamp()
    }

    /// 过期时间
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// 本地登录成功后返回给客户端的令牌
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedToken {
    pub access_token: String,
    pub token_type: String,
    /// 剩余有效期（秒）
    pub expires_in: i64,
}

/// 委托模式下浏览器需要跳转的授权地址
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationUrl {
    pub authorization_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_token_record_serializes_lowercase_bearer() {
        let mut info = Map::new();
        info.insert("email".into(), json!("a@b.c"));
        let record = TokenRecord::new("ya29.token", info);

        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({
                "access_token": "ya29.token",
                "token_type": "bearer",
                "user_info": { "email": "a@b.c" }
            })
        );
    }

    #[test]
    fn test_claims_expiry_window() {
        let live = SignedTokenClaims::new("test@test.com", chrono::Duration::minutes(30));
        assert!(!live.is_expired());
        assert_eq!(live.exp - live.iat, 30 * 60);

        let dead = SignedTokenClaims::new("test@test.com", chrono::Duration::seconds(-1));
        assert!(dead.is_expired());
    }

    #[test]
    fn test_principal_display_name() {
        let mut profile = Map::new();
        profile.insert("sub".into(), json!("1234"));
        assert_eq!(Principal::Profile(profile).display_name(), "1234");

        let subject = Principal::Subject {
            sub: "test@test.com".into(),
            expires_at: Utc::now(),
        };
        assert_eq!(subject.display_name(), "test@test.com");
    }
}
