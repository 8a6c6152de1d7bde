//! # 凭据验证
//!
//! 两种验证策略在启动时按配置选定一次：
//! - `DelegatedVerifier` 把令牌转发到身份提供商的用户信息端点
//! - `LocalVerifier` 本地校验 HS256 签名与过期时间
//!
//! 请求时不根据令牌形状猜测类型。

use async_trait::async_trait;
use std::sync::Arc;

use super::header_parser::AuthHeaderParser;
use super::jwt::JwtManager;
use super::provider::IdentityProvider;
use super::types::Principal;
use crate::config::VerificationMode;
use crate::error::{AuthError, AuthResult};
use crate::logging::{LogComponent, LogStage, sanitize_token_for_logging};
use crate::{ldebug, lwarn};

/// 凭据验证器
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// 验证已从头中取出的令牌
    async fn verify_token(&self, token: &str) -> AuthResult<Principal>;

    /// 当前策略
    fn mode(&self) -> VerificationMode;

    /// 验证完整的 `Authorization` 头值
    ///
    /// 头格式不合法时直接失败，不会调用任何下游
    async fn verify(&self, header_value: &str) -> AuthResult<Principal> {
        let credential = AuthHeaderParser::parse(header_value)?;
        self.verify_token(credential.token).await
    }
}

/// 委托验证：用户信息端点返回成功即视为有效
pub struct DelegatedVerifier {
    provider: Arc<dyn IdentityProvider>,
}

impl DelegatedVerifier {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl CredentialVerifier for DelegatedVerifier {
    async fn verify_token(&self, token: &str) -> AuthResult<Principal> {
        match self.provider.fetch_user_info(token).await {
            Ok(profile) => Ok(Principal::Profile(profile)),
            // 网络故障单独归类，不与凭据错误混淆
            Err(err @ AuthError::UpstreamUnavailable(_)) => Err(err),
            Err(err) => {
                ldebug!(
                    "system",
                    LogStage::Authentication,
                    LogComponent::Verifier,
                    "verify_delegated",
                    "身份提供商拒绝令牌",
                    token = %sanitize_token_for_logging(token),
                    reason = %err
                );
                Err(AuthError::InvalidOrExpiredCredential)
            }
        }
    }

    fn mode(&self) -> VerificationMode {
        VerificationMode::Delegated
    }
}

/// 本地验证：签名与过期时间
pub struct LocalVerifier {
    jwt: Arc<JwtManager>,
}

impl LocalVerifier {
    pub fn new(jwt: Arc<JwtManager>) -> Self {
        Self { jwt }
    }
}

#[async_trait]
impl CredentialVerifier for LocalVerifier {
    async fn verify_token(&self, token: &str) -> AuthResult<Principal> {
        let claims = self.jwt.verify(token).inspect_err(|err| {
            lwarn!(
                "system",
                LogStage::Authentication,
                LogComponent::Verifier,
                "verify_local",
                "本地令牌校验失败",
                token = %sanitize_token_for_logging(token),
                reason = %err
            );
        })?;

        Ok(Principal::Subject {
            expires_at: claims.expires_at(),
            sub: claims.sub,
        })
    }

    fn mode(&self) -> VerificationMode {
        VerificationMode::Local
    }
}

/// 按配置选定验证策略
///
/// 本地模式必须提供 `JwtManager`，委托模式必须提供身份提供商
pub fn build_verifier(
    mode: VerificationMode,
    provider: Option<Arc<dyn IdentityProvider>>,
    jwt: Option<Arc<JwtManager>>,
) -> AuthResult<Arc<dyn CredentialVerifier>> {
    match mode {
        VerificationMode::Delegated => provider
            .map(|p| Arc::new(DelegatedVerifier::new(p)) as Arc<dyn CredentialVerifier>)
            .ok_or_else(|| AuthError::Internal("delegated mode requires an identity provider".into())),
        VerificationMode::Local => jwt
            .map(|j| Arc::new(LocalVerifier::new(j)) as Arc<dyn CredentialVerifier>)
            .ok_or_else(|| AuthError::Internal("local mode requires a signing key".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::HttpIdentityProvider;
    use crate::auth::credentials::CredentialStore;
    use crate::testing::{StubIdentityProvider, bearer, init_test_env};
    use axum::http::StatusCode;
    use chrono::Duration;
    use serde_json::json;

    fn jwt() -> Arc<JwtManager> {
        Arc::new(JwtManager::with_parts(
            b"verifier-key",
            Duration::minutes(30),
            CredentialStore::new("test@test.com", "11111111").unwrap(),
        ))
    }

    #[tokio::test]
    async fn test_local_verifier_accepts_issued_token() {
        init_test_env();
        let jwt = jwt();
        let token = jwt.issue("test@test.com", "11111111").unwrap().access_token;
        let verifier = LocalVerifier::new(jwt);

        let principal = verifier.verify(&bearer(&token)).await.unwrap();
        assert!(matches!(principal, Principal::Subject { ref sub, .. } if sub == "test@test.com"));
    }

    #[tokio::test]
    async fn test_local_verifier_header_shape_checked_first() {
        let verifier = LocalVerifier::new(jwt());
        assert_eq!(
            verifier.verify("Bearer").await,
            Err(AuthError::MalformedHeader)
        );
        assert_eq!(
            verifier.verify("Basic abc").await,
            Err(AuthError::UnsupportedScheme)
        );
        assert_eq!(
            verifier.verify("Bearer garbage").await,
            Err(AuthError::InvalidCredential)
        );
    }

    #[tokio::test]
    async fn test_delegated_verifier_returns_profile() {
        let stub = StubIdentityProvider::start().await;
        stub.mock_userinfo("good", json!({"email": "a@b.c"}), 1).await;

        let verifier = DelegatedVerifier::new(stub.provider());
        let principal = verifier.verify("bearer good").await.unwrap();
        assert_eq!(principal.display_name(), "a@b.c");
    }

    #[tokio::test]
    async fn test_delegated_rejection_is_invalid_or_expired() {
        let stub = StubIdentityProvider::start().await;
        stub.mock_userinfo_rejected("stale", 401, 1).await;

        let verifier = DelegatedVerifier::new(stub.provider());
        assert_eq!(
            verifier.verify("Bearer stale").await,
            Err(AuthError::InvalidOrExpiredCredential)
        );
    }

    #[tokio::test]
    async fn test_delegated_outage_is_not_a_credential_error() {
        let provider = HttpIdentityProvider::with_endpoints(
            "http://127.0.0.1:9/token",
            "http://127.0.0.1:9/userinfo",
            std::time::Duration::from_secs(2),
        )
        .unwrap();

        let verifier = DelegatedVerifier::new(Arc::new(provider));
        let err = verifier.verify("Bearer ya29.any").await.unwrap_err();
        assert!(matches!(err, AuthError::UpstreamUnavailable(_)));
        assert_eq!(err.status_and_code().0, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_malformed_header_never_calls_provider() {
        let stub = StubIdentityProvider::start().await;
        stub.mock_userinfo_any(0).await;

        let verifier = DelegatedVerifier::new(stub.provider());
        assert_eq!(
            verifier.verify("Bearer a b").await,
            Err(AuthError::MalformedHeader)
        );
        assert_eq!(verifier.verify("token").await, Err(AuthError::MalformedHeader));
    }

    #[test]
    fn test_build_verifier_selects_mode() {
        let local = build_verifier(VerificationMode::Local, None, Some(jwt())).unwrap();
        assert_eq!(local.mode(), VerificationMode::Local);

        assert!(build_verifier(VerificationMode::Delegated, None, Some(jwt())).is_err());
        assert!(build_verifier(VerificationMode::Local, None, None).is_err());
    }
}
