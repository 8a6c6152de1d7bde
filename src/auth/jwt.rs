//! JWT token management
//!
//! Local token issuer and verifier. Tokens are HS256-signed, carry the username as
//! `sub`, and are valid for a fixed window. There is no revocation store: validity
//! is a pure function of the signature and `exp`.

use chrono::Duration;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};

use super::credentials::CredentialStore;
use super::types::{IssuedToken, SignedTokenClaims, TOKEN_TYPE_BEARER};
use crate::config::LocalAuthConfig;
use crate::error::{AuthError, AuthResult, GatewayError, Result};
use crate::logging::{LogComponent, LogStage};
use crate::{ldebug, linfo};

/// JWT token manager
pub struct JwtManager {
    /// Encoding key
    encoding_key: EncodingKey,
    /// Decoding key
    decoding_key: DecodingKey,
    /// Validation configuration
    validation: Validation,
    /// Token lifetime
    expiry: Duration,
    /// Known account
    credentials: CredentialStore,
}

impl JwtManager {
    /// Create new JWT manager from the local auth section
    pub fn new(config: &LocalAuthConfig) -> Result<Self> {
        if config.signing_key.is_empty() {
            return Err(GatewayError::config("local_auth.signing_key 不能为空"));
        }
        if config.token_expiry_minutes <= 0 {
            return Err(GatewayError::config(
                "local_auth.token_expiry_minutes 必须大于0",
            ));
        }

        Ok(Self::with_parts(
            config.signing_key.as_bytes(),
            Duration::minutes(config.token_expiry_minutes),
            CredentialStore::from_config(config)
                .map_err(|e| GatewayError::config(e.to_string()))?,
        ))
    }

    /// Create a manager from raw parts
    #[must_use]
    pub fn with_parts(secret: &[u8], expiry: Duration, credentials: CredentialStore) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.validate_nbf = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            expiry,
            credentials,
        }
    }

    /// Check the presented pair and mint a token for it
    pub fn issue(&self, username: &str, password: &str) -> AuthResult<IssuedToken> {
        self.credentials.verify(username, password)?;

        let claims = SignedTokenClaims::new(username, self.expiry);
        let access_token = self.sign(&claims)?;

        linfo!(
            "system",
            LogStage::Authentication,
            LogComponent::Jwt,
            "issue",
            "本地令牌签发成功",
            subject = %claims.sub,
            expires_at = claims.exp
        );

        Ok(IssuedToken {
            access_token,
            token_type: TOKEN_TYPE_BEARER.to_string(),
            expires_in: self.expiry.num_seconds(),
        })
    }

    /// Sign arbitrary claims
    pub fn sign(&self, claims: &SignedTokenClaims) -> AuthResult<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("Token generation failed: {e}")))
    }

    /// Validate signature and expiry
    pub fn verify(&self, token: &str) -> AuthResult<SignedTokenClaims> {
        let claims = decode::<SignedTokenClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredCredential,
                _ => {
                    ldebug!(
                        "system",
                        LogStage::Authentication,
                        LogComponent::Jwt,
                        "verify",
                        "令牌校验失败",
                        reason = %e
                    );
                    AuthError::InvalidCredential
                }
            })?;

        // exp 必须严格大于当前时间
        if claims.is_expired() {
            return Err(AuthError::ExpiredCredential);
        }

        Ok(claims)
    }

    /// Configured token lifetime
    #[must_use]
    pub const fn expiry(&self) -> Duration {
        self.expiry
    }
}

impl std::fmt::Debug for JwtManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtManager")
            .field("expiry", &self.expiry)
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn manager() -> JwtManager {
        JwtManager::with_parts(
            b"unit-test-signing-key",
            Duration::minutes(30),
            CredentialStore::new("test@test.com", "11111111").unwrap(),
        )
    }

    #[test]
    fn test_issue_and_verify() {
        let manager = manager();
        let issued = manager.issue("test@test.com", "11111111").unwrap();
        assert_eq!(issued.token_type, "bearer");
        assert_eq!(issued.expires_in, 30 * 60);

        let claims = manager.verify(&issued.access_token).unwrap();
        assert_eq!(claims.sub, "test@test.com");
        let remaining = claims.exp - Utc::now().timestamp();
        assert!((29 * 60..=30 * 60).contains(&remaining));
    }

    #[test]
    fn test_issue_rejects_wrong_pair() {
        let manager = manager();
        assert_eq!(
            manager.issue("test@test.com", "22222222"),
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(
            manager.issue("nobody@test.com", "11111111"),
            Err(AuthError::InvalidCredentials)
        );
    }

    #[test]
    fn test_expired_token_is_expired_credential() {
        let manager = manager();
        let claims = SignedTokenClaims::new("test@test.com", Duration::seconds(-60));
        let token = manager.sign(&claims).unwrap();
        assert_eq!(manager.verify(&token), Err(AuthError::ExpiredCredential));
    }

    #[test]
    fn test_token_expiring_now_is_rejected() {
        let manager = manager();
        let claims = SignedTokenClaims::new("test@test.com", Duration::zero());
        let token = manager.sign(&claims).unwrap();
        assert_eq!(manager.verify(&token), Err(AuthError::ExpiredCredential));
    }

    #[test]
    fn test_any_tampered_payload_byte_fails() {
        let manager = manager();
        let token = manager
            .issue("test@test.com", "11111111")
            .unwrap()
            .access_token;

        let payload_start = token.find('.').unwrap() + 1;
        let payload_end = token.rfind('.').unwrap();

        for (index, ch) in token.char_indices() {
            if !(payload_start..payload_end).contains(&index) {
                continue;
            }
            let replacement = if ch == 'A' { 'B' } else { 'A' };
            let mut tampered = token.clone();
            tampered.replace_range(index..=index, &replacement.to_string());
            assert!(
                manager.verify(&tampered).is_err(),
                "tampered byte at {index} still verified"
            );
        }
    }

    #[test]
    fn test_foreign_key_is_invalid_credential() {
        let other = JwtManager::with_parts(
            b"another-key",
            Duration::minutes(30),
            CredentialStore::new("test@test.com", "11111111").unwrap(),
        );
        let token = other.issue("test@test.com", "11111111").unwrap().access_token;
        assert_eq!(manager().verify(&token), Err(AuthError::InvalidCredential));
        assert_eq!(manager().verify("not-a-jwt"), Err(AuthError::InvalidCredential));
    }

    #[test]
    fn test_new_requires_signing_key() {
        let config = LocalAuthConfig::default();
        assert!(JwtManager::new(&config).is_err());

        let config = LocalAuthConfig {
            signing_key: "k".into(),
            ..LocalAuthConfig::default()
        };
        assert_eq!(JwtManager::new(&config).unwrap().expiry(), Duration::minutes(30));
    }
}
