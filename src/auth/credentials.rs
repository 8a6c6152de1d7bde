//! # 已知账户凭据
//!
//! 本地登录只认一组固定账户：用户名原样保存，密码只保留 bcrypt 哈希

use bcrypt::{DEFAULT_COST, hash, verify};

use crate::config::LocalAuthConfig;
use crate::error::{AuthError, AuthResult};

/// 已知凭据存储
#[derive(Clone)]
pub struct CredentialStore {
    username: String,
    password_hash: String,
}

impl CredentialStore {
    /// 根据账户名和明文密码创建
    pub fn new(username: impl Into<String>, password: &str) -> AuthResult<Self> {
        let password_hash = hash(password, DEFAULT_COST)
            .map_err(|e| AuthError::Internal(format!("Password hashing failed: {e}")))?;
        Ok(Self {
            username: username.into(),
            password_hash,
        })
    }

    /// 从本地认证配置创建
    pub fn from_config(config: &LocalAuthConfig) -> AuthResult<Self> {
        Self::new(config.username.clone(), &config.password)
    }

    /// 校验用户名密码
    ///
    /// 任一字段不匹配都返回同一个 `InvalidCredentials`，不区分具体原因
    pub fn verify(&self, username: &str, password: &str) -> AuthResult<()> {
        let password_valid = verify(password, &self.password_hash)
            .map_err(|e| AuthError::Internal(format!("Password verification error: {e}")))?;

        if username == self.username && password_valid {
            Ok(())
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}
