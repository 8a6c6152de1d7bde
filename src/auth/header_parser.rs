//! # 认证头解析器
//!
//! 解析 `Authorization` 头为 "Scheme Token" 两段格式，只接受 `Bearer` 方案

use axum::http::{HeaderMap, header::AUTHORIZATION};

use crate::error::{AuthError, AuthResult};

/// 解析后的 Bearer 凭据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerCredential<'a> {
    /// 原始方案名（保留客户端大小写）
    pub scheme: &'a str,
    /// 令牌本体
    pub token: &'a str,
}

/// 认证头解析器
pub struct AuthHeaderParser;

impl AuthHeaderParser {
    /// 解析认证头值
    ///
    /// # 规则
    /// - 按空白切分后必须恰好两段，否则 `MalformedHeader`
    /// - 方案名大小写不敏感地等于 `bearer`，否则 `UnsupportedScheme`
    ///
    /// # 示例
    /// - `"Bearer abc"` -> `BearerCredential { scheme: "Bearer", token: "abc" }`
    /// - `"bearer   abc"` -> 同上（多余空白被忽略）
    /// - `"Bearer"` / `"Bearer a b"` -> `MalformedHeader`
    /// - `"Basic abc"` -> `UnsupportedScheme`
    pub fn parse(header_value: &str) -> AuthResult<BearerCredential<'_>> {
        let mut parts = header_value.split_whitespace();
        let (Some(scheme), Some(token), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(AuthError::MalformedHeader);
        };

        if !scheme.eq_ignore_ascii_case("bearer") {
            return Err(AuthError::UnsupportedScheme);
        }

        Ok(BearerCredential { scheme, token })
    }

    /// 从请求头中取出 `Authorization` 值，不做格式检查
    pub fn header_value(headers: &HeaderMap) -> AuthResult<&str> {
        let value = headers.get(AUTHORIZATION).ok_or(AuthError::MissingHeader)?;
        value.to_str().map_err(|_| AuthError::MalformedHeader)
    }

    /// 从请求头中提取并解析 Bearer 令牌
    pub fn bearer_token(headers: &HeaderMap) -> AuthResult<&str> {
        Self::parse(Self::header_value(headers)?).map(|credential| credential.token)
    }
}
