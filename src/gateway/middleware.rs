//! # 资源路由认证中间件
//!
//! 要求 `Authorization` 头存在且为 `Bearer <token>` 形状。开启
//! `auth.verify_resource_requests` 时还会调用凭据验证器，并把验证结果放入请求扩展。

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use super::server::AppState;
use crate::auth::AuthHeaderParser;
use crate::error::AuthError;
use crate::logging::{LogComponent, LogStage, sanitize_token_for_logging};
use crate::{ldebug, lwarn};

/// Axum认证中间件
pub async fn require_bearer(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let header_value = AuthHeaderParser::header_value(request.headers())
        .inspect_err(|err| reject(&request, err))?;
    let credential =
        AuthHeaderParser::parse(header_value).inspect_err(|err| reject(&request, err))?;

    if state.config.auth.verify_resource_requests {
        let principal = state.verifier.verify_token(credential.token).await?;
        ldebug!(
            "system",
            LogStage::Authentication,
            LogComponent::Gateway,
            "require_bearer",
            "资源请求凭据验证通过",
            principal = %principal.display_name(),
            token = %sanitize_token_for_logging(credential.token)
        );
        request.extensions_mut().insert(Arc::new(principal));
    }

    Ok(next.run(request).await)
}

fn reject(request: &Request, err: &AuthError) {
    lwarn!(
        "system",
        LogStage::Authentication,
        LogComponent::Gateway,
        "require_bearer",
        "拒绝资源请求",
        path = %request.uri().path(),
        reason = %err
    );
}
