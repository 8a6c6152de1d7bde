//! # 认证流程处理器
//!
//! 授权码回调按授权码经历 `unseen -> exchanging -> cached -> consumed` 四个状态，
//! 状态全部由 `TokenCache` 维护。

use axum::{
    Form, Json,
    extract::{Path, Query, State},
    http::HeaderMap,
};
use serde::Deserialize;

use crate::auth::{
    AuthHeaderParser, AuthorizationUrl, IssuedToken, Principal, TokenRecord,
    build_authorization_url,
};
use crate::error::{AuthError, GatewayError};
use crate::gateway::server::AppState;
use crate::linfo;
use crate::logging::{LogComponent, LogStage, sanitize_token_for_logging};

/// 本地登录表单
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// 回调查询参数，提供商附带的 `scope`、`authuser`、`prompt`、`state` 等字段被忽略
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
}

/// GET /login：委托模式下返回授权地址
pub async fn login_redirect(
    State(state): State<AppState>,
) -> Result<Json<AuthorizationUrl>, GatewayError> {
    if state.exchanger.is_none() {
        return Err(AuthError::UnsupportedOperation(
            "GET /login is only available in delegated mode, use POST /login".to_string(),
        )
        .into());
    }

    let url = build_authorization_url(&state.config.provider);
    linfo!(
        "system",
        LogStage::Authentication,
        LogComponent::Gateway,
        "login_redirect",
        "生成授权地址",
        authorization_url = %url.authorization_url
    );
    Ok(Json(url))
}

/// POST /login：本地模式下用户名密码换取签名令牌
pub async fn login_form(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Json<IssuedToken>, GatewayError> {
    let jwt = state.jwt.as_ref().ok_or_else(|| {
        AuthError::UnsupportedOperation(
            "POST /login is only available in local mode, use GET /login".to_string(),
        )
    })?;

    Ok(Json(jwt.issue(&form.username, &form.password)?))
}

/// GET /auth/callback：首次请求执行交换并缓存，重复请求直接返回缓存记录
pub async fn auth_callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Result<Json<TokenRecord>, GatewayError> {
    let code = params
        .code
        .filter(|code| !code.trim().is_empty())
        .ok_or_else(|| AuthError::InvalidRequest("missing authorization code".to_string()))?;

    let exchanger = state.exchanger.clone().ok_or_else(|| {
        AuthError::UnsupportedOperation(
            "authorization code flow is only available in delegated mode".to_string(),
        )
    })?;

    linfo!(
        "system",
        LogStage::Authentication,
        LogComponent::Gateway,
        "auth_callback",
        "收到授权回调",
        code = %sanitize_token_for_logging(&code)
    );

    let record = state
        .token_cache
        .peek_or_exchange(&code, move |code| async move {
            exchanger.exchange_code(&code).await
        })
        .await?;

    Ok(Json(record))
}

/// GET /get-cached-token/{code}：取走缓存记录，第二次请求返回 404
pub async fn get_cached_token(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<TokenRecord>, GatewayError> {
    Ok(Json(state.token_cache.consume(&code)?))
}

/// GET /verify-token：按启动时选定的策略验证 `Authorization` 头
pub async fn verify_token(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Principal>, GatewayError> {
    let header_value = AuthHeaderParser::header_value(&headers)?;
    let principal = state.verifier.verify(header_value).await?;
    Ok(Json(principal))
}
