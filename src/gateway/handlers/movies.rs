//! # 电影资源转发处理器

use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, State, rejection::JsonRejection},
    http::{HeaderMap, Method, header::AUTHORIZATION},
};
use serde_json::Value;
use std::sync::Arc;

use crate::auth::Principal;
use crate::error::{AuthError, GatewayError};
use crate::gateway::resource_client::ForwardedResponse;
use crate::gateway::server::AppState;
use crate::ldebug;
use crate::logging::{LogComponent, LogStage};

/// 中间件开启凭据验证时才会放入的身份
type VerifiedPrincipal = Option<Extension<Arc<Principal>>>;

async fn forward(
    state: &AppState,
    headers: &HeaderMap,
    principal: VerifiedPrincipal,
    method: Method,
    path: &str,
    body: Option<Value>,
) -> Result<ForwardedResponse, GatewayError> {
    // 中间件已保证头存在，这里只是取值
    let authorization = headers.get(AUTHORIZATION).ok_or(AuthError::MissingHeader)?;
    if let Some(Extension(principal)) = principal {
        ldebug!(
            "system",
            LogStage::UpstreamRequest,
            LogComponent::Gateway,
            "forward",
            "代已验证身份转发资源请求",
            principal = %principal.display_name(),
            method = %method,
            path = %path
        );
    }
    let body = body
        .map(|value| serde_json::to_vec(&value).map(Bytes::from))
        .transpose()?;
    state
        .resource_client
        .forward(method, path, authorization, body)
        .await
}

/// 请求体解析失败同样走统一错误信封
fn json_body(body: Result<Json<Value>, JsonRejection>) -> Result<Value, GatewayError> {
    body.map(|Json(value)| value).map_err(|rejection| {
        GatewayError::serialization_with_source(rejection.body_text(), rejection)
    })
}

pub async fn list_movies(
    State(state): State<AppState>,
    principal: VerifiedPrincipal,
    headers: HeaderMap,
) -> Result<ForwardedResponse, GatewayError> {
    forward(&state, &headers, principal, Method::GET, "/movies", None).await
}

pub async fn create_movie(
    State(state): State<AppState>,
    principal: VerifiedPrincipal,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<ForwardedResponse, GatewayError> {
    let body = json_body(body)?;
    forward(&state, &headers, principal, Method::POST, "/movies", Some(body)).await
}

pub async fn update_movie(
    State(state): State<AppState>,
    Path(movie_id): Path<i64>,
    principal: VerifiedPrincipal,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<ForwardedResponse, GatewayError> {
    let body = json_body(body)?;
    let path = format!("/movies/{movie_id}");
    forward(&state, &headers, principal, Method::PUT, &path, Some(body)).await
}

pub async fn delete_movie(
    State(state): State<AppState>,
    Path(movie_id): Path<i64>,
    principal: VerifiedPrincipal,
    headers: HeaderMap,
) -> Result<ForwardedResponse, GatewayError> {
    let path = format!("/movies/{movie_id}");
    forward(&state, &headers, principal, Method::DELETE, &path, None).await
}
