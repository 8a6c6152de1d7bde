//! # 电影服务处理器
//!
//! 错误响应体沿用 `{"detail": "..."}` 形状，网关会原样透传

use axum::{
    Json,
    extract::{Path, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::sync::Arc;

use super::store::{Movie, MovieStore};
use crate::auth::AuthHeaderParser;
use crate::error::AuthError;
use crate::ldebug;
use crate::logging::{LogComponent, LogStage};

/// 电影服务错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MovieServiceError {
    /// 缺少或格式错误的认证头
    Unauthorized(&'static str),
    NotFound,
}

impl IntoResponse for MovieServiceError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            Self::Unauthorized(detail) => (StatusCode::UNAUTHORIZED, detail),
            Self::NotFound => (StatusCode::NOT_FOUND, "Movie not found"),
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

impl From<AuthError> for MovieServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingHeader => Self::Unauthorized("No authorization header"),
            AuthError::UnsupportedScheme => Self::Unauthorized("Invalid authentication scheme"),
            _ => Self::Unauthorized("Invalid authorization header"),
        }
    }
}

/// 只检查 `Bearer <token>` 形状，不做任何密码学或委托验证
pub async fn require_bearer_shape(
    request: Request,
    next: Next,
) -> Result<Response, MovieServiceError> {
    AuthHeaderParser::bearer_token(request.headers()).map_err(|err| {
        ldebug!(
            "system",
            LogStage::Authentication,
            LogComponent::MovieService,
            "require_bearer_shape",
            "拒绝缺少 Bearer 凭据的请求",
            reason = %err
        );
        MovieServiceError::from(err)
    })?;
    Ok(next.run(request).await)
}

pub async fn list_movies(State(store): State<Arc<MovieStore>>) -> Json<Vec<Movie>> {
    Json(store.list().await)
}

pub async fn create_movie(
    State(store): State<Arc<MovieStore>>,
    Json(movie): Json<Movie>,
) -> Json<Movie> {
    Json(store.create(movie).await)
}

pub async fn update_movie(
    State(store): State<Arc<MovieStore>>,
    Path(movie_id): Path<i64>,
    Json(movie): Json<Movie>,
) -> Result<Json<Movie>, MovieServiceError> {
    store
        .update(movie_id, movie)
        .await
        .map(Json)
        .ok_or(MovieServiceError::NotFound)
}

pub async fn delete_movie(
    State(store): State<Arc<MovieStore>>,
    Path(movie_id): Path<i64>,
) -> Result<Json<serde_json::Value>, MovieServiceError> {
    if store.delete(movie_id).await {
        Ok(Json(json!({ "message": "Movie deleted" })))
    } else {
        Err(MovieServiceError::NotFound)
    }
}
