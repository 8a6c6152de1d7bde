//! # 路由配置
//!
//! 定义网关对外暴露的全部路由

use axum::Router;
use axum::http::{StatusCode, Uri};
use axum::middleware::from_fn_with_state;
use axum::response::Response;
use axum::routing::{get, put};

use super::handlers::{auth, health, movies};
use super::middleware::require_bearer;
use super::response;
use super::server::AppState;

/// 创建所有路由
pub fn create_routes(state: AppState) -> Router {
    Router::new()
        // 认证流程路由
        .merge(auth_routes())
        // 资源服务路由（需要 Bearer 凭据）
        .merge(movie_routes(state.clone()))
        .route("/health", get(health::health_check))
        .fallback(not_found)
        .with_state(state)
}

/// 认证流程路由
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_redirect).post(auth::login_form))
        .route("/auth/callback", get(auth::auth_callback))
        .route("/get-cached-token/{code}", get(auth::get_cached_token))
        .route("/verify-token", get(auth::verify_token))
}

/// 电影资源路由
fn movie_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/movies", get(movies::list_movies).post(movies::create_movie))
        .route(
            "/movies/{movie_id}",
            put(movies::update_movie).delete(movies::delete_movie),
        )
        .route_layer(from_fn_with_state(state, require_bearer))
}

async fn not_found(uri: Uri) -> Response {
    response::error(
        StatusCode::NOT_FOUND,
        "ROUTE_NOT_FOUND",
        &format!("No route for {}", uri.path()),
    )
}
