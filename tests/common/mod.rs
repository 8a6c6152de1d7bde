//! # 集成测试公共设施
//!
//! 桩身份提供商与测试配置来自 `movie_gateway::testing`，这里只补充
//! 真实监听的电影服务和直接驱动网关路由的辅助函数

#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::Value;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceExt;

use movie_gateway::app::AppContext;
use movie_gateway::config::{AppConfig, CorsConfig};
use movie_gateway::gateway::{AppState, GatewayServer};
use movie_gateway::movie_service::{MovieStore, movie_router};

pub use movie_gateway::testing::{
    StubIdentityProvider, TEST_PASSWORD, TEST_USERNAME, delegated_app_config, local_app_config,
    movie_json, sample_profile,
};

/// 在随机端口上启动真实的电影服务，返回基础 URL
pub async fn spawn_movie_service() -> (String, Arc<MovieStore>) {
    let store = Arc::new(MovieStore::new());
    let router = movie_router(Arc::clone(&store), &CorsConfig::default());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (format!("http://{addr}"), store)
}

/// 组装网关路由，同时返回上下文以便检查缓存状态
pub fn gateway(config: AppConfig) -> (Router, Arc<AppContext>) {
    let context = Arc::new(AppContext::new(Arc::new(config)).unwrap());
    let router = GatewayServer::create_router(AppState::new(Arc::clone(&context)));
    (router, context)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn get_with_auth(uri: &str, authorization: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, authorization)
        .body(Body::empty())
        .unwrap()
}

pub fn json_request(method: &str, uri: &str, authorization: &str, body: &Value) -> Request<Body> {
    raw_json_request(method, uri, authorization, body.to_string())
}

/// 原样发送请求体，不保证是合法 JSON
pub fn raw_json_request(
    method: &str,
    uri: &str,
    authorization: &str,
    body: impl Into<Body>,
) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, authorization)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap()
}

pub fn login_form(username: &str, password: &str) -> Request<Body> {
    let body = format!(
        "username={}&password={}",
        urlencoding::encode(username),
        urlencoding::encode(password)
    );
    Request::builder()
        .method("POST")
        .uri("/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

/// 发送请求，返回状态码和 JSON 响应体（空响应体为 `Null`）
pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}
