//! # 电影服务路由与监听

use axum::Router;
use axum::middleware::from_fn;
use axum::routing::{get, put};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{create_movie, delete_movie, list_movies, require_bearer_shape, update_movie};
use super::store::MovieStore;
use crate::config::{CorsConfig, ListenerConfig};
use crate::error::{GatewayError, Result};
use crate::gateway::server::build_cors_layer;
use crate::linfo;
use crate::logging::{LogComponent, LogStage};

/// 构建电影服务路由
pub fn movie_router(store: Arc<MovieStore>, cors: &CorsConfig) -> Router {
    let mut router = Router::new()
        .route("/movies", get(list_movies).post(create_movie))
        .route("/movies/{movie_id}", put(update_movie).delete(delete_movie))
        .layer(from_fn(require_bearer_shape))
        .with_state(store);

    if let Some(cors_layer) = build_cors_layer(cors) {
        router = router.layer(cors_layer);
    }

    router.layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

/// 电影服务
pub struct MovieServer {
    listener: ListenerConfig,
    router: Router,
}

impl MovieServer {
    pub fn new(listener: ListenerConfig, store: Arc<MovieStore>, cors: &CorsConfig) -> Self {
        Self {
            listener,
            router: movie_router(store, cors),
        }
    }

    /// 启动监听，直到监听失败才返回
    pub async fn serve(self) -> Result<()> {
        let addr = self.listener.bind_address()?;
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            GatewayError::server_start_with_source(format!("电影服务绑定 {addr} 失败"), e)
        })?;

        linfo!(
            "system",
            LogStage::Startup,
            LogComponent::MovieService,
            "serve",
            &format!("电影服务监听于 {addr}")
        );

        axum::serve(listener, self.router)
            .await
            .map_err(|e| GatewayError::server_start_with_source("电影服务异常退出", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{bearer, movie_json};
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn router() -> Router {
        movie_router(Arc::new(MovieStore::new()), &CorsConfig::default())
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn authed(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, bearer("anything"));
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_crud_flow() {
        let router = router();

        let (status, body) = send(&router, authed("POST", "/movies", Some(movie_json(1, "Alien")))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, movie_json(1, "Alien"));

        let (_, body) = send(&router, authed("GET", "/movies", None)).await;
        assert_eq!(body, json!([movie_json(1, "Alien")]));

        let (status, body) =
            send(&router, authed("PUT", "/movies/1", Some(movie_json(1, "Aliens")))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], "Aliens");

        let (status, body) = send(&router, authed("DELETE", "/movies/1", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"message": "Movie deleted"}));

        let (status, body) = send(&router, authed("DELETE", "/movies/1", None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"detail": "Movie not found"}));
    }

    #[tokio::test]
    async fn test_scheme_check_only() {
        let router = router();

        let request = Request::get("/movies").body(Body::empty()).unwrap();
        let (status, body) = send(&router, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({"detail": "No authorization header"}));

        let request = Request::get("/movies")
            .header(header::AUTHORIZATION, "Basic abc")
            .body(Body::empty())
            .unwrap();
        let (_, body) = send(&router, request).await;
        assert_eq!(body, json!({"detail": "Invalid authentication scheme"}));

        let request = Request::get("/movies")
            .header(header::AUTHORIZATION, "Bearer")
            .body(Body::empty())
            .unwrap();
        let (_, body) = send(&router, request).await;
        assert_eq!(body, json!({"detail": "Invalid authorization header"}));
    }
}
