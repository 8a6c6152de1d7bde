//! # 网关服务器
//!
//! Axum HTTP服务器，客户端唯一可见的入口

use axum::Router;
use axum::http::{HeaderValue, Method, header};
use std::net::SocketAddr;
use std::ops::Deref;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::app::context::AppContext;
use crate::config::CorsConfig;
use crate::error::{GatewayError, Result};
use crate::logging::{LogComponent, LogStage};
use crate::{linfo, lwarn};

/// 网关应用状态
#[derive(Clone)]
pub struct AppState {
    context: Arc<AppContext>,
}

impl AppState {
    #[must_use]
    pub const fn new(context: Arc<AppContext>) -> Self {
        Self { context }
    }
}

impl Deref for AppState {
    type Target = AppContext;

    fn deref(&self) -> &Self::Target {
        &self.context
    }
}

/// 根据配置构建 CORS 层，未启用时返回 `None`
pub fn build_cors_layer(config: &CorsConfig) -> Option<CorsLayer> {
    if !config.enabled {
        return None;
    }

    let cors_layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            header::ORIGIN,
        ]);

    if config.origins.iter().any(|origin| origin == "*") {
        return Some(cors_layer.allow_origin(Any));
    }

    let origins = config
        .origins
        .iter()
        .map(|origin| origin.parse::<HeaderValue>())
        .collect::<std::result::Result<Vec<_>, _>>();

    match origins {
        Ok(origins) => Some(cors_layer.allow_origin(origins)),
        Err(e) => {
            lwarn!(
                "system",
                LogStage::Startup,
                LogComponent::ServerSetup,
                "cors_config_fail",
                &format!("Invalid CORS origin configuration: {e}, falling back to allow any")
            );
            Some(cors_layer.allow_origin(Any))
        }
    }
}

/// 网关服务器
pub struct GatewayServer {
    bind_address: SocketAddr,
    router: Router,
}

impl GatewayServer {
    /// 创建新的网关服务器
    pub fn new(context: Arc<AppContext>) -> Result<Self> {
        let bind_address = context.config.server.bind_address()?;
        let router = Self::create_router(AppState::new(context));
        Ok(Self {
            bind_address,
            router,
        })
    }

    /// 创建路由器
    pub fn create_router(state: AppState) -> Router {
        let cors = build_cors_layer(&state.config.cors);
        let mut app = super::routes::create_routes(state);

        let service_builder = ServiceBuilder::new().layer(TraceLayer::new_for_http());
        if let Some(cors_layer) = cors {
            app = app.layer(service_builder.layer(cors_layer));
        } else {
            app = app.layer(service_builder);
        }
        app
    }

    /// 启动服务器
    pub async fn serve(self) -> Result<()> {
        let addr = self.bind_address;
        linfo!(
            "system",
            LogStage::Startup,
            LogComponent::ServerSetup,
            "server_start",
            &format!("Starting gateway server on {addr}")
        );

        let listener = TcpListener::bind(&addr).await.map_err(|e| {
            GatewayError::server_start_with_source(format!("网关绑定 {addr} 失败"), e)
        })?;

        axum::serve(listener, self.router)
            .await
            .map_err(|e| GatewayError::server_start_with_source("网关服务异常退出", e))
    }

    /// 获取绑定地址
    #[must_use]
    pub const fn bind_address(&self) -> SocketAddr {
        self.bind_address
    }

    /// 路由器（测试中直接驱动）
    #[must_use]
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}
