//! # 网关模块
//!
//! 客户端唯一可见的入口：认证流程路由、资源转发、错误响应格式

pub mod handlers;
pub mod middleware;
pub mod resource_client;
pub mod response;
pub mod routes;
pub mod server;

pub use resource_client::ResourceClient;
pub use server::{AppState, GatewayServer};
