//! # Movie Gateway Library
//!
//! 认证网关核心库：授权码交换与缓存、本地令牌签发、凭据验证、资源转发

pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod movie_service;
pub mod server_setup;
pub mod testing;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AuthError, GatewayError, Result};
