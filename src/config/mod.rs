//! # 配置管理模块
//!
//! 处理应用配置加载、验证和环境变量覆盖。配置只在进程启动时加载一次。

mod app_config;
mod manager;

pub use app_config::{
    AppConfig, AuthSettings, CorsConfig, ListenerConfig, LocalAuthConfig, MovieServiceConfig,
    ProviderConfig, VerificationMode,
};
pub use manager::ConfigManager;
