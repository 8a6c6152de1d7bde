//! # 日志配置模块
//!
//! 初始化 tracing 订阅器，并提供带有阶段/组件字段的结构化日志宏

use std::env;
use std::fmt;
use tracing_subscriber::{EnvFilter, fmt as tracing_fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[doc(hidden)]
pub use tracing as __tracing;

/// 请求处理阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStage {
    Startup,
    Shutdown,
    Configuration,
    Authentication,
    Cache,
    ExternalApi,
    UpstreamRequest,
}

impl LogStage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::Shutdown => "shutdown",
            Self::Configuration => "configuration",
            Self::Authentication => "authentication",
            Self::Cache => "cache",
            Self::ExternalApi => "external_api",
            Self::UpstreamRequest => "upstream_request",
        }
    }
}

impl fmt::Display for LogStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 产生日志的组件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogComponent {
    Main,
    Config,
    ServerSetup,
    Gateway,
    OAuth,
    TokenCache,
    Jwt,
    Verifier,
    Upstream,
    MovieService,
}

impl LogComponent {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Config => "config",
            Self::ServerSetup => "server_setup",
            Self::Gateway => "gateway",
            Self::OAuth => "oauth",
            Self::TokenCache => "token_cache",
            Self::Jwt => "jwt",
            Self::Verifier => "verifier",
            Self::Upstream => "upstream",
            Self::MovieService => "movie_service",
        }
    }
}

impl fmt::Display for LogComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 结构化日志宏的公共实现
#[doc(hidden)]
#[macro_export]
macro_rules! __structured_log {
    ($level:ident, $request_id:expr, $stage:expr, $component:expr, $operation:expr, $message:expr $(,)?) => {
        $crate::logging::__tracing::$level!(
            request_id = %$request_id,
            stage = %$stage,
            component = %$component,
            operation = %$operation,
            "{}",
            $message
        )
    };
    ($level:ident, $request_id:expr, $stage:expr, $component:expr, $operation:expr, $message:expr, $($field:tt)+) => {
        $crate::logging::__tracing::$level!(
            request_id = %$request_id,
            stage = %$stage,
            component = %$component,
            operation = %$operation,
            $($field)+,
            "{}",
            $message
        )
    };
}

/// INFO 级别结构化日志
#[macro_export]
macro_rules! linfo {
    ($($arg:tt)+) => { $crate::__structured_log!(info, $($arg)+) };
}

/// DEBUG 级别结构化日志
#[macro_export]
macro_rules! ldebug {
    ($($arg:tt)+) => { $crate::__structured_log!(debug, $($arg)+) };
}

/// WARN 级别结构化日志
#[macro_export]
macro_rules! lwarn {
    ($($arg:tt)+) => { $crate::__structured_log!(warn, $($arg)+) };
}

/// ERROR 级别结构化日志
#[macro_export]
macro_rules! lerror {
    ($($arg:tt)+) => { $crate::__structured_log!(error, $($arg)+) };
}

/// 令牌脱敏：只保留前缀与长度
#[must_use]
pub fn sanitize_token_for_logging(token: &str) -> String {
    if token.len() <= 8 {
        return format!("***(len={})", token.len());
    }
    let prefix: String = token.chars().take(6).collect();
    format!("{prefix}...(len={})", token.len())
}

/// 初始化日志系统
pub fn init_logging(log_level: Option<&str>) {
    let level = log_level.unwrap_or("info");
    let default_filter = format!("{level},movie_gateway=debug,tower_http=info,hyper=warn,reqwest=warn");

    let log_filter = env::var("RUST_LOG").unwrap_or(default_filter);

    let result = tracing_subscriber::registry()
        .with(EnvFilter::try_new(&log_filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .try_init();

    if result.is_ok() {
        tracing::info!(filter = %log_filter, "📋 日志系统初始化完成");
    }
}

/// 环境变量设置指南
pub fn print_logging_help() {
    println!("📋 日志配置指南:");
    println!("  RUST_LOG=info                          # 标准日志级别");
    println!("  RUST_LOG=debug                         # 调试级别");
    println!("  RUST_LOG=movie_gateway=trace           # 应用详细追踪");
    println!("  RUST_LOG=info,tower_http=debug         # 输出每个HTTP请求");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_token_for_logging() {
        assert_eq!(sanitize_token_for_logging("abc"), "***(len=3)");
        assert_eq!(
            sanitize_token_for_logging("ya29.a0AfH6SMBxyz"),
            "ya29.a...(len=17)"
        );
    }

    #[test]
    fn test_stage_and_component_names() {
        assert_eq!(LogStage::ExternalApi.to_string(), "external_api");
        assert_eq!(LogComponent::TokenCache.to_string(), "token_cache");
    }

    #[test]
    fn test_macros_expand_without_subscriber() {
        crate::linfo!(
            "system",
            LogStage::Startup,
            LogComponent::Main,
            "macro_check",
            "plain message"
        );
        crate::lwarn!(
            "req-1",
            LogStage::Cache,
            LogComponent::TokenCache,
            "macro_fields",
            &format!("code={}", "abc"),
            cached = 3
        );
    }
}
