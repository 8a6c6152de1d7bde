//! # 测试辅助函数

use std::sync::Once;
use tracing::Level;

static INIT: Once = Once::new();

/// 初始化测试日志
pub fn init_test_env() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(Level::DEBUG)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// 构造 `Authorization` 头值
pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}
