//! # 测试框架模块
//!
//! 提供桩身份提供商、测试配置和测试辅助函数

#[cfg(any(test, feature = "testing"))]
pub mod fixtures;
#[cfg(any(test, feature = "testing"))]
pub mod helpers;
#[cfg(any(test, feature = "testing"))]
pub mod mocks;

#[cfg(any(test, feature = "testing"))]
pub use fixtures::*;
#[cfg(any(test, feature = "testing"))]
pub use helpers::*;
#[cfg(any(test, feature = "testing"))]
pub use mocks::*;
