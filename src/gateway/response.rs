//! # API 响应结构
//!
//! 成功响应直接返回业务 JSON；错误统一为 `ErrorResponse`，
//! 上游错误附带上游状态码和原始响应体。

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AuthError, GatewayError};

/// # 标准错误信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
    /// 上游返回的HTTP状态码
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_status: Option<u16>,
    /// 上游原始响应体
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// # 标准错误响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorInfo,
    pub timestamp: DateTime<Utc>,
}

impl ErrorResponse {
    /// 从应用错误构造
    #[must_use]
    pub fn from_error(error: &GatewayError) -> (StatusCode, Self) {
        let (status, code) = error.to_http_response_parts();
        let response = Self {
            success: false,
            error: ErrorInfo {
                code: code.to_string(),
                message: error.to_string(),
                upstream_status: error.upstream_status(),
                detail: error.upstream_body().map(str::to_string),
            },
            timestamp: Utc::now(),
        };
        (status, response)
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, body) = ErrorResponse::from_error(&self);
        if status.is_server_error() {
            tracing::error!(code = %body.error.code, error = %self, "request failed");
        }
        (status, Json(body)).into_response()
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        GatewayError::from(self).into_response()
    }
}

/// # 便捷函数：HTTP错误响应
pub fn error(status: StatusCode, code: &str, message: &str) -> Response {
    let body = ErrorResponse {
        success: false,
        error: ErrorInfo {
            code: code.to_string(),
            message: message.to_string(),
            upstream_status: None,
            detail: None,
        },
        timestamp: Utc::now(),
    };
    (status, Json(body)).into_response()
}
