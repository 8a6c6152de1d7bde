//! # 资源服务转发客户端
//!
//! 将 `Authorization` 头原样转发给电影服务。成功响应体原样返回，
//! 非成功响应转换为 `GatewayError::Upstream`，保留状态码和响应体。

use axum::body::Bytes;
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use std::time::Duration;

use crate::error::{GatewayError, Result};
use crate::logging::{LogComponent, LogStage};
use crate::{ldebug, lwarn};

/// 转发成功的响应
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardedResponse {
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub body: Bytes,
}

impl IntoResponse for ForwardedResponse {
    fn into_response(self) -> Response {
        let content_type = self
            .content_type
            .unwrap_or_else(|| HeaderValue::from_static("application/json"));
        (self.status, [(header::CONTENT_TYPE, content_type)], self.body).into_response()
    }
}

/// 资源服务客户端
#[derive(Debug, Clone)]
pub struct ResourceClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl ResourceClient {
    /// 创建客户端，`timeout` 同时约束连接和整个请求
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| GatewayError::config_with_source("创建资源服务HTTP客户端失败", e))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// 转发请求
    ///
    /// `path` 以 `/` 开头；`json_body` 为 `Some` 时以 JSON 发送
    pub async fn forward(
        &self,
        method: Method,
        path: &str,
        authorization: &HeaderValue,
        json_body: Option<Bytes>,
    ) -> Result<ForwardedResponse> {
        let url = format!("{}{path}", self.base_url);
        ldebug!(
            "system",
            LogStage::UpstreamRequest,
            LogComponent::Upstream,
            "forward",
            "转发资源请求",
            method = %method,
            url = %url
        );

        let mut request = self
            .http_client
            .request(method, &url)
            .header(header::AUTHORIZATION, authorization.clone());
        if let Some(body) = json_body {
            request = request
                .header(header::CONTENT_TYPE, "application/json")
                .body(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| GatewayError::network_with_source(format!("资源服务不可达: {url}"), e))?;

        let status = response.status();
        let content_type = response.headers().get(header::CONTENT_TYPE).cloned();
        let body = response
            .bytes()
            .await
            .map_err(|e| GatewayError::network_with_source("读取资源服务响应失败", e))?;

        if !status.is_success() {
            let body = String::from_utf8_lossy(&body).into_owned();
            lwarn!(
                "system",
                LogStage::UpstreamRequest,
                LogComponent::Upstream,
                "forward",
                "资源服务返回非成功状态",
                status = status.as_u16(),
                body = %body
            );
            return Err(GatewayError::upstream(status.as_u16(), body));
        }

        Ok(ForwardedResponse {
            status,
            content_type,
            body,
        })
    }
}
