//! # 健康检查处理器

use axum::{Json, extract::State};
use serde::Serialize;

use crate::gateway::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub verification_mode: &'static str,
    /// 尚未被取走的缓存记录数，没有过期淘汰，只会随消费减少
    pub cached_tokens: usize,
    pub in_flight_exchanges: usize,
    pub uptime_seconds: u64,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok",
        verification_mode: state.verification_mode().as_str(),
        cached_tokens: state.token_cache.len(),
        in_flight_exchanges: state.token_cache.in_flight(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    })
}
