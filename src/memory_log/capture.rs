//! 请求结束时的内存采样中间件
//!
//! 包裹宿主路由，在内层处理器返回响应后采样并追加一条记录。
//! 写入失败只记录日志，不影响已生成的响应。

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};

use crate::common::auth;
use crate::model::config::CaptureScope;

use super::sampler::{RequestContext, capture};
use super::source::MemorySource;
use super::store::EventLogStore;

/// 采样中间件状态
#[derive(Clone)]
pub struct CaptureState {
    pub store: EventLogStore,
    pub source: Arc<dyn MemorySource>,
    pub scope: CaptureScope,
    pub admin_api_key: String,
    pub admin_user: String,
    pub memory_limit: String,
    pub active_plugins: Arc<Vec<String>>,
}

/// 采样中间件
pub async fn capture_middleware(
    State(state): State<CaptureState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let is_admin = auth::is_admin(&request, &state.admin_api_key);
    if !is_admin && state.scope == CaptureScope::AdminOnly {
        return next.run(request).await;
    }

    let uri = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string());
    let method = request.method().as_str().to_string();
    let referrer = request
        .headers()
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());
    let is_async = request
        .headers()
        .get("x-requested-with")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("XMLHttpRequest"));

    let response = next.run(request).await;

    let sample = state.source.sample();
    let ctx = RequestContext {
        uri,
        user: is_admin.then(|| state.admin_user.clone()),
        memory_limit: state.memory_limit.clone(),
        usage_bytes: sample.usage_bytes,
        peak_bytes: sample.peak_bytes,
        method: Some(method),
        is_async,
        referrer,
        active_plugins: state.active_plugins.as_ref().clone(),
    };
    let record = capture(&ctx);

    let store = state.store.clone();
    match tokio::task::spawn_blocking(move || store.append(&record)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!("写入内存日志失败: {}", e),
        Err(e) => tracing::error!("内存日志写入任务异常: {}", e),
    }

    response
}
