//! Memory Log API 处理器
//!
//! 所有处理器都挂在 Admin 认证中间件之后，导出和清空仍会检查中间件注入的 [`AdminCapability`]

use axum::{
    Extension, Form,
    extract::{Query, State, rejection::FormRejection},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Json, Redirect, Response},
};

use super::actions;
use super::error::MemoryLogError;
use super::nonce::CLEAR_ACTION;
use super::report::{self, PageContext};
use super::router::{AdminCapability, MemoryLogState};
use super::types::{ClearRequest, ViewQuery};

fn error_response(e: MemoryLogError) -> Response {
    (e.status_code(), Json(e.into_response())).into_response()
}

async fn load_records(state: &MemoryLogState) -> Result<report::ReportView, MemoryLogError> {
    let store = state.store.clone();
    let records = tokio::task::spawn_blocking(move || store.read_all())
        .await
        .map_err(|e| MemoryLogError::ReadFailed(e.to_string()))??;
    Ok(report::render(records))
}

/// GET /admin/memory-log
/// 管理页面
pub async fn view_page(
    State(state): State<MemoryLogState>,
    Query(query): Query<ViewQuery>,
) -> Response {
    match load_records(&state).await {
        Ok(view) => {
            let nonce = state.nonces.issue(CLEAR_ACTION);
            let page = report::render_page(
                &view,
                &PageContext {
                    base_path: &state.base_path,
                    clear_nonce: &nonce,
                    cleared: query.cleared,
                },
            );
            Html(page).into_response()
        }
        Err(e) => {
            tracing::error!("读取内存日志失败: {}", e);
            error_response(e)
        }
    }
}

/// GET /admin/memory-log/records
/// 报表视图模型（JSON）
pub async fn get_records(State(state): State<MemoryLogState>) -> Response {
    match load_records(&state).await {
        Ok(view) => Json(view).into_response(),
        Err(e) => {
            tracing::error!("读取内存日志失败: {}", e);
            error_response(e)
        }
    }
}

/// GET /admin/memory-log/export
/// 导出日志原文
pub async fn export_log(
    State(state): State<MemoryLogState>,
    capability: Option<Extension<AdminCapability>>,
) -> Response {
    let authorized = capability.is_some();
    let store = state.store.clone();
    let result = tokio::task::spawn_blocking(move || actions::export(&store, authorized))
        .await
        .map_err(|e| MemoryLogError::ReadFailed(e.to_string()))
        .and_then(|r| r);

    match result {
        Ok(file) => {
            tracing::info!(filename = %file.filename, bytes = file.body.len(), "导出内存日志");
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, file.content_type.to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{}\"", file.filename),
                    ),
                ],
                bytes::Bytes::from(file.body),
            )
                .into_response()
        }
        Err(e) => {
            if !matches!(e, MemoryLogError::NotFound) {
                tracing::error!("导出内存日志失败: {}", e);
            }
            error_response(e)
        }
    }
}

/// POST /admin/memory-log/clear
/// 清空日志，成功后跳转回管理页面
pub async fn clear_log(
    State(state): State<MemoryLogState>,
    capability: Option<Extension<AdminCapability>>,
    Query(query): Query<ClearRequest>,
    form: Result<Form<ClearRequest>, FormRejection>,
) -> Response {
    let authorized = capability.is_some();
    let nonce = form.ok().and_then(|Form(f)| f.nonce).or(query.nonce);

    let store = state.store.clone();
    let nonces = state.nonces.clone();
    let result = tokio::task::spawn_blocking(move || {
        actions::clear(&store, &nonces, authorized, nonce.as_deref())
    })
    .await
    .map_err(|e| MemoryLogError::WriteFailed(e.to_string()))
    .and_then(|r| r);

    match result {
        Ok(()) => Redirect::to(&format!("{}?cleared=true", state.base_path)).into_response(),
        Err(e) => {
            if !matches!(e, MemoryLogError::Unauthorized) {
                tracing::error!("清空内存日志失败: {}", e);
            }
            error_response(e)
        }
    }
}
