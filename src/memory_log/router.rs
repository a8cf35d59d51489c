//! Memory Log 路由

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::{IntoResponse, Json},
    routing::{get, post},
};

use crate::common::auth;

use super::error::MemoryLogError;
use super::handlers::{clear_log, export_log, get_records, view_page};
use super::nonce::NonceStore;
use super::store::EventLogStore;

/// 默认挂载路径
pub const MEMORY_LOG_BASE_PATH: &str = "/admin/memory-log";

/// 管理员权限标记，由认证中间件注入请求扩展
#[derive(Debug, Clone, Copy)]
pub struct AdminCapability;

/// Memory Log 路由状态
#[derive(Clone)]
pub struct MemoryLogState {
    pub admin_api_key: String,
    pub base_path: String,
    pub store: EventLogStore,
    pub nonces: Arc<NonceStore>,
}

/// Admin 认证中间件
async fn admin_auth_middleware(
    State(state): State<MemoryLogState>,
    mut request: Request<Body>,
    next: Next,
) -> axum::response::Response {
    if auth::is_admin(&request, &state.admin_api_key) {
        request.extensions_mut().insert(AdminCapability);
        return next.run(request).await;
    }

    let e = MemoryLogError::Unauthorized;
    (e.status_code(), Json(e.into_response())).into_response()
}

/// 创建 Memory Log 路由
///
/// # 端点
/// - `GET /` - 管理页面（`?cleared=true` 显示清空成功提示）
/// - `GET /records` - 报表视图模型 JSON
/// - `GET /export` - 导出日志原文
/// - `POST /clear` - 清空日志（需要一次性 token）
///
/// 返回 Router<()>，由调用方 nest 到 `base_path`
pub fn create_memory_log_router(
    admin_api_key: impl Into<String>,
    base_path: impl Into<String>,
    store: EventLogStore,
    nonces: Arc<NonceStore>,
) -> Router {
    let state = MemoryLogState {
        admin_api_key: admin_api_key.into(),
        base_path: base_path.into(),
        store,
        nonces,
    };

    Router::new()
        .route("/", get(view_page))
        .route("/records", get(get_records))
        .route("/export", get(export_log))
        .route("/clear", post(clear_log))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth_middleware,
        ))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use axum::http::{StatusCode, header};
    use tower::ServiceExt;

    use crate::memory_log::nonce::CLEAR_ACTION;
    use crate::memory_log::sampler::{RequestContext, capture};

    const KEY: &str = "secret";
    const MB: u64 = 1024 * 1024;

    struct Fixture {
        _dir: tempfile::TempDir,
        store: EventLogStore,
        nonces: Arc<NonceStore>,
        app: Router,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let store = EventLogStore::new(dir.path().join("debug-memory.log"));
        let nonces = Arc::new(NonceStore::new(Duration::from_secs(60)));
        let app = Router::new().nest(
            MEMORY_LOG_BASE_PATH,
            create_memory_log_router(KEY, MEMORY_LOG_BASE_PATH, store.clone(), nonces.clone()),
        );
        Fixture {
            _dir: dir,
            store,
            nonces,
            app,
        }
    }

    fn append(store: &EventLogStore, peak_mb: u64) {
        store
            .append(&capture(&RequestContext {
                uri: Some("/shop/cart/".to_string()),
                memory_limit: "256M".to_string(),
                peak_bytes: peak_mb * MB,
                ..Default::default()
            }))
            .unwrap();
    }

    fn get_req(path: &str, key: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(path);
        if let Some(key) = key {
            builder = builder.header("x-api-key", key);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn clear_req(nonce: &str, key: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(format!("{}/clear", MEMORY_LOG_BASE_PATH))
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(key) = key {
            builder = builder.header("authorization", format!("Bearer {}", key));
        }
        builder.body(Body::from(format!("nonce={}", nonce))).unwrap()
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_requires_admin_key() {
        let f = fixture();
        for path in ["", "/records", "/export"] {
            let response = f
                .app
                .clone()
                .oneshot(get_req(&format!("{}{}", MEMORY_LOG_BASE_PATH, path), Some("wrong")))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::FORBIDDEN);
            assert!(body_string(response).await.contains("Unauthorized"));
        }
    }

    #[tokio::test]
    async fn test_view_page_renders_rows() {
        let f = fixture();
        append(&f.store, 230);
        append(&f.store, 240);

        let response = f
            .app
            .clone()
            .oneshot(get_req(MEMORY_LOG_BASE_PATH, Some(KEY)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let page = body_string(response).await;
        assert!(page.contains("Total entries: 2"));
        assert!(page.contains("class=\"memory-medium\" data-index=\"0\""));
        assert!(page.contains("class=\"memory-high\" data-index=\"1\""));
        assert!(page.contains("name=\"nonce\""));
    }

    #[tokio::test]
    async fn test_records_json() {
        let f = fixture();
        append(&f.store, 230);
        append(&f.store, 240);

        let response = f
            .app
            .clone()
            .oneshot(get_req(&format!("{}/records", MEMORY_LOG_BASE_PATH), Some(KEY)))
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();

        assert_eq!(json["total"], 2);
        assert_eq!(json["rows"][0]["severity"], "medium");
        assert_eq!(json["rows"][1]["severity"], "high");
        assert_eq!(json["detail"][1]["warning"], "High memory usage");
    }

    #[tokio::test]
    async fn test_export_empty_is_not_found() {
        let f = fixture();
        let response = f
            .app
            .clone()
            .oneshot(get_req(&format!("{}/export", MEMORY_LOG_BASE_PATH), Some(KEY)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_export_returns_file_verbatim() {
        let f = fixture();
        append(&f.store, 100);

        let response = f
            .app
            .clone()
            .oneshot(get_req(&format!("{}/export", MEMORY_LOG_BASE_PATH), Some(KEY)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
        let disposition = response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.starts_with("attachment; filename=\"debug-memory-"));
        assert!(disposition.ends_with(".json\""));

        let body = body_string(response).await;
        assert_eq!(body.as_bytes(), std::fs::read(f.store.path()).unwrap().as_slice());
    }

    #[tokio::test]
    async fn test_clear_with_nonce_redirects() {
        let f = fixture();
        append(&f.store, 100);
        let nonce = f.nonces.issue(CLEAR_ACTION);

        let response = f.app.clone().oneshot(clear_req(&nonce, Some(KEY))).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()[header::LOCATION],
            "/admin/memory-log?cleared=true"
        );
        assert!(f.store.read_all().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear_with_bad_nonce_is_forbidden() {
        let f = fixture();
        append(&f.store, 100);

        let response = f.app.clone().oneshot(clear_req("forged", Some(KEY))).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(f.store.read_all().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_clear_without_admin_keeps_nonce_and_store() {
        let f = fixture();
        append(&f.store, 100);
        let nonce = f.nonces.issue(CLEAR_ACTION);

        let response = f.app.clone().oneshot(clear_req(&nonce, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(f.store.read_all().unwrap().len(), 1);
        assert!(f.nonces.consume(CLEAR_ACTION, &nonce));
    }
}
