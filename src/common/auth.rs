//! Admin Key 认证工具

use axum::{body::Body, http::Request};
use subtle::ConstantTimeEq;

/// 从请求中提取 Admin Key
///
/// 支持 `x-api-key` header 和 `Authorization: Bearer <key>` header
pub fn extract_api_key(request: &Request<Body>) -> Option<String> {
    let headers = request.headers();

    if let Some(key) = headers.get("x-api-key").and_then(|v| v.to_str().ok()) {
        return Some(key.to_string());
    }

    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|v| v.to_string())
}

/// 常量时间字符串比较，防止时序攻击
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// 请求是否携带有效的 Admin Key
pub fn is_admin(request: &Request<Body>, admin_api_key: &str) -> bool {
    matches!(extract_api_key(request), Some(key) if constant_time_eq(&key, admin_api_key))
}
