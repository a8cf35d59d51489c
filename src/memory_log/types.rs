//! Memory Log API 请求/响应类型

use serde::{Deserialize, Serialize};

/// 查看页面查询参数
#[derive(Debug, Default, Deserialize)]
pub struct ViewQuery {
    /// 清空成功后跳转回页面时携带，用于显示确认提示
    #[serde(default)]
    pub cleared: bool,
}

/// 清空请求（表单字段或查询参数）
#[derive(Debug, Default, Deserialize)]
pub struct ClearRequest {
    #[serde(default)]
    pub nonce: Option<String>,
}

/// 错误响应
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorBody {
                error_type: error_type.into(),
                message: message.into(),
            },
        }
    }

    pub fn unauthorized() -> Self {
        Self::new("unauthorized", "Unauthorized")
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("not_found", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
    }
}
