//! 内存日志错误类型

use axum::http::StatusCode;

use super::types::ErrorResponse;

/// 内存日志错误
#[derive(Debug)]
pub enum MemoryLogError {
    /// 权限或防伪 token 校验失败
    Unauthorized,
    /// 导出时日志文件不存在或为空
    NotFound,
    /// 单行日志无法解析（仅内部使用，不向查看者暴露）
    ParseSkipped { line: usize, reason: String },
    /// 追加或清空失败
    WriteFailed(String),
    /// 读取失败
    ReadFailed(String),
}

impl std::fmt::Display for MemoryLogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemoryLogError::Unauthorized => write!(f, "Unauthorized"),
            MemoryLogError::NotFound => write!(f, "No memory log entries to export"),
            MemoryLogError::ParseSkipped { line, reason } => {
                write!(f, "Skipped malformed log line {}: {}", line, reason)
            }
            MemoryLogError::WriteFailed(e) => write!(f, "Failed to write memory log: {}", e),
            MemoryLogError::ReadFailed(e) => write!(f, "Failed to read memory log: {}", e),
        }
    }
}

impl std::error::Error for MemoryLogError {}

impl MemoryLogError {
    /// 对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            MemoryLogError::Unauthorized => StatusCode::FORBIDDEN,
            MemoryLogError::NotFound => StatusCode::NOT_FOUND,
            MemoryLogError::ParseSkipped { .. }
            | MemoryLogError::WriteFailed(_)
            | MemoryLogError::ReadFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 转换为对外错误响应（内部错误不暴露细节）
    pub fn into_response(self) -> ErrorResponse {
        match self {
            MemoryLogError::Unauthorized => ErrorResponse::unauthorized(),
            MemoryLogError::NotFound => ErrorResponse::not_found(self.to_string()),
            _ => ErrorResponse::internal_error("Memory log operation failed"),
        }
    }
}
