//! 导出 / 清空操作

use chrono::Local;

use super::error::MemoryLogError;
use super::nonce::{CLEAR_ACTION, NonceStore};
use super::store::EventLogStore;

/// 导出的文件
#[derive(Debug)]
pub struct ExportFile {
    pub filename: String,
    pub content_type: &'static str,
    /// 日志文件原始字节（JSON Lines，不是 JSON 数组）
    pub body: Vec<u8>,
}

/// 导出文件名：`debug-memory-YYYYMMDD_HHMMSS.json`
pub fn export_filename() -> String {
    format!("debug-memory-{}.json", Local::now().format("%Y%m%d_%H%M%S"))
}

/// 导出日志原文
pub fn export(store: &EventLogStore, authorized: bool) -> Result<ExportFile, MemoryLogError> {
    if !authorized {
        return Err(MemoryLogError::Unauthorized);
    }

    let body = match store.read_raw()? {
        Some(body) if !body.is_empty() => body,
        _ => return Err(MemoryLogError::NotFound),
    };

    Ok(ExportFile {
        filename: export_filename(),
        content_type: "application/json",
        body,
    })
}

/// 清空日志，需要管理员权限和一次性 token
pub fn clear(
    store: &EventLogStore,
    nonces: &NonceStore,
    authorized: bool,
    nonce: Option<&str>,
) -> Result<(), MemoryLogError> {
    if !authorized {
        return Err(MemoryLogError::Unauthorized);
    }
    match nonce {
        Some(token) if nonces.consume(CLEAR_ACTION, token) => {}
        _ => {
            tracing::warn!("清空内存日志被拒绝：防伪 token 缺失或无效");
            return Err(MemoryLogError::Unauthorized);
        }
    }

    store.clear()
}
