//! 请求内存日志模块
//!
//! 请求结束时采样内存并追加到 JSON Lines 文件，提供管理页面查看、导出和清空

pub mod actions;
pub mod capture;
pub mod error;
pub mod model;
pub mod nonce;
pub mod report;
pub mod sampler;
pub mod source;
pub mod store;
mod handlers;
mod router;
mod types;

pub use capture::{CaptureState, capture_middleware};
pub use nonce::NonceStore;
pub use router::{MEMORY_LOG_BASE_PATH, create_memory_log_router};
pub use source::ProcessMemorySource;
pub use store::EventLogStore;
