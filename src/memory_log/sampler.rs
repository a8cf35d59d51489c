//! 请求结束时的内存快照采集
//!
//! 纯函数：只根据传入的上下文构造 [`LogRecord`]，不做任何 I/O

use chrono::Local;

use super::model::{LogRecord, warning_for};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// 内存上限
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MemoryLimit {
    /// 不限制（"-1"、"0" 或无法解析）
    Unlimited,
    /// 上限（字节）
    Bytes(u64),
}

impl MemoryLimit {
    /// 解析人类可读的内存上限
    ///
    /// 支持二进制单位后缀 K/M/G（不区分大小写），无后缀时按字节处理
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() {
            return Self::Unlimited;
        }

        let (digits, multiplier) = match raw.chars().last() {
            Some('k' | 'K') => (&raw[..raw.len() - 1], 1024u64),
            Some('m' | 'M') => (&raw[..raw.len() - 1], 1024 * 1024),
            Some('g' | 'G') => (&raw[..raw.len() - 1], 1024 * 1024 * 1024),
            _ => (raw, 1),
        };

        match digits.trim().parse::<i64>() {
            Ok(n) if n > 0 => (n as u64)
                .checked_mul(multiplier)
                .map(Self::Bytes)
                .unwrap_or(Self::Unlimited),
            _ => Self::Unlimited,
        }
    }

    /// 转换为 MB，不限制时返回 None
    pub fn as_mb(&self) -> Option<f64> {
        match self {
            Self::Unlimited => None,
            Self::Bytes(bytes) => Some(*bytes as f64 / BYTES_PER_MB),
        }
    }
}

/// 采样上下文，由请求钩子在请求结束时填充
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub uri: Option<String>,
    pub user: Option<String>,
    pub memory_limit: String,
    pub usage_bytes: u64,
    pub peak_bytes: u64,
    pub method: Option<String>,
    pub is_async: bool,
    pub referrer: Option<String>,
    pub active_plugins: Vec<String>,
}

/// 保留两位小数
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// 计算峰值占上限的百分比，不限制时为 0
pub fn memory_percent(peak_bytes: u64, limit: MemoryLimit) -> f64 {
    match limit.as_mb() {
        Some(limit_mb) if limit_mb > 0.0 => {
            round2(peak_bytes as f64 / BYTES_PER_MB / limit_mb * 100.0)
        }
        _ => 0.0,
    }
}

/// 根据上下文构造一条日志记录
pub fn capture(ctx: &RequestContext) -> LogRecord {
    let limit = MemoryLimit::parse(&ctx.memory_limit);
    let percent = memory_percent(ctx.peak_bytes, limit);

    LogRecord {
        timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        uri: non_empty_or(ctx.uri.as_deref(), "unknown"),
        user: non_empty_or(ctx.user.as_deref(), "guest"),
        memory_usage_mb: round2(ctx.usage_bytes as f64 / BYTES_PER_MB),
        peak_memory_mb: round2(ctx.peak_bytes as f64 / BYTES_PER_MB),
        memory_limit: ctx.memory_limit.clone(),
        memory_percent: percent,
        active_plugins: ctx.active_plugins.clone(),
        method: non_empty_or(ctx.method.as_deref(), "CLI"),
        is_async: ctx.is_async,
        referrer: ctx.referrer.clone().unwrap_or_default(),
        warning: warning_for(percent),
    }
}

fn non_empty_or(value: Option<&str>, fallback: &str) -> String {
    match value {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => fallback.to_string(),
    }
}
