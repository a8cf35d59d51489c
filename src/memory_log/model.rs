//! 内存日志记录数据模型

use serde::{Deserialize, Serialize};

/// 高内存警告文本
pub const HIGH_MEMORY_WARNING: &str = "High memory usage";

/// 单次请求的内存快照，写入后不可修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// 采样时间（本地时间，`YYYY-MM-DD HH:MM:SS`）
    pub timestamp: String,
    #[serde(default = "default_uri")]
    pub uri: String,
    #[serde(default = "default_user")]
    pub user: String,
    pub memory_usage_mb: f64,
    pub peak_memory_mb: f64,
    /// 原始配置值，如 "256M"
    #[serde(default)]
    pub memory_limit: String,
    pub memory_percent: f64,
    #[serde(default)]
    pub active_plugins: Vec<String>,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub is_async: bool,
    #[serde(default)]
    pub referrer: String,
    #[serde(default)]
    pub warning: String,
}

fn default_uri() -> String {
    "unknown".to_string()
}

fn default_user() -> String {
    "guest".to_string()
}

fn default_method() -> String {
    "CLI".to_string()
}

impl LogRecord {
    /// 校验反序列化后的记录，内存数值必须为有限非负数
    pub fn validate(&self) -> Result<(), String> {
        let figures = [
            ("memory_usage_mb", self.memory_usage_mb),
            ("peak_memory_mb", self.peak_memory_mb),
            ("memory_percent", self.memory_percent),
        ];
        for (name, value) in figures {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("{} 非法: {}", name, value));
            }
        }
        Ok(())
    }

    /// 显示用严重程度（每次读取时重新计算，不落盘）
    pub fn severity(&self) -> Severity {
        Severity::classify(self.memory_percent)
    }
}

/// 根据内存百分比生成警告文本（严格大于 90 才告警）
pub fn warning_for(percent: f64) -> String {
    if percent > 90.0 {
        HIGH_MEMORY_WARNING.to_string()
    } else {
        String::new()
    }
}

/// 行级严重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    None,
    Medium,
    High,
}

impl Severity {
    pub fn classify(percent: f64) -> Self {
        if percent >= 90.0 {
            Self::High
        } else if percent >= 75.0 {
            Self::Medium
        } else {
            Self::None
        }
    }

    /// 表格行使用的 CSS class
    pub fn css_class(&self) -> &'static str {
        match self {
            Self::None => "",
            Self::Medium => "memory-medium",
            Self::High => "memory-high",
        }
    }
}
