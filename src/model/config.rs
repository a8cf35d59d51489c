use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 内存采样范围
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum CaptureScope {
    /// 仅在请求携带有效 Admin Key 时采样
    AdminOnly,
    /// 对所有请求采样
    AllRequests,
}

impl Default for CaptureScope {
    fn default() -> Self {
        Self::AdminOnly
    }
}

/// debug-memory 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Admin API 密钥（必填，未配置时拒绝启动）
    #[serde(default)]
    pub admin_api_key: Option<String>,

    /// 通过 Admin Key 认证的请求在日志中记录的用户名
    #[serde(default = "default_admin_user")]
    pub admin_user: String,

    /// 内存日志文件路径（JSON Lines）
    #[serde(default = "default_log_path")]
    pub log_path: PathBuf,

    /// 内存上限（如 "256M"、"1G"，"-1" 表示不限制）
    #[serde(default = "default_memory_limit")]
    pub memory_limit: String,

    /// 采样范围（"admin-only" 或 "all-requests"）
    #[serde(default)]
    pub capture_scope: CaptureScope,

    /// 当前启用的插件列表，按顺序写入每条记录
    #[serde(default)]
    pub active_plugins: Vec<String>,

    /// 清空操作防伪 token 有效期（秒）
    #[serde(default = "default_nonce_ttl_secs")]
    pub nonce_ttl_secs: u64,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_admin_user() -> String {
    "admin".to_string()
}

fn default_log_path() -> PathBuf {
    PathBuf::from("data").join("debug-memory.log")
}

fn default_memory_limit() -> String {
    "256M".to_string()
}

fn default_nonce_ttl_secs() -> u64 {
    60 * 60
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            admin_api_key: None,
            admin_user: default_admin_user(),
            log_path: default_log_path(),
            memory_limit: default_memory_limit(),
            capture_scope: CaptureScope::default(),
            active_plugins: Vec::new(),
            nonce_ttl_secs: default_nonce_ttl_secs(),
        }
    }
}

impl Config {
    /// 获取默认配置文件路径
    pub fn default_config_path() -> &'static str {
        "config.json"
    }

    /// 从文件加载配置，文件不存在时返回默认配置
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("解析配置文件失败: {}", path.display()))?;
        Ok(config)
    }
}
