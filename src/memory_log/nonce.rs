//! 一次性防伪 token
//!
//! 每个 token 绑定一个操作名，验证成功后立即作废

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use uuid::Uuid;

/// 清空日志操作名
pub const CLEAR_ACTION: &str = "debug_memory_clear";

#[derive(Debug, Clone)]
struct NonceEntry {
    action: String,
    issued_at: Instant,
}

/// 防伪 token 存储
pub struct NonceStore {
    /// token -> entry
    entries: RwLock<HashMap<String, NonceEntry>>,
    ttl: Duration,
}

impl NonceStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// 为指定操作签发 token
    pub fn issue(&self, action: &str) -> String {
        let token = Uuid::new_v4().to_string();
        self.entries.write().insert(
            token.clone(),
            NonceEntry {
                action: action.to_string(),
                issued_at: Instant::now(),
            },
        );
        token
    }

    /// 校验并消费 token
    ///
    /// token 不存在、已过期或操作不匹配时返回 false；
    /// 只要 token 存在就会被移除，不能重放
    pub fn consume(&self, action: &str, token: &str) -> bool {
        let Some(entry) = self.entries.write().remove(token) else {
            return false;
        };
        entry.action == action && entry.issued_at.elapsed() < self.ttl
    }

    /// 清理过期 token
    pub fn cleanup_expired(&self) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.issued_at.elapsed() < self.ttl);
        before - entries.len()
    }
}
