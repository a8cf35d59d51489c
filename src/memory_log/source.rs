//! 内存数据源
//!
//! 采样器本身不读取进程内存，由调用方注入 [`MemorySource`]

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use sysinfo::{Pid, ProcessesToUpdate, System};

/// 一次内存采样（字节）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemorySample {
    pub usage_bytes: u64,
    pub peak_bytes: u64,
}

/// 内存数据源
pub trait MemorySource: Send + Sync {
    fn sample(&self) -> MemorySample;
}

/// 当前进程常驻内存（RSS），峰值为进程启动以来观测到的最大值
pub struct ProcessMemorySource {
    system: Mutex<System>,
    pid: Option<Pid>,
    peak: AtomicU64,
}

impl ProcessMemorySource {
    pub fn new() -> Self {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                tracing::warn!("无法获取当前进程 PID，内存采样将返回 0: {}", e);
                None
            }
        };

        Self {
            system: Mutex::new(System::new()),
            pid,
            peak: AtomicU64::new(0),
        }
    }
}

impl Default for ProcessMemorySource {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySource for ProcessMemorySource {
    fn sample(&self) -> MemorySample {
        let Some(pid) = self.pid else {
            return MemorySample::default();
        };

        let usage_bytes = {
            let mut system = self.system.lock();
            system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
            system.process(pid).map(|p| p.memory()).unwrap_or(0)
        };

        let previous = self.peak.fetch_max(usage_bytes, Ordering::AcqRel);
        MemorySample {
            usage_bytes,
            peak_bytes: previous.max(usage_bytes),
        }
    }
}

/// 固定返回值的数据源（测试及无法采样的平台）
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedMemorySource(pub MemorySample);

impl MemorySource for FixedMemorySource {
    fn sample(&self) -> MemorySample {
        self.0
    }
}
