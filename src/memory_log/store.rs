//! 内存日志存储
//!
//! 单个 JSON Lines 文件，只追加或整体清空：
//! - 每条记录一行，追加时持有排他文件锁，并发写入不会交错
//! - 读取时跳过空行和无法解析的行（可能是正在写入的半行）
//! - 清空与追加使用同一把锁

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use super::error::MemoryLogError;
use super::model::LogRecord;

/// 内存日志存储
#[derive(Debug, Clone)]
pub struct EventLogStore {
    path: PathBuf,
}

impl EventLogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// 追加一条记录
    pub fn append(&self, record: &LogRecord) -> Result<(), MemoryLogError> {
        let mut line = serde_json::to_vec(record)
            .map_err(|e| MemoryLogError::WriteFailed(format!("序列化记录失败: {}", e)))?;
        line.push(b'\n');

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| write_failed("创建日志目录失败", e))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| write_failed("打开日志文件失败", e))?;

        file.lock_exclusive()
            .map_err(|e| write_failed("获取日志文件锁失败", e))?;
        let result = file.write_all(&line).and_then(|_| file.flush());
        unlock(&file);
        result.map_err(|e| write_failed("写入日志文件失败", e))?;

        tracing::debug!(
            uri = %record.uri,
            memory_percent = record.memory_percent,
            path = %self.path.display(),
            "内存记录已追加"
        );
        Ok(())
    }

    /// 按写入顺序读取全部有效记录
    pub fn read_all(&self) -> Result<Vec<LogRecord>, MemoryLogError> {
        let Some(content) = self.read_raw()? else {
            return Ok(Vec::new());
        };

        let mut records = Vec::new();
        let mut skipped = 0usize;
        for (idx, line) in content.split(|b| *b == b'\n').enumerate() {
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            match parse_line(idx + 1, line) {
                Ok(record) => records.push(record),
                Err(e) => {
                    skipped += 1;
                    tracing::debug!("{}", e);
                }
            }
        }

        if skipped > 0 {
            tracing::warn!(
                skipped = skipped,
                path = %self.path.display(),
                "已跳过无法解析的内存日志行"
            );
        }

        Ok(records)
    }

    /// 读取文件原始字节，文件不存在时返回 None
    pub fn read_raw(&self) -> Result<Option<Vec<u8>>, MemoryLogError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(MemoryLogError::ReadFailed(e.to_string())),
        }
    }

    /// 清空日志，文件不存在时不做任何事
    pub fn clear(&self) -> Result<(), MemoryLogError> {
        let file = match OpenOptions::new().write(true).open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(write_failed("打开日志文件失败", e)),
        };

        file.lock_exclusive()
            .map_err(|e| write_failed("获取日志文件锁失败", e))?;
        let result = file.set_len(0).and_then(|_| file.sync_all());
        unlock(&file);
        result.map_err(|e| write_failed("清空日志文件失败", e))?;

        tracing::info!(path = %self.path.display(), "内存日志已清空");
        Ok(())
    }
}

fn parse_line(line_no: usize, line: &[u8]) -> Result<LogRecord, MemoryLogError> {
    let skipped = |reason: String| MemoryLogError::ParseSkipped {
        line: line_no,
        reason,
    };
    let record: LogRecord = serde_json::from_slice(line).map_err(|e| skipped(e.to_string()))?;
    record.validate().map_err(skipped)?;
    Ok(record)
}

fn write_failed(context: &str, e: std::io::Error) -> MemoryLogError {
    MemoryLogError::WriteFailed(format!("{}: {}", context, e))
}

fn unlock(file: &File) {
    if let Err(e) = FileExt::unlock(file) {
        tracing::warn!("释放日志文件锁失败: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_log::sampler::{RequestContext, capture};

    const MB: u64 = 1024 * 1024;

    fn record(uri: &str, peak_mb: u64) -> LogRecord {
        capture(&RequestContext {
            uri: Some(uri.to_string()),
            memory_limit: "256M".to_string(),
            usage_bytes: peak_mb * MB / 2,
            peak_bytes: peak_mb * MB,
            method: Some("GET".to_string()),
            active_plugins: vec!["akismet/akismet.php".to_string()],
            ..Default::default()
        })
    }

    fn temp_store() -> (tempfile::TempDir, EventLogStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = EventLogStore::new(dir.path().join("data").join("debug-memory.log"));
        (dir, store)
    }

    #[test]
    fn test_append_then_read_all_round_trip() {
        let (_dir, store) = temp_store();
        let written: Vec<LogRecord> = (0..5).map(|i| record(&format!("/p/{}", i), 100 + i)).collect();
        for r in &written {
            store.append(r).unwrap();
        }

        assert!(store.exists());
        assert_eq!(store.read_all().unwrap(), written);
    }

    #[test]
    fn test_lines_are_newline_terminated_and_slashes_unescaped() {
        let (_dir, store) = temp_store();
        store.append(&record("/wp-admin/admin.php?page=x", 10)).unwrap();

        let raw = String::from_utf8(store.read_raw().unwrap().unwrap()).unwrap();
        assert!(raw.ends_with('\n'));
        assert_eq!(raw.lines().count(), 1);
        assert!(raw.contains("/wp-admin/admin.php?page=x"));
        assert!(raw.contains("akismet/akismet.php"));
        assert!(!raw.contains("\\/"));
    }

    #[test]
    fn test_missing_file_reads_empty() {
        let (_dir, store) = temp_store();
        assert!(!store.exists());
        assert!(store.read_all().unwrap().is_empty());
        assert!(store.read_raw().unwrap().is_none());
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let (_dir, store) = temp_store();
        store.append(&record("/a", 10)).unwrap();
        {
            let mut file = OpenOptions::new().append(true).open(store.path()).unwrap();
            file.write_all(b"\n   \nnot json\n").unwrap();
            file.write_all(br#"{"timestamp":"t","memory_usage_mb":1,"peak_memory_mb":1,"memory_percent":-1}"#).unwrap();
            file.write_all(b"\n").unwrap();
        }
        store.append(&record("/b", 20)).unwrap();
        {
            let mut file = OpenOptions::new().append(true).open(store.path()).unwrap();
            file.write_all(br#"{"timestamp":"2026-10-18 12:00:00","uri":"/half"#).unwrap();
        }

        let records = store.read_all().unwrap();
        let uris: Vec<&str> = records.iter().map(|r| r.uri.as_str()).collect();
        assert_eq!(uris, vec!["/a", "/b"]);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let (_dir, store) = temp_store();
        store.clear().unwrap();
        assert!(store.read_all().unwrap().is_empty());

        store.append(&record("/a", 10)).unwrap();
        store.clear().unwrap();
        store.clear().unwrap();

        assert!(store.read_all().unwrap().is_empty());
        assert_eq!(store.read_raw().unwrap(), Some(Vec::new()));

        store.append(&record("/b", 10)).unwrap();
        assert_eq!(store.read_all().unwrap().len(), 1);
    }

    #[test]
    fn test_concurrent_appends_do_not_interleave() {
        let (_dir, store) = temp_store();
        let writers = 8;
        let per_writer = 50;

        let handles: Vec<_> = (0..writers)
            .map(|w| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for i in 0..per_writer {
                        let mut r = record(&format!("/writer/{}/{}", w, i), 64);
                        r.active_plugins = (0..20).map(|p| format!("plugin-{}/main.php", p)).collect();
                        store.append(&r).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let raw = String::from_utf8(store.read_raw().unwrap().unwrap()).unwrap();
        assert_eq!(raw.lines().count(), writers * per_writer);
        for line in raw.lines() {
            assert!(serde_json::from_str::<LogRecord>(line).is_ok(), "corrupt line: {}", line);
        }
        assert_eq!(store.read_all().unwrap().len(), writers * per_writer);
    }

    #[test]
    fn test_clear_and_append_are_mutually_exclusive() {
        let (_dir, store) = temp_store();
        let writers = 8;
        let per_writer = 200;

        let mut handles: Vec<_> = (0..writers)
            .map(|w| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for i in 0..per_writer {
                        let mut r = record(&format!("/writer/{}/{}", w, i), 64);
                        r.active_plugins = (0..30).map(|p| format!("plugin-{}/main.php", p)).collect();
                        store.append(&r).unwrap();
                    }
                })
            })
            .collect();
        let clearer = store.clone();
        handles.push(std::thread::spawn(move || {
            for _ in 0..200 {
                clearer.clear().unwrap();
            }
        }));
        for h in handles {
            h.join().unwrap();
        }

        let raw = store.read_raw().unwrap().unwrap_or_default();
        assert!(!raw.contains(&0u8), "truncation left NUL bytes");
        let text = String::from_utf8(raw).unwrap();
        assert!(text.is_empty() || text.ends_with('\n'));
        let lines = text.lines().count();
        for line in text.lines() {
            assert!(serde_json::from_str::<LogRecord>(line).is_ok(), "corrupt line: {}", line);
        }
        assert_eq!(store.read_all().unwrap().len(), lines);
        assert!(lines <= writers * per_writer);
    }

    #[test]
    fn test_append_to_unwritable_location_fails() {
        let (dir, _) = temp_store();
        // 把目录当作文件路径，打开必然失败
        let store = EventLogStore::new(dir.path());
        let err = store.append(&record("/a", 10)).unwrap_err();
        assert!(matches!(err, MemoryLogError::WriteFailed(_)));
    }
}
