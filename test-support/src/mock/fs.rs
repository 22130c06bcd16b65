//! 文件系统相关的 Mock 实现
//!
//! 注意：这里不直接依赖 `vfs` crate（避免循环依赖）。
//! 测试 crate 用薄包装为这些类型实现 `vfs` 的 trait。

use std::sync::atomic::{AtomicUsize, Ordering};

/// Mock 的日志：只统计事务的开始与结束
pub struct MockLog {
    begins: AtomicUsize,
    ends: AtomicUsize,
    depth: AtomicUsize,
}

impl MockLog {
    pub const fn new() -> Self {
        Self {
            begins: AtomicUsize::new(0),
            ends: AtomicUsize::new(0),
            depth: AtomicUsize::new(0),
        }
    }

    pub fn begin_op(&self) {
        self.begins.fetch_add(1, Ordering::SeqCst);
        self.depth.fetch_add(1, Ordering::SeqCst);
    }

    pub fn end_op(&self) {
        let prev = self.depth.fetch_sub(1, Ordering::SeqCst);
        assert!(prev > 0, "end_op without begin_op");
        self.ends.fetch_add(1, Ordering::SeqCst);
    }

    /// 是否有事务正在进行（任意线程）
    pub fn in_transaction(&self) -> bool {
        self.depth.load(Ordering::SeqCst) > 0
    }

    pub fn begins(&self) -> usize {
        self.begins.load(Ordering::SeqCst)
    }

    pub fn ends(&self) -> usize {
        self.ends.load(Ordering::SeqCst)
    }
}

/// 全局 Mock 实例
pub static MOCK_LOG: MockLog = MockLog::new();

/// 内存中的文件内容
///
/// `capacity` 限制文件能增长到的大小，超出部分的写入被截断，用来模拟磁盘写满。
#[derive(Debug, Default)]
pub struct MemFile {
    pub data: Vec<u8>,
    pub capacity: Option<usize>,
    /// 每次写入的 (offset, 请求长度)
    pub writes: Vec<(usize, usize)>,
    /// 每次写入时是否处于事务中
    pub writes_in_tx: Vec<bool>,
}

impl MemFile {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            ..Self::default()
        }
    }

    pub fn with_capacity_limit(data: Vec<u8>, capacity: usize) -> Self {
        Self {
            data,
            capacity: Some(capacity),
            ..Self::default()
        }
    }

    pub fn read_at(&self, off: usize, buf: &mut [u8]) -> usize {
        if off >= self.data.len() {
            return 0;
        }
        let n = buf.len().min(self.data.len() - off);
        buf[..n].copy_from_slice(&self.data[off..off + n]);
        n
    }

    pub fn write_at(&mut self, off: usize, buf: &[u8]) -> usize {
        self.writes.push((off, buf.len()));
        self.writes_in_tx.push(MOCK_LOG.in_transaction());
        let end = match self.capacity {
            Some(cap) => (off + buf.len()).min(cap),
            None => off + buf.len(),
        };
        if end <= off {
            return 0;
        }
        if self.data.len() < end {
            self.data.resize(end, 0);
        }
        let n = end - off;
        self.data[off..end].copy_from_slice(&buf[..n]);
        n
    }
}
