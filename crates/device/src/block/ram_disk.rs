//! 内存模拟块设备

use super::BlockDriver;
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicUsize, Ordering};
use sync::SpinLock;

/// 内存模拟的块设备
///
/// 用于测试和开发，同时统计读写次数以便观察缓存命中情况
pub struct RamDisk {
    data: SpinLock<Vec<u8>>,
    block_size: usize,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl RamDisk {
    /// 创建指定大小的内存磁盘
    pub fn new(size: usize, block_size: usize) -> Arc<Self> {
        Self::from_bytes(vec![0u8; size], block_size)
    }

    /// 从字节数组创建
    pub fn from_bytes(data: Vec<u8>, block_size: usize) -> Arc<Self> {
        Arc::new(Self {
            data: SpinLock::new(data),
            block_size,
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        })
    }

    /// 获取原始数据（用于调试）
    pub fn raw_data(&self) -> Vec<u8> {
        self.data.lock().clone()
    }

    /// 成功完成的块读取次数
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    /// 成功完成的块写入次数
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }

    fn block_range(&self, block_id: usize, len: usize, total: usize) -> Option<core::ops::Range<usize>> {
        if len != self.block_size {
            return None;
        }
        let start = block_id.checked_mul(self.block_size)?;
        let end = start.checked_add(self.block_size)?;
        (end <= total).then_some(start..end)
    }
}

impl BlockDriver for RamDisk {
    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> bool {
        let data = self.data.lock();
        match self.block_range(block_id, buf.len(), data.len()) {
            Some(range) => {
                buf.copy_from_slice(&data[range]);
                self.reads.fetch_add(1, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) -> bool {
        let mut data = self.data.lock();
        let total = data.len();
        match self.block_range(block_id, buf.len(), total) {
            Some(range) => {
                data[range].copy_from_slice(buf);
                self.writes.fetch_add(1, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    fn block_size(&self) -> usize {
        self.block_size
    }

    fn total_blocks(&self) -> usize {
        self.data.lock().len() / self.block_size
    }
}
