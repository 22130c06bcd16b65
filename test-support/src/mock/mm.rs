//! 内存管理相关的 Mock 实现
//!
//! 注意：这里不直接依赖 `mm` crate（避免循环依赖）。

use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::collections::HashSet;
use std::sync::Mutex;

/// Mock 的页大小
pub const MOCK_PAGE_SIZE: usize = 4096;

/// Mock 的物理页帧分配器
///
/// 用宿主机堆上按页对齐的内存充当物理页，页帧号就是地址右移 12 位（恒等映射）。
pub struct MockFrames {
    live: Mutex<HashSet<usize>>,
    limit: Option<usize>,
}

impl MockFrames {
    pub fn new() -> Self {
        Self {
            live: Mutex::new(HashSet::new()),
            limit: None,
        }
    }

    /// 最多同时分配 `limit` 个页
    pub fn with_limit(limit: usize) -> Self {
        Self {
            live: Mutex::new(HashSet::new()),
            limit: Some(limit),
        }
    }

    fn layout() -> Layout {
        Layout::from_size_align(MOCK_PAGE_SIZE, MOCK_PAGE_SIZE).unwrap()
    }

    pub fn alloc(&self) -> Option<usize> {
        let mut live = self.live.lock().unwrap();
        if self.limit.is_some_and(|limit| live.len() >= limit) {
            return None;
        }
        // Safety: layout 大小非零
        let ptr = unsafe { alloc_zeroed(Self::layout()) };
        if ptr.is_null() {
            return None;
        }
        let ppn = ptr as usize / MOCK_PAGE_SIZE;
        live.insert(ppn);
        Some(ppn)
    }

    pub fn dealloc(&self, ppn: usize) {
        let removed = self.live.lock().unwrap().remove(&ppn);
        assert!(removed, "double free of frame {:#x}", ppn);
        // Safety: ppn 来自 alloc，且只释放一次
        unsafe { dealloc((ppn * MOCK_PAGE_SIZE) as *mut u8, Self::layout()) };
    }

    pub fn vaddr(&self, ppn: usize) -> usize {
        ppn * MOCK_PAGE_SIZE
    }

    /// 尚未释放的页数
    pub fn live(&self) -> usize {
        self.live.lock().unwrap().len()
    }

    /// 读取一个已分配页的内容
    pub fn page(&self, ppn: usize) -> &[u8] {
        assert!(self.live.lock().unwrap().contains(&ppn));
        // Safety: 页仍然有效，生命周期受 &self 约束
        unsafe { std::slice::from_raw_parts((ppn * MOCK_PAGE_SIZE) as *const u8, MOCK_PAGE_SIZE) }
    }
}

impl Default for MockFrames {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MockFrames {
    fn drop(&mut self) {
        let live = self.live.get_mut().unwrap();
        for &ppn in live.iter() {
            // Safety: 剩余的页都来自 alloc
            unsafe { dealloc((ppn * MOCK_PAGE_SIZE) as *mut u8, Self::layout()) };
        }
        live.clear();
    }
}
