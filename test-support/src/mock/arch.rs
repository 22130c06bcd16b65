//! 架构相关操作的 Mock 实现

use std::sync::atomic::{AtomicUsize, Ordering};

use sync::ArchOps;

/// Mock 架构操作
///
/// 宿主机线程没有“本地中断”，这里只记录关中断的嵌套深度，便于断言锁的配对使用。
pub struct MockArchOps {
    pub disable_depth: AtomicUsize,
}

impl MockArchOps {
    pub const fn new() -> Self {
        Self {
            disable_depth: AtomicUsize::new(0),
        }
    }
}

impl ArchOps for MockArchOps {
    unsafe fn read_and_disable_interrupts(&self) -> usize {
        self.disable_depth.fetch_add(1, Ordering::SeqCst);
        self.sstatus_sie()
    }

    unsafe fn restore_interrupts(&self, _flags: usize) {
        self.disable_depth.fetch_sub(1, Ordering::SeqCst);
    }

    fn sstatus_sie(&self) -> usize {
        0x2 // SIE bit
    }
}

/// 全局 Mock 实例
pub static MOCK_ARCH_OPS: MockArchOps = MockArchOps::new();
