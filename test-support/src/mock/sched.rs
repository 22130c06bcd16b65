//! 调度相关操作的 Mock 实现

use std::sync::atomic::{AtomicUsize, Ordering};

/// Mock 调度器：用宿主机线程的 `yield_now` 代替进程睡眠
pub struct MockSchedOps {
    pub yields: AtomicUsize,
}

impl MockSchedOps {
    pub const fn new() -> Self {
        Self {
            yields: AtomicUsize::new(0),
        }
    }
}

impl sync::SchedOps for MockSchedOps {
    fn yield_now(&self) {
        self.yields.fetch_add(1, Ordering::Relaxed);
        std::thread::yield_now();
    }
}

/// 全局 Mock 实例
pub static MOCK_SCHED_OPS: MockSchedOps = MockSchedOps::new();
