//! 睡眠锁
//!
//! 与 [`SpinLock`](crate::SpinLock) 不同，睡眠锁不关闭中断，持有者可以在同步磁盘 I/O 期间被调度出去。
//! 等待者不会忙等，而是反复通过 [`SchedOps::yield_now`](crate::SchedOps::yield_now) 让出处理器。
//!
//! 数据封装直接复用 `lock_api::Mutex`，本模块只提供底层的 [`RawSleepLock`]。

use core::sync::atomic::{AtomicBool, Ordering};
use lock_api::{GuardSend, RawMutex};

use crate::sched_ops;

/// 睡眠锁的锁标志
pub struct RawSleepLock {
    locked: AtomicBool,
}

impl RawSleepLock {
    /// 创建一个未上锁的睡眠锁
    pub const fn new() -> Self {
        RawSleepLock {
            locked: AtomicBool::new(false),
        }
    }
}

impl Default for RawSleepLock {
    fn default() -> Self {
        Self::new()
    }
}

// SAFETY: 锁标志通过 Acquire/Release 的 CAS 保证同一时刻只有一个持有者
unsafe impl RawMutex for RawSleepLock {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: Self = RawSleepLock::new();

    // 持有者可能在 I/O 完成后由另一个内核线程继续执行
    type GuardMarker = GuardSend;

    fn lock(&self) {
        while !self.try_lock() {
            sched_ops().yield_now();
        }
    }

    fn try_lock(&self) -> bool {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    unsafe fn unlock(&self) {
        self.locked.store(false, Ordering::Release);
    }

    fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }
}

/// 长持有的睡眠锁
pub type SleepLock<T> = lock_api::Mutex<RawSleepLock, T>;

/// [`SleepLock`] 的 RAII 保护器
pub type SleepLockGuard<'a, T> = lock_api::MutexGuard<'a, RawSleepLock, T>;
