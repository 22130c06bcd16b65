//! 中断保护器
//!
//! 自旋锁持有期间必须关闭本地中断，否则同一 CPU 上的中断处理程序可能再次申请同一把锁而自死锁。
//! 关闭中断只阻止本地 CPU 上“任务 vs 中断”的并发，跨 CPU 的互斥仍由自旋锁本身保证。

use crate::arch_ops;

/// 基于 RAII 的中断保护器
///
/// 创建时禁用中断并保存之前的状态，销毁时恢复。
pub struct IntrGuard {
    flags: usize,
}

impl IntrGuard {
    /// 禁用本地中断并返回保护器
    pub fn new() -> Self {
        // SAFETY: 保存的 flags 只会在 Drop 中原样恢复
        let flags = unsafe { arch_ops().read_and_disable_interrupts() };
        IntrGuard { flags }
    }

    /// 进入临界区前中断是否处于启用状态
    pub fn was_enabled(&self) -> bool {
        self.flags & arch_ops().sstatus_sie() != 0
    }
}

impl Default for IntrGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for IntrGuard {
    fn drop(&mut self) {
        // SAFETY: flags 来自 new() 中的 read_and_disable_interrupts
        unsafe { arch_ops().restore_interrupts(self.flags) };
    }
}
