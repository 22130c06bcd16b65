//! 同步原语
//!
//! 向缓冲区缓存、文件表和 mmap 管理器提供两类锁：
//!
//! - [`SpinLock`]：短临界区互斥锁（分片成员链表、引用计数），持有期间关闭本地中断，
//!   绝不能跨越阻塞 I/O 持有。
//! - [`SleepLock`]：长持有的睡眠锁（缓冲区数据、inode），持有者可以在同步 I/O 中让出 CPU，
//!   等待者通过 [`SchedOps::yield_now`] 让出处理器而不是忙等。
//!
//! # 架构依赖
//!
//! 此 crate 通过 [`ArchOps`] 和 [`SchedOps`] trait 抽象架构与调度相关操作。
//! 使用前必须调用 [`register_arch_ops`] 和 [`register_sched_ops`] 注册实现。

#![no_std]

#[cfg(test)]
extern crate std;

mod intr_guard;
mod raw_spin_lock;
mod sleep_lock;
mod spin_lock;

pub use intr_guard::*;
pub use raw_spin_lock::*;
pub use sleep_lock::*;
pub use spin_lock::*;

use core::sync::atomic::{AtomicUsize, Ordering};

/// 架构相关操作的 trait
///
/// 由内核实现并注册，提供中断控制
pub trait ArchOps: Send + Sync {
    /// 读取并禁用中断，返回之前的状态
    ///
    /// # Safety
    /// 调用者必须确保在适当的上下文中调用
    unsafe fn read_and_disable_interrupts(&self) -> usize;

    /// 恢复中断状态
    ///
    /// # Safety
    /// flags 必须是之前 read_and_disable_interrupts 返回的值
    unsafe fn restore_interrupts(&self, flags: usize);

    /// 获取 SSTATUS_SIE 常量（中断使能位）
    fn sstatus_sie(&self) -> usize;
}

/// 调度相关操作的 trait
///
/// 睡眠锁的等待者通过它把处理器让给其它线程。
pub trait SchedOps: Send + Sync {
    /// 让出当前处理器，稍后被重新调度
    fn yield_now(&self);
}

/// 以 (data, vtable) 两个原子字存储一个 `&'static dyn Trait`
macro_rules! ops_slot {
    ($data:ident, $vtable:ident, $register:ident, $get:ident, $tr:ident, $name:literal) => {
        static $data: AtomicUsize = AtomicUsize::new(0);
        static $vtable: AtomicUsize = AtomicUsize::new(0);

        #[doc = concat!("注册 [`", stringify!($tr), "`] 实现")]
        ///
        /// # Safety
        /// 必须在单线程环境下调用，且只能调用一次
        pub unsafe fn $register(ops: &'static dyn $tr) {
            let ptr = ops as *const dyn $tr;
            // SAFETY: fat pointer 的布局是 (data, vtable)
            let (data, vtable) = unsafe { core::mem::transmute::<*const dyn $tr, (usize, usize)>(ptr) };
            $vtable.store(vtable, Ordering::Release);
            $data.store(data, Ordering::Release);
        }

        #[inline]
        pub(crate) fn $get() -> &'static dyn $tr {
            let data = $data.load(Ordering::Acquire);
            let vtable = $vtable.load(Ordering::Acquire);
            if data == 0 {
                panic!(concat!("sync: ", $name, " not registered, call ", stringify!($register), " first"));
            }
            // SAFETY: data 和 vtable 是通过注册函数设置的有效指针
            unsafe { &*core::mem::transmute::<(usize, usize), *const dyn $tr>((data, vtable)) }
        }
    };
}

ops_slot!(ARCH_OPS_DATA, ARCH_OPS_VTABLE, register_arch_ops, arch_ops, ArchOps, "ArchOps");
ops_slot!(SCHED_OPS_DATA, SCHED_OPS_VTABLE, register_sched_ops, sched_ops, SchedOps, "SchedOps");
