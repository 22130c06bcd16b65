//! VFS 运行时操作 trait 定义和注册
//!
//! 日志事务由外部的文件系统提供，此模块只定义 VFS 需要的接口，
//! 由内核在启动时注册。

use core::sync::atomic::{AtomicUsize, Ordering};

use crate::config::MAXOPBLOCKS;

/// VFS 运行时操作
pub trait VfsOps: Send + Sync {
    /// 开始一个文件系统事务（可能睡眠等待日志空间）
    fn begin_op(&self);

    /// 结束当前事务
    fn end_op(&self);

    /// 文件系统块大小
    fn block_size(&self) -> usize;

    /// 单个事务最多写入的块数
    fn max_op_blocks(&self) -> usize {
        MAXOPBLOCKS
    }
}

static VFS_OPS_DATA: AtomicUsize = AtomicUsize::new(0);
static VFS_OPS_VTABLE: AtomicUsize = AtomicUsize::new(0);

/// 注册 VFS 操作实现
///
/// # Safety
/// 必须在单线程环境下调用，且只能调用一次
pub unsafe fn register_vfs_ops(ops: &'static dyn VfsOps) {
    let ptr = ops as *const dyn VfsOps;
    // SAFETY: 将 fat pointer 拆分为 data 和 vtable 两部分存储
    let (data, vtable) =
        unsafe { core::mem::transmute::<*const dyn VfsOps, (usize, usize)>(ptr) };
    VFS_OPS_DATA.store(data, Ordering::Release);
    VFS_OPS_VTABLE.store(vtable, Ordering::Release);
}

/// 获取已注册的 VFS 操作实现
///
/// # Panics
/// 如果尚未调用 [`register_vfs_ops`] 注册实现，则 panic
#[inline]
pub fn vfs_ops() -> &'static dyn VfsOps {
    let data = VFS_OPS_DATA.load(Ordering::Acquire);
    let vtable = VFS_OPS_VTABLE.load(Ordering::Acquire);
    if data == 0 {
        panic!("vfs: VfsOps not registered");
    }
    // SAFETY: 重组 fat pointer
    unsafe { &*core::mem::transmute::<(usize, usize), *const dyn VfsOps>((data, vtable)) }
}

/// 文件系统事务
///
/// 创建时 `begin_op`，离开作用域时 `end_op`。
pub struct Transaction {
    _private: (),
}

impl Transaction {
    /// 开始一个事务
    #[inline]
    pub fn begin() -> Self {
        vfs_ops().begin_op();
        Self { _private: () }
    }
}

impl Drop for Transaction {
    #[inline]
    fn drop(&mut self) {
        vfs_ops().end_op();
    }
}

/// 一次事务内最多写入 inode 的字节数
///
/// 扣除 inode 块、间接块和两块非对齐余量，每个数据块还可能连带一个位图块，所以再除以二。
pub fn max_write_chunk() -> usize {
    let ops = vfs_ops();
    let blocks = (ops.max_op_blocks().saturating_sub(1 + 1 + 2) / 2).max(1);
    blocks * ops.block_size()
}
