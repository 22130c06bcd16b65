//! 物理页帧分配接口

use crate::address::Ppn;
use crate::config::PAGE_SIZE;

/// 物理页帧分配器
pub trait FrameAllocator: Send + Sync {
    /// 分配一页，内容未定义
    fn alloc_frame(&self) -> Option<Ppn>;

    /// 释放一页
    fn dealloc_frame(&self, ppn: Ppn);

    /// 内核访问该页使用的虚拟地址
    fn frame_vaddr(&self, ppn: Ppn) -> usize;
}

/// 以字节切片访问一个物理页
///
/// # Safety
/// `ppn` 必须由 `frames` 分配且在 `'a` 内不被释放，期间不能存在该页的其它引用
pub(crate) unsafe fn frame_bytes_mut<'a>(frames: &dyn FrameAllocator, ppn: Ppn) -> &'a mut [u8] {
    let vaddr = frames.frame_vaddr(ppn);
    // SAFETY: 由调用者保证页有效且没有别名
    unsafe { core::slice::from_raw_parts_mut(vaddr as *mut u8, PAGE_SIZE) }
}

/// 只读访问一个物理页
///
/// # Safety
/// `ppn` 必须由 `frames` 分配且在 `'a` 内不被释放，期间不能存在该页的可变引用
pub(crate) unsafe fn frame_bytes<'a>(frames: &dyn FrameAllocator, ppn: Ppn) -> &'a [u8] {
    let vaddr = frames.frame_vaddr(ppn);
    // SAFETY: 由调用者保证页有效
    unsafe { core::slice::from_raw_parts(vaddr as *const u8, PAGE_SIZE) }
}
