//! 页表接口
//!
//! 页表由具体架构实现，映射管理只依赖 [`PageTable`] trait。

use bitflags::bitflags;

use crate::address::{Ppn, Vpn};

bitflags! {
    /// 页表项标志（RISC-V Sv39 布局）
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PteFlags: u8 {
        /// 有效
        const V = 1 << 0;
        /// 可读
        const R = 1 << 1;
        /// 可写
        const W = 1 << 2;
        /// 可执行
        const X = 1 << 3;
        /// 用户态可访问
        const U = 1 << 4;
    }
}

/// 分页操作中可能发生的错误
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagingError {
    /// 虚拟地址未被映射
    NotMapped,
    /// 虚拟地址已被映射
    AlreadyMapped,
    /// 提供了无效的地址
    InvalidAddress,
    /// 分配中间级页表失败
    FrameAllocFailed,
}

/// 分页操作的结果类型
pub type PagingResult<T> = Result<T, PagingError>;

/// 进程页表
pub trait PageTable {
    /// 映射虚拟页到物理页
    fn map(&mut self, vpn: Vpn, ppn: Ppn, flags: PteFlags) -> PagingResult<()>;

    /// 查找有效的映射
    fn translate(&self, vpn: Vpn) -> Option<(Ppn, PteFlags)>;

    /// 清除映射，返回原来映射的物理页；没有有效映射时返回 `None`
    fn unmap(&mut self, vpn: Vpn) -> Option<Ppn>;
}
