//! 内存映射错误类型

use vfs::{FileFault, FsError};

use crate::page_table::PagingError;

/// 内存映射错误
///
/// 分两类，用 [`MmError::is_fatal`] 区分：
///
/// - 可报告：参数错误、权限不符、没有空闲槽位或地址空间，返回给系统调用
/// - 不可恢复：没有覆盖缺页地址的区域、物理页耗尽、写回不完整、文件表失配、页表失配，
///   说明内核不变量已被破坏，由调用方决定停机或隔离进程
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MmError {
    /// 参数无效 (-EINVAL)
    InvalidArgument,
    /// 没有空闲的区域槽位或足够大的地址空间 (-ENOMEM)
    NoSpace,
    /// 文件层报告的错误
    Fs(FsError),
    /// 缺页地址不属于任何映射区域
    NoRegion {
        /// 缺页地址
        addr: usize,
    },
    /// 物理页分配失败
    OutOfFrames,
    /// 共享可写区域写回文件时写入不完整
    ShortWriteBack {
        /// 写回失败的虚拟地址
        addr: usize,
    },
    /// 文件句柄失配
    File(FileFault),
    /// 页表操作失败
    Paging(PagingError),
}

impl MmError {
    /// 是否为不可恢复错误
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            MmError::InvalidArgument | MmError::NoSpace | MmError::Fs(_)
        )
    }

    /// 转换为系统调用错误码（负数），不可恢复错误没有对应的错误码
    pub fn to_errno(&self) -> Option<isize> {
        match self {
            MmError::InvalidArgument => Some(-22),
            MmError::NoSpace => Some(-12),
            MmError::Fs(e) => Some(e.to_errno()),
            _ => None,
        }
    }
}

impl From<FsError> for MmError {
    fn from(e: FsError) -> Self {
        MmError::Fs(e)
    }
}

impl From<FileFault> for MmError {
    fn from(e: FileFault) -> Self {
        MmError::File(e)
    }
}

impl From<PagingError> for MmError {
    fn from(e: PagingError) -> Self {
        MmError::Paging(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_tiers() {
        assert!(!MmError::InvalidArgument.is_fatal());
        assert!(!MmError::Fs(FsError::PermissionDenied).is_fatal());
        assert!(MmError::NoRegion { addr: 0x1000 }.is_fatal());
        assert!(MmError::ShortWriteBack { addr: 0 }.is_fatal());
        assert_eq!(MmError::NoSpace.to_errno(), Some(-12));
        assert_eq!(MmError::OutOfFrames.to_errno(), None);
    }
}
