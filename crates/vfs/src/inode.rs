//! Inode 接口
//!
//! inode 由外部文件系统实现，VFS 只通过显式 offset 的随机访问使用它。
//! 所有访问都在 inode 的睡眠锁内进行（相当于 ilock / iunlock）。

use alloc::sync::Arc;
use sync::SleepLock;
use uapi::fs::Stat;

use crate::FsError;

/// 文件系统 inode
pub trait Inode: Send + Sync {
    /// 从 `off` 开始读取，返回实际读取的字节数，到达文件末尾时可能少于 `buf.len()`
    fn read_at(&mut self, off: usize, buf: &mut [u8]) -> Result<usize, FsError>;

    /// 从 `off` 开始写入，返回实际写入的字节数
    fn write_at(&mut self, off: usize, buf: &[u8]) -> Result<usize, FsError>;

    /// 获取元数据
    fn stat(&self) -> Stat;

    /// 文件大小（字节）
    fn size(&self) -> usize;
}

/// 共享的 inode 引用
///
/// 最后一个引用被丢弃即释放 inode（iput），这一步必须发生在事务内。
pub type InodeRef = Arc<SleepLock<dyn Inode>>;
