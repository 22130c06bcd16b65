//! 打开的文件
//!
//! [`File`] 是对管道端点、字符设备或 inode 的访问能力，由 [`FileKind`] 区分。
//! 读写按种类分发：
//!
//! - 管道：直接交给 [`Pipe`]
//! - 设备：按主设备号查 [`DEVSW`](crate::DEVSW)
//! - inode：在 inode 睡眠锁内从当前偏移量读写，并按实际传输的字节数推进偏移量
//!
//! inode 写入被切成不超过 [`max_write_chunk()`] 的片段，每段在自己的 [`Transaction`] 内完成，
//! 保证单次写入不会超出日志的事务容量。

use alloc::sync::Arc;
use core::sync::atomic::{AtomicUsize, Ordering};
use uapi::fs::Stat;

use crate::devsw::{dev_read, dev_write};
use crate::{FsError, InodeRef, Pipe, Transaction, max_write_chunk};

bitflags::bitflags! {
    /// 文件的访问方向
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OpenMode: u8 {
        /// 可读
        const READ = 1 << 0;
        /// 可写
        const WRITE = 1 << 1;
    }
}

/// 文件背后的对象
pub enum FileKind {
    /// 管道端点
    Pipe(Arc<dyn Pipe>),
    /// 字符设备，读写交给设备表，元数据来自设备 inode
    Device {
        /// 主设备号
        major: usize,
        /// 设备文件的 inode
        inode: InodeRef,
    },
    /// 普通 inode
    Inode(InodeRef),
}

/// 打开的文件
pub struct File {
    kind: FileKind,
    mode: OpenMode,
    /// 只对 inode 有意义，只在持有 inode 锁时修改
    off: AtomicUsize,
}

impl File {
    /// 创建管道端点
    pub fn pipe(pipe: Arc<dyn Pipe>, mode: OpenMode) -> Self {
        Self::new(FileKind::Pipe(pipe), mode)
    }

    /// 创建字符设备文件
    pub fn device(major: usize, inode: InodeRef, mode: OpenMode) -> Self {
        Self::new(FileKind::Device { major, inode }, mode)
    }

    /// 创建 inode 文件，偏移量从 0 开始
    pub fn inode(inode: InodeRef, mode: OpenMode) -> Self {
        Self::new(FileKind::Inode(inode), mode)
    }

    fn new(kind: FileKind, mode: OpenMode) -> Self {
        Self {
            kind,
            mode,
            off: AtomicUsize::new(0),
        }
    }

    /// 文件种类
    pub fn kind(&self) -> &FileKind {
        &self.kind
    }

    /// 检查文件是否可读
    pub fn readable(&self) -> bool {
        self.mode.contains(OpenMode::READ)
    }

    /// 检查文件是否可写
    pub fn writable(&self) -> bool {
        self.mode.contains(OpenMode::WRITE)
    }

    /// 当前偏移量
    pub fn offset(&self) -> usize {
        self.off.load(Ordering::Acquire)
    }

    /// 背后的 inode，管道没有 inode
    pub fn inode_ref(&self) -> Option<&InodeRef> {
        match &self.kind {
            FileKind::Inode(ip) | FileKind::Device { inode: ip, .. } => Some(ip),
            FileKind::Pipe(_) => None,
        }
    }

    /// 从文件读取数据
    pub fn read(&self, buf: &mut [u8]) -> Result<usize, FsError> {
        if !self.readable() {
            return Err(FsError::BadFileDescriptor);
        }
        match &self.kind {
            FileKind::Pipe(pipe) => pipe.read(buf),
            FileKind::Device { major, .. } => dev_read(*major, buf),
            FileKind::Inode(ip) => {
                let mut inode = ip.lock();
                let off = self.off.load(Ordering::Acquire);
                let n = inode.read_at(off, buf)?;
                self.off.store(off + n, Ordering::Release);
                Ok(n)
            }
        }
    }

    /// 向文件写入数据
    ///
    /// inode 写入如果某一段写得比请求的少，立即停止并返回 [`FsError::IoError`]；
    /// 之前已提交的段不会回滚，偏移量也只推进实际写入的字节数。
    pub fn write(&self, buf: &[u8]) -> Result<usize, FsError> {
        if !self.writable() {
            return Err(FsError::BadFileDescriptor);
        }
        match &self.kind {
            FileKind::Pipe(pipe) => pipe.write(buf),
            FileKind::Device { major, .. } => dev_write(*major, buf),
            FileKind::Inode(ip) => self.write_inode(ip, buf),
        }
    }

    fn write_inode(&self, ip: &InodeRef, buf: &[u8]) -> Result<usize, FsError> {
        let max = max_write_chunk();
        let mut done = 0;
        while done < buf.len() {
            let len = (buf.len() - done).min(max);
            let written = {
                let _tx = Transaction::begin();
                let mut inode = ip.lock();
                let off = self.off.load(Ordering::Acquire);
                let written = inode.write_at(off, &buf[done..done + len])?;
                self.off.store(off + written, Ordering::Release);
                written
            };
            if written != len {
                log::warn!(
                    "vfs: short inode write, {} of {} bytes at chunk {}",
                    written,
                    len,
                    done
                );
                return Err(FsError::IoError);
            }
            done += written;
        }
        Ok(done)
    }

    /// 获取元数据，管道没有元数据
    pub fn stat(&self) -> Result<Stat, FsError> {
        match self.inode_ref() {
            Some(ip) => Ok(ip.lock().stat()),
            None => Err(FsError::NotSupported),
        }
    }
}

/// 引用计数归零后释放文件背后的资源
///
/// 调用时不能持有文件表的锁：释放 inode 要开事务，事务可能睡眠。
pub(crate) fn teardown(file: Arc<File>) {
    if let FileKind::Pipe(pipe) = &file.kind {
        pipe.close(file.writable());
        return;
    }
    let _tx = Transaction::begin();
    drop(file);
}
