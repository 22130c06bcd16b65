//! VFS 错误类型
//!
//! 两类错误：
//!
//! - [`FsError`]：可以报告给调用者的失败，可通过 [`FsError::to_errno()`] 转换为系统调用错误码
//! - [`FileFault`]：文件表被误用，属于不可恢复的内核不变量破坏

/// VFS 错误类型
///
/// 各错误码对应标准 POSIX errno 值。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    // 文件描述符相关
    /// 无效的文件描述符，或以不允许的方向访问文件 (-EBADF)
    BadFileDescriptor,
    /// 打开的文件过多 (-ENFILE)
    TooManyOpenFiles,

    // 权限相关
    /// 文件的打开方式不允许请求的访问 (-EACCES)
    PermissionDenied,

    // 参数相关
    /// 无效参数 (-EINVAL)
    InvalidArgument,

    // 文件系统相关
    /// 设备空间不足 (-ENOSPC)
    NoSpace,
    /// I/O 错误，包括只写入了一部分的写操作 (-EIO)
    IoError,
    /// 主设备号越界或没有注册对应的处理函数 (-ENODEV)
    NoDevice,

    // 管道相关
    /// 管道破裂 (-EPIPE)
    BrokenPipe,
    /// 非阻塞操作将阻塞 (-EAGAIN)
    WouldBlock,

    // 其他
    /// 操作不支持 (-ENOTSUP)
    NotSupported,
}

impl FsError {
    /// 转换为系统调用错误码（负数）
    pub fn to_errno(&self) -> isize {
        match self {
            FsError::IoError => -5,
            FsError::BadFileDescriptor => -9,
            FsError::WouldBlock => -11,
            FsError::PermissionDenied => -13,
            FsError::NoDevice => -19,
            FsError::InvalidArgument => -22,
            FsError::TooManyOpenFiles => -23,
            FsError::NoSpace => -28,
            FsError::BrokenPipe => -32,
            FsError::NotSupported => -95,
        }
    }
}

/// 文件表误用
///
/// 出现这些错误说明引用计数或句柄已经失配，文件表内部状态不可再信任。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFault {
    /// 句柄指向的槽位已经被释放并重新分配
    StaleHandle {
        /// 槽位下标
        idx: usize,
    },
    /// 对引用计数为零的槽位执行 dup 或 close
    RefUnderflow {
        /// 槽位下标
        idx: usize,
    },
}
