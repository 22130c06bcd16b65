//! 管道端点接口

use crate::FsError;

/// 管道，读端和写端共享同一个对象
pub trait Pipe: Send + Sync {
    /// 读取数据，管道为空时可能睡眠
    fn read(&self, buf: &mut [u8]) -> Result<usize, FsError>;

    /// 写入数据
    fn write(&self, buf: &[u8]) -> Result<usize, FsError>;

    /// 关闭一个端点，`writable` 指明关闭的是写端还是读端
    fn close(&self, writable: bool);
}
