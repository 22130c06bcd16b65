//! 字符设备分发表
//!
//! 按主设备号索引的读写函数表。处理函数在表锁之外调用，
//! 因为它们可能睡眠（例如控制台读等待输入）。

use lazy_static::lazy_static;
use sync::SpinLock;

use crate::FsError;
use crate::config::NDEV;

/// 设备读函数
pub type DevReadFn = fn(&mut [u8]) -> Result<usize, FsError>;
/// 设备写函数
pub type DevWriteFn = fn(&[u8]) -> Result<usize, FsError>;

/// 一个主设备号的处理函数
#[derive(Clone, Copy, Default)]
pub struct DevSw {
    /// 读处理函数
    pub read: Option<DevReadFn>,
    /// 写处理函数
    pub write: Option<DevWriteFn>,
}

impl DevSw {
    const EMPTY: DevSw = DevSw {
        read: None,
        write: None,
    };
}

lazy_static! {
    /// 全局设备表
    pub static ref DEVSW: SpinLock<[DevSw; NDEV]> = SpinLock::new([DevSw::EMPTY; NDEV]);
}

/// 为 `major` 注册处理函数，覆盖旧的注册
pub fn register_devsw(major: usize, sw: DevSw) -> Result<(), FsError> {
    let mut table = DEVSW.lock();
    let slot = table.get_mut(major).ok_or(FsError::NoDevice)?;
    *slot = sw;
    log::debug!("devsw: registered major {}", major);
    Ok(())
}

/// 移除 `major` 的处理函数，返回旧的注册
pub fn unregister_devsw(major: usize) -> Option<DevSw> {
    let mut table = DEVSW.lock();
    table
        .get_mut(major)
        .map(|slot| core::mem::replace(slot, DevSw::EMPTY))
}

pub(crate) fn dev_read(major: usize, buf: &mut [u8]) -> Result<usize, FsError> {
    let read = DEVSW
        .lock()
        .get(major)
        .and_then(|sw| sw.read)
        .ok_or(FsError::NoDevice)?;
    read(buf)
}

pub(crate) fn dev_write(major: usize, buf: &[u8]) -> Result<usize, FsError> {
    let write = DEVSW
        .lock()
        .get(major)
        .and_then(|sw| sw.write)
        .ok_or(FsError::NoDevice)?;
    write(buf)
}
