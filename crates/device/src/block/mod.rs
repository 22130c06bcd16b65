//! 块设备模块

mod ram_disk;

use alloc::{sync::Arc, vec::Vec};
use lazy_static::lazy_static;
use sync::SpinLock;

pub use ram_disk::RamDisk;

lazy_static! {
    /// 全局块设备驱动列表，下标即缓冲区缓存使用的设备号
    pub static ref BLK_DRIVERS: SpinLock<Vec<Arc<dyn BlockDriver>>> = SpinLock::new(Vec::new());
}

/// 注册块设备驱动，返回分配给它的设备号
pub fn register_block_driver(driver: Arc<dyn BlockDriver>) -> usize {
    let mut drivers = BLK_DRIVERS.lock();
    drivers.push(driver);
    let dev = drivers.len() - 1;
    log::info!("device: block driver registered as dev {}", dev);
    dev
}

/// 块设备驱动程序接口
///
/// 读写都是同步的：返回时数据已经到达缓冲区或设备。
pub trait BlockDriver: Send + Sync {
    /// 读取一个块到 `buf`，`buf` 长度必须等于块大小
    ///
    /// 成功返回 true
    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> bool;

    /// 把 `buf` 写入一个块，`buf` 长度必须等于块大小
    ///
    /// 成功返回 true
    fn write_block(&self, block_id: usize, buf: &[u8]) -> bool;

    /// 块大小（字节）
    fn block_size(&self) -> usize;

    /// 总块数
    fn total_blocks(&self) -> usize;
}
