//! 块缓冲区缓存
//!
//! 缓冲区缓存保存磁盘块在内存中的副本，按 (设备号, 块号) 索引，同时是多个进程访问同一磁盘块的同步点。
//!
//! - [`BufCache::read`]（`bread`）：返回独占持有、内容有效的缓冲区 [`BufGuard`]
//! - [`BufGuard::write`]（`bwrite`）：把修改后的内容写回磁盘
//! - 丢弃 [`BufGuard`]（`brelse`）：释放缓冲区，之后不得再使用
//! - [`BufGuard::pin`] / 丢弃 [`BufPin`]（`bpin` / `bunpin`）：跨多次持有保活
//!
//! 同一时刻只有一个持有者能访问某个缓冲区，不要长时间占用。
//!
//! 缓存被切分为多个分片，每个分片有自己的自旋锁，互不相关的块可以并发查找，
//! 回收策略与加锁顺序见 [`cache`] 模块文档。

#![no_std]

extern crate alloc;

mod buf;
pub mod cache;
pub mod config;
mod error;
mod shard;

pub use buf::{BufGuard, BufPin};
pub use cache::{BufCache, BufState};
pub use config::{BSIZE, BioConfig, NBUCKET, NBUF};
pub use error::BioError;
pub use shard::BlockKey;

use alloc::boxed::Box;
use once_cell::race::OnceBox;

static BCACHE: OnceBox<BufCache> = OnceBox::new();

/// 用 [`device::BLK_DRIVERS`] 中已注册的驱动初始化全局缓存，只能成功一次
pub fn binit(config: BioConfig) -> Result<&'static BufCache, BioError> {
    let disks = device::BLK_DRIVERS.lock().clone();
    let cache = BufCache::new(config, disks)?;
    BCACHE
        .set(Box::new(cache))
        .map_err(|_| BioError::BadConfig("buffer cache already initialised"))?;
    bcache()
}

/// 全局缓存
pub fn bcache() -> Result<&'static BufCache, BioError> {
    BCACHE.get().ok_or(BioError::Uninitialized)
}

/// 读取全局缓存中的块
pub fn bread(dev: usize, blockno: usize) -> Result<BufGuard<'static>, BioError> {
    bcache()?.read(dev, blockno)
}
