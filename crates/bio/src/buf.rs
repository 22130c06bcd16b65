//! 缓冲区句柄
//!
//! - [`BufGuard`]：独占持有缓冲区数据（睡眠锁）并占用一个引用，Drop 即 `brelse`。
//! - [`BufPin`]：只占用一个引用、不持有数据锁，阻止缓冲区在多次持有/释放之间被回收，Drop 即 `bunpin`。

use alloc::boxed::Box;
use core::mem::ManuallyDrop;
use core::ops::{Deref, DerefMut};

use sync::SleepLockGuard;

use crate::shard::BlockKey;
use crate::{BioError, BufCache};

/// 独占持有的缓冲区
pub struct BufGuard<'a> {
    cache: &'a BufCache,
    idx: usize,
    key: BlockKey,
    data: ManuallyDrop<SleepLockGuard<'a, Box<[u8]>>>,
}

impl<'a> BufGuard<'a> {
    pub(crate) fn new(
        cache: &'a BufCache,
        idx: usize,
        key: BlockKey,
        data: SleepLockGuard<'a, Box<[u8]>>,
    ) -> Self {
        Self {
            cache,
            idx,
            key,
            data: ManuallyDrop::new(data),
        }
    }

    /// 缓冲区在 arena 中的下标，同一缓冲区在回收前保持不变
    pub fn id(&self) -> usize {
        self.idx
    }

    /// 设备号
    pub fn dev(&self) -> usize {
        self.key.0
    }

    /// 块号
    pub fn blockno(&self) -> usize {
        self.key.1
    }

    /// 数据是否已从磁盘读入
    pub fn is_valid(&self) -> bool {
        self.cache.is_valid(self.idx)
    }

    /// 把缓冲区内容同步写回磁盘
    ///
    /// 持有 `BufGuard` 本身就证明调用者独占了缓冲区。
    pub fn write(&mut self) -> Result<(), BioError> {
        let (dev, blockno) = self.key;
        let disk = self.cache.disk(dev)?;
        if disk.write_block(blockno, &self.data) {
            Ok(())
        } else {
            log::error!("bio: write of dev {} block {} failed", dev, blockno);
            Err(BioError::DeviceIo {
                dev,
                blockno,
                write: true,
            })
        }
    }

    /// 额外占用一个引用，使缓冲区在本保护器释放后仍不会被回收
    pub fn pin(&self) -> BufPin<'a> {
        self.cache.pin(self.idx, self.key)
    }

    /// 释放缓冲区
    pub fn release(self) {}
}

impl Deref for BufGuard<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data
    }
}

impl DerefMut for BufGuard<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl Drop for BufGuard<'_> {
    fn drop(&mut self) {
        // 先放开数据锁，再在分片锁内减少引用计数
        // SAFETY: data 只在这里被 drop 一次
        unsafe { ManuallyDrop::drop(&mut self.data) };
        self.cache.put(self.idx, self.key);
    }
}

/// 只保活、不持有数据的缓冲区引用
pub struct BufPin<'a> {
    cache: &'a BufCache,
    idx: usize,
    key: BlockKey,
}

impl<'a> BufPin<'a> {
    pub(crate) fn new(cache: &'a BufCache, idx: usize, key: BlockKey) -> Self {
        Self { cache, idx, key }
    }

    /// 缓冲区在 arena 中的下标
    pub fn id(&self) -> usize {
        self.idx
    }

    /// 块号
    pub fn blockno(&self) -> usize {
        self.key.1
    }

    /// 放弃保活引用
    pub fn unpin(self) {}
}

impl Drop for BufPin<'_> {
    fn drop(&mut self) {
        self.cache.put(self.idx, self.key);
    }
}
