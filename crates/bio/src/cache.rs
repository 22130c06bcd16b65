//! 分片缓冲区缓存
//!
//! 缓冲区存放在固定大小的 arena 中，从不分配或释放，只会被回收复用。
//! 缓冲区按块号散列到分片，分片链表决定“哪个块缓存在哪个缓冲区”。
//!
//! # 加锁规则
//!
//! 任意时刻最多持有一把分片锁：查找在本分片锁内完成；未命中时先放开本分片，
//! 再按固定的循环顺序（本分片之后的下一个分片开始）逐个锁住其它分片寻找牺牲者，
//! 摘下牺牲者后重新锁住本分片并复查，期间若别的线程已经缓存了同一块，则使用那个缓冲区，
//! 牺牲者以“未使用”身份挂回本分片队尾。这样不存在嵌套加锁，也就没有环路等待。
//!
//! 本分片自己的空闲缓冲区不会被回收给散列到本分片的块，这是以 LRU 局部性换取的简单性。

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, Ordering};

use device::BlockDriver;
use sync::{SleepLock, SpinLock};

use crate::buf::{BufGuard, BufPin};
use crate::shard::{BlockKey, Entry, Shard};
use crate::{BioConfig, BioError};

/// arena 中的一个缓冲区
pub(crate) struct Buf {
    /// 数据是否已从磁盘读入；只在持有数据睡眠锁或引用计数为零时修改
    pub valid: AtomicBool,
    pub data: SleepLock<Box<[u8]>>,
}

/// 某个缓冲区在某一时刻的状态快照，用于诊断
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufState {
    /// 所在分片
    pub shard: usize,
    /// arena 下标
    pub idx: usize,
    /// 缓存的 (设备号, 块号)
    pub key: Option<BlockKey>,
    /// 引用计数
    pub refcnt: usize,
}

/// 分片缓冲区缓存
pub struct BufCache {
    shards: Box<[SpinLock<Shard>]>,
    bufs: Box<[Buf]>,
    disks: Vec<Arc<dyn BlockDriver>>,
    block_size: usize,
}

impl BufCache {
    /// 按配置创建缓存，`disks[dev]` 是设备号 `dev` 的驱动
    pub fn new(config: BioConfig, disks: Vec<Arc<dyn BlockDriver>>) -> Result<Self, BioError> {
        config.validate()?;
        if disks.iter().any(|d| d.block_size() != config.block_size) {
            return Err(BioError::BadConfig("device block size differs from buffer size"));
        }

        let bufs: Box<[Buf]> = (0..config.nbuf)
            .map(|_| Buf {
                valid: AtomicBool::new(false),
                data: SleepLock::new(vec![0u8; config.block_size].into_boxed_slice()),
            })
            .collect();

        let mut shards: Vec<Shard> = (0..config.nshards).map(|_| Shard::new()).collect();
        for idx in 0..config.nbuf {
            shards[idx % config.nshards].push_lru(Entry::unused(idx));
        }

        log::debug!(
            "bio: {} buffers of {} bytes in {} shards, {} devices",
            config.nbuf,
            config.block_size,
            config.nshards,
            disks.len()
        );

        Ok(Self {
            shards: shards.into_iter().map(SpinLock::new).collect(),
            bufs,
            disks,
            block_size: config.block_size,
        })
    }

    /// 块号所属的分片
    pub fn shard_of(&self, blockno: usize) -> usize {
        blockno % self.shards.len()
    }

    /// 分片数
    pub fn nshards(&self) -> usize {
        self.shards.len()
    }

    /// 缓冲区总数
    pub fn nbuf(&self) -> usize {
        self.bufs.len()
    }

    /// 缓冲区数据大小
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// 查找或分配 `(dev, blockno)` 的缓冲区，返回独占持有的保护器
    ///
    /// 返回的缓冲区数据不一定有效，需要磁盘内容时使用 [`BufCache::read`]。
    pub fn get(&self, dev: usize, blockno: usize) -> Result<BufGuard<'_>, BioError> {
        let key = (dev, blockno);
        let home = self.shard_of(blockno);

        let cached = self.shards[home].lock().hit(key);
        if let Some(idx) = cached {
            return Ok(self.hold(idx, key));
        }

        let victim = self.steal_victim(home).ok_or_else(|| {
            log::error!("bio: no buffers for dev {} block {}", dev, blockno);
            BioError::NoBuffers
        })?;

        let idx = {
            let mut shard = self.shards[home].lock();
            match shard.hit(key) {
                Some(idx) => {
                    // 扫描期间别的线程已经缓存了这个块
                    shard.push_lru(Entry::unused(victim.idx));
                    idx
                }
                None => {
                    self.bufs[victim.idx].valid.store(false, Ordering::Release);
                    shard.push_mru(Entry {
                        idx: victim.idx,
                        key: Some(key),
                        refcnt: 1,
                    });
                    victim.idx
                }
            }
        };
        Ok(self.hold(idx, key))
    }

    /// 返回持有 `(dev, blockno)` 磁盘内容的缓冲区
    pub fn read(&self, dev: usize, blockno: usize) -> Result<BufGuard<'_>, BioError> {
        let disk = self.disk(dev)?;
        let mut buf = self.get(dev, blockno)?;
        let slot = &self.bufs[buf.id()];
        if !slot.valid.load(Ordering::Acquire) {
            if !disk.read_block(blockno, &mut buf) {
                log::error!("bio: read of dev {} block {} failed", dev, blockno);
                return Err(BioError::DeviceIo {
                    dev,
                    blockno,
                    write: false,
                });
            }
            slot.valid.store(true, Ordering::Release);
        }
        Ok(buf)
    }

    /// 当前缓存 `(dev, blockno)` 的缓冲区的引用计数
    pub fn refcnt(&self, dev: usize, blockno: usize) -> Option<usize> {
        self.shards[self.shard_of(blockno)]
            .lock()
            .find((dev, blockno))
            .map(|e| e.refcnt)
    }

    /// 分片中的缓冲区数量
    pub fn shard_len(&self, shard: usize) -> usize {
        self.shards[shard].lock().len()
    }

    /// 逐个分片收集所有缓冲区的状态
    ///
    /// 每次只锁一个分片，并发修改时快照可能不一致。
    pub fn snapshot(&self) -> Vec<BufState> {
        let mut out = Vec::with_capacity(self.bufs.len());
        for (i, shard) in self.shards.iter().enumerate() {
            out.extend(shard.lock().iter().map(|e| BufState {
                shard: i,
                idx: e.idx,
                key: e.key,
                refcnt: e.refcnt,
            }));
        }
        out
    }

    pub(crate) fn disk(&self, dev: usize) -> Result<&Arc<dyn BlockDriver>, BioError> {
        self.disks.get(dev).ok_or(BioError::NoDevice { dev })
    }

    /// 数据是否已从磁盘读入
    pub(crate) fn is_valid(&self, idx: usize) -> bool {
        self.bufs[idx].valid.load(Ordering::Acquire)
    }

    /// 从其它分片摘下一个空闲缓冲区，同一时刻只锁一个分片
    fn steal_victim(&self, home: usize) -> Option<Entry> {
        let n = self.shards.len();
        (1..n).map(|step| (home + step) % n).find_map(|i| {
            let victim = self.shards[i].lock().take_victim();
            if let Some(v) = victim {
                log::trace!("bio: recycled buffer {} from shard {} into shard {}", v.idx, i, home);
            }
            victim
        })
    }

    /// 引用计数已经加一，这里只获取数据睡眠锁
    fn hold(&self, idx: usize, key: BlockKey) -> BufGuard<'_> {
        let data = self.bufs[idx].data.lock();
        BufGuard::new(self, idx, key, data)
    }

    pub(crate) fn pin(&self, idx: usize, key: BlockKey) -> BufPin<'_> {
        self.adjust_refcnt(idx, key, true);
        BufPin::new(self, idx, key)
    }

    pub(crate) fn put(&self, idx: usize, key: BlockKey) {
        self.adjust_refcnt(idx, key, false);
    }

    fn adjust_refcnt(&self, idx: usize, key: BlockKey, inc: bool) {
        let home = self.shard_of(key.1);
        let mut shard = self.shards[home].lock();
        let entry = match shard.entry_mut(idx) {
            Some(e) if e.key == Some(key) && e.refcnt > 0 => e,
            // 持有引用的条目不会被回收或迁出本分片
            _ => panic!("bio: buffer {} for {:?} not referenced in shard {}", idx, key, home),
        };
        if inc {
            entry.refcnt += 1;
        } else {
            entry.refcnt -= 1;
        }
    }
}
