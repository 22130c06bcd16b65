//! 分片成员链表
//!
//! 每个分片按最近使用顺序保存一组缓冲区条目：队首最近使用，队尾最久未用。
//! 条目的身份与引用计数都由分片自旋锁保护，缓冲区数据不在这里。

use alloc::collections::VecDeque;

/// 缓存块的身份：(设备号, 块号)
pub type BlockKey = (usize, usize);

/// 分片中的一个缓冲区条目
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Entry {
    /// 缓冲区在 arena 中的下标
    pub idx: usize,
    /// 当前缓存的块，None 表示从未使用
    pub key: Option<BlockKey>,
    pub refcnt: usize,
}

impl Entry {
    pub const fn unused(idx: usize) -> Self {
        Self {
            idx,
            key: None,
            refcnt: 0,
        }
    }
}

pub(crate) struct Shard {
    entries: VecDeque<Entry>,
}

impl Shard {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    pub fn find(&self, key: BlockKey) -> Option<&Entry> {
        self.entries.iter().find(|e| e.key == Some(key))
    }

    /// 命中时增加引用计数并移到队首，返回缓冲区下标
    pub fn hit(&mut self, key: BlockKey) -> Option<usize> {
        let pos = self.entries.iter().position(|e| e.key == Some(key))?;
        let mut entry = self.entries.remove(pos)?;
        entry.refcnt += 1;
        self.entries.push_front(entry);
        Some(entry.idx)
    }

    /// 从队尾开始寻找引用计数为零的条目并摘除
    pub fn take_victim(&mut self) -> Option<Entry> {
        let pos = self.entries.iter().rposition(|e| e.refcnt == 0)?;
        self.entries.remove(pos)
    }

    pub fn push_mru(&mut self, entry: Entry) {
        self.entries.push_front(entry);
    }

    pub fn push_lru(&mut self, entry: Entry) {
        self.entries.push_back(entry);
    }

    pub fn entry_mut(&mut self, idx: usize) -> Option<&mut Entry> {
        self.entries.iter_mut().find(|e| e.idx == idx)
    }
}
