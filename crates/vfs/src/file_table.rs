//! 系统打开文件表
//!
//! 固定数量的槽位，每个槽位记录引用计数和代数。[`FileHandle`] 持有一个引用，
//! 由槽位下标加代数组成，槽位被释放后代数递增，旧句柄因此可以被识别出来。
//!
//! 引用计数归零时在表锁内摘下文件，在表锁外执行释放（关闭管道端点或在事务内释放 inode），
//! 避免与存储层的锁顺序形成环。

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use core::ops::Deref;
use lazy_static::lazy_static;
use sync::SpinLock;

use crate::config::NFILE;
use crate::file::{File, teardown};
use crate::{FileFault, FsError};

#[derive(Default)]
struct Slot {
    refcnt: usize,
    generation: u32,
    file: Option<Arc<File>>,
}

/// 打开文件表
pub struct FileTable {
    slots: SpinLock<Vec<Slot>>,
}

lazy_static! {
    /// 全局打开文件表
    pub static ref FILE_TABLE: Arc<FileTable> = FileTable::new(NFILE);
}

impl fmt::Debug for FileTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots = self.slots.lock();
        let used = slots.iter().filter(|slot| slot.refcnt > 0).count();
        f.debug_struct("FileTable")
            .field("slots", &slots.len())
            .field("used", &used)
            .finish()
    }
}

impl FileTable {
    /// 创建有 `nfile` 个槽位的文件表
    pub fn new(nfile: usize) -> Arc<Self> {
        let slots = (0..nfile).map(|_| Slot::default()).collect();
        Arc::new(Self {
            slots: SpinLock::new(slots),
        })
    }

    /// 槽位总数
    pub fn capacity(&self) -> usize {
        self.slots.lock().len()
    }

    /// 正在使用的槽位数
    pub fn in_use(&self) -> usize {
        self.slots.lock().iter().filter(|slot| slot.refcnt > 0).count()
    }

    /// 在第一个空闲槽位放入 `file`，引用计数为 1
    ///
    /// 表满时 `file` 被直接丢弃，不会关闭管道端点，调用者应先分配文件再创建管道。
    pub fn alloc(self: &Arc<Self>, file: File) -> Result<FileHandle, FsError> {
        let file = Arc::new(file);
        let mut slots = self.slots.lock();
        let (idx, slot) = slots
            .iter_mut()
            .enumerate()
            .find(|(_, slot)| slot.refcnt == 0)
            .ok_or(FsError::TooManyOpenFiles)?;
        slot.refcnt = 1;
        slot.file = Some(file.clone());
        Ok(FileHandle {
            table: self.clone(),
            idx,
            generation: slot.generation,
            file,
            closed: false,
        })
    }

    fn dup(&self, idx: usize, generation: u32) -> Result<(), FileFault> {
        let mut slots = self.slots.lock();
        let slot = Self::checked_slot(&mut slots, idx, generation)?;
        slot.refcnt += 1;
        Ok(())
    }

    /// 引用计数减一，归零时返回摘下的文件
    fn put(&self, idx: usize, generation: u32) -> Result<Option<Arc<File>>, FileFault> {
        let mut slots = self.slots.lock();
        let slot = Self::checked_slot(&mut slots, idx, generation)?;
        slot.refcnt -= 1;
        if slot.refcnt > 0 {
            return Ok(None);
        }
        slot.generation = slot.generation.wrapping_add(1);
        Ok(slot.file.take())
    }

    fn refcnt(&self, idx: usize) -> usize {
        self.slots.lock().get(idx).map_or(0, |slot| slot.refcnt)
    }

    fn checked_slot(
        slots: &mut [Slot],
        idx: usize,
        generation: u32,
    ) -> Result<&mut Slot, FileFault> {
        let slot = slots.get_mut(idx).ok_or(FileFault::StaleHandle { idx })?;
        if slot.generation != generation {
            log::error!("file table: stale handle for slot {}", idx);
            return Err(FileFault::StaleHandle { idx });
        }
        if slot.refcnt == 0 {
            log::error!("file table: reference underflow on slot {}", idx);
            return Err(FileFault::RefUnderflow { idx });
        }
        Ok(slot)
    }
}

/// 打开文件的句柄，持有文件表中的一个引用
///
/// 句柄必须通过 [`FileHandle::close`] 关闭。直接丢弃会泄漏引用，只打印一条警告。
#[must_use = "a file handle holds a reference that must be closed"]
pub struct FileHandle {
    table: Arc<FileTable>,
    idx: usize,
    generation: u32,
    file: Arc<File>,
    closed: bool,
}

impl FileHandle {
    /// 槽位下标，同一文件的所有句柄相同
    pub fn index(&self) -> usize {
        self.idx
    }

    /// 当前引用计数
    pub fn refcnt(&self) -> usize {
        self.table.refcnt(self.idx)
    }

    /// 复制句柄，引用计数加一，返回同一个文件
    pub fn dup(&self) -> Result<FileHandle, FileFault> {
        self.table.dup(self.idx, self.generation)?;
        Ok(FileHandle {
            table: self.table.clone(),
            idx: self.idx,
            generation: self.generation,
            file: self.file.clone(),
            closed: false,
        })
    }

    /// 关闭句柄，引用计数归零时释放文件
    pub fn close(mut self) -> Result<(), FileFault> {
        self.closed = true;
        let last = self.table.put(self.idx, self.generation)?;
        let file = self.file.clone();
        drop(self);
        if let Some(slot_file) = last {
            drop(slot_file);
            // 槽位和句柄的引用都已放下，这里持有最后一个
            teardown(file);
        }
        Ok(())
    }
}

impl Drop for FileHandle {
    fn drop(&mut self) {
        if !self.closed {
            log::warn!(
                "file table: handle for slot {} dropped without close, reference leaked",
                self.idx
            );
        }
    }
}

impl Deref for FileHandle {
    type Target = File;

    fn deref(&self) -> &File {
        &self.file
    }
}

impl fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileHandle")
            .field("idx", &self.idx)
            .field("generation", &self.generation)
            .finish()
    }
}
