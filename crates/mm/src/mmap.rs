//! 进程的文件映射空间
//!
//! 每个区域的状态变化：
//!
//! ```text
//! 未映射 --mmap--> 已映射，没有驻留页 --缺页--> 部分驻留
//!     部分驻留 --完全解除--> 未映射（释放页，关闭文件）
//!     部分驻留 --从头部解除--> 区域缩小（起始地址和文件偏移量前移）
//!     部分驻留 --从尾部解除--> 区域缩小（结束地址后移）
//! ```
//!
//! 共享且可写的区域在解除映射前把驻留页写回文件，写回按 [`vfs::max_write_chunk()`]
//! 切分，每段在自己的 [`Transaction`] 内完成。写回不完整属于不可恢复错误：
//! 脏页在没有持久化之前不能丢弃。
//!
//! 写回还会在页边界处切分：每段只取自一个驻留页，未驻留的页整页跳过，
//! 所以跨页的写回即使总长不超过上限也会分成多段。

use alloc::sync::Arc;
use alloc::vec::Vec;
use uapi::mm::{MapFlags, ProtFlags};
use vfs::{FileHandle, FsError, Transaction, max_write_chunk};

use crate::address::{Vpn, is_page_aligned, page_round_down, page_round_up};
use crate::config::{MMAP_TOP, NVMA, PAGE_SIZE};
use crate::frame::{FrameAllocator, frame_bytes, frame_bytes_mut};
use crate::page_table::PageTable;
use crate::{MmError, Vma};

/// 一个进程的映射区域和页表
pub struct MmapSpace<PT: PageTable> {
    vmas: [Option<Vma>; NVMA],
    page_table: PT,
    frames: Arc<dyn FrameAllocator>,
    top: usize,
}

impl<PT: PageTable> MmapSpace<PT> {
    /// 创建空的映射空间，区域从 [`MMAP_TOP`] 向下分配
    pub fn new(page_table: PT, frames: Arc<dyn FrameAllocator>) -> Self {
        Self::with_top(page_table, frames, MMAP_TOP)
    }

    /// 创建空的映射空间，区域从 `top` 向下分配
    pub fn with_top(page_table: PT, frames: Arc<dyn FrameAllocator>, top: usize) -> Self {
        Self {
            vmas: core::array::from_fn(|_| None),
            page_table,
            frames,
            top: page_round_down(top),
        }
    }

    /// 页表
    pub fn page_table(&self) -> &PT {
        &self.page_table
    }

    /// 所有有效区域
    pub fn regions(&self) -> impl Iterator<Item = &Vma> {
        self.vmas.iter().flatten()
    }

    /// 包含 `addr` 的区域
    pub fn region(&self, addr: usize) -> Option<&Vma> {
        self.regions().find(|vma| vma.contains(addr))
    }

    /// `addr` 是否属于某个映射区域，供缺页处理判断是否交给 [`Self::handle_fault`]
    pub fn covers(&self, addr: usize) -> bool {
        self.region(addr).is_some()
    }

    fn slot_of(&self, addr: usize) -> Option<usize> {
        self.vmas
            .iter()
            .position(|slot| slot.as_ref().is_some_and(|vma| vma.contains(addr)))
    }

    /// 建立文件映射，返回区域起始地址
    ///
    /// 只记录区域并复制文件句柄，不分配任何物理页。
    pub fn mmap(
        &mut self,
        len: usize,
        prot: ProtFlags,
        flags: MapFlags,
        file: &FileHandle,
        offset: usize,
    ) -> Result<usize, MmError> {
        if len == 0 || !is_page_aligned(offset) || !flags.is_valid_sharing() {
            return Err(MmError::InvalidArgument);
        }
        if file.inode_ref().is_none() {
            return Err(FsError::NoDevice.into());
        }
        if prot.contains(ProtFlags::READ) && !file.readable() {
            return Err(FsError::PermissionDenied.into());
        }
        if flags.contains(MapFlags::SHARED) && prot.contains(ProtFlags::WRITE) && !file.writable()
        {
            return Err(FsError::PermissionDenied.into());
        }

        let len = page_round_up(len);
        let slot = self
            .vmas
            .iter()
            .position(Option::is_none)
            .ok_or(MmError::NoSpace)?;
        let start = self.find_gap(len).ok_or(MmError::NoSpace)?;
        let file = file.dup()?;

        log::debug!(
            "mmap: [{:#x}, {:#x}) file slot {} offset {:#x} prot {:?} flags {:?}",
            start,
            start + len,
            file.index(),
            offset,
            prot,
            flags
        );
        self.vmas[slot] = Some(Vma {
            start,
            end: start + len,
            offset,
            prot,
            flags,
            file,
        });
        Ok(start)
    }

    /// 自顶向下找第一个放得下 `len` 字节的空隙
    fn find_gap(&self, len: usize) -> Option<usize> {
        let mut taken: Vec<(usize, usize)> = self.regions().map(|v| (v.start, v.end)).collect();
        taken.sort_unstable_by(|a, b| b.0.cmp(&a.0));

        let mut hi = self.top;
        for (start, end) in taken {
            if end <= hi && hi - end >= len {
                break;
            }
            hi = hi.min(start);
        }
        // 第 0 页保留给空指针
        hi.checked_sub(len).filter(|&start| start >= PAGE_SIZE)
    }

    /// 处理落在映射区域内的缺页
    ///
    /// 分配一页并清零，按区域和文件的权限计算页表项，从对应的文件偏移量读入一页内容后安装映射。
    /// 没有覆盖 `addr` 的区域是不可恢复错误。
    pub fn handle_fault(&mut self, addr: usize) -> Result<(), MmError> {
        let Some(vma) = self.region(addr) else {
            log::error!("mmap: fault at {:#x} without a mapped region", addr);
            return Err(MmError::NoRegion { addr });
        };
        let va = page_round_down(addr);
        let vpn = Vpn::from_addr_floor(va);
        let file_off = vma.offset + (va - vma.start);
        let flags = vma.pte_flags();
        let inode = vma.file.inode_ref().cloned().ok_or(FsError::NoDevice)?;
        if self.page_table.translate(vpn).is_some() {
            return Err(MmError::Paging(crate::PagingError::AlreadyMapped));
        }

        let ppn = self.frames.alloc_frame().ok_or_else(|| {
            log::error!("mmap: out of frames at {:#x}", addr);
            MmError::OutOfFrames
        })?;
        // SAFETY: 新分配的页还没有映射给任何人
        let page = unsafe { frame_bytes_mut(self.frames.as_ref(), ppn) };
        page.fill(0);
        // 文件末尾之后的部分保持为零
        let read = inode.lock().read_at(file_off, page);
        if let Err(e) = read {
            // 没有文件内容的页不装入页表
            log::warn!("mmap: read at file offset {:#x} failed: {:?}", file_off, e);
            self.frames.dealloc_frame(ppn);
            return Err(e.into());
        }

        if let Err(e) = self.page_table.map(vpn, ppn, flags) {
            self.frames.dealloc_frame(ppn);
            return Err(e.into());
        }
        Ok(())
    }

    /// 解除 `slot` 号区域中 `[addr, addr + len)` 的映射
    ///
    /// `full` 表示整个区域，否则 `trim_start` 区分从头部还是从尾部缩小。
    /// `addr` 和 `len` 必须页对齐，并且是区域的头部、尾部或整体。
    pub fn unmap(
        &mut self,
        slot: usize,
        addr: usize,
        len: usize,
        full: bool,
        trim_start: bool,
    ) -> Result<(), MmError> {
        let vma = self
            .vmas
            .get(slot)
            .and_then(Option::as_ref)
            .ok_or(MmError::NoRegion { addr })?;
        if vma.needs_write_back() {
            self.write_back(vma, addr, len)?;
        }

        let closing = if full {
            self.vmas[slot].take()
        } else {
            if let Some(vma) = self.vmas[slot].as_mut() {
                if trim_start {
                    vma.start += len;
                    vma.offset += len;
                } else {
                    vma.end = addr;
                }
            }
            None
        };

        for i in 0..len / PAGE_SIZE {
            let vpn = Vpn::from_addr_floor(addr).add(i);
            if let Some(ppn) = self.page_table.unmap(vpn) {
                self.frames.dealloc_frame(ppn);
            }
        }

        if let Some(vma) = closing {
            vma.file.close()?;
        }
        Ok(())
    }

    /// 把 `[addr, addr + len)` 中已驻留的页写回文件，长度截断到文件大小
    fn write_back(&self, vma: &Vma, addr: usize, len: usize) -> Result<(), MmError> {
        let Some(inode) = vma.file.inode_ref() else {
            return Ok(());
        };
        let base = vma.offset + (addr - vma.start);
        let size = inode.lock().size();
        let end = addr + len.min(size.saturating_sub(base));
        let max = max_write_chunk();

        let mut va = addr;
        while va < end {
            let page_end = (page_round_down(va) + PAGE_SIZE).min(end);
            let Some((ppn, _)) = self.page_table.translate(Vpn::from_addr_floor(va)) else {
                va = page_end;
                continue;
            };
            // SAFETY: 页仍然映射在区域内，只读访问
            let page = unsafe { frame_bytes(self.frames.as_ref(), ppn) };
            while va < page_end {
                let n = (page_end - va).min(max);
                let src = &page[va % PAGE_SIZE..va % PAGE_SIZE + n];
                let file_off = vma.offset + (va - vma.start);
                let written = {
                    let _tx = Transaction::begin();
                    let mut ip = inode.lock();
                    ip.write_at(file_off, src)
                };
                match written {
                    Ok(w) if w == n => va += n,
                    other => {
                        log::error!(
                            "mmap: write back at {:#x} (file offset {:#x}, {} bytes) failed: {:?}",
                            va,
                            file_off,
                            n,
                            other
                        );
                        return Err(MmError::ShortWriteBack { addr: va });
                    }
                }
            }
        }
        Ok(())
    }

    /// `munmap` 系统调用
    ///
    /// 只接受整个区域、区域头部或区域尾部，在区域中间打洞返回 [`MmError::InvalidArgument`]。
    pub fn munmap(&mut self, addr: usize, len: usize) -> Result<(), MmError> {
        if len == 0 || !is_page_aligned(addr) {
            return Err(MmError::InvalidArgument);
        }
        let len = page_round_up(len);
        let slot = self.slot_of(addr).ok_or(MmError::InvalidArgument)?;
        let (start, end) = match &self.vmas[slot] {
            Some(vma) => (vma.start, vma.end),
            None => return Err(MmError::InvalidArgument),
        };
        let unmap_end = addr.checked_add(len).ok_or(MmError::InvalidArgument)?;
        if unmap_end > end {
            return Err(MmError::InvalidArgument);
        }

        let from_start = addr == start;
        let to_end = unmap_end == end;
        if !from_start && !to_end {
            return Err(MmError::InvalidArgument);
        }
        self.unmap(slot, addr, len, from_start && to_end, from_start)
    }

    /// 进程退出时解除所有映射
    pub fn unmap_all(&mut self) -> Result<(), MmError> {
        for slot in 0..NVMA {
            let Some((start, len)) = self.vmas[slot].as_ref().map(|v| (v.start, v.len())) else {
                continue;
            };
            self.unmap(slot, start, len, true, false)?;
        }
        Ok(())
    }

    /// fork 时复制映射区域到子进程
    ///
    /// 子进程得到相同的区域描述符和新的文件引用，页面在子进程里重新按需缺页读入。
    pub fn fork(&self, child_page_table: PT) -> Result<MmapSpace<PT>, MmError> {
        let mut child = MmapSpace::with_top(child_page_table, self.frames.clone(), self.top);
        for (slot, vma) in self.vmas.iter().enumerate() {
            let Some(vma) = vma else {
                continue;
            };
            match vma.try_clone() {
                Ok(copy) => child.vmas[slot] = Some(copy),
                Err(e) => {
                    // 子进程还没有驻留页，这里只会关闭已经复制的文件引用
                    child.unmap_all()?;
                    return Err(e.into());
                }
            }
        }
        Ok(child)
    }
}

impl<PT: PageTable> Drop for MmapSpace<PT> {
    fn drop(&mut self) {
        let live = self.vmas.iter().flatten().count();
        if live > 0 {
            log::warn!(
                "mmap: space dropped with {} mapped regions, pages and file references leaked",
                live
            );
        }
    }
}
