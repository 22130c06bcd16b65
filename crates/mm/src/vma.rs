//! 映射区域描述符

use uapi::mm::{MapFlags, ProtFlags};
use vfs::{FileFault, FileHandle};

use crate::page_table::PteFlags;

/// 一段按需从文件填充的虚拟地址区间 `[start, end)`
///
/// 区域在整个生命周期内持有文件的一个引用，只在完全解除映射时关闭。
#[derive(Debug)]
pub struct Vma {
    pub(crate) start: usize,
    pub(crate) end: usize,
    pub(crate) offset: usize,
    pub(crate) prot: ProtFlags,
    pub(crate) flags: MapFlags,
    pub(crate) file: FileHandle,
}

impl Vma {
    /// 起始地址
    pub fn start(&self) -> usize {
        self.start
    }

    /// 结束地址（不含）
    pub fn end(&self) -> usize {
        self.end
    }

    /// `start` 对应的文件偏移量
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// 保护标志
    pub fn prot(&self) -> ProtFlags {
        self.prot
    }

    /// 共享方式
    pub fn flags(&self) -> MapFlags {
        self.flags
    }

    /// 背后的文件
    pub fn file(&self) -> &FileHandle {
        &self.file
    }

    /// 区间长度
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// 区间是否为空
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// `addr` 是否落在区间内
    pub fn contains(&self, addr: usize) -> bool {
        self.start <= addr && addr < self.end
    }

    /// 缺页时安装的页表项权限
    ///
    /// 可读要求文件可读且区域允许读；可写要求区域允许写，并且区域是私有的或文件可写。
    /// 私有映射不做写时复制，写入直接落在进程自己的页上。
    pub fn pte_flags(&self) -> PteFlags {
        let mut flags = PteFlags::U | PteFlags::V;
        if self.file.readable() && self.prot.contains(ProtFlags::READ) {
            flags |= PteFlags::R;
        }
        if self.prot.contains(ProtFlags::WRITE)
            && (self.flags.contains(MapFlags::PRIVATE) || self.file.writable())
        {
            flags |= PteFlags::W;
        }
        flags
    }

    /// 解除映射时是否需要把内容写回文件
    pub fn needs_write_back(&self) -> bool {
        self.file.writable()
            && self.flags.contains(MapFlags::SHARED)
            && self.prot.contains(ProtFlags::WRITE)
    }

    /// 复制描述符，文件引用加一
    pub(crate) fn try_clone(&self) -> Result<Vma, FileFault> {
        Ok(Vma {
            start: self.start,
            end: self.end,
            offset: self.offset,
            prot: self.prot,
            flags: self.flags,
            file: self.file.dup()?,
        })
    }
}
