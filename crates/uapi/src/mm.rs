//! mmap 相关标志

use bitflags::bitflags;

bitflags! {
    /// 映射区域的保护标志
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ProtFlags: u32 {
        const NONE = 0x0;
        const READ = 0x1;
        const WRITE = 0x2;
        const EXEC = 0x4;
    }
}

bitflags! {
    /// 映射共享方式
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MapFlags: u32 {
        /// 修改写回文件
        const SHARED = 0x01;
        /// 修改只留在进程私有页中
        const PRIVATE = 0x02;
    }
}

impl MapFlags {
    /// SHARED 与 PRIVATE 恰好指定一个
    pub fn is_valid_sharing(&self) -> bool {
        self.contains(MapFlags::SHARED) != self.contains(MapFlags::PRIVATE)
    }
}
