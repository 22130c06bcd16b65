//! 内存管理配置常量

/// 页大小
pub const PAGE_SIZE: usize = 4096;

/// 页内偏移位数
pub const PAGE_SHIFT: usize = 12;

/// 每个进程的映射区域槽位数
pub const NVMA: usize = 16;

/// Sv39 用户地址空间上界
pub const MAXVA: usize = 1 << (9 + 9 + 9 + 12 - 1);

/// 映射区域从这里向下分配，留出 trampoline 和 trapframe 两页
pub const MMAP_TOP: usize = MAXVA - 2 * PAGE_SIZE;
