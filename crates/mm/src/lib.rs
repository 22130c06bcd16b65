//! 文件映射管理
//!
//! 提供按需缺页的文件映射（mmap）：
//!
//! - [`MmapSpace`] - 一个进程的映射区域数组、页表和页帧分配器
//! - [`Vma`] - 映射区域描述符
//! - [`PageTable`] / [`FrameAllocator`] - 由架构和物理内存管理实现的接口
//!
//! 文件读写通过 `vfs` 的 inode 接口完成，写回包在 [`vfs::Transaction`] 内。

#![no_std]

extern crate alloc;

pub mod address;
pub mod config;
mod error;
mod frame;
mod mmap;
pub mod page_table;
mod vma;

pub use address::{Ppn, Vpn, page_round_down, page_round_up};
pub use error::MmError;
pub use frame::FrameAllocator;
pub use mmap::MmapSpace;
pub use page_table::{PageTable, PagingError, PagingResult, PteFlags};
pub use vma::Vma;
