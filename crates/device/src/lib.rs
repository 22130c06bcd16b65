//! 设备驱动接口
//!
//! 缓冲区缓存只依赖块设备的同步读写原语：
//!
//! - [`BlockDriver`] trait - 块设备驱动接口
//! - [`RamDisk`] - 内存模拟块设备
//! - [`BLK_DRIVERS`] - 全局块设备驱动表，下标即设备号

#![no_std]

extern crate alloc;

pub mod block;

pub use block::{BLK_DRIVERS, BlockDriver, RamDisk, register_block_driver};