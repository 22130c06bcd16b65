//! 与用户空间共用定义和声明
//!
//! 包含 `stat` 结构体和 mmap 标志，确保内核和用户空间的一致性

#![no_std]
#![allow(missing_docs)]

pub mod fs;
pub mod mm;
