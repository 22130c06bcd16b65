//! 打开文件表与文件读写分发
//!
//! 此 crate 提供：
//!
//! - [`FileTable`] / [`FileHandle`] - 系统打开文件表，句柄带代数检查
//! - [`File`] - 管道、字符设备或 inode 上的读写能力，按 [`FileKind`] 分发
//! - [`DEVSW`] - 按主设备号索引的字符设备表
//! - [`Transaction`] - 文件系统事务作用域
//!
//! inode、管道和日志事务由外部实现，通过 [`Inode`]、[`Pipe`] 和 [`VfsOps`] 接入。

#![no_std]

extern crate alloc;

pub mod config;
pub mod devsw;
pub mod error;
pub mod ops;

mod file;
mod file_table;
mod inode;
mod pipe;

pub use devsw::{DEVSW, DevReadFn, DevSw, DevWriteFn, register_devsw, unregister_devsw};
pub use error::{FileFault, FsError};
pub use file::{File, FileKind, OpenMode};
pub use file_table::{FILE_TABLE, FileHandle, FileTable};
pub use inode::{Inode, InodeRef};
pub use ops::{Transaction, VfsOps, max_write_chunk, register_vfs_ops, vfs_ops};
pub use pipe::Pipe;

pub use uapi::fs::{InodeType, Stat};
