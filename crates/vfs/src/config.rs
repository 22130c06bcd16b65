//! VFS 配置常量

/// 系统中同时打开的文件数上限
pub const NFILE: usize = 100;

/// 主设备号上限（设备表大小）
pub const NDEV: usize = 10;

/// 单个事务最多写入的块数
pub const MAXOPBLOCKS: usize = 10;
