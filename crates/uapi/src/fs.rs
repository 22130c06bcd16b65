//! 文件元数据

/// inode 类型，数值与磁盘上的 `type` 字段一致
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InodeType {
    #[default]
    Free = 0,
    Directory = 1,
    File = 2,
    Device = 3,
}

/// `fstat` 返回给用户的文件元数据
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stat {
    /// 文件系统所在磁盘设备
    pub dev: u32,
    /// inode 编号
    pub ino: u32,
    /// 文件类型
    pub kind: InodeType,
    /// 指向该文件的硬链接数
    pub nlink: i16,
    /// 文件大小（字节）
    pub size: u64,
}
