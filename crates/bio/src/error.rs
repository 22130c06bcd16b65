//! 缓冲区缓存错误类型

/// 缓冲区缓存错误
///
/// 所有变体都是不可恢复的：它们表示容量规划错误、设备故障或初始化顺序错误，
/// 由调用方（内核）决定停机还是隔离故障单元。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BioError {
    /// 所有可回收的缓冲区都在使用中
    NoBuffers,
    /// 设备号没有注册驱动
    NoDevice {
        /// 设备号
        dev: usize,
    },
    /// 块设备读写失败
    DeviceIo {
        /// 设备号
        dev: usize,
        /// 块号
        blockno: usize,
        /// 是否为写操作
        write: bool,
    },
    /// 配置无效
    BadConfig(&'static str),
    /// 全局缓存尚未初始化
    Uninitialized,
}
