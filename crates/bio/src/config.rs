//! 缓冲区缓存配置

use crate::BioError;

/// 块大小（字节）
pub const BSIZE: usize = 1024;
/// 单个文件系统操作最多写入的块数
pub const MAXOPBLOCKS: usize = 10;
/// 缓冲区数量
pub const NBUF: usize = MAXOPBLOCKS * 3;
/// 分片数量，取素数使块号分布更均匀
pub const NBUCKET: usize = 13;

/// 缓冲区缓存的容量配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BioConfig {
    /// 缓冲区总数，运行期间固定
    pub nbuf: usize,
    /// 分片数
    pub nshards: usize,
    /// 每个缓冲区的数据大小，必须与设备块大小一致
    pub block_size: usize,
}

impl Default for BioConfig {
    fn default() -> Self {
        Self {
            nbuf: NBUF,
            nshards: NBUCKET,
            block_size: BSIZE,
        }
    }
}

impl BioConfig {
    /// 检查配置能否构造出可用的缓存
    ///
    /// 回收只从其它分片寻找牺牲者，所以至少需要两个分片。
    pub fn validate(&self) -> Result<(), BioError> {
        if self.nshards < 2 {
            return Err(BioError::BadConfig("need at least two shards"));
        }
        if self.nbuf < self.nshards {
            return Err(BioError::BadConfig("fewer buffers than shards"));
        }
        if self.block_size == 0 {
            return Err(BioError::BadConfig("zero block size"));
        }
        Ok(())
    }
}
