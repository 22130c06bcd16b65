#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Once};

use sync::SleepLock;
use test_support::mock::{MemFile, MOCK_LOG};
use vfs::{FsError, Inode, InodeRef, InodeType, Pipe, Stat, VfsOps};

pub const BLOCK: usize = 1024;

struct TestOps;

impl VfsOps for TestOps {
    fn begin_op(&self) {
        MOCK_LOG.begin_op();
    }

    fn end_op(&self) {
        MOCK_LOG.end_op();
    }

    fn block_size(&self) -> usize {
        BLOCK
    }
}

static TEST_OPS: TestOps = TestOps;
static INIT: Once = Once::new();

pub fn init() {
    test_support::init_sync();
    INIT.call_once(|| {
        // Safety: Once 保证只注册一次
        unsafe { vfs::register_vfs_ops(&TEST_OPS) };
    });
}

/// inode 被释放时记录是否处于事务中
#[derive(Default)]
pub struct DropProbe {
    pub dropped: AtomicBool,
    pub in_tx: AtomicBool,
}

pub struct MemInode {
    pub file: MemFile,
    pub ino: u32,
    pub probe: Arc<DropProbe>,
}

impl Inode for MemInode {
    fn read_at(&mut self, off: usize, buf: &mut [u8]) -> Result<usize, FsError> {
        Ok(self.file.read_at(off, buf))
    }

    fn write_at(&mut self, off: usize, buf: &[u8]) -> Result<usize, FsError> {
        Ok(self.file.write_at(off, buf))
    }

    fn stat(&self) -> Stat {
        Stat {
            dev: 1,
            ino: self.ino,
            kind: InodeType::File,
            nlink: 1,
            size: self.file.data.len() as u64,
        }
    }

    fn size(&self) -> usize {
        self.file.data.len()
    }
}

impl Drop for MemInode {
    fn drop(&mut self) {
        self.probe.in_tx.store(MOCK_LOG.in_transaction(), Ordering::SeqCst);
        self.probe.dropped.store(true, Ordering::SeqCst);
    }
}

/// 返回具体类型的引用（用于检查内容）和擦除类型后的 [`InodeRef`]
pub fn mem_inode(file: MemFile, ino: u32) -> (Arc<SleepLock<MemInode>>, InodeRef) {
    let mem = Arc::new(SleepLock::new(MemInode {
        file,
        ino,
        probe: Arc::new(DropProbe::default()),
    }));
    let ip: InodeRef = mem.clone();
    (mem, ip)
}

#[derive(Default)]
pub struct MockPipe {
    pub buf: Mutex<VecDeque<u8>>,
    /// 每次 close 传入的 writable
    pub closes: Mutex<Vec<bool>>,
}

impl Pipe for MockPipe {
    fn read(&self, buf: &mut [u8]) -> Result<usize, FsError> {
        let mut data = self.buf.lock().unwrap();
        let n = buf.len().min(data.len());
        for (dst, src) in buf.iter_mut().zip(data.drain(..n)) {
            *dst = src;
        }
        Ok(n)
    }

    fn write(&self, buf: &[u8]) -> Result<usize, FsError> {
        self.buf.lock().unwrap().extend(buf.iter().copied());
        Ok(buf.len())
    }

    fn close(&self, writable: bool) {
        self.closes.lock().unwrap().push(writable);
    }
}

pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}
