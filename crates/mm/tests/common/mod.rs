#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Once};

use mm::{FrameAllocator, MmapSpace, PageTable, PagingError, PagingResult, Ppn, PteFlags, Vpn};
use sync::SleepLock;
use test_support::mock::{MemFile, MockFrames, MOCK_LOG};
use vfs::{FileHandle, FileTable, FsError, Inode, InodeType, OpenMode, Stat, VfsOps};

pub const PAGE: usize = mm::config::PAGE_SIZE;

struct TestOps;

impl VfsOps for TestOps {
    fn begin_op(&self) {
        MOCK_LOG.begin_op();
    }

    fn end_op(&self) {
        MOCK_LOG.end_op();
    }

    fn block_size(&self) -> usize {
        1024
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

/// 用 BTreeMap 模拟的页表
#[derive(Default)]
pub struct MockPageTable {
    pub entries: BTreeMap<Vpn, (Ppn, PteFlags)>,
}

impl PageTable for MockPageTable {
    fn map(&mut self, vpn: Vpn, ppn: Ppn, flags: PteFlags) -> PagingResult<()> {
        if self.entries.contains_key(&vpn) {
            return Err(PagingError::AlreadyMapped);
        }
        self.entries.insert(vpn, (ppn, flags));
        Ok(())
    }

    fn translate(&self, vpn: Vpn) -> Option<(Ppn, PteFlags)> {
        self.entries.get(&vpn).copied()
    }

    fn unmap(&mut self, vpn: Vpn) -> Option<Ppn> {
        self.entries.remove(&vpn).map(|(ppn, _)| ppn)
    }
}

pub struct TestFrames(pub MockFrames);

impl FrameAllocator for TestFrames {
    fn alloc_frame(&self) -> Option<Ppn> {
        self.0.alloc().map(Ppn)
    }

    fn dealloc_frame(&self, ppn: Ppn) {
        self.0.dealloc(ppn.as_usize());
    }

    fn frame_vaddr(&self, ppn: Ppn) -> usize {
        self.0.vaddr(ppn.as_usize())
    }
}

pub struct MemInode {
    pub file: MemFile,
    /// 让写入什么都写不进去
    pub fail_writes: Arc<AtomicBool>,
    /// 让读取返回 I/O 错误
    pub fail_reads: Arc<AtomicBool>,
}

impl Inode for MemInode {
    fn read_at(&mut self, off: usize, buf: &mut [u8]) -> Result<usize, FsError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(FsError::IoError);
        }
        Ok(self.file.read_at(off, buf))
    }

    fn write_at(&mut self, off: usize, buf: &[u8]) -> Result<usize, FsError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Ok(0);
        }
        Ok(self.file.write_at(off, buf))
    }

    fn stat(&self) -> Stat {
        Stat {
            dev: 1,
            ino: 1,
            kind: InodeType::File,
            nlink: 1,
            size: self.file.data.len() as u64,
        }
    }

    fn size(&self) -> usize {
        self.file.data.len()
    }
}

pub struct Fixture {
    pub space: MmapSpace<MockPageTable>,
    pub frames: Arc<TestFrames>,
    pub table: Arc<FileTable>,
}

pub fn fixture() -> Fixture {
    init();
    let frames = Arc::new(TestFrames(MockFrames::new()));
    let space = MmapSpace::new(MockPageTable::default(), frames.clone());
    Fixture {
        space,
        frames,
        table: FileTable::new(8),
    }
}

impl Fixture {
    pub fn open(&self, data: Vec<u8>, mode: OpenMode) -> (Arc<SleepLock<MemInode>>, FileHandle) {
        let mem = Arc::new(SleepLock::new(MemInode {
            file: MemFile::new(data),
            fail_writes: Arc::new(AtomicBool::new(false)),
            fail_reads: Arc::new(AtomicBool::new(false)),
        }));
        let handle = self
            .table
            .alloc(vfs::File::inode(mem.clone(), mode))
            .unwrap();
        (mem, handle)
    }

    pub fn pte(&self, addr: usize) -> Option<(Ppn, PteFlags)> {
        self.space.page_table().translate(Vpn::from_addr_floor(addr))
    }

    /// 模拟用户态访问已映射的页
    pub fn page_mut<'a>(&self, addr: usize) -> &'a mut [u8] {
        let (ppn, _) = self.pte(addr).expect("page not resident");
        let vaddr = self.frames.frame_vaddr(ppn);
        unsafe { std::slice::from_raw_parts_mut(vaddr as *mut u8, PAGE) }
    }
}

pub fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_mul(7).wrapping_add(seed)).collect()
}
