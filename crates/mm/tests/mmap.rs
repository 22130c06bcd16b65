mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;

use common::{Fixture, MockPageTable, PAGE, TestFrames, fixture, pattern};
use mm::config::{MMAP_TOP, NVMA};
use mm::{MmError, MmapSpace, PteFlags};
use test_support::mock::{MOCK_LOGGER, MockFrames};
use uapi::mm::{MapFlags, ProtFlags};
use vfs::{FsError, OpenMode};

const RW: OpenMode = OpenMode::READ.union(OpenMode::WRITE);

fn prot_rw() -> ProtFlags {
    ProtFlags::READ | ProtFlags::WRITE
}

#[test]
fn test_read_only_shared_map_never_writes_back() {
    let mut fx = fixture();
    let data = pattern(2 * PAGE, 1);
    let (mem, file) = fx.open(data.clone(), OpenMode::READ);

    let addr = fx
        .space
        .mmap(2 * PAGE, ProtFlags::READ, MapFlags::SHARED, &file, 0)
        .unwrap();
    assert_eq!(file.refcnt(), 2);
    assert!(fx.pte(addr).is_none());

    fx.space.handle_fault(addr + 10).unwrap();
    let (_, flags) = fx.pte(addr).unwrap();
    assert_eq!(flags, PteFlags::R | PteFlags::U | PteFlags::V);
    assert_eq!(&fx.page_mut(addr)[..], &data[..PAGE]);

    fx.space.munmap(addr, 2 * PAGE).unwrap();
    assert!(mem.lock().file.writes.is_empty());
    assert_eq!(fx.frames.0.live(), 0);
    assert_eq!(file.refcnt(), 1);
    assert!(!fx.space.covers(addr));
    file.close().unwrap();
}

#[test]
fn test_shared_writable_writes_back_faulted_range_clamped_to_size() {
    let mut fx = fixture();
    let size = PAGE + 1000;
    let (mem, file) = fx.open(pattern(size, 2), RW);

    let addr = fx
        .space
        .mmap(3 * PAGE, prot_rw(), MapFlags::SHARED, &file, 0)
        .unwrap();
    fx.space.handle_fault(addr).unwrap();
    fx.space.handle_fault(addr + PAGE + 5).unwrap();
    assert!(fx.pte(addr + 2 * PAGE).is_none());
    let (_, flags) = fx.pte(addr).unwrap();
    assert_eq!(flags, PteFlags::R | PteFlags::W | PteFlags::U | PteFlags::V);

    fx.page_mut(addr)[..4].copy_from_slice(&[0xAA; 4]);
    fx.page_mut(addr + PAGE)[0] = 0xBB;
    // 文件末尾之后的修改不会写回
    fx.page_mut(addr + PAGE)[2000] = 0xCC;

    fx.space.munmap(addr, 3 * PAGE).unwrap();

    let inode = mem.lock();
    assert_eq!(
        inode.file.writes,
        vec![(0, 3072), (3072, 1024), (PAGE, 1000)]
    );
    assert!(inode.file.writes_in_tx.iter().all(|&tx| tx));
    assert_eq!(inode.file.data.len(), size);
    assert_eq!(&inode.file.data[..4], &[0xAA; 4]);
    assert_eq!(inode.file.data[PAGE], 0xBB);
    drop(inode);

    assert_eq!(fx.frames.0.live(), 0);
    assert_eq!(file.refcnt(), 1);
    file.close().unwrap();
}

#[test]
fn test_only_resident_pages_are_written_back() {
    let mut fx = fixture();
    let (mem, file) = fx.open(pattern(2 * PAGE, 3), RW);
    let addr = fx
        .space
        .mmap(2 * PAGE, prot_rw(), MapFlags::SHARED, &file, 0)
        .unwrap();
    fx.space.handle_fault(addr + PAGE).unwrap();

    fx.space.munmap(addr, 2 * PAGE).unwrap();
    assert_eq!(
        mem.lock().file.writes,
        vec![(PAGE, 3072), (PAGE + 3072, 1024)]
    );
    file.close().unwrap();
}

#[test]
fn test_trim_from_start_advances_start_and_offset() {
    let mut fx = fixture();
    let (mem, file) = fx.open(pattern(2 * PAGE, 4), RW);
    let addr = fx
        .space
        .mmap(2 * PAGE, prot_rw(), MapFlags::SHARED, &file, 0)
        .unwrap();
    fx.space.handle_fault(addr).unwrap();
    fx.space.handle_fault(addr + PAGE).unwrap();
    fx.page_mut(addr)[0] = 1;
    fx.page_mut(addr + PAGE)[0] = 2;

    fx.space.munmap(addr, PAGE).unwrap();
    assert_eq!(mem.lock().file.writes, vec![(0, 3072), (3072, 1024)]);
    let vma = fx.space.region(addr + PAGE).unwrap();
    assert_eq!(vma.start(), addr + PAGE);
    assert_eq!(vma.end(), addr + 2 * PAGE);
    assert_eq!(vma.offset(), PAGE);
    assert!(fx.pte(addr).is_none());
    assert!(fx.pte(addr + PAGE).is_some());
    assert_eq!(fx.frames.0.live(), 1);
    assert_eq!(file.refcnt(), 2);

    // 剩下的一页仍然要写回到它自己的文件偏移量
    fx.space.munmap(addr + PAGE, PAGE).unwrap();
    let inode = mem.lock();
    assert_eq!(&inode.file.writes[2..], &[(PAGE, 3072), (PAGE + 3072, 1024)]);
    assert_eq!(inode.file.data[0], 1);
    assert_eq!(inode.file.data[PAGE], 2);
    drop(inode);
    assert_eq!(file.refcnt(), 1);
    assert_eq!(fx.frames.0.live(), 0);
    file.close().unwrap();
}

#[test]
fn test_trim_from_end_only_shrinks_end() {
    let mut fx = fixture();
    let (mem, file) = fx.open(pattern(2 * PAGE, 5), RW);
    let addr = fx
        .space
        .mmap(2 * PAGE, prot_rw(), MapFlags::SHARED, &file, 0)
        .unwrap();
    fx.space.handle_fault(addr).unwrap();
    fx.space.handle_fault(addr + PAGE).unwrap();

    fx.space.munmap(addr + PAGE, PAGE).unwrap();
    assert_eq!(
        mem.lock().file.writes,
        vec![(PAGE, 3072), (PAGE + 3072, 1024)]
    );
    let vma = fx.space.region(addr).unwrap();
    assert_eq!((vma.start(), vma.end(), vma.offset()), (addr, addr + PAGE, 0));
    assert!(fx.pte(addr).is_some());
    assert!(fx.pte(addr + PAGE).is_none());
    assert_eq!(file.refcnt(), 2);

    let err = fx.space.handle_fault(addr + PAGE).unwrap_err();
    assert_eq!(err, MmError::NoRegion { addr: addr + PAGE });

    fx.space.unmap_all().unwrap();
    assert_eq!(file.refcnt(), 1);
    file.close().unwrap();
}

#[test]
fn test_fault_without_region_is_fatal() {
    let mut fx = fixture();
    let err = fx.space.handle_fault(0x1000).unwrap_err();
    assert_eq!(err, MmError::NoRegion { addr: 0x1000 });
    assert!(err.is_fatal());
    assert_eq!(err.to_errno(), None);
}

#[test]
fn test_permission_matrix() {
    let mut fx = fixture();
    let (ro_mem, ro) = fx.open(pattern(PAGE, 6), OpenMode::READ);
    let (_, wo) = fx.open(pattern(PAGE, 7), OpenMode::WRITE);
    let (rw_mem, rw) = fx.open(pattern(PAGE, 8), RW);

    // 私有映射可写，即使文件只读
    let a = fx
        .space
        .mmap(PAGE, prot_rw(), MapFlags::PRIVATE, &ro, 0)
        .unwrap();
    fx.space.handle_fault(a).unwrap();
    assert_eq!(
        fx.pte(a).unwrap().1,
        PteFlags::R | PteFlags::W | PteFlags::U | PteFlags::V
    );
    fx.page_mut(a)[0] ^= 0xFF;

    // 共享可写映射要求文件可写
    let err = fx
        .space
        .mmap(PAGE, prot_rw(), MapFlags::SHARED, &ro, 0)
        .unwrap_err();
    assert_eq!(err, MmError::Fs(FsError::PermissionDenied));
    assert!(!err.is_fatal());
    assert_eq!(err.to_errno(), Some(-13));

    // 只写文件不能映射为可读
    let err = fx
        .space
        .mmap(PAGE, ProtFlags::READ, MapFlags::SHARED, &wo, 0)
        .unwrap_err();
    assert_eq!(err, MmError::Fs(FsError::PermissionDenied));
    let b = fx
        .space
        .mmap(PAGE, ProtFlags::WRITE, MapFlags::SHARED, &wo, 0)
        .unwrap();
    fx.space.handle_fault(b).unwrap();
    assert_eq!(fx.pte(b).unwrap().1, PteFlags::W | PteFlags::U | PteFlags::V);

    // 没有 PROT_WRITE 的共享映射只读
    let c = fx
        .space
        .mmap(PAGE, ProtFlags::READ, MapFlags::SHARED, &rw, 0)
        .unwrap();
    fx.space.handle_fault(c).unwrap();
    assert_eq!(fx.pte(c).unwrap().1, PteFlags::R | PteFlags::U | PteFlags::V);

    fx.space.unmap_all().unwrap();
    assert!(ro_mem.lock().file.writes.is_empty());
    assert!(rw_mem.lock().file.writes.is_empty());
    assert_eq!(ro_mem.lock().file.data, pattern(PAGE, 6));
    for f in [ro, wo, rw] {
        assert_eq!(f.refcnt(), 1);
        f.close().unwrap();
    }
}

#[test]
fn test_mmap_rejects_bad_arguments() {
    let mut fx = fixture();
    let (_, file) = fx.open(pattern(PAGE, 9), RW);

    let cases = [
        (0, MapFlags::SHARED, 0),
        (PAGE, MapFlags::SHARED, 100),
        (PAGE, MapFlags::SHARED | MapFlags::PRIVATE, 0),
        (PAGE, MapFlags::empty(), 0),
    ];
    for (len, flags, offset) in cases {
        let err = fx
            .space
            .mmap(len, ProtFlags::READ, flags, &file, offset)
            .unwrap_err();
        assert_eq!(err, MmError::InvalidArgument);
    }
    assert_eq!(fx.space.regions().count(), 0);
    assert_eq!(file.refcnt(), 1);
    file.close().unwrap();
}

#[test]
fn test_munmap_rejects_holes_and_strays() {
    let mut fx = fixture();
    let (_, file) = fx.open(pattern(3 * PAGE, 10), RW);
    let addr = fx
        .space
        .mmap(3 * PAGE, ProtFlags::READ, MapFlags::SHARED, &file, 0)
        .unwrap();

    assert_eq!(fx.space.munmap(addr + PAGE, PAGE), Err(MmError::InvalidArgument));
    assert_eq!(fx.space.munmap(addr + 1, PAGE), Err(MmError::InvalidArgument));
    assert_eq!(fx.space.munmap(addr, 4 * PAGE), Err(MmError::InvalidArgument));
    assert_eq!(fx.space.munmap(addr, 0), Err(MmError::InvalidArgument));
    assert_eq!(fx.space.munmap(PAGE, PAGE), Err(MmError::InvalidArgument));
    assert_eq!(fx.space.region(addr).unwrap().len(), 3 * PAGE);

    // 不足一页的长度向上取整
    fx.space.munmap(addr, 1).unwrap();
    assert_eq!(fx.space.region(addr + PAGE).unwrap().start(), addr + PAGE);
    fx.space.unmap_all().unwrap();
    file.close().unwrap();
}

#[test]
fn test_regions_are_placed_top_down_without_overlap() {
    let mut fx = fixture();
    let (_, file) = fx.open(pattern(PAGE, 11), OpenMode::READ);
    let map = |fx: &mut common::Fixture, len| {
        fx.space
            .mmap(len, ProtFlags::READ, MapFlags::PRIVATE, &file, 0)
            .unwrap()
    };

    let a = map(&mut fx, PAGE);
    let b = map(&mut fx, 2 * PAGE);
    let c = map(&mut fx, PAGE);
    assert_eq!(a, MMAP_TOP - PAGE);
    assert_eq!(b, a - 2 * PAGE);
    assert_eq!(c, b - PAGE);

    fx.space.munmap(b, 2 * PAGE).unwrap();
    let d = map(&mut fx, PAGE);
    let e = map(&mut fx, PAGE);
    assert_eq!(d, a - PAGE);
    assert_eq!(e, a - 2 * PAGE);

    let mut spans: Vec<_> = fx.space.regions().map(|v| (v.start(), v.end())).collect();
    spans.sort();
    for pair in spans.windows(2) {
        assert!(pair[0].1 <= pair[1].0);
    }
    fx.space.unmap_all().unwrap();
    file.close().unwrap();
}

#[test]
fn test_slots_run_out() {
    let mut fx = fixture();
    let (_, file) = fx.open(pattern(PAGE, 12), OpenMode::READ);
    for _ in 0..NVMA {
        fx.space
            .mmap(PAGE, ProtFlags::READ, MapFlags::PRIVATE, &file, 0)
            .unwrap();
    }
    let err = fx
        .space
        .mmap(PAGE, ProtFlags::READ, MapFlags::PRIVATE, &file, 0)
        .unwrap_err();
    assert_eq!(err, MmError::NoSpace);
    assert_eq!(file.refcnt(), NVMA + 1);

    fx.space.unmap_all().unwrap();
    assert_eq!(fx.space.regions().count(), 0);
    assert_eq!(file.refcnt(), 1);
    file.close().unwrap();
}

#[test]
fn test_fault_reads_at_region_offset_and_zero_fills() {
    let mut fx = fixture();
    let data = pattern(2 * PAGE + 100, 13);
    let (_, file) = fx.open(data.clone(), OpenMode::READ);

    let addr = fx
        .space
        .mmap(2 * PAGE, ProtFlags::READ, MapFlags::PRIVATE, &file, PAGE)
        .unwrap();
    fx.space.handle_fault(addr).unwrap();
    assert_eq!(&fx.page_mut(addr)[..], &data[PAGE..2 * PAGE]);

    // 第二页只有 100 字节落在文件内
    fx.space.handle_fault(addr + PAGE).unwrap();
    let page = fx.page_mut(addr + PAGE);
    assert_eq!(&page[..100], &data[2 * PAGE..]);
    assert!(page[100..].iter().all(|&b| b == 0));

    fx.space.unmap_all().unwrap();
    file.close().unwrap();
}

#[test]
fn test_fork_duplicates_regions_not_pages() {
    let mut fx = fixture();
    let data = pattern(2 * PAGE, 14);
    let (_, file) = fx.open(data.clone(), RW);
    let addr = fx
        .space
        .mmap(2 * PAGE, prot_rw(), MapFlags::SHARED, &file, 0)
        .unwrap();
    fx.space.handle_fault(addr).unwrap();

    let mut child = fx.space.fork(MockPageTable::default()).unwrap();
    assert_eq!(file.refcnt(), 3);
    let vma = child.region(addr).unwrap();
    assert_eq!((vma.start(), vma.end()), (addr, addr + 2 * PAGE));
    assert!(child.page_table().entries.is_empty());

    child.handle_fault(addr + PAGE).unwrap();
    assert_eq!(fx.frames.0.live(), 2);

    child.unmap_all().unwrap();
    assert_eq!(file.refcnt(), 2);
    fx.space.unmap_all().unwrap();
    assert_eq!(file.refcnt(), 1);
    assert_eq!(fx.frames.0.live(), 0);
    file.close().unwrap();
}

#[test]
fn test_short_write_back_is_fatal() {
    let mut fx = fixture();
    let (mem, file) = fx.open(pattern(PAGE, 15), RW);
    let addr = fx
        .space
        .mmap(PAGE, prot_rw(), MapFlags::SHARED, &file, 0)
        .unwrap();
    fx.space.handle_fault(addr).unwrap();

    let fail = mem.lock().fail_writes.clone();
    fail.store(true, Ordering::SeqCst);
    let err = fx.space.munmap(addr, PAGE).unwrap_err();
    assert_eq!(err, MmError::ShortWriteBack { addr });
    assert!(err.is_fatal());
    // 失败时区域和页都保持原样
    assert!(fx.space.covers(addr));
    assert!(fx.pte(addr).is_some());

    fail.store(false, Ordering::SeqCst);
    fx.space.munmap(addr, PAGE).unwrap();
    assert_eq!(file.refcnt(), 1);
    file.close().unwrap();
}

#[test]
fn test_out_of_frames_is_fatal() {
    common::init();
    let frames = Arc::new(TestFrames(MockFrames::with_limit(1)));
    let mut space = MmapSpace::new(MockPageTable::default(), frames.clone());
    let table = vfs::FileTable::new(2);
    let mem = Arc::new(sync::SleepLock::new(common::MemInode {
        file: test_support::mock::MemFile::new(pattern(2 * PAGE, 16)),
        fail_writes: Default::default(),
        fail_reads: Default::default(),
    }));
    let file = table.alloc(vfs::File::inode(mem, OpenMode::READ)).unwrap();

    let addr = space
        .mmap(2 * PAGE, ProtFlags::READ, MapFlags::PRIVATE, &file, 0)
        .unwrap();
    space.handle_fault(addr).unwrap();
    let err = space.handle_fault(addr + PAGE).unwrap_err();
    assert_eq!(err, MmError::OutOfFrames);
    assert!(err.is_fatal());

    space.unmap_all().unwrap();
    assert_eq!(frames.0.live(), 0);
    file.close().unwrap();
}

#[test]
fn test_failed_fault_read_installs_nothing() {
    let mut fx = fixture();
    let (mem, file) = fx.open(vec![0xAB; PAGE], RW);
    let addr = fx
        .space
        .mmap(PAGE, prot_rw(), MapFlags::SHARED, &file, 0)
        .unwrap();

    let fail = mem.lock().fail_reads.clone();
    fail.store(true, Ordering::SeqCst);
    let err = fx.space.handle_fault(addr).unwrap_err();
    assert_eq!(err, MmError::Fs(FsError::IoError));
    assert!(fx.pte(addr).is_none());
    assert_eq!(fx.frames.0.live(), 0);

    // 没有驻留页，解除映射不会写回任何东西
    fx.space.munmap(addr, PAGE).unwrap();
    assert!(mem.lock().file.writes.is_empty());
    assert!(mem.lock().file.data.iter().all(|&b| b == 0xAB));

    // 读恢复后重新缺页能拿到文件内容
    fail.store(false, Ordering::SeqCst);
    let addr = fx
        .space
        .mmap(PAGE, prot_rw(), MapFlags::SHARED, &file, 0)
        .unwrap();
    fx.space.handle_fault(addr).unwrap();
    assert!(fx.page_mut(addr).iter().all(|&b| b == 0xAB));
    fx.space.unmap_all().unwrap();
    assert_eq!(&mem.lock().file.data[..], &[0xAB; PAGE][..]);
    file.close().unwrap();
}

#[test]
fn test_dropping_space_with_regions_warns() {
    test_support::mock::init_logger();
    let mut fx = fixture();
    let (_, file) = fx.open(pattern(PAGE, 17), OpenMode::READ);
    fx.space
        .mmap(PAGE, ProtFlags::READ, MapFlags::PRIVATE, &file, 0)
        .unwrap();
    fx.space
        .mmap(PAGE, ProtFlags::READ, MapFlags::PRIVATE, &file, 0)
        .unwrap();
    assert_eq!(file.refcnt(), 3);

    let Fixture { space, .. } = fx;
    drop(space);
    let warned = MOCK_LOGGER.take_matching("space dropped with 2 mapped regions");
    assert!(!warned.is_empty());
    assert!(warned.iter().all(|r| r.starts_with("WARN")));
    // 区域持有的引用没有被释放
    assert_eq!(file.refcnt(), 3);
    file.close().unwrap();
}
