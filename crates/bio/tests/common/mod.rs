#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;

use bio::{BioConfig, BufCache};
use device::{BlockDriver, RamDisk};

pub const BLOCK: usize = 512;

/// 每个块的前 8 字节是它自己的块号
pub fn disk_with_tags(nblocks: usize) -> Arc<RamDisk> {
    let mut data = vec![0u8; nblocks * BLOCK];
    for b in 0..nblocks {
        data[b * BLOCK..b * BLOCK + 8].copy_from_slice(&(b as u64).to_le_bytes());
    }
    RamDisk::from_bytes(data, BLOCK)
}

pub fn cache_with_disk(nbuf: usize, nshards: usize, nblocks: usize) -> (BufCache, Arc<RamDisk>) {
    test_support::init_sync();
    let disk = disk_with_tags(nblocks);
    let config = BioConfig {
        nbuf,
        nshards,
        block_size: BLOCK,
    };
    let cache = BufCache::new(config, vec![disk.clone() as Arc<dyn BlockDriver>]).unwrap();
    (cache, disk)
}

pub fn tag(buf: &[u8]) -> u64 {
    u64::from_le_bytes(buf[..8].try_into().unwrap())
}

/// 静止状态下的结构不变量
pub fn check_invariants(cache: &BufCache) {
    let states = cache.snapshot();
    assert_eq!(states.len(), cache.nbuf(), "a buffer left every shard");

    let mut seen = HashSet::new();
    for s in &states {
        assert!(seen.insert(s.idx), "buffer {} linked twice", s.idx);
        if let Some((_, blockno)) = s.key {
            assert_eq!(s.shard, cache.shard_of(blockno), "block {} in wrong shard", blockno);
        }
    }

    let mut live = HashSet::new();
    for s in states.iter().filter(|s| s.refcnt > 0) {
        assert!(live.insert(s.key), "two referenced buffers hold {:?}", s.key);
    }
}
