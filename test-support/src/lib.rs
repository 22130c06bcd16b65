//! 测试支持 crate
//!
//! 为宿主机上的 `cargo test` 提供 Mock 实现：同步原语需要的架构/调度操作、日志事务、内存文件、物理页帧和日志捕获

pub mod mock;

use std::sync::Once;

use mock::{MOCK_ARCH_OPS, MOCK_SCHED_OPS};

static INIT_SYNC: Once = Once::new();

/// 注册 Mock 的 [`sync::ArchOps`] 与 [`sync::SchedOps`]，可重复调用
pub fn init_sync() {
    INIT_SYNC.call_once(|| {
        // Safety: Once 保证只注册一次，且注册完成前其它调用者会阻塞
        unsafe {
            sync::register_arch_ops(&MOCK_ARCH_OPS);
            sync::register_sched_ops(&MOCK_SCHED_OPS);
        }
    });
}
