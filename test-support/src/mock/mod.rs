//! Mock 实现模块

pub mod arch;
pub mod fs;
pub mod logger;
pub mod mm;
pub mod sched;

pub use arch::{MockArchOps, MOCK_ARCH_OPS};
pub use fs::{MemFile, MockLog, MOCK_LOG};
pub use logger::{init_logger, MockLogger, MOCK_LOGGER};
pub use mm::{MockFrames, MOCK_PAGE_SIZE};
pub use sched::{MockSchedOps, MOCK_SCHED_OPS};
