//! 捕获 `log` 输出的 Mock 日志器

use std::sync::{Mutex, Once};

use log::{LevelFilter, Log, Metadata, Record};

/// 把每条日志记录为 `"LEVEL message"` 的日志器
pub struct MockLogger {
    records: Mutex<Vec<String>>,
}

impl MockLogger {
    pub const fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
        }
    }

    /// 取出包含 `needle` 的记录，其余记录保留
    ///
    /// 同一测试二进制里的测试并行运行，按各自独有的内容过滤。
    pub fn take_matching(&self, needle: &str) -> Vec<String> {
        let mut records = self.records.lock().unwrap();
        let (hit, rest): (Vec<String>, Vec<String>) =
            records.drain(..).partition(|r| r.contains(needle));
        *records = rest;
        hit
    }
}

impl Log for MockLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        self.records
            .lock()
            .unwrap()
            .push(format!("{} {}", record.level(), record.args()));
    }

    fn flush(&self) {}
}

/// 全局 Mock 实例
pub static MOCK_LOGGER: MockLogger = MockLogger::new();

static INIT_LOGGER: Once = Once::new();

/// 把 [`MOCK_LOGGER`] 设为全局日志器，可重复调用
pub fn init_logger() {
    INIT_LOGGER.call_once(|| {
        // 其它日志器已经设置时保持原样
        if log::set_logger(&MOCK_LOGGER).is_ok() {
            log::set_max_level(LevelFilter::Trace);
        }
    });
}
