//! 心跳模块
//!
//! 提供 GET-并-分类 探测、结果到日志的映射以及心跳调度循环

pub mod outcome;
pub mod probe;
pub mod scheduler;

// 重新导出主要类型
pub use outcome::{log_level, CheckOutcome, Step, TransportError, TransportErrorKind};
pub use probe::{HttpProbe, Probe};
pub use scheduler::{CycleReport, HeartbeatScheduler, HeartbeatTargets};
