//! Heartbeat Agent - 周期性心跳上报代理
//!
//! 这是一个用Rust编写的心跳上报工具，支持：
//! - 按固定间隔向监控端发送 HTTP GET 心跳
//! - 可选的本地前置检测，检测通过才上报
//! - 单次请求超时与传输错误分类
//! - 结构化日志记录

pub mod cli;
pub mod config;
pub mod error;
pub mod heartbeat;
pub mod logging;


// 重新导出主要类型
pub use config::HeartbeatConfig;
pub use error::{HeartbeatError, Result};
pub use heartbeat::{CheckOutcome, CycleReport, HeartbeatScheduler, HttpProbe, Probe};

/// 应用程序版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 应用程序名称
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// 应用程序描述
pub const APP_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
