//! 配置管理模块
//!
//! 提供配置文件解析、环境变量覆盖与验证功能

pub mod loader;
pub mod types;

// 重新导出主要类型
pub use loader::{get_default_config_path, resolve_config, ConfigLoader, TomlConfigLoader};
pub use types::{
    validate_config, ConfigOverrides, HeartbeatConfig, LogFormat, MAX_INTERVAL_SECONDS,
};
