//! 配置数据结构定义
//!
//! 定义应用程序的配置结构体和验证逻辑

use crate::error::ConfigError;
use crate::heartbeat::HeartbeatTargets;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 未显式配置请求超时时使用的上限
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// 检测间隔上限（一年），更大的值在计算下一次执行时间时会溢出
pub const MAX_INTERVAL_SECONDS: u64 = 365 * 24 * 60 * 60;

/// 心跳代理配置
///
/// 启动时构建一次，之后以值的形式交给调度器，运行期间不再读取环境变量。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HeartbeatConfig {
    /// 心跳上报地址（必填）
    #[serde(default)]
    pub heartbeat_url: String,
    /// 前置检测地址，返回200时才上报心跳
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_url: Option<String>,
    /// 检测间隔（秒）
    #[serde(default = "default_interval")]
    pub interval_seconds: u64,
    /// 单次请求超时（秒），未配置时按间隔推导
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_seconds: Option<u64>,
    /// 是否输出调试日志
    #[serde(default)]
    pub verbose: bool,
    /// 日志输出格式
    #[serde(default)]
    pub log_format: LogFormat,
}

/// 日志输出格式
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// 人类可读文本
    #[default]
    Text,
    /// 每行一个JSON对象
    Json,
}

/// 来自命令行或环境变量的覆盖项，优先级高于配置文件
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub heartbeat_url: Option<String>,
    pub test_url: Option<String>,
    pub interval_seconds: Option<u64>,
    pub request_timeout_seconds: Option<u64>,
    pub verbose: bool,
    pub log_format: Option<LogFormat>,
}

fn default_interval() -> u64 {
    30
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            heartbeat_url: String::new(),
            test_url: None,
            interval_seconds: default_interval(),
            request_timeout_seconds: None,
            verbose: false,
            log_format: LogFormat::default(),
        }
    }
}

impl HeartbeatConfig {
    /// 应用覆盖项
    ///
    /// 只有显式给出的字段会覆盖原值；`verbose` 只能被打开，不能被关闭。
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(url) = overrides.heartbeat_url {
            self.heartbeat_url = url;
        }
        if let Some(url) = overrides.test_url {
            self.test_url = Some(url);
        }
        if let Some(interval) = overrides.interval_seconds {
            self.interval_seconds = interval;
        }
        if let Some(timeout) = overrides.request_timeout_seconds {
            self.request_timeout_seconds = Some(timeout);
        }
        if let Some(format) = overrides.log_format {
            self.log_format = format;
        }
        self.verbose |= overrides.verbose;
        self
    }

    /// 检测间隔
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    /// 单次请求超时
    ///
    /// 未显式配置时取 5 秒与间隔一半中的较小值，保证始终小于间隔。
    pub fn request_timeout(&self) -> Duration {
        match self.request_timeout_seconds {
            Some(secs) => Duration::from_secs(secs),
            None => DEFAULT_REQUEST_TIMEOUT.min(self.interval() / 2),
        }
    }

    /// 调度器需要的目标地址
    pub fn targets(&self) -> HeartbeatTargets {
        HeartbeatTargets {
            heartbeat_url: self.heartbeat_url.clone(),
            test_url: self.test_url.clone(),
        }
    }
}

/// 配置验证函数
///
/// # 参数
/// * `config` - 要验证的配置
///
/// # 返回
/// * `Result<(), ConfigError>` - 验证结果
pub fn validate_config(config: &HeartbeatConfig) -> Result<(), ConfigError> {
    if config.heartbeat_url.trim().is_empty() {
        return Err(ConfigError::MissingHeartbeatUrl);
    }
    validate_url("HEARTBEAT_URL", &config.heartbeat_url)?;

    if let Some(ref test_url) = config.test_url {
        // 已设置但为空时不能退化为无条件上报
        if test_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "TEST_URL 已设置但为空，如不需要前置检测请移除该配置".to_string(),
            ));
        }
        validate_url("TEST_URL", test_url)?;
    }

    if config.interval_seconds == 0 {
        return Err(ConfigError::ValidationError("检测间隔不能为0".to_string()));
    }
    if config.interval_seconds > MAX_INTERVAL_SECONDS {
        return Err(ConfigError::ValidationError(format!(
            "检测间隔({}秒)不能超过{MAX_INTERVAL_SECONDS}秒",
            config.interval_seconds
        )));
    }

    if let Some(timeout) = config.request_timeout_seconds {
        if timeout == 0 {
            return Err(ConfigError::ValidationError(
                "请求超时时间不能为0".to_string(),
            ));
        }
        if timeout >= config.interval_seconds {
            return Err(ConfigError::ValidationError(format!(
                "请求超时时间({timeout}秒)必须小于检测间隔({}秒)",
                config.interval_seconds
            )));
        }
    }

    Ok(())
}

fn validate_url(name: &str, url: &str) -> Result<(), ConfigError> {
    let parsed = Url::parse(url)
        .map_err(|e| ConfigError::ValidationError(format!("{name} 格式无效: {url} ({e})")))?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(ConfigError::ValidationError(format!(
            "{name} 仅支持 http/https 协议，实际为: {scheme}"
        ))),
    }
}
