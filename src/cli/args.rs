//! 命令行参数定义
//!
//! 使用clap定义应用程序的命令行接口，每个选项都可以通过环境变量提供

use crate::config::{get_default_config_path, ConfigOverrides, LogFormat};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// 按存在与否开启调试日志的环境变量
pub const VERBOSE_ENV: &str = "VERBOSE";

/// Heartbeat Agent - 周期性心跳上报代理
#[derive(Parser, Debug, Clone)]
#[command(
    name = "heartbeat-agent",
    version = crate::VERSION,
    about = crate::APP_DESCRIPTION,
    long_about = None
)]
pub struct Args {
    /// 配置文件路径
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "配置文件路径",
        env = "HEARTBEAT_CONFIG"
    )]
    pub config: Option<PathBuf>,

    /// 心跳上报地址
    #[arg(
        long,
        value_name = "URL",
        help = "心跳上报地址",
        env = "HEARTBEAT_URL"
    )]
    pub heartbeat_url: Option<String>,

    /// 前置检测地址
    #[arg(
        long,
        value_name = "URL",
        help = "前置检测地址，返回200时才上报心跳",
        env = "TEST_URL"
    )]
    pub test_url: Option<String>,

    /// 检测间隔（秒）
    #[arg(
        short,
        long,
        value_name = "SECONDS",
        help = "检测间隔（秒），默认30",
        env = "INTERVAL"
    )]
    pub interval: Option<u64>,

    /// 单次请求超时（秒）
    #[arg(
        short,
        long,
        value_name = "SECONDS",
        help = "单次请求超时（秒），必须小于检测间隔",
        env = "REQUEST_TIMEOUT"
    )]
    pub timeout: Option<u64>,

    /// 是否启用详细输出
    ///
    /// 环境变量 `VERBOSE` 只看是否存在，不解析取值，见 [`Args::verbose_requested`]。
    #[arg(
        short,
        long,
        action = ArgAction::SetTrue,
        help = "输出调试日志（设置环境变量 VERBOSE 为任意值同样生效）"
    )]
    pub verbose: bool,

    /// 日志输出格式
    #[arg(
        long,
        value_enum,
        value_name = "FORMAT",
        help = "日志输出格式",
        env = "HEARTBEAT_LOG_FORMAT"
    )]
    pub log_format: Option<LogFormat>,

    /// 子命令，缺省为 run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// 子命令定义
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// 启动心跳循环
    Run,

    /// 立即执行一轮心跳后退出
    Once {
        /// 输出格式
        #[arg(short, long, value_enum, default_value = "text", help = "输出格式")]
        format: OutputFormat,
    },

    /// 验证配置并输出最终生效的配置
    Validate,

    /// 显示版本信息
    Version {
        /// 输出格式
        #[arg(short, long, value_enum, default_value = "text", help = "输出格式")]
        format: OutputFormat,
    },
}

/// 输出格式枚举
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum OutputFormat {
    /// 文本格式
    Text,
    /// JSON格式
    Json,
}

impl Args {
    /// 实际要执行的子命令
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Run)
    }

    /// 获取配置文件路径
    ///
    /// 未显式指定时查找默认位置，默认位置也不存在则不使用配置文件。
    pub fn get_config_path(&self) -> Option<PathBuf> {
        self.config.clone().or_else(get_default_config_path)
    }

    /// 是否请求调试日志
    ///
    /// 命令行给出 `-v`，或环境变量 `VERBOSE` 已定义（包括空值、`0`、`false`）。
    pub fn verbose_requested(&self) -> bool {
        self.verbose || std::env::var_os(VERBOSE_ENV).is_some()
    }

    /// 命令行与环境变量提供的覆盖项
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            heartbeat_url: self.heartbeat_url.clone(),
            test_url: self.test_url.clone(),
            interval_seconds: self.interval,
            request_timeout_seconds: self.timeout,
            verbose: self.verbose_requested(),
            log_format: self.log_format,
        }
    }
}
