//! Heartbeat Agent 主程序入口
//!
//! 周期性心跳上报代理

use anyhow::{Context, Result};
use clap::Parser;
use heartbeat_agent::cli::{
    load_config, Args, Command, Commands, OnceCommand, RunCommand, ValidateCommand,
    VersionCommand,
};
use heartbeat_agent::config::HeartbeatConfig;
use heartbeat_agent::logging::{LogConfig, LoggingSystem};
use log::LevelFilter;
use tracing::{debug, error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // 解析命令行参数
    let args = Args::parse();

    if let Commands::Version { format } = args.command() {
        return VersionCommand { format }
            .print()
            .context("输出版本信息失败");
    }

    // 加载配置，失败时以非零状态退出
    let config = match load_config(&args).await {
        Ok(config) => config,
        Err(e) => {
            let log_config = LogConfig {
                level: if args.verbose_requested() {
                    LevelFilter::Debug
                } else {
                    LevelFilter::Info
                },
                ..Default::default()
            };
            LoggingSystem::setup_logging(log_config).context("初始化日志系统失败")?;
            error!("{}", e);
            std::process::exit(1);
        }
    };

    // 初始化日志系统
    LoggingSystem::setup_logging(LogConfig::from_heartbeat_config(&config))
        .context("初始化日志系统失败")?;

    info!("Heartbeat Agent v{} 启动", heartbeat_agent::VERSION);
    log_effective_config(&config);

    // 执行命令
    if let Err(e) = execute_command(&args, &config).await {
        error!("命令执行失败: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// 执行CLI命令
async fn execute_command(args: &Args, config: &HeartbeatConfig) -> heartbeat_agent::Result<()> {
    match args.command() {
        Commands::Run => RunCommand.execute(config).await,
        Commands::Once { format } => OnceCommand { format }.execute(config).await,
        Commands::Validate => ValidateCommand.execute(config).await,
        Commands::Version { format } => VersionCommand { format }.print(),
    }
}

fn log_effective_config(config: &HeartbeatConfig) {
    debug!(url = %config.heartbeat_url, "HEARTBEAT_URL 已设置");
    debug!(interval_secs = config.interval_seconds, "INTERVAL 已设置");
    match config.test_url.as_deref() {
        Some(url) => debug!(url, "TEST_URL 已设置"),
        None => debug!("未设置 TEST_URL"),
    }
    debug!(
        timeout_ms = config.request_timeout().as_millis() as u64,
        "请求超时已设置"
    );
}
