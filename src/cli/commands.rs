//! 命令处理逻辑
//!
//! 实现各种CLI命令的处理逻辑

use crate::cli::args::{Args, OutputFormat};
use crate::config::{resolve_config, HeartbeatConfig, TomlConfigLoader};
use crate::error::{HeartbeatError, Result};
use crate::heartbeat::{CycleReport, HeartbeatScheduler};
use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{error, info};

/// 命令处理器trait
#[async_trait]
pub trait Command: Send + Sync {
    /// 执行命令
    ///
    /// # 参数
    /// * `config` - 已验证的配置
    async fn execute(&self, config: &HeartbeatConfig) -> Result<()>;
}

/// 合并命令行、环境变量与配置文件并验证
pub async fn load_config(args: &Args) -> Result<HeartbeatConfig> {
    let loader = TomlConfigLoader::new(true);
    let config_path = args.get_config_path();
    resolve_config(&loader, config_path.as_deref(), args.overrides()).await
}

/// 心跳循环命令
pub struct RunCommand;

#[async_trait]
impl Command for RunCommand {
    async fn execute(&self, config: &HeartbeatConfig) -> Result<()> {
        let scheduler = HeartbeatScheduler::from_config(config)?;

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        tokio::spawn(async move {
            wait_for_shutdown_signal().await;
            let _ = shutdown_tx.send(());
        });

        scheduler.run(shutdown_rx).await;
        info!("心跳服务已停止");
        Ok(())
    }
}

/// 单轮心跳命令
///
/// 心跳未成功发送时返回错误，使进程以非零状态退出。
pub struct OnceCommand {
    pub format: OutputFormat,
}

#[async_trait]
impl Command for OnceCommand {
    async fn execute(&self, config: &HeartbeatConfig) -> Result<()> {
        let scheduler = HeartbeatScheduler::from_config(config)?;
        let report = scheduler.run_cycle().await;

        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
            OutputFormat::Text => print_report(&report),
        }

        if report.heartbeat_sent() {
            Ok(())
        } else {
            Err(HeartbeatError::Other(anyhow::anyhow!("本轮心跳未成功发送")))
        }
    }
}

fn print_report(report: &CycleReport) {
    println!("本轮ID: {}", report.id);
    println!("开始时间: {}", report.started_at.to_rfc3339());
    println!("耗时: {}ms", report.elapsed_ms);
    match &report.precondition {
        Some(outcome) => println!("前置检测: {outcome}"),
        None => println!("前置检测: 未配置"),
    }
    match &report.report {
        Some(outcome) => println!("心跳上报: {outcome}"),
        None => println!("心跳上报: 已跳过"),
    }
}

/// 配置验证命令
pub struct ValidateCommand;

#[async_trait]
impl Command for ValidateCommand {
    async fn execute(&self, config: &HeartbeatConfig) -> Result<()> {
        let rendered = toml::to_string_pretty(config)
            .map_err(|e| HeartbeatError::Other(anyhow::anyhow!("配置序列化失败: {e}")))?;

        println!("✓ 配置验证通过");
        println!();
        print!("{rendered}");
        println!(
            "# 生效的请求超时: {}ms",
            config.request_timeout().as_millis()
        );
        Ok(())
    }
}

/// 版本命令
pub struct VersionCommand {
    pub format: OutputFormat,
}

impl VersionCommand {
    /// 输出版本信息，不需要配置
    pub fn print(&self) -> Result<()> {
        match self.format {
            OutputFormat::Json => {
                let version_info = serde_json::json!({
                    "name": crate::APP_NAME,
                    "version": crate::VERSION,
                    "description": crate::APP_DESCRIPTION
                });
                println!("{}", serde_json::to_string_pretty(&version_info)?);
            }
            OutputFormat::Text => {
                println!("{} v{}", crate::APP_NAME, crate::VERSION);
                println!("{}", crate::APP_DESCRIPTION);
            }
        }
        Ok(())
    }
}

/// 等待 Ctrl+C 或 SIGTERM
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("监听中断信号失败: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!("监听SIGTERM失败: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("收到中断信号，正在停止服务..."),
        _ = terminate => info!("收到终止信号，正在停止服务..."),
    }
}
