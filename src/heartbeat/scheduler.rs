//! 心跳调度器模块
//!
//! 按固定间隔驱动心跳循环：可选的前置检测通过后才上报心跳。
//! 各轮之间不共享任何状态，单轮失败不会终止循环。

use crate::config::{HeartbeatConfig, MAX_INTERVAL_SECONDS};
use crate::error::Result;
use crate::heartbeat::outcome::{log_outcome, CheckOutcome, Step};
use crate::heartbeat::probe::{HttpProbe, Probe};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

/// 心跳目标地址
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatTargets {
    /// 心跳上报地址
    pub heartbeat_url: String,
    /// 前置检测地址
    pub test_url: Option<String>,
}

/// 单轮心跳的执行记录
///
/// 只用于日志和一次性命令的输出，不会回传给调度循环。
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    /// 本轮ID
    pub id: Uuid,
    /// 开始时间
    pub started_at: DateTime<Utc>,
    /// 耗时（毫秒）
    pub elapsed_ms: u64,
    /// 前置检测结果，未配置时为空
    pub precondition: Option<CheckOutcome>,
    /// 心跳上报结果，被跳过时为空
    pub report: Option<CheckOutcome>,
}

impl CycleReport {
    /// 本轮是否发起了上报
    pub fn report_attempted(&self) -> bool {
        self.report.is_some()
    }

    /// 本轮心跳是否上报成功
    pub fn heartbeat_sent(&self) -> bool {
        self.report.as_ref().is_some_and(CheckOutcome::is_success)
    }
}

/// 心跳调度器
pub struct HeartbeatScheduler {
    /// 探测器，前置检测与心跳上报共用
    probe: Arc<dyn Probe>,
    /// 目标地址
    targets: HeartbeatTargets,
    /// 检测间隔
    interval: Duration,
}

impl HeartbeatScheduler {
    /// 创建新的心跳调度器
    ///
    /// # 参数
    /// * `probe` - 探测器
    /// * `targets` - 目标地址
    /// * `interval` - 检测间隔，必须大于0，超过 [`MAX_INTERVAL_SECONDS`] 时按上限处理
    pub fn new(probe: Arc<dyn Probe>, targets: HeartbeatTargets, interval: Duration) -> Self {
        Self {
            probe,
            targets,
            interval: interval.min(Duration::from_secs(MAX_INTERVAL_SECONDS)),
        }
    }

    /// 根据已验证的配置创建调度器
    pub fn from_config(config: &HeartbeatConfig) -> Result<Self> {
        let probe = HttpProbe::new(config.request_timeout())?;
        Ok(Self::new(
            Arc::new(probe),
            config.targets(),
            config.interval(),
        ))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn targets(&self) -> &HeartbeatTargets {
        &self.targets
    }

    /// 运行心跳循环，直到收到关闭信号
    ///
    /// 第一轮在启动一个间隔后执行。某一轮耗时超过间隔时，下一轮在其结束后立即开始，
    /// 之后重新按间隔对齐，两轮开始时间的间隔不会小于 `interval`。
    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) {
        info!(
            interval_secs = self.interval.as_secs_f64(),
            heartbeat_url = %self.targets.heartbeat_url,
            test_url = self.targets.test_url.as_deref().unwrap_or("-"),
            "心跳服务已启动"
        );

        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => {
                    info!("收到关闭信号，停止心跳循环");
                    break;
                }
                _ = ticker.tick() => {
                    self.run_cycle().await;
                }
            }
        }
    }

    /// 执行一轮心跳
    pub async fn run_cycle(&self) -> CycleReport {
        let id = Uuid::new_v4();
        let span = info_span!("cycle", %id);

        async move {
            let started_at = Utc::now();
            let start_time = Instant::now();
            debug!("开始本轮心跳");

            let (precondition, report) = match self.targets.test_url.as_deref() {
                Some(test_url) => {
                    let outcome = self.check_precondition(test_url).await;
                    let report = if outcome.is_success() {
                        Some(self.send_heartbeat().await)
                    } else {
                        None
                    };
                    (Some(outcome), report)
                }
                None => {
                    debug!("未配置前置检测地址，直接发送心跳");
                    (None, Some(self.send_heartbeat().await))
                }
            };

            CycleReport {
                id,
                started_at,
                elapsed_ms: start_time.elapsed().as_millis() as u64,
                precondition,
                report,
            }
        }
        .instrument(span)
        .await
    }

    /// 前置检测
    async fn check_precondition(&self, test_url: &str) -> CheckOutcome {
        debug!(url = test_url, "检查前置检测地址");
        let outcome = self.probe.probe(test_url).await;
        log_outcome(Step::Precondition, test_url, &outcome);
        outcome
    }

    /// 心跳上报
    async fn send_heartbeat(&self) -> CheckOutcome {
        let url = self.targets.heartbeat_url.as_str();
        debug!(url, "发送心跳请求");
        let outcome = self.probe.probe(url).await;
        log_outcome(Step::Report, url, &outcome);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heartbeat::outcome::{TransportError, TransportErrorKind};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    const HEARTBEAT_URL: &str = "http://monitor.test/push";
    const TEST_URL: &str = "http://localhost.test/health";

    /// 按URL返回预设结果并记录调用的探测器
    struct ScriptedProbe {
        outcomes: HashMap<String, CheckOutcome>,
        delay: Duration,
        calls: Mutex<Vec<(String, Instant)>>,
    }

    impl ScriptedProbe {
        fn new(outcomes: &[(&str, CheckOutcome)]) -> Self {
            Self {
                outcomes: outcomes
                    .iter()
                    .map(|(url, outcome)| (url.to_string(), outcome.clone()))
                    .collect(),
                delay: Duration::ZERO,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn calls_to(&self, url: &str) -> Vec<Instant> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|(called, _)| called == url)
                .map(|(_, at)| *at)
                .collect()
        }
    }

    #[async_trait]
    impl Probe for ScriptedProbe {
        async fn probe(&self, url: &str) -> CheckOutcome {
            self.calls
                .lock()
                .unwrap()
                .push((url.to_string(), Instant::now()));
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.outcomes
                .get(url)
                .cloned()
                .unwrap_or(CheckOutcome::NonOkStatus { status: 404 })
        }
    }

    fn refused() -> CheckOutcome {
        CheckOutcome::TransportError(TransportError::new(
            TransportErrorKind::Connect,
            "Connection refused",
        ))
    }

    fn scheduler(probe: Arc<ScriptedProbe>, test_url: Option<&str>) -> HeartbeatScheduler {
        HeartbeatScheduler::new(
            probe,
            HeartbeatTargets {
                heartbeat_url: HEARTBEAT_URL.to_string(),
                test_url: test_url.map(str::to_string),
            },
            Duration::from_secs(10),
        )
    }

    #[tokio::test]
    async fn test_precondition_success_sends_heartbeat() {
        let probe = Arc::new(ScriptedProbe::new(&[
            (TEST_URL, CheckOutcome::Success),
            (HEARTBEAT_URL, CheckOutcome::Success),
        ]));
        let report = scheduler(probe.clone(), Some(TEST_URL)).run_cycle().await;

        assert_eq!(report.precondition, Some(CheckOutcome::Success));
        assert!(report.heartbeat_sent());
        assert_eq!(probe.calls_to(HEARTBEAT_URL).len(), 1);

        // 前置检测先于上报
        let calls = probe.calls.lock().unwrap();
        assert_eq!(calls[0].0, TEST_URL);
        assert_eq!(calls[1].0, HEARTBEAT_URL);
    }

    #[tokio::test]
    async fn test_precondition_non_ok_skips_heartbeat() {
        let probe = Arc::new(ScriptedProbe::new(&[
            (TEST_URL, CheckOutcome::NonOkStatus { status: 503 }),
            (HEARTBEAT_URL, CheckOutcome::Success),
        ]));
        let report = scheduler(probe.clone(), Some(TEST_URL)).run_cycle().await;

        assert_eq!(
            report.precondition,
            Some(CheckOutcome::NonOkStatus { status: 503 })
        );
        assert!(!report.report_attempted());
        assert!(probe.calls_to(HEARTBEAT_URL).is_empty());
    }

    #[tokio::test]
    async fn test_precondition_transport_error_skips_heartbeat() {
        let probe = Arc::new(ScriptedProbe::new(&[
            (TEST_URL, refused()),
            (HEARTBEAT_URL, CheckOutcome::Success),
        ]));
        let report = scheduler(probe.clone(), Some(TEST_URL)).run_cycle().await;

        assert!(matches!(
            report.precondition,
            Some(CheckOutcome::TransportError(_))
        ));
        assert!(!report.report_attempted());
        assert!(probe.calls_to(HEARTBEAT_URL).is_empty());
    }

    #[tokio::test]
    async fn test_no_precondition_always_reports() {
        let probe = Arc::new(ScriptedProbe::new(&[(
            HEARTBEAT_URL,
            CheckOutcome::NonOkStatus { status: 500 },
        )]));
        let scheduler = scheduler(probe.clone(), None);

        for _ in 0..3 {
            let report = scheduler.run_cycle().await;
            assert!(report.precondition.is_none());
            assert_eq!(
                report.report,
                Some(CheckOutcome::NonOkStatus { status: 500 })
            );
            assert!(!report.heartbeat_sent());
        }
        assert_eq!(probe.calls_to(HEARTBEAT_URL).len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_ticks_at_interval() {
        let probe = Arc::new(ScriptedProbe::new(&[(HEARTBEAT_URL, CheckOutcome::Success)]));
        let scheduler = Arc::new(scheduler(probe.clone(), None));
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let started = Instant::now();
        let runner = {
            let scheduler = Arc::clone(&scheduler);
            tokio::spawn(async move { scheduler.run(shutdown_rx).await })
        };

        tokio::time::sleep(Duration::from_secs(55)).await;
        shutdown_tx.send(()).unwrap();
        runner.await.unwrap();

        let calls = probe.calls_to(HEARTBEAT_URL);
        assert_eq!(calls.len(), 5);
        // 第一轮在一个间隔之后
        assert!(calls[0] - started >= Duration::from_secs(10));
        for pair in calls.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_secs(10));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_survives_failures() {
        let probe = Arc::new(ScriptedProbe::new(&[
            (TEST_URL, CheckOutcome::Success),
            (HEARTBEAT_URL, refused()),
        ]));
        let scheduler = Arc::new(scheduler(probe.clone(), Some(TEST_URL)));
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let runner = {
            let scheduler = Arc::clone(&scheduler);
            tokio::spawn(async move { scheduler.run(shutdown_rx).await })
        };

        tokio::time::sleep(Duration::from_secs(35)).await;
        assert!(!runner.is_finished());
        shutdown_tx.send(()).unwrap();
        runner.await.unwrap();

        assert_eq!(probe.calls_to(TEST_URL).len(), 3);
        assert_eq!(probe.calls_to(HEARTBEAT_URL).len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_cycles_do_not_burst() {
        let probe = Arc::new(
            ScriptedProbe::new(&[(HEARTBEAT_URL, CheckOutcome::Success)])
                .with_delay(Duration::from_secs(25)),
        );
        let scheduler = Arc::new(scheduler(probe.clone(), None));
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let runner = {
            let scheduler = Arc::clone(&scheduler);
            tokio::spawn(async move { scheduler.run(shutdown_rx).await })
        };

        tokio::time::sleep(Duration::from_secs(120)).await;
        shutdown_tx.send(()).unwrap();
        runner.await.unwrap();

        let calls = probe.calls_to(HEARTBEAT_URL);
        assert!(calls.len() >= 3);
        for pair in calls.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_secs(10));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_interval_is_capped() {
        let probe = Arc::new(ScriptedProbe::new(&[(HEARTBEAT_URL, CheckOutcome::Success)]));
        let scheduler = Arc::new(HeartbeatScheduler::new(
            probe.clone(),
            HeartbeatTargets {
                heartbeat_url: HEARTBEAT_URL.to_string(),
                test_url: None,
            },
            Duration::from_secs(u64::MAX),
        ));
        assert_eq!(
            scheduler.interval(),
            Duration::from_secs(MAX_INTERVAL_SECONDS)
        );

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let runner = {
            let scheduler = Arc::clone(&scheduler);
            tokio::spawn(async move { scheduler.run(shutdown_rx).await })
        };

        tokio::time::sleep(Duration::from_secs(1)).await;
        shutdown_tx.send(()).unwrap();
        runner.await.unwrap();

        assert!(probe.calls_to(HEARTBEAT_URL).is_empty());
    }

    #[test]
    fn test_cycle_report_serialization() {
        let report = CycleReport {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            elapsed_ms: 12,
            precondition: Some(CheckOutcome::NonOkStatus { status: 503 }),
            report: None,
        };

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["precondition"]["status"], 503);
        assert!(json["report"].is_null());
    }
}
