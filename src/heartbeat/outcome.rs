//! 单次检测结果
//!
//! 定义 GET 请求的分类结果、传输错误类型，以及结果到日志级别的映射

use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use thiserror::Error;
use tracing::Level;

/// 一轮心跳中的步骤
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    /// 前置检测（TEST_URL）
    Precondition,
    /// 心跳上报（HEARTBEAT_URL）
    Report,
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Step::Precondition => write!(f, "前置检测"),
            Step::Report => write!(f, "心跳上报"),
        }
    }
}

/// 传输错误分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportErrorKind {
    /// 请求超时
    Timeout,
    /// 连接失败
    Connect,
    /// DNS解析失败
    Dns,
    /// TLS/证书错误
    Tls,
    /// 其他错误
    Other,
}

impl std::fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportErrorKind::Timeout => write!(f, "Request timeout"),
            TransportErrorKind::Connect => write!(f, "Connection failed"),
            TransportErrorKind::Dns => write!(f, "DNS resolution failed"),
            TransportErrorKind::Tls => write!(f, "SSL/TLS certificate error"),
            TransportErrorKind::Other => write!(f, "Request failed"),
        }
    }
}

/// 未收到响应时的传输层错误
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{kind}: {message}")]
pub struct TransportError {
    /// 错误分类
    pub kind: TransportErrorKind,
    /// 完整错误链文本
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// 从 reqwest 错误归类
    pub fn from_reqwest(error: &reqwest::Error) -> Self {
        let message = error_chain(error);
        let lowered = message.to_lowercase();

        let kind = if error.is_timeout() {
            TransportErrorKind::Timeout
        } else if lowered.contains("dns") || lowered.contains("failed to lookup address") {
            TransportErrorKind::Dns
        } else if lowered.contains("certificate")
            || lowered.contains("tls")
            || lowered.contains("ssl")
        {
            TransportErrorKind::Tls
        } else if error.is_connect() {
            TransportErrorKind::Connect
        } else {
            TransportErrorKind::Other
        };

        Self { kind, message }
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == TransportErrorKind::Timeout
    }
}

/// reqwest 的顶层错误信息不含底层原因，拼接整条 source 链
fn error_chain(error: &dyn StdError) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// 一次 GET 请求的分类结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CheckOutcome {
    /// 返回200
    Success,
    /// 收到响应但状态码不是200
    NonOkStatus { status: u16 },
    /// 未收到响应
    TransportError(TransportError),
}

impl CheckOutcome {
    /// 按状态码分类，只有200视为成功
    pub fn from_status(status: u16) -> Self {
        if status == 200 {
            CheckOutcome::Success
        } else {
            CheckOutcome::NonOkStatus { status }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CheckOutcome::Success)
    }

    /// 收到响应时的状态码
    pub fn status_code(&self) -> Option<u16> {
        match self {
            CheckOutcome::Success => Some(200),
            CheckOutcome::NonOkStatus { status } => Some(*status),
            CheckOutcome::TransportError(_) => None,
        }
    }
}

impl std::fmt::Display for CheckOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckOutcome::Success => write!(f, "HTTP 200 OK"),
            CheckOutcome::NonOkStatus { status } => write!(
                f,
                "HTTP {} {}",
                status,
                reqwest::StatusCode::from_u16(*status)
                    .ok()
                    .and_then(|s| s.canonical_reason())
                    .unwrap_or("Unknown")
            ),
            CheckOutcome::TransportError(e) => write!(f, "{e}"),
        }
    }
}

/// 结果对应的日志级别
///
/// | 结果 | 前置检测 | 心跳上报 |
/// |---|---|---|
/// | Success | DEBUG | INFO |
/// | NonOkStatus | DEBUG | WARN |
/// | TransportError | WARN | WARN |
pub fn log_level(step: Step, outcome: &CheckOutcome) -> Level {
    match (step, outcome) {
        (Step::Report, CheckOutcome::Success) => Level::INFO,
        (Step::Precondition, CheckOutcome::Success) => Level::DEBUG,
        (Step::Report, CheckOutcome::NonOkStatus { .. }) => Level::WARN,
        (Step::Precondition, CheckOutcome::NonOkStatus { .. }) => Level::DEBUG,
        (_, CheckOutcome::TransportError(_)) => Level::WARN,
    }
}

/// 以运行时给出的级别记录事件，tracing 的宏要求级别为常量
macro_rules! event_at {
    ($level:expr, $($arg:tt)+) => {{
        let level = $level;
        if level == Level::ERROR {
            tracing::error!($($arg)+)
        } else if level == Level::WARN {
            tracing::warn!($($arg)+)
        } else if level == Level::INFO {
            tracing::info!($($arg)+)
        } else if level == Level::DEBUG {
            tracing::debug!($($arg)+)
        } else {
            tracing::trace!($($arg)+)
        }
    }};
}

/// 按映射表记录一次检测结果
///
/// 级别取自 [`log_level`]；收到响应时带 `status` 字段，传输错误带 `kind` 和 `error` 字段。
pub fn log_outcome(step: Step, url: &str, outcome: &CheckOutcome) {
    let level = log_level(step, outcome);
    let message = match (step, outcome) {
        (Step::Report, CheckOutcome::Success) => "心跳已发送",
        (Step::Precondition, CheckOutcome::Success) => "前置检测返回200，继续本轮心跳",
        (Step::Report, CheckOutcome::NonOkStatus { .. }) => "心跳地址未返回200",
        (Step::Precondition, CheckOutcome::NonOkStatus { .. }) => "前置检测未返回200，跳过本轮心跳",
        (_, CheckOutcome::TransportError(_)) => "请求出错，跳过本轮心跳",
    };

    match outcome {
        CheckOutcome::TransportError(e) => event_at!(
            level,
            url,
            %step,
            kind = ?e.kind,
            error = %e.message,
            "{}",
            message
        ),
        CheckOutcome::Success | CheckOutcome::NonOkStatus { .. } => {
            let status = outcome.status_code().unwrap_or_default();
            event_at!(level, url, status, "{}", message)
        }
    }
}
