//! HTTP 探测器实现
//!
//! 发送单次 GET 请求，读尽并释放响应体，再把结果归类为 [`CheckOutcome`]

use crate::error::Result;
use crate::heartbeat::outcome::{CheckOutcome, TransportError};
use async_trait::async_trait;
use reqwest::{Client, Response};
use std::time::{Duration, Instant};
use tracing::debug;

/// 探测器trait，定义单次 GET-并-分类 接口
///
/// 普通网络失败都体现在返回的 [`CheckOutcome`] 中，不返回错误也不 panic。
#[async_trait]
pub trait Probe: Send + Sync {
    /// 对 `url` 发送一次 GET 请求并归类结果
    async fn probe(&self, url: &str) -> CheckOutcome;
}

/// 基于 reqwest 的探测器
///
/// 内部的 [`Client`] 在各轮之间复用连接池。
#[derive(Debug, Clone)]
pub struct HttpProbe {
    /// HTTP客户端
    client: Client,
    /// 单次请求超时
    timeout: Duration,
}

impl HttpProbe {
    /// 创建新的HTTP探测器
    ///
    /// # 参数
    /// * `timeout` - 单次请求超时，覆盖连接、发送与读取响应体的全过程
    ///
    /// # 返回
    /// * `Result<Self>` - 探测器实例
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(format!("{}/{}", crate::APP_NAME, crate::VERSION))
            .build()?;

        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// 读尽响应体
    ///
    /// 连接只有在响应体读完后才会回到连接池；读取失败时响应被丢弃，连接随之关闭。
    async fn drain(mut response: Response) -> usize {
        let mut drained = 0;
        loop {
            match response.chunk().await {
                Ok(Some(chunk)) => drained += chunk.len(),
                Ok(None) => break,
                Err(e) => {
                    debug!(error = %e, "读取响应体失败，丢弃连接");
                    break;
                }
            }
        }
        drained
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn probe(&self, url: &str) -> CheckOutcome {
        let start_time = Instant::now();

        match self.client.get(url).send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                let body_bytes = Self::drain(response).await;

                debug!(
                    url,
                    status,
                    body_bytes,
                    elapsed_ms = start_time.elapsed().as_millis() as u64,
                    "GET 返回状态码"
                );

                CheckOutcome::from_status(status)
            }
            Err(e) => {
                let error = TransportError::from_reqwest(&e);
                debug!(
                    url,
                    error = %error,
                    elapsed_ms = start_time.elapsed().as_millis() as u64,
                    "GET 请求失败"
                );
                CheckOutcome::TransportError(error)
            }
        }
    }
}
