// http.rs — HTTP 抓取层
// 所有网络请求都经过 HttpFetcher trait，方便测试时替换为桩实现

use crate::error::NetworkError;
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;

/// HTTP 客户端参数
#[derive(Debug, Clone)]
pub struct FetchSettings {
    /// 建立连接的超时时间
    pub connect_timeout: Duration,
    /// 整个请求（含读取响应体）的超时时间
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            user_agent: default_user_agent(),
        }
    }
}

pub fn default_user_agent() -> String {
    format!("wallcraft/{}", env!("CARGO_PKG_VERSION"))
}

/// 抓取接口
///
/// 只有状态码恰好为 200 时才返回内容，其余一律视为失败。
/// 每次调用只发出一个请求，不缓存也不重试。
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    async fn fetch_text(&self, url: &str) -> Result<String, NetworkError>;

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, NetworkError>;
}

/// 基于 reqwest 的默认实现
///
/// `reqwest::Client` 内部维护连接池，构造一次后在所有采集之间复用。
/// 重定向使用 reqwest 的默认策略（最多 10 次）。
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new(settings: &FetchSettings) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .user_agent(settings.user_agent.as_str())
            .build()?;
        Ok(Self { client })
    }

    async fn get_ok(&self, url: &str) -> Result<reqwest::Response, NetworkError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| transport(url, &err))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(NetworkError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl HttpFetcher for ReqwestFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, NetworkError> {
        tracing::debug!(%url, "GET text");
        let response = self.get_ok(url).await?;
        response.text().await.map_err(|err| transport(url, &err))
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, NetworkError> {
        tracing::debug!(%url, "GET bytes");
        let response = self.get_ok(url).await?;
        // 响应体被截断时 reqwest 会返回错误，这里不接受部分内容
        let bytes = response.bytes().await.map_err(|err| transport(url, &err))?;
        Ok(bytes.to_vec())
    }
}

fn transport(url: &str, err: &reqwest::Error) -> NetworkError {
    let reason = if err.is_timeout() {
        format!("timed out: {err}")
    } else {
        err.to_string()
    };
    NetworkError::Transport {
        url: url.to_string(),
        reason,
    }
}
