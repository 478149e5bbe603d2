//! 静态 HTTP 获取 (Plain HTTP Fetcher)

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::config::AppConfig;
use crate::core::error::{Result, ScrapeError};
use crate::interfaces::PageFetcher;

/// 不执行脚本的页面获取器，适用于服务端渲染的站点
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: Arc<AppConfig>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.browser.user_agent.clone())
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .timeout(Duration::from_secs(config.browser.navigation_timeout_secs))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(&self, url: &str, cancel: &CancellationToken) -> Result<String> {
        let request = async {
            let resp = self.client.get(url).send().await?.error_for_status()?;
            debug!("HTTP {} <- {}", resp.status(), url);
            Ok::<_, ScrapeError>(resp.text().await?)
        };

        tokio::select! {
            _ = cancel.cancelled() => Err(ScrapeError::Cancelled),
            r = request => r,
        }
    }
}
