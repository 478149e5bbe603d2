//! 浏览器渲染 (Headless Browser Rendering)
//!
//! 每次获取启动一个独立的浏览器会话，导航、等待脚本渲染、读取 DOM 后关闭。

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::{
    Page,
    browser::{Browser, BrowserConfig},
};
use futures::StreamExt;
use tokio::{
    task::JoinHandle,
    time::{sleep, timeout},
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::config::AppConfig;
use crate::core::error::{Result, ScrapeError};
use crate::interfaces::PageFetcher;

/// 浏览器会话
/// 采用显式的所有权管理，确保关闭逻辑的确定性
pub struct BrowserSession {
    browser: Option<Browser>,
    handler: Option<JoinHandle<()>>,
}

impl BrowserSession {
    /// 启动浏览器会话
    pub async fn launch(config: &AppConfig) -> Result<Self> {
        let browser_config = build_browser_config(config)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| ScrapeError::Browser(e.to_string()))?;

        let handle = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            browser: Some(browser),
            handler: Some(handle),
        })
    }

    pub async fn new_page(&self) -> Result<Page> {
        let browser = self
            .browser
            .as_ref()
            .ok_or_else(|| ScrapeError::Browser("Browser already closed".into()))?;
        browser
            .new_page("about:blank")
            .await
            .map_err(|e| ScrapeError::Browser(e.to_string()))
    }

    /// 关闭浏览器，并等待事件循环结束
    pub async fn close(&mut self) -> Result<()> {
        if let Some(mut browser) = self.browser.take() {
            browser
                .close()
                .await
                .map_err(|e| ScrapeError::Browser(e.to_string()))?;
            if let Some(h) = self.handler.take() {
                let _ = h.await;
            }
        }
        Ok(())
    }
}

fn build_browser_config(config: &AppConfig) -> Result<BrowserConfig> {
    let cfg = &config.browser;
    let mut builder = BrowserConfig::builder()
        .arg("--disable-blink-features=AutomationControlled")
        .arg(format!("--user-agent={}", cfg.user_agent))
        .arg("--disable-gpu")
        .arg("--no-sandbox")
        .arg("--disable-popup-blocking")
        .arg("--disable-infobars")
        .arg("--window-size=1920,1080")
        .request_timeout(Duration::from_secs(cfg.navigation_timeout_secs));

    if cfg.headless {
        builder = builder.arg("--headless=new");
    } else {
        builder = builder.with_head();
    }

    let chrome_path = cfg.chrome_path.clone().or_else(|| {
        [
            "/usr/bin/google-chrome",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
        ]
        .iter()
        .find(|p| Path::new(p).exists())
        .map(|p| p.to_string())
    });

    if let Some(path) = chrome_path {
        builder = builder.chrome_executable(path);
    }

    builder.build().map_err(ScrapeError::Browser)
}

// 未显式关闭时在后台清理
impl Drop for BrowserSession {
    fn drop(&mut self) {
        let Some(mut browser) = self.browser.take() else {
            return;
        };
        let handler = self.handler.take();
        if let Ok(rt) = tokio::runtime::Handle::try_current() {
            rt.spawn(async move {
                let _ = browser.close().await;
                if let Some(h) = handler {
                    let _ = h.await;
                }
            });
        }
    }
}

/// 基于无头浏览器的页面获取器
pub struct BrowserFetcher {
    config: Arc<AppConfig>,
}

impl BrowserFetcher {
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self { config }
    }

    async fn render(&self, session: &BrowserSession, url: &str) -> Result<String> {
        let cfg = &self.config.browser;
        let page = session.new_page().await?;

        timeout(Duration::from_secs(cfg.navigation_timeout_secs), page.goto(url))
            .await
            .map_err(|_| ScrapeError::Timeout(cfg.navigation_timeout_secs))?
            .map_err(|e| ScrapeError::Browser(e.to_string()))?;

        // 等待客户端脚本完成渲染
        sleep(Duration::from_millis(cfg.settle_ms)).await;

        let html = page
            .content()
            .await
            .map_err(|e| ScrapeError::Browser(e.to_string()))?;

        if let Err(e) = page.close().await {
            debug!("关闭页面时发生非致命错误: {}", e);
        }
        Ok(html)
    }
}

#[async_trait]
impl PageFetcher for BrowserFetcher {
    fn name(&self) -> &str {
        "browser"
    }

    async fn fetch(&self, url: &str, cancel: &CancellationToken) -> Result<String> {
        if cancel.is_cancelled() {
            return Err(ScrapeError::Cancelled);
        }

        let mut session = BrowserSession::launch(&self.config).await?;

        let result = tokio::select! {
            _ = cancel.cancelled() => Err(ScrapeError::Cancelled),
            r = self.render(&session, url) => r,
        };

        // 无论成功与否都关闭浏览器
        if let Err(e) = session.close().await {
            debug!("关闭浏览器时发生非致命错误: {}", e);
        }
        sleep(Duration::from_millis(self.config.browser.release_delay_ms)).await;

        result
    }
}
