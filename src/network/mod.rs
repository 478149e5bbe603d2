//! 页面获取实现

pub mod browser;
pub mod http;

use std::sync::Arc;

use crate::core::config::{AppConfig, FetcherKind};
use crate::core::error::Result;
use crate::interfaces::PageFetcher;

pub use browser::{BrowserFetcher, BrowserSession};
pub use http::HttpFetcher;

/// 根据配置选择页面获取器
pub fn create_fetcher(config: Arc<AppConfig>) -> Result<Arc<dyn PageFetcher>> {
    let fetcher: Arc<dyn PageFetcher> = match config.scraper.fetcher {
        FetcherKind::Browser => Arc::new(BrowserFetcher::new(config)),
        FetcherKind::Http => Arc::new(HttpFetcher::new(config)?),
    };
    Ok(fetcher)
}
