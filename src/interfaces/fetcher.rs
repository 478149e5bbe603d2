use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::core::error::Result;

/// 页面获取接口
///
/// - 负责：取得目标 URL 渲染完成后的 HTML 源码。
/// - 不负责：解析与重试，失败直接返回错误，由抓取循环决定是否停止翻页。
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// 实现名称 (用于日志)
    fn name(&self) -> &str;

    /// 获取页面 HTML，`cancel` 触发时应尽快返回 `ScrapeError::Cancelled`
    async fn fetch(&self, url: &str, cancel: &CancellationToken) -> Result<String>;
}
