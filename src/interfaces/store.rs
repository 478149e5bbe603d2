//! 外部协作者接口 (External Collaborators)
//!
//! 模板存储、结果存储与站点配置存储。引擎只依赖这些 Trait，具体实现见 `crate::store`。

use async_trait::async_trait;

use crate::core::config::SiteConfig;
use crate::core::error::Result;
use crate::core::model::{ScrapeResult, Template};

/// 模板存储，一个站点对应一个模板
#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn get_by_site_guid(&self, site_guid: &str) -> Result<Option<Template>>;

    async fn get_by_guid(&self, guid: &str) -> Result<Option<Template>>;

    async fn list(&self) -> Result<Vec<Template>>;

    async fn create(&self, template: Template) -> Result<Template>;

    /// 按 guid 覆盖，返回是否存在该模板
    async fn update(&self, template: Template) -> Result<bool>;

    /// 按 guid 删除，返回是否删除了模板
    async fn delete(&self, guid: &str) -> Result<bool>;
}

/// 抓取结果存储
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn create(&self, result: ScrapeResult) -> Result<ScrapeResult>;

    async fn get_by_guid(&self, guid: &str) -> Result<Option<ScrapeResult>>;
}

/// 站点配置存储
#[async_trait]
pub trait SiteStore: Send + Sync {
    async fn get(&self, site_guid: &str) -> Result<Option<SiteConfig>>;
}
