//! 内存存储，用于测试与嵌入式调用

use std::collections::HashMap;

use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::core::config::{AppConfig, SiteConfig};
use crate::core::error::{Result, ScrapeError};
use crate::core::model::{ScrapeResult, Template};
use crate::interfaces::{RecordStore, SiteStore, TemplateStore};

#[derive(Default)]
pub struct MemoryTemplateStore {
    templates: RwLock<IndexMap<String, Template>>,
}

impl MemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_templates(templates: impl IntoIterator<Item = Template>) -> Self {
        let map = templates.into_iter().map(|t| (t.guid.clone(), t)).collect();
        Self {
            templates: RwLock::new(map),
        }
    }
}

#[async_trait]
impl TemplateStore for MemoryTemplateStore {
    async fn get_by_site_guid(&self, site_guid: &str) -> Result<Option<Template>> {
        Ok(self
            .templates
            .read()
            .values()
            .find(|t| t.site_guid == site_guid)
            .cloned())
    }

    async fn get_by_guid(&self, guid: &str) -> Result<Option<Template>> {
        Ok(self.templates.read().get(guid).cloned())
    }

    async fn list(&self) -> Result<Vec<Template>> {
        Ok(self.templates.read().values().cloned().collect())
    }

    async fn create(&self, template: Template) -> Result<Template> {
        let mut templates = self.templates.write();
        if templates.contains_key(&template.guid) {
            return Err(ScrapeError::Persistence(format!(
                "template {} already exists",
                template.guid
            )));
        }
        templates.insert(template.guid.clone(), template.clone());
        Ok(template)
    }

    async fn update(&self, template: Template) -> Result<bool> {
        let mut templates = self.templates.write();
        match templates.get_mut(&template.guid) {
            Some(slot) => {
                *slot = template;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, guid: &str) -> Result<bool> {
        Ok(self.templates.write().shift_remove(guid).is_some())
    }
}

#[derive(Default)]
pub struct MemoryRecordStore {
    results: RwLock<IndexMap<String, ScrapeResult>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.results.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.read().is_empty()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn create(&self, result: ScrapeResult) -> Result<ScrapeResult> {
        self.results
            .write()
            .insert(result.guid.clone(), result.clone());
        Ok(result)
    }

    async fn get_by_guid(&self, guid: &str) -> Result<Option<ScrapeResult>> {
        Ok(self.results.read().get(guid).cloned())
    }
}

/// 站点配置存储，数据来自 `AppConfig.sites`
#[derive(Default)]
pub struct MemorySiteStore {
    sites: HashMap<String, SiteConfig>,
}

impl MemorySiteStore {
    pub fn new(sites: HashMap<String, SiteConfig>) -> Self {
        Self { sites }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.sites.clone())
    }
}

#[async_trait]
impl SiteStore for MemorySiteStore {
    async fn get(&self, site_guid: &str) -> Result<Option<SiteConfig>> {
        Ok(self.sites.get(site_guid).cloned())
    }
}
