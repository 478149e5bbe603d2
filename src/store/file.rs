//! 文件存储 (File-backed Stores)
//!
//! 模板保存为 `templates/<guid>.yaml`，抓取结果保存为 `results/<guid>.json`。

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, warn};

use crate::core::error::{Result, ScrapeError};
use crate::core::model::{ScrapeResult, Template};
use crate::interfaces::{RecordStore, TemplateStore};
use crate::utils::{file_exists, save_file};

/// 模板文件存储
pub struct FileTemplateStore {
    dir: PathBuf,
}

impl FileTemplateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, guid: &str) -> PathBuf {
        self.dir.join(format!("{}.yaml", guid))
    }

    async fn read(path: &Path) -> Result<Template> {
        let raw = fs::read_to_string(path).await?;
        Ok(serde_yml::from_str(&raw)?)
    }

    async fn write(&self, template: &Template) -> Result<()> {
        let raw = serde_yml::to_string(template)?;
        save_file(self.path_for(&template.guid), raw.as_bytes()).await?;
        Ok(())
    }
}

#[async_trait]
impl TemplateStore for FileTemplateStore {
    async fn get_by_site_guid(&self, site_guid: &str) -> Result<Option<Template>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .find(|t| t.site_guid == site_guid))
    }

    async fn get_by_guid(&self, guid: &str) -> Result<Option<Template>> {
        let path = self.path_for(guid);
        if !file_exists(&path).await {
            return Ok(None);
        }
        Self::read(&path).await.map(Some)
    }

    async fn list(&self) -> Result<Vec<Template>> {
        if !file_exists(&self.dir).await {
            return Ok(Vec::new());
        }

        let mut entries = fs::read_dir(&self.dir).await?;
        let mut templates = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
                continue;
            }
            match Self::read(&path).await {
                Ok(t) => templates.push(t),
                Err(e) => warn!("跳过无法解析的模板文件 {:?}: {}", path, e),
            }
        }
        templates.sort_by(|a, b| a.guid.cmp(&b.guid));
        Ok(templates)
    }

    async fn create(&self, template: Template) -> Result<Template> {
        if file_exists(self.path_for(&template.guid)).await {
            return Err(ScrapeError::Persistence(format!(
                "template {} already exists",
                template.guid
            )));
        }
        self.write(&template).await?;
        debug!("模板已写入: {:?}", self.path_for(&template.guid));
        Ok(template)
    }

    async fn update(&self, template: Template) -> Result<bool> {
        if !file_exists(self.path_for(&template.guid)).await {
            return Ok(false);
        }
        self.write(&template).await?;
        Ok(true)
    }

    async fn delete(&self, guid: &str) -> Result<bool> {
        match fs::remove_file(self.path_for(guid)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// 抓取结果文件存储
pub struct FileRecordStore {
    dir: PathBuf,
}

impl FileRecordStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, guid: &str) -> PathBuf {
        self.dir.join(format!("{}.json", guid))
    }
}

#[async_trait]
impl RecordStore for FileRecordStore {
    async fn create(&self, result: ScrapeResult) -> Result<ScrapeResult> {
        let raw = serde_json::to_vec_pretty(&result)?;
        let path = self.path_for(&result.guid);
        save_file(&path, &raw)
            .await
            .map_err(|e| ScrapeError::Persistence(format!("{:?}: {}", path, e)))?;
        debug!("抓取结果已写入: {:?}", path);
        Ok(result)
    }

    async fn get_by_guid(&self, guid: &str) -> Result<Option<ScrapeResult>> {
        let path = self.path_for(guid);
        if !file_exists(&path).await {
            return Ok(None);
        }
        let raw = fs::read(&path).await?;
        Ok(Some(serde_json::from_slice(&raw)?))
    }
}
