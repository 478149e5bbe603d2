//! 抓取与模板服务 (Scrape & Template Services)
//!
//! 负责协调单次抓取的生命周期：模板加载 -> 编译 -> 翻页采集 -> 分类与持久化。

use std::sync::Arc;

use bon::Builder;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::core::error::{Result, ScrapeError};
use crate::core::event::ScrapeEvent;
use crate::core::model::{FieldDescriptor, ScrapeOutcome, ScrapeRequest, ScrapeResult, Template};
use crate::engine::classifier::Classifier;
use crate::engine::collector::Collector;
use crate::engine::context::ScrapeContext;
use crate::engine::dom::{ContainerSuggestion, Document};
use crate::engine::template::CompiledTemplate;
use crate::engine::url::PageUrls;
use crate::interfaces::{PageFetcher, RecordStore, SiteStore, TemplateStore};

/// 抓取服务
#[derive(Builder)]
pub struct ScrapeService {
    templates: Arc<dyn TemplateStore>,
    records: Arc<dyn RecordStore>,
    sites: Arc<dyn SiteStore>,
    fetcher: Arc<dyn PageFetcher>,
    ctx: ScrapeContext,
}

/// 页面检查结果，用于编写模板
#[derive(Debug, Clone)]
pub struct PageInspection {
    pub url: String,
    pub body_html: String,
    pub suggestion: Option<ContainerSuggestion>,
}

impl ScrapeService {
    pub fn context(&self) -> &ScrapeContext {
        &self.ctx
    }

    /// 执行一次抓取
    ///
    /// 模板缺失在任何页面获取之前返回 `ScrapeError::TemplateNotFound`；
    /// 存储失败返回 `ScrapeError::Persistence`；页面获取失败只会提前结束翻页。
    pub async fn scrape_data(&self, request: ScrapeRequest) -> Result<ScrapeOutcome> {
        let result = self.run(&request).await;
        if let Err(e) = &result {
            error!("抓取任务失败 [{}]: {}", request.site_guid, e);
            self.ctx.emit(ScrapeEvent::TaskFailed { error: e.to_string() });
        }
        result
    }

    async fn run(&self, request: &ScrapeRequest) -> Result<ScrapeOutcome> {
        if request.limit_data == 0 {
            return Err(ScrapeError::InvalidRequest("limit_data must be greater than 0".into()));
        }

        let template = self
            .templates
            .get_by_site_guid(&request.site_guid)
            .await?
            .ok_or_else(|| ScrapeError::TemplateNotFound(request.site_guid.clone()))?;
        let template = CompiledTemplate::compile(&template)?;

        self.ctx.emit(ScrapeEvent::TaskStarted {
            site_guid: request.site_guid.clone(),
            limit: request.limit_data,
        });
        info!(
            "开始抓取站点 {} (目标 {} 条, 获取方式: {})",
            request.site_guid,
            request.limit_data,
            self.fetcher.name()
        );

        let collection = Collector::new(self.fetcher.as_ref(), &template, &self.ctx)
            .collect(request)
            .await;

        Classifier::new(self.records.as_ref(), &self.ctx)
            .finalize(request, collection)
            .await
    }

    /// 根据站点配置构建抓取请求
    pub async fn site_request(
        &self,
        site_guid: &str,
        account_guid: &str,
        limit_data: usize,
        scrape_name: Option<String>,
    ) -> Result<ScrapeRequest> {
        let site = self
            .sites
            .get(site_guid)
            .await?
            .ok_or_else(|| ScrapeError::SiteNotFound(site_guid.to_string()))?;
        if !site.is_active {
            return Err(ScrapeError::SiteInactive(site_guid.to_string()));
        }

        Ok(ScrapeRequest {
            site_guid: site_guid.to_string(),
            account_guid: account_guid.to_string(),
            limit_data,
            scrape_name,
            site_url: site.url,
            url_pattern: site.url_pattern,
            space_rule: site.space_rule,
        })
    }

    /// 按站点配置抓取
    pub async fn scrape_site(
        &self,
        site_guid: &str,
        account_guid: &str,
        limit_data: usize,
        scrape_name: Option<String>,
    ) -> Result<ScrapeOutcome> {
        let request = self
            .site_request(site_guid, account_guid, limit_data, scrape_name)
            .await?;
        self.scrape_data(request).await
    }

    /// 预览某一页的 URL，不发起请求
    pub async fn preview_url(&self, site_guid: &str, page: usize) -> Result<Option<String>> {
        let site = self
            .sites
            .get(site_guid)
            .await?
            .ok_or_else(|| ScrapeError::SiteNotFound(site_guid.to_string()))?;
        Ok(PageUrls::new(&site.url, &site.url_pattern, &site.space_rule).page_url(page))
    }

    /// 获取页面并返回清理后的 `<body>` 以及推测的容器
    pub async fn inspect(&self, url: &str) -> Result<PageInspection> {
        let source = self.fetcher.fetch(url, &self.ctx.shutdown).await?;
        let doc = Document::parse(&source);
        let body_html = doc
            .body_html()
            .ok_or_else(|| ScrapeError::Parse(format!("no <body> in {}", url)))?;
        let suggestion = doc.suggest_container();
        if suggestion.is_none() {
            warn!("未能推测出列表容器: {}", url);
        }

        Ok(PageInspection {
            url: url.to_string(),
            body_html,
            suggestion,
        })
    }

    pub async fn get_result(&self, guid: &str) -> Result<Option<ScrapeResult>> {
        self.records.get_by_guid(guid).await
    }
}

/// 模板草稿 (创建或更新时的输入)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateDraft {
    pub site_guid: String,
    #[serde(default)]
    pub container: Option<String>,
    pub container_tag: String,
    #[serde(default)]
    pub is_class: bool,
    #[serde(default)]
    pub is_id: bool,
    #[serde(default)]
    pub is_tag: bool,
    pub tag_data: Vec<FieldDescriptor>,
}

impl TemplateDraft {
    fn into_template(self, guid: String) -> Template {
        Template {
            guid,
            site_guid: self.site_guid,
            container: self.container,
            container_tag: self.container_tag,
            is_class: self.is_class,
            is_id: self.is_id,
            is_tag: self.is_tag,
            tag_data: self.tag_data,
        }
    }
}

/// 模板服务
pub struct TemplateService {
    store: Arc<dyn TemplateStore>,
}

impl TemplateService {
    pub fn new(store: Arc<dyn TemplateStore>) -> Self {
        Self { store }
    }

    pub async fn get_by_site_guid(&self, site_guid: &str) -> Result<Option<Template>> {
        self.store.get_by_site_guid(site_guid).await
    }

    pub async fn list(&self) -> Result<Vec<Template>> {
        self.store.list().await
    }

    /// 校验并创建模板，每个站点只允许一个模板
    pub async fn create(&self, draft: TemplateDraft) -> Result<Template> {
        if self.store.get_by_site_guid(&draft.site_guid).await?.is_some() {
            return Err(ScrapeError::InvalidTemplate(format!(
                "site {} already has a template",
                draft.site_guid
            )));
        }

        let template = draft.into_template(Uuid::new_v4().to_string());
        CompiledTemplate::compile(&template)?;
        let created = self.store.create(template).await?;
        info!("模板已创建: {} (site {})", created.guid, created.site_guid);
        Ok(created)
    }

    /// 更新模板，`site_guid` 保持不变
    pub async fn update(&self, guid: &str, draft: TemplateDraft) -> Result<Template> {
        let existing = self
            .store
            .get_by_guid(guid)
            .await?
            .ok_or_else(|| ScrapeError::TemplateNotFound(guid.to_string()))?;

        let template = TemplateDraft {
            site_guid: existing.site_guid,
            ..draft
        }
        .into_template(guid.to_string());
        CompiledTemplate::compile(&template)?;

        if !self.store.update(template.clone()).await? {
            return Err(ScrapeError::TemplateNotFound(guid.to_string()));
        }
        Ok(template)
    }

    pub async fn delete(&self, guid: &str) -> Result<bool> {
        self.store.delete(guid).await
    }
}
