#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use template_scraper::core::config::{AppConfig, ScraperConfig, SiteConfig};
use template_scraper::core::error::{Result, ScrapeError};
use template_scraper::core::model::{
    FieldDescriptor, ScrapeRequest, ScrapeResult, Template, UrlPatternSegment,
};
use template_scraper::engine::ScrapeContext;
use template_scraper::interfaces::{PageFetcher, RecordStore};

pub const SITE_URL: &str = "http://shop.test";
pub const SITE_GUID: &str = "site-1";

/// 按 URL 返回预置 HTML 的获取器；未登记的 URL 返回空页面
#[derive(Default)]
pub struct StaticFetcher {
    pages: HashMap<String, String>,
    failing: HashSet<String>,
    fallback: Option<String>,
    cancel_at: Option<(String, CancellationToken)>,
    calls: AtomicUsize,
    requested: Mutex<Vec<String>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.insert(url.into(), html.into());
        self
    }

    pub fn failing(mut self, url: impl Into<String>) -> Self {
        self.failing.insert(url.into());
        self
    }

    /// 所有未登记的 URL 都返回同一页面
    pub fn repeating(mut self, html: impl Into<String>) -> Self {
        self.fallback = Some(html.into());
        self
    }

    /// 请求该 URL 时触发关闭令牌，模拟获取途中被取消
    pub fn cancel_on(mut self, url: impl Into<String>, shutdown: CancellationToken) -> Self {
        self.cancel_at = Some((url.into(), shutdown));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().clone()
    }
}

#[async_trait]
impl PageFetcher for StaticFetcher {
    fn name(&self) -> &str {
        "static"
    }

    async fn fetch(&self, url: &str, cancel: &CancellationToken) -> Result<String> {
        if cancel.is_cancelled() {
            return Err(ScrapeError::Cancelled);
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().push(url.to_string());

        if let Some((target, shutdown)) = &self.cancel_at
            && target == url
        {
            shutdown.cancel();
            cancel.cancelled().await;
            return Err(ScrapeError::Cancelled);
        }
        if self.failing.contains(url) {
            return Err(ScrapeError::Browser(format!("navigation failed: {}", url)));
        }
        Ok(self
            .pages
            .get(url)
            .cloned()
            .or_else(|| self.fallback.clone())
            .unwrap_or_else(|| "<html><body><p>nothing here</p></body></html>".to_string()))
    }
}

/// 写入总是失败的结果存储
pub struct FailingRecordStore;

#[async_trait]
impl RecordStore for FailingRecordStore {
    async fn create(&self, _result: ScrapeResult) -> Result<ScrapeResult> {
        Err(ScrapeError::Io(std::io::Error::other("disk full")))
    }

    async fn get_by_guid(&self, _guid: &str) -> Result<Option<ScrapeResult>> {
        Ok(None)
    }
}

pub fn page_url(page: usize) -> String {
    format!("{}/page/{}", SITE_URL, page)
}

pub fn url_pattern() -> Vec<UrlPatternSegment> {
    vec![UrlPatternSegment::page("/page/")]
}

/// 商品卡片模板：名称、价格、详情链接与两个颜色
pub fn product_template() -> Template {
    Template {
        guid: "tpl-1".into(),
        site_guid: SITE_GUID.into(),
        container: Some("card".into()),
        container_tag: "div".into(),
        is_class: true,
        is_id: false,
        is_tag: false,
        tag_data: vec![
            FieldDescriptor::tag("h2", "Name"),
            FieldDescriptor::attr("span", "class", "price", "Price"),
            FieldDescriptor::attr("a", "class", "more", "Link"),
            FieldDescriptor::tag("ul", "Color, Alt Color").with_children("li", None),
        ],
    }
}

pub fn card(n: usize, with_price: bool) -> String {
    let price = if with_price {
        format!(r#"<span class="price">${}</span>"#, n)
    } else {
        String::new()
    };
    format!(
        r#"<div class="card"><h2>Item {n}</h2>{price}<a class="more" href="/p/{n}">more</a><ul><li>red</li><li>blue</li></ul></div>"#
    )
}

/// 生成包含 `count` 个卡片的页面，编号从 `start` 开始
pub fn product_page(start: usize, count: usize) -> String {
    let cards: String = (start..start + count).map(|n| card(n, true)).collect();
    format!(
        "<html><head><title>shop</title></head><body><!-- listing --><div class=\"grid\">{}</div></body></html>",
        cards
    )
}

pub fn request(limit: usize) -> ScrapeRequest {
    ScrapeRequest::builder()
        .site_guid(SITE_GUID)
        .account_guid("acct-1")
        .limit_data(limit)
        .site_url(SITE_URL)
        .url_pattern(url_pattern())
        .build()
}

pub fn config_with_max_pages(max_pages: usize) -> Arc<AppConfig> {
    Arc::new(AppConfig {
        scraper: ScraperConfig {
            max_pages,
            retry_backoff_ms: 1,
            ..ScraperConfig::default()
        },
        ..AppConfig::default()
    })
}

pub fn context() -> ScrapeContext {
    ScrapeContext::new(Arc::new(AppConfig::default()))
}

pub fn site(is_active: bool) -> SiteConfig {
    SiteConfig {
        name: "Shop".into(),
        url: SITE_URL.into(),
        url_pattern: url_pattern(),
        space_rule: "+".into(),
        is_active,
    }
}
