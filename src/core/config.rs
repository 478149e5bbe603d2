//! 配置管理系统 (Configuration Management)
//!
//! 负责 `config.toml` 的反序列化及其层级结构映射，支持环境变量 (`SCRAPER__*`) 与默认值回退机制。

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use bon::Builder;
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::core::error::{Result, ScrapeError};
use crate::core::model::UrlPatternSegment;

/// 全局应用配置
#[derive(Debug, Deserialize, Builder, Clone)]
pub struct AppConfig {
    /// 模板与抓取结果的持久化根目录
    #[serde(default = "default_data_path")]
    #[builder(default = default_data_path())]
    pub data_path: String,

    /// 自动化浏览器 (Chromium) 相关配置
    #[serde(default)]
    #[builder(default)]
    pub browser: BrowserConfig,

    /// 抓取循环参数
    #[serde(default)]
    #[builder(default)]
    pub scraper: ScraperConfig,

    /// 站点配置映射 (site_guid -> 站点)
    #[serde(default)]
    #[builder(default)]
    pub sites: HashMap<String, SiteConfig>,
}

/// 浏览器引擎配置
#[derive(Debug, Deserialize, Builder, Clone)]
pub struct BrowserConfig {
    /// 是否以无头模式 (Headless) 运行
    #[serde(default = "default_headless")]
    #[builder(default = default_headless())]
    pub headless: bool,
    /// 自定义可执行文件路径
    pub chrome_path: Option<String>,
    /// 单次导航的超时时间
    #[serde(default = "default_navigation_timeout")]
    #[builder(default = default_navigation_timeout())]
    pub navigation_timeout_secs: u64,
    /// 导航完成后等待脚本渲染的时间
    #[serde(default = "default_settle_ms")]
    #[builder(default = default_settle_ms())]
    pub settle_ms: u64,
    /// 关闭浏览器后等待系统回收资源的时间
    #[serde(default = "default_release_delay_ms")]
    #[builder(default = default_release_delay_ms())]
    pub release_delay_ms: u64,
    /// 静态抓取时使用的 User-Agent
    #[serde(default = "default_user_agent")]
    #[builder(default = default_user_agent())]
    pub user_agent: String,
}

/// 页面获取方式
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FetcherKind {
    /// 无头浏览器渲染 (执行 JavaScript)
    #[default]
    Browser,
    /// 纯 HTTP 获取，适用于服务端渲染的站点
    Http,
}

/// 抓取循环参数
#[derive(Debug, Deserialize, Builder, Clone)]
pub struct ScraperConfig {
    /// 页面获取方式
    #[serde(default)]
    #[builder(default)]
    pub fetcher: FetcherKind,
    /// 单次任务的最大翻页数，防止容器始终存在时无限循环
    #[serde(default = "default_max_pages")]
    #[builder(default = default_max_pages())]
    pub max_pages: usize,
    /// 单页获取失败后的重试次数 (0 表示失败即停止翻页)
    #[serde(default)]
    #[builder(default)]
    pub fetch_retries: u32,
    /// 重试退避基准时间
    #[serde(default = "default_retry_backoff_ms")]
    #[builder(default = default_retry_backoff_ms())]
    pub retry_backoff_ms: u64,
    /// 部署时区相对 UTC 的偏移，用于默认任务名与创建时间
    #[serde(default = "default_utc_offset_hours")]
    #[builder(default = default_utc_offset_hours())]
    pub utc_offset_hours: i32,
}

/// 站点配置
#[derive(Debug, Deserialize, Builder, Clone, Default)]
pub struct SiteConfig {
    /// 站点显示名称
    #[serde(default)]
    #[builder(default)]
    pub name: String,
    /// 站点基础 URL
    pub url: String,
    /// 翻页 URL 片段
    #[serde(default)]
    #[builder(default)]
    pub url_pattern: Vec<UrlPatternSegment>,
    /// 空格替换规则
    #[serde(default)]
    #[builder(default)]
    pub space_rule: String,
    #[serde(default = "default_active")]
    #[builder(default = default_active())]
    pub is_active: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_path: default_data_path(),
            browser: BrowserConfig::default(),
            scraper: ScraperConfig::default(),
            sites: HashMap::new(),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_path: None,
            navigation_timeout_secs: default_navigation_timeout(),
            settle_ms: default_settle_ms(),
            release_delay_ms: default_release_delay_ms(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            fetcher: FetcherKind::default(),
            max_pages: default_max_pages(),
            fetch_retries: 0,
            retry_backoff_ms: default_retry_backoff_ms(),
            utc_offset_hours: default_utc_offset_hours(),
        }
    }
}

fn default_data_path() -> String {
    "data".to_string()
}
fn default_headless() -> bool {
    true
}
fn default_navigation_timeout() -> u64 {
    30
}
fn default_settle_ms() -> u64 {
    1500
}
fn default_release_delay_ms() -> u64 {
    2000
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string()
}
fn default_max_pages() -> usize {
    100
}
fn default_retry_backoff_ms() -> u64 {
    500
}
fn default_utc_offset_hours() -> i32 {
    7
}
fn default_active() -> bool {
    true
}

impl AppConfig {
    /// 从工作目录的 `config.toml` 与环境变量加载配置
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("config.toml"))
    }

    /// 从指定文件加载配置，文件不存在时仅使用环境变量与默认值
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let builder = Config::builder();

        let builder = if config_path.exists() {
            builder.add_source(File::from(config_path))
        } else {
            builder
        };

        let settings = builder
            .add_source(Environment::with_prefix("SCRAPER").separator("__"))
            .build()
            .map_err(ScrapeError::Config)?;
        settings.try_deserialize().map_err(ScrapeError::Config)
    }

    pub fn templates_dir(&self) -> PathBuf {
        Path::new(&self.data_path).join("templates")
    }

    pub fn results_dir(&self) -> PathBuf {
        Path::new(&self.data_path).join("results")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_sites_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
data_path = "out"

[scraper]
max_pages = 5
fetcher = "http"

[sites.books]
name = "Books"
url = "https://books.example.com"
space_rule = "+"
url_pattern = [
    { identifier = "/catalogue/page-", is_page = true },
    { identifier = ".html" },
]
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.data_path, "out");
        assert_eq!(config.scraper.max_pages, 5);
        assert_eq!(config.scraper.fetcher, FetcherKind::Http);
        assert_eq!(config.scraper.utc_offset_hours, 7);
        assert!(config.browser.headless);

        let site = &config.sites["books"];
        assert_eq!(site.url_pattern.len(), 2);
        assert!(site.url_pattern[0].is_page);
        assert!(site.is_active);
        assert_eq!(config.templates_dir(), Path::new("out").join("templates"));
    }
}
