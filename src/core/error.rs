//! 错误处理体系 (Error Handling System)
//!
//! 定义抓取引擎的领域错误类型、错误分类以及全局 Result 别名。

use thiserror::Error;

/// 错误分类 (Error Taxonomy)
///
/// 调用方据此决定重试、告警或接受部分数据。
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum ErrorKind {
    /// 模板缺失或非法，抓取不会开始
    Configuration,
    /// 渲染器启动或导航失败
    Fetch,
    /// 单个字段的解析失败
    Extraction,
    /// 结果存储写入失败
    Persistence,
}

/// 全局错误定义 (Scraper Domain Errors)
#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Fetch timed out after {0}s")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yml::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Parsing error: {0}")]
    Parse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid template: {0}")]
    InvalidTemplate(String),

    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Site not found: {0}")]
    SiteNotFound(String),

    #[error("Site is inactive: {0}")]
    SiteInactive(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Operation cancelled")]
    Cancelled,
}

/// 全局 Result 别名
pub type Result<T> = std::result::Result<T, ScrapeError>;

impl ScrapeError {
    /// 将具体错误映射到错误分类
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScrapeError::Browser(_)
            | ScrapeError::Network(_)
            | ScrapeError::Timeout(_)
            | ScrapeError::Cancelled => ErrorKind::Fetch,
            ScrapeError::Parse(_) => ErrorKind::Extraction,
            ScrapeError::Io(_)
            | ScrapeError::Serialization(_)
            | ScrapeError::Yaml(_)
            | ScrapeError::Persistence(_) => ErrorKind::Persistence,
            ScrapeError::Config(_)
            | ScrapeError::InvalidRequest(_)
            | ScrapeError::InvalidTemplate(_)
            | ScrapeError::TemplateNotFound(_)
            | ScrapeError::SiteNotFound(_)
            | ScrapeError::SiteInactive(_) => ErrorKind::Configuration,
        }
    }

    pub fn is_template_not_found(&self) -> bool {
        matches!(self, ScrapeError::TemplateNotFound(_))
    }
}
