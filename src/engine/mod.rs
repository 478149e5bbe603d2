//! 抓取引擎
//!
//! 自底向上：URL 构建 -> DOM 查询 -> 字段抽取 -> 翻页采集 -> 分类持久化。

pub mod classifier;
pub mod collector;
pub mod context;
pub mod dom;
pub mod extract;
pub mod service;
pub mod template;
pub mod url;

pub use collector::{Collection, Collector};
pub use context::ScrapeContext;
pub use service::{ScrapeService, TemplateDraft, TemplateService};
pub use template::CompiledTemplate;
