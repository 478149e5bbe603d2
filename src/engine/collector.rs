//! 翻页采集循环 (Pagination Loop / Collector)
//!
//! 状态机：`Collecting -> (PageFetched | PageEmpty) -> Collecting | Done`。
//! 每个字段维护一列，容器内每个字段恰好写入一格，行按下标合并，
//! 单个字段匹配失败不会导致行错位。

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::core::error::{Result, ScrapeError};
use crate::core::event::ScrapeEvent;
use crate::core::model::{Record, ScrapeRequest, StopReason};
use crate::engine::context::ScrapeContext;
use crate::engine::dom::{Document, find_field};
use crate::engine::extract::{Extracted, SiteUrl, extract, placeholders};
use crate::engine::template::{CompiledTemplate, FieldKind};
use crate::engine::url::PageUrls;
use crate::interfaces::PageFetcher;

/// 单元格：`None` 表示该容器内未定位到字段元素
pub type Cell = Option<Extracted>;

/// 列式累加器，每个字段一列
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldColumns {
    columns: Vec<Vec<Cell>>,
}

impl FieldColumns {
    pub fn new(field_count: usize) -> Self {
        Self {
            columns: vec![Vec::new(); field_count],
        }
    }

    pub fn push(&mut self, field: usize, cell: Cell) {
        if let Some(column) = self.columns.get_mut(field) {
            column.push(cell);
        }
    }

    /// 行数以第一列为准
    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    pub fn truncate(&mut self, limit: usize) {
        for column in &mut self.columns {
            column.truncate(limit);
        }
    }

    /// 按下标合并为记录，越界或缺失的单元格填充占位值
    pub fn into_records(self, template: &CompiledTemplate) -> Vec<Record> {
        let rows = self.row_count();
        (0..rows)
            .map(|index| {
                let mut record = Record::new(index);
                for (rule, column) in template.fields.iter().zip(&self.columns) {
                    let values = column
                        .get(index)
                        .cloned()
                        .flatten()
                        .unwrap_or_else(|| placeholders(rule));
                    record.fields.extend(values);
                }
                record
            })
            .collect()
    }
}

/// 解析一页并为每个容器的每个字段写入一格，返回容器数量
///
/// 页面文档只在此函数内存活。
pub fn harvest_page(
    source: &str,
    template: &CompiledTemplate,
    site: &SiteUrl,
    columns: &mut FieldColumns,
) -> usize {
    let doc = Document::parse(source);
    let containers = doc.find_container(&template.container_tag, &template.selector);

    for item in &containers {
        for (idx, rule) in template.fields.iter().enumerate() {
            let cell = find_field(*item, &rule.matcher).map(|el| extract(Some(el), rule, site));
            if cell.is_none() && !matches!(rule.kind, FieldKind::Container { .. }) {
                debug!("字段未匹配: {:?}", rule.names);
            }
            columns.push(idx, cell);
        }
    }

    containers.len()
}

/// 第 `attempt` 次失败后的等待时间，溢出时取上限
fn retry_backoff(base_ms: u64, attempt: u32) -> Duration {
    Duration::from_millis(base_ms.saturating_mul(u64::from(attempt)))
}

/// 采集结果
#[derive(Debug, Clone)]
pub struct Collection {
    pub records: Vec<Record>,
    pub pages_fetched: usize,
    pub stop_reason: StopReason,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CollectorState {
    Collecting,
    PageFetched { containers: usize },
    PageEmpty,
    Done(StopReason),
}

/// 翻页采集器
pub struct Collector<'a> {
    fetcher: &'a dyn PageFetcher,
    template: &'a CompiledTemplate,
    ctx: &'a ScrapeContext,
}

impl<'a> Collector<'a> {
    pub fn new(fetcher: &'a dyn PageFetcher, template: &'a CompiledTemplate, ctx: &'a ScrapeContext) -> Self {
        Self {
            fetcher,
            template,
            ctx,
        }
    }

    /// 运行翻页循环直到达到目标数量或没有更多数据
    pub async fn collect(&self, request: &ScrapeRequest) -> Collection {
        let started = Instant::now();
        let limit = request.limit_data;
        let max_pages = self.ctx.config.scraper.max_pages;
        let site = SiteUrl::new(&request.site_url);
        let urls = PageUrls::new(&request.site_url, &request.url_pattern, &request.space_rule);

        let mut columns = FieldColumns::new(self.template.fields.len());
        let mut page = 1;
        let mut pages_fetched = 0;
        let mut state = CollectorState::Collecting;

        let stop_reason = loop {
            state = match state {
                CollectorState::Collecting => {
                    if columns.row_count() >= limit {
                        CollectorState::Done(StopReason::LimitReached)
                    } else if self.ctx.is_cancelled() {
                        CollectorState::Done(StopReason::Cancelled)
                    } else if page > max_pages {
                        CollectorState::Done(StopReason::PageCeiling { pages: max_pages })
                    } else {
                        match urls.page_url(page) {
                            Some(url) => self.visit(page, &url, &site, &mut columns, limit).await,
                            None => CollectorState::Done(StopReason::NoMorePages),
                        }
                    }
                }
                CollectorState::PageFetched { containers } => {
                    debug!("第 {} 页共 {} 个容器", page, containers);
                    pages_fetched += 1;
                    page += 1;
                    CollectorState::Collecting
                }
                CollectorState::PageEmpty => CollectorState::Done(StopReason::ContainerMissing { page }),
                CollectorState::Done(reason) => break reason,
            };
        };

        columns.truncate(limit);
        let records = columns.into_records(self.template);
        info!("采集结束: {} 条记录, {} 页, 原因: {}", records.len(), pages_fetched, stop_reason);

        Collection {
            records,
            pages_fetched,
            stop_reason,
            elapsed: started.elapsed(),
        }
    }

    async fn visit(
        &self,
        page: usize,
        url: &str,
        site: &SiteUrl,
        columns: &mut FieldColumns,
        limit: usize,
    ) -> CollectorState {
        info!("正在获取第 {} 页: {}", page, url);

        let source = match self.fetch_page(url).await {
            Ok(source) => source,
            Err(ScrapeError::Cancelled) => return CollectorState::Done(StopReason::Cancelled),
            Err(e) => {
                warn!("页面获取失败，停止翻页 [{}]: {}", url, e);
                self.ctx.emit(ScrapeEvent::FetchFailed {
                    page,
                    url: url.to_string(),
                    error: e.to_string(),
                });
                return CollectorState::Done(StopReason::FetchFailed { page });
            }
        };

        let containers = harvest_page(&source, self.template, site, columns);
        if containers == 0 {
            info!("第 {} 页未找到容器 `{}`", page, self.template.container_tag);
            self.ctx.emit(ScrapeEvent::PageEmpty {
                page,
                url: url.to_string(),
            });
            return CollectorState::PageEmpty;
        }

        self.ctx.emit(ScrapeEvent::PageFetched {
            page,
            url: url.to_string(),
            collected: columns.row_count().min(limit),
            limit,
        });
        CollectorState::PageFetched { containers }
    }

    /// 获取页面，按配置进行有限次数的退避重试
    async fn fetch_page(&self, url: &str) -> Result<String> {
        let cfg = &self.ctx.config.scraper;
        let max_attempts = cfg.fetch_retries.saturating_add(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.fetcher.fetch(url, &self.ctx.shutdown).await {
                Ok(source) => return Ok(source),
                Err(ScrapeError::Cancelled) => return Err(ScrapeError::Cancelled),
                Err(e) if attempt >= max_attempts => return Err(e),
                Err(e) => {
                    let wait = retry_backoff(cfg.retry_backoff_ms, attempt);
                    warn!(
                        "[{}] 获取失败 (第 {}/{} 次): {}。将在 {:?} 后重试...",
                        self.fetcher.name(),
                        attempt,
                        max_attempts,
                        e,
                        wait
                    );
                    tokio::select! {
                        _ = self.ctx.shutdown.cancelled() => return Err(ScrapeError::Cancelled),
                        _ = tokio::time::sleep(wait) => {}
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_linearly_and_saturates() {
        assert_eq!(retry_backoff(250, 1), Duration::from_millis(250));
        assert_eq!(retry_backoff(250, 3), Duration::from_millis(750));
        assert_eq!(retry_backoff(u64::MAX, 2), Duration::from_millis(u64::MAX));
    }
}
