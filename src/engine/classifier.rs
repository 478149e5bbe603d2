//! 结果分类与持久化 (Result Classifier & Persistor)

use tracing::{error, info};
use uuid::Uuid;

use crate::core::error::{Result, ScrapeError};
use crate::core::event::ScrapeEvent;
use crate::core::model::{Completeness, ScrapeOutcome, ScrapeRequest, ScrapeResult};
use crate::engine::collector::Collection;
use crate::engine::context::ScrapeContext;
use crate::interfaces::RecordStore;
use crate::utils::{format_hms, local_now, timestamp_name};

pub struct Classifier<'a> {
    store: &'a dyn RecordStore,
    ctx: &'a ScrapeContext,
}

impl<'a> Classifier<'a> {
    pub fn new(store: &'a dyn RecordStore, ctx: &'a ScrapeContext) -> Self {
        Self { store, ctx }
    }

    /// 组装结果并写入存储
    ///
    /// 存储失败返回 `ScrapeError::Persistence`；数量不足上限时标记为部分完成，
    /// 但仍视为成功创建。
    pub async fn finalize(&self, request: &ScrapeRequest, collection: Collection) -> Result<ScrapeOutcome> {
        let now = local_now(self.ctx.config.scraper.utc_offset_hours);
        let scrape_name = request
            .scrape_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| timestamp_name(&now));

        let data_count = collection.records.len();
        let result = ScrapeResult {
            guid: Uuid::new_v4().to_string(),
            account_guid: request.account_guid.clone(),
            site_guid: request.site_guid.clone(),
            scrape_name,
            limit_data: request.limit_data,
            data_count,
            favourite_count: 0,
            web_data: collection.records,
            scrape_time: format_hms(collection.elapsed),
            created_date: now,
        };

        self.ctx.emit(ScrapeEvent::Persisting { data_count });

        let saved = self.store.create(result).await.map_err(|e| {
            error!("抓取结果保存失败: {}", e);
            match e {
                ScrapeError::Persistence(_) => e,
                other => ScrapeError::Persistence(other.to_string()),
            }
        })?;

        let completeness = Completeness::classify(saved.data_count, request.limit_data);
        info!(
            "抓取结果已保存: {} ({} / {}, {})",
            saved.scrape_name, saved.data_count, request.limit_data, completeness
        );

        self.ctx.emit(ScrapeEvent::TaskCompleted {
            scrape_name: saved.scrape_name.clone(),
            data_count: saved.data_count,
            partial: completeness == Completeness::Partial,
        });

        Ok(ScrapeOutcome {
            response: completeness.response(),
            completeness,
            scrape_guid: saved.guid,
            scrape_name: saved.scrape_name,
            created_date: saved.created_date,
            data_count: saved.data_count,
            stop_reason: collection.stop_reason,
        })
    }
}
