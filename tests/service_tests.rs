mod common;

use std::collections::HashMap;
use std::sync::Arc;

use template_scraper::core::event::{ScrapeEvent, create_event_channel};
use template_scraper::core::model::{Completeness, FieldDescriptor, StopReason};
use template_scraper::engine::service::TemplateDraft;
use template_scraper::engine::{ScrapeContext, ScrapeService, TemplateService};
use template_scraper::interfaces::{PageFetcher, RecordStore, TemplateStore};
use template_scraper::store::{MemoryRecordStore, MemorySiteStore, MemoryTemplateStore};
use template_scraper::{ErrorKind, ScrapeError};

use common::*;

struct Harness {
    fetcher: Arc<StaticFetcher>,
    records: Arc<MemoryRecordStore>,
    service: ScrapeService,
}

fn harness_with(fetcher: StaticFetcher, templates: MemoryTemplateStore, ctx: ScrapeContext) -> Harness {
    let fetcher = Arc::new(fetcher);
    let records = Arc::new(MemoryRecordStore::new());
    let sites = HashMap::from([
        (SITE_GUID.to_string(), site(true)),
        ("dormant".to_string(), site(false)),
    ]);

    let service = ScrapeService::builder()
        .templates(Arc::new(templates) as Arc<dyn TemplateStore>)
        .records(records.clone() as Arc<dyn RecordStore>)
        .sites(Arc::new(MemorySiteStore::new(sites)))
        .fetcher(fetcher.clone() as Arc<dyn PageFetcher>)
        .ctx(ctx)
        .build();

    Harness {
        fetcher,
        records,
        service,
    }
}

fn harness(fetcher: StaticFetcher) -> Harness {
    harness_with(
        fetcher,
        MemoryTemplateStore::with_templates([product_template()]),
        context(),
    )
}

#[tokio::test]
async fn missing_template_fails_before_fetching() {
    let h = harness_with(
        StaticFetcher::new().repeating(product_page(1, 3)),
        MemoryTemplateStore::new(),
        context(),
    );

    let err = h.service.scrape_data(request(5)).await.unwrap_err();

    assert!(err.is_template_not_found());
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert_eq!(h.fetcher.calls(), 0);
    assert!(h.records.is_empty());
}

#[tokio::test]
async fn zero_limit_is_rejected() {
    let h = harness(StaticFetcher::new().repeating(product_page(1, 3)));

    let err = h.service.scrape_data(request(0)).await.unwrap_err();

    assert!(matches!(err, ScrapeError::InvalidRequest(_)));
    assert_eq!(h.fetcher.calls(), 0);
}

#[tokio::test]
async fn full_result_is_persisted_and_retrievable() {
    let h = harness(
        StaticFetcher::new()
            .page(page_url(1), product_page(1, 3))
            .page(page_url(2), product_page(4, 3)),
    );

    let mut req = request(5);
    req.scrape_name = Some("weekly shoes".into());
    let outcome = h.service.scrape_data(req).await.unwrap();

    assert_eq!(outcome.response, 1);
    assert_eq!(outcome.completeness, Completeness::Full);
    assert_eq!(outcome.data_count, 5);
    assert_eq!(outcome.scrape_name, "weekly shoes");
    assert_eq!(outcome.stop_reason, StopReason::LimitReached);

    let saved = h
        .service
        .get_result(&outcome.scrape_guid)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(saved.data_count, 5);
    assert_eq!(saved.web_data.len(), 5);
    assert_eq!(saved.limit_data, 5);
    assert_eq!(saved.favourite_count, 0);
    assert_eq!(saved.account_guid, "acct-1");
    assert_eq!(saved.site_guid, SITE_GUID);
    assert_eq!(saved.created_date, outcome.created_date);
    assert_eq!(saved.scrape_time.len(), "00:00:00".len());
}

#[tokio::test]
async fn short_result_is_partial_but_saved() {
    let h = harness(StaticFetcher::new().page(page_url(1), product_page(1, 3)));

    let outcome = h.service.scrape_data(request(10)).await.unwrap();

    assert_eq!(outcome.response, 0);
    assert_eq!(outcome.completeness, Completeness::Partial);
    assert_eq!(outcome.data_count, 3);
    assert_eq!(outcome.stop_reason, StopReason::ContainerMissing { page: 2 });
    assert_eq!(h.records.len(), 1);
}

#[tokio::test]
async fn cancelled_run_is_saved_as_partial() {
    let ctx = context();
    let fetcher = StaticFetcher::new()
        .page(page_url(1), product_page(1, 3))
        .cancel_on(page_url(2), ctx.shutdown.clone());
    let h = harness_with(
        fetcher,
        MemoryTemplateStore::with_templates([product_template()]),
        ctx,
    );

    let outcome = h.service.scrape_data(request(10)).await.unwrap();

    assert_eq!(outcome.stop_reason, StopReason::Cancelled);
    assert_eq!(outcome.completeness, Completeness::Partial);
    assert_eq!(outcome.response, 0);
    assert_eq!(outcome.data_count, 3);

    let saved = h.records.get_by_guid(&outcome.scrape_guid).await.unwrap().unwrap();
    assert_eq!(saved.web_data.len(), 3);
    assert_eq!(saved.data_count, 3);
}

#[tokio::test]
async fn default_name_is_a_timestamp() {
    let h = harness(StaticFetcher::new().page(page_url(1), product_page(1, 1)));

    let mut req = request(1);
    req.scrape_name = Some("   ".into());
    let outcome = h.service.scrape_data(req).await.unwrap();

    assert_eq!(
        outcome.scrape_name,
        outcome.created_date.format("%Y-%m-%d %H:%M:%S").to_string()
    );
}

#[tokio::test]
async fn store_failure_is_a_persistence_error() {
    let service = ScrapeService::builder()
        .templates(Arc::new(MemoryTemplateStore::with_templates([product_template()])) as Arc<dyn TemplateStore>)
        .records(Arc::new(FailingRecordStore) as Arc<dyn RecordStore>)
        .sites(Arc::new(MemorySiteStore::default()))
        .fetcher(Arc::new(StaticFetcher::new().page(page_url(1), product_page(1, 2))) as Arc<dyn PageFetcher>)
        .ctx(context())
        .build();

    let err = service.scrape_data(request(2)).await.unwrap_err();

    assert!(matches!(err, ScrapeError::Persistence(_)));
    assert_eq!(err.kind(), ErrorKind::Persistence);
    assert!(!err.is_template_not_found());
}

#[tokio::test]
async fn scrape_site_reads_site_configuration() {
    let h = harness(StaticFetcher::new().page(page_url(1), product_page(1, 2)));

    let outcome = h
        .service
        .scrape_site(SITE_GUID, "acct-9", 2, None)
        .await
        .unwrap();

    assert_eq!(outcome.data_count, 2);
    assert_eq!(h.fetcher.requested(), vec![page_url(1)]);
    let saved = h.records.get_by_guid(&outcome.scrape_guid).await.unwrap().unwrap();
    assert_eq!(saved.account_guid, "acct-9");
}

#[tokio::test]
async fn inactive_or_unknown_sites_are_refused() {
    let h = harness(StaticFetcher::new().repeating(product_page(1, 2)));

    let err = h.service.scrape_site("dormant", "acct", 5, None).await.unwrap_err();
    assert!(matches!(err, ScrapeError::SiteInactive(_)));

    let err = h.service.scrape_site("nope", "acct", 5, None).await.unwrap_err();
    assert!(matches!(err, ScrapeError::SiteNotFound(_)));

    assert_eq!(h.fetcher.calls(), 0);
}

#[tokio::test]
async fn preview_url_builds_without_fetching() {
    let h = harness(StaticFetcher::new());

    let url = h.service.preview_url(SITE_GUID, 3).await.unwrap();

    assert_eq!(url.as_deref(), Some("http://shop.test/page/3"));
    assert_eq!(h.fetcher.calls(), 0);
}

#[tokio::test]
async fn inspect_returns_clean_body_and_suggestion() {
    let url = "http://shop.test/page/1";
    let h = harness(StaticFetcher::new().page(url, product_page(1, 3)));

    let inspection = h.service.inspect(url).await.unwrap();

    assert!(inspection.body_html.starts_with("<body>"));
    assert!(!inspection.body_html.contains("listing"));
    let suggestion = inspection.suggestion.unwrap();
    assert_eq!(suggestion.classes, vec!["grid".to_string()]);
    assert_eq!(suggestion.child_count, 3);
}

#[tokio::test]
async fn emits_lifecycle_events() {
    let (tx, rx) = create_event_channel();
    let h = harness_with(
        StaticFetcher::new().page(page_url(1), product_page(1, 2)),
        MemoryTemplateStore::with_templates([product_template()]),
        context().with_events(tx),
    );

    h.service.scrape_data(request(4)).await.unwrap();

    let events = rx.drain();
    assert!(matches!(events.first(), Some(ScrapeEvent::TaskStarted { limit: 4, .. })));
    assert!(events.iter().any(|e| matches!(
        e,
        ScrapeEvent::PageFetched { page: 1, collected: 2, .. }
    )));
    assert!(events.iter().any(|e| matches!(e, ScrapeEvent::PageEmpty { page: 2, .. })));
    assert!(matches!(
        events.last(),
        Some(ScrapeEvent::TaskCompleted { data_count: 2, partial: true, .. })
    ));
}

#[tokio::test]
async fn failed_task_emits_failure_event() {
    let (tx, rx) = create_event_channel();
    let h = harness_with(StaticFetcher::new(), MemoryTemplateStore::new(), context().with_events(tx));

    let _ = h.service.scrape_data(request(4)).await;

    let events = rx.drain();
    assert!(matches!(events.as_slice(), [ScrapeEvent::TaskFailed { .. }]));
}

fn draft(site_guid: &str) -> TemplateDraft {
    TemplateDraft {
        site_guid: site_guid.into(),
        container: Some("card".into()),
        container_tag: "div".into(),
        is_class: true,
        is_id: false,
        is_tag: false,
        tag_data: vec![FieldDescriptor::tag("h2", "Name")],
    }
}

#[tokio::test]
async fn template_service_lifecycle() {
    let store = Arc::new(MemoryTemplateStore::new());
    let service = TemplateService::new(store.clone());

    let created = service.create(draft("s1")).await.unwrap();
    assert!(!created.guid.is_empty());
    assert_eq!(
        service.get_by_site_guid("s1").await.unwrap().unwrap().guid,
        created.guid
    );

    let err = service.create(draft("s1")).await.unwrap_err();
    assert!(matches!(err, ScrapeError::InvalidTemplate(_)));

    // site_guid 不随更新改变
    let mut changed = draft("other-site");
    changed.container_tag = "li".into();
    let updated = service.update(&created.guid, changed).await.unwrap();
    assert_eq!(updated.site_guid, "s1");
    assert_eq!(updated.container_tag, "li");

    let err = service.update("missing", draft("s1")).await.unwrap_err();
    assert!(err.is_template_not_found());

    assert!(service.delete(&created.guid).await.unwrap());
    assert!(service.get_by_site_guid("s1").await.unwrap().is_none());
}

#[tokio::test]
async fn invalid_templates_are_not_stored() {
    let store = Arc::new(MemoryTemplateStore::new());
    let service = TemplateService::new(store.clone());

    let mut bad = draft("s1");
    bad.tag_data = vec![FieldDescriptor::tag("span", "Note")];
    let err = service.create(bad).await.unwrap_err();

    assert!(matches!(err, ScrapeError::InvalidTemplate(_)));
    assert!(store.list().await.unwrap().is_empty());
}
