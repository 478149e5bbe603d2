pub mod fetcher;
pub mod store;

pub use fetcher::PageFetcher;
pub use store::{RecordStore, SiteStore, TemplateStore};
