//! 基于模板的网页列表抓取引擎
//!
//! 按站点模板翻页抓取列表页，将每个容器内的字段对齐为一条记录并持久化。

pub mod core;
pub mod engine;
pub mod interfaces;
pub mod network;
pub mod store;
pub mod ui;
pub mod utils;

pub use crate::core::error::{ErrorKind, Result, ScrapeError};
