//! 终端进度渲染引擎 (Terminal UI Progress Engine)
//!
//! 基于 `indicatif` 实现非阻塞式进度条，消费抓取事件通道。

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use parking_lot::RwLock;
use tokio::task::JoinHandle;

use crate::core::event::{EventReceiver, ScrapeEvent};

static MULTI: OnceLock<MultiProgress> = OnceLock::new();

/// 获取全局进度容器实例
pub fn get_multi() -> &'static MultiProgress {
    MULTI.get_or_init(MultiProgress::new)
}

#[derive(Default)]
struct UiState {
    /// 任务状态条
    main_bar: Option<ProgressBar>,
    /// 记录采集进度条
    record_bar: Option<ProgressBar>,
}

static STATE: OnceLock<Arc<RwLock<UiState>>> = OnceLock::new();

fn get_state() -> &'static Arc<RwLock<UiState>> {
    STATE.get_or_init(|| Arc::new(RwLock::new(UiState::default())))
}

/// 进度协调器
pub struct Ui;

impl Ui {
    /// 启动事件监听循环，发送端全部关闭后退出
    pub fn run(receiver: EventReceiver) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = receiver.recv_async().await {
                Self::handle_event(event);
            }
        })
    }

    fn handle_event(event: ScrapeEvent) {
        let multi = get_multi();
        let mut ui = get_state().write();

        match event {
            ScrapeEvent::TaskStarted { site_guid, limit } => {
                let main = multi.add(ProgressBar::new_spinner());
                if let Ok(style) = ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {msg}")
                {
                    main.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
                }
                main.set_message(format!("🕸️ {}", site_guid));
                main.enable_steady_tick(Duration::from_millis(100));

                let records = multi.add(ProgressBar::new(limit as u64));
                if let Ok(style) = ProgressStyle::default_bar()
                    .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
                {
                    records.set_style(style.progress_chars("█▉▊▋▌▍▎▏  "));
                }

                ui.main_bar = Some(main);
                ui.record_bar = Some(records);
            }
            ScrapeEvent::PageFetched {
                page,
                url,
                collected,
                ..
            } => {
                if let Some(ref bar) = ui.record_bar {
                    bar.set_position(collected as u64);
                    bar.set_message(format!("p{} {}", page, truncate_string(&url, 40)));
                }
            }
            ScrapeEvent::PageEmpty { page, .. } => {
                if let Some(ref bar) = ui.main_bar {
                    bar.set_message(format!("📭 第 {} 页无数据，停止翻页", page));
                }
            }
            ScrapeEvent::FetchFailed { page, error, .. } => {
                if let Some(ref bar) = ui.main_bar {
                    bar.set_message(format!("⚠️ 第 {} 页获取失败: {}", page, truncate_string(&error, 60)));
                }
            }
            ScrapeEvent::Persisting { data_count } => {
                if let Some(ref bar) = ui.main_bar {
                    bar.set_message(format!("💾 SAVING: {} records", data_count));
                }
            }
            ScrapeEvent::TaskCompleted {
                scrape_name,
                data_count,
                partial,
            } => {
                if let Some(ref bar) = ui.record_bar {
                    bar.set_position(data_count as u64);
                    if partial {
                        bar.abandon_with_message("PARTIAL");
                    } else {
                        bar.finish_with_message("FULL");
                    }
                }
                if let Some(ref bar) = ui.main_bar {
                    bar.finish_with_message(format!("✅ {} ({} records)", scrape_name, data_count));
                }
            }
            ScrapeEvent::TaskFailed { error } => {
                if let Some(ref bar) = ui.record_bar {
                    bar.abandon();
                }
                match ui.main_bar {
                    Some(ref bar) => bar.abandon_with_message(format!("❌ FAILED: {}", error)),
                    None => {
                        let _ = multi.println(format!("❌ FAILED: {}", error));
                    }
                }
            }
        }
    }
}

fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}
