//! 引擎运行时上下文 (Runtime Context)
//!
//! 聚合配置、事件分发句柄与取消令牌，随单次抓取调用在栈上传递。

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::core::config::AppConfig;
use crate::core::event::{EventSender, ScrapeEvent};

#[derive(Clone)]
pub struct ScrapeContext {
    /// 应用配置
    pub config: Arc<AppConfig>,
    /// 事件发送器（可选）
    pub events: Option<EventSender>,
    /// 优雅退出令牌
    pub shutdown: CancellationToken,
}

impl ScrapeContext {
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self {
            config,
            events: None,
            shutdown: CancellationToken::new(),
        }
    }

    /// 设置事件发送器
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    /// 使用外部提供的取消令牌
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn emit(&self, event: ScrapeEvent) {
        if let Some(ref sender) = self.events {
            sender.emit(event);
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}
