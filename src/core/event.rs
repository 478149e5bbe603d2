//! 事件系统定义
//!
//! 用于抓取引擎与 UI 之间的解耦通信

use flume::{Receiver, Sender};

/// 抓取事件类型
#[derive(Debug, Clone)]
pub enum ScrapeEvent {
    /// 任务开始
    TaskStarted { site_guid: String, limit: usize },

    /// 页面已获取并完成字段定位
    PageFetched {
        page: usize,
        url: String,
        collected: usize,
        limit: usize,
    },

    /// 页面中未找到容器
    PageEmpty { page: usize, url: String },

    /// 页面获取失败
    FetchFailed {
        page: usize,
        url: String,
        error: String,
    },

    /// 正在写入结果存储
    Persisting { data_count: usize },

    /// 任务完成
    TaskCompleted {
        scrape_name: String,
        data_count: usize,
        partial: bool,
    },

    /// 任务失败
    TaskFailed { error: String },
}

/// 事件发送器
#[derive(Clone)]
pub struct EventSender {
    tx: Sender<ScrapeEvent>,
}

impl EventSender {
    pub fn new(tx: Sender<ScrapeEvent>) -> Self {
        Self { tx }
    }

    /// 发送事件，接收端关闭时静默丢弃
    pub fn emit(&self, event: ScrapeEvent) {
        let _ = self.tx.send(event);
    }
}

/// 事件接收器
pub struct EventReceiver {
    rx: Receiver<ScrapeEvent>,
}

impl EventReceiver {
    pub fn new(rx: Receiver<ScrapeEvent>) -> Self {
        Self { rx }
    }

    /// 非阻塞接收事件
    pub fn try_recv(&self) -> Option<ScrapeEvent> {
        self.rx.try_recv().ok()
    }

    /// 异步接收事件
    pub async fn recv_async(&self) -> Option<ScrapeEvent> {
        self.rx.recv_async().await.ok()
    }

    /// 取出当前已缓冲的全部事件
    pub fn drain(&self) -> Vec<ScrapeEvent> {
        self.rx.drain().collect()
    }
}

/// 创建事件通道
pub fn create_event_channel() -> (EventSender, EventReceiver) {
    let (tx, rx) = flume::unbounded();
    (EventSender::new(tx), EventReceiver::new(rx))
}
