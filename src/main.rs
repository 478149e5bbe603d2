//! 应用程序入口 (Application Entrypoint)
//!
//! 负责 CLI 指令解析、日志初始化、依赖注入及系统生命周期管理。

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::fmt::MakeWriter;

use template_scraper::core::config::AppConfig;
use template_scraper::core::event::create_event_channel;
use template_scraper::engine::service::TemplateDraft;
use template_scraper::engine::{ScrapeContext, ScrapeService, TemplateService};
use template_scraper::interfaces::RecordStore;
use template_scraper::network::create_fetcher;
use template_scraper::store::{FileRecordStore, FileTemplateStore, MemorySiteStore};
use template_scraper::ui::progress::{Ui, get_multi};
use template_scraper::utils::save_file;

/// 进度条感知的日志写入器
///
/// 确保日志输出不会破坏终端进度条的渲染布局。
struct IndicatifWriter;

impl io::Write for IndicatifWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let s = String::from_utf8_lossy(buf);
        let _ = get_multi().println(s.trim_end());
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for IndicatifWriter {
    type Writer = IndicatifWriter;

    fn make_writer(&self) -> Self::Writer {
        IndicatifWriter
    }
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// 配置文件路径
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 按站点模板执行抓取
    Scrape {
        /// 站点标识 (config.toml 中的 sites 键)
        #[arg(short, long)]
        site: String,
        /// 账户标识
        #[arg(short, long, default_value = "local")]
        account: String,
        /// 目标记录数
        #[arg(short, long)]
        limit: usize,
        /// 结果名称，缺省为当前时间
        #[arg(short, long)]
        name: Option<String>,
    },
    /// 预览站点某一页的 URL
    Url {
        #[arg(short, long)]
        site: String,
        #[arg(short, long, default_value_t = 1)]
        page: usize,
    },
    /// 获取页面并输出清理后的 body 与推测的容器
    Inspect {
        url: String,
        /// 将 body HTML 写入文件
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// 以 JSON 输出已保存的抓取结果
    Show { guid: String },
    /// 模板管理
    #[command(subcommand)]
    Template(TemplateCommand),
}

#[derive(Subcommand)]
enum TemplateCommand {
    List,
    /// 从 YAML 文件导入模板
    Import { file: PathBuf },
    Delete { guid: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        unsafe {
            std::env::set_var("RUST_LOG", "info");
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(IndicatifWriter)
        .with_target(false)
        .with_ansi(true)
        .init();

    let cli = Cli::parse();
    let config = Arc::new(AppConfig::load_from(&cli.config)?);

    let templates = Arc::new(FileTemplateStore::new(config.templates_dir()));
    let records = Arc::new(FileRecordStore::new(config.results_dir()));

    match cli.command {
        Commands::Template(cmd) => run_template(cmd, TemplateService::new(templates)).await,
        Commands::Show { guid } => {
            let result = records
                .get_by_guid(&guid)
                .await?
                .with_context(|| format!("抓取结果不存在: {}", guid))?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        command => {
            // 建立 UI 事件反馈链路
            let (event_sender, event_receiver) = create_event_channel();
            let ui_handle = Ui::run(event_receiver);

            let result = {
                let ctx = ScrapeContext::new(config.clone()).with_events(event_sender);

                // 信号处理与优雅退出
                let shutdown = ctx.shutdown.clone();
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        shutdown.cancel();
                    }
                });

                let service = ScrapeService::builder()
                    .templates(templates)
                    .records(records)
                    .sites(Arc::new(MemorySiteStore::from_config(&config)))
                    .fetcher(create_fetcher(config.clone())?)
                    .ctx(ctx)
                    .build();
                run_scrape(command, &service).await
            };

            // 发送端全部释放后 UI 循环退出
            let _ = ui_handle.await;
            result
        }
    }
}

async fn run_template(cmd: TemplateCommand, service: TemplateService) -> anyhow::Result<()> {
    match cmd {
        TemplateCommand::List => {
            for t in service.list().await? {
                println!("{}  site={}  {} fields", t.guid, t.site_guid, t.tag_data.len());
            }
        }
        TemplateCommand::Import { file } => {
            let raw = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("读取模板文件失败: {:?}", file))?;
            let draft: TemplateDraft = serde_yml::from_str(&raw)?;
            let created = service.create(draft).await?;
            println!("{}", created.guid);
        }
        TemplateCommand::Delete { guid } => {
            if !service.delete(&guid).await? {
                anyhow::bail!("模板不存在: {}", guid);
            }
        }
    }
    Ok(())
}

async fn run_scrape(command: Commands, service: &ScrapeService) -> anyhow::Result<()> {
    match command {
        Commands::Scrape {
            site,
            account,
            limit,
            name,
        } => {
            let outcome = service.scrape_site(&site, &account, limit, name).await?;
            tracing::info!(
                "抓取完成: {} ({} 条, {}, 停止原因: {})",
                outcome.scrape_name,
                outcome.data_count,
                outcome.completeness,
                outcome.stop_reason
            );
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Commands::Url { site, page } => match service.preview_url(&site, page).await? {
            Some(url) => println!("{}", url),
            None => anyhow::bail!("站点 {} 没有第 {} 页", site, page),
        },
        Commands::Inspect { url, out } => {
            let inspection = service.inspect(&url).await?;
            if let Some(s) = &inspection.suggestion {
                println!(
                    "候选容器: div id={:?} class={:?} ({} 个子元素)",
                    s.id, s.classes, s.child_count
                );
            }
            match out {
                Some(path) => {
                    save_file(&path, inspection.body_html.as_bytes()).await?;
                    println!("body 已写入 {:?}", path);
                }
                None => println!("{}", inspection.body_html),
            }
        }
        Commands::Show { .. } | Commands::Template(_) => {}
    }
    Ok(())
}
