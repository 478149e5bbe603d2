//! 字段抽取器 (Field Extractor)
//!
//! 对单个条目元素应用一条字段规则，产出一个或多个命名值。纯函数，无副作用。

use scraper::ElementRef;
use url::Url;

use crate::core::model::FieldValue;
use crate::engine::dom::{find_all_fields, visible_text};
use crate::engine::template::{ChildOutput, FieldKind, FieldRule};

/// 一条规则的输出：(字段名, 值)，顺序与规则中的字段名一致
pub type Extracted = Vec<(String, FieldValue)>;

/// 站点地址，用于补全相对链接
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteUrl {
    base: String,
    domain: String,
}

impl SiteUrl {
    pub fn new(site_url: &str) -> Self {
        Self {
            base: site_url.to_string(),
            domain: site_domain(site_url),
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// 链接未包含站点域名时直接以站点 URL 作前缀
    pub fn resolve(&self, href: &str) -> String {
        if !self.domain.is_empty() && href.contains(&self.domain) {
            href.to_string()
        } else {
            format!("{}{}", self.base, href)
        }
    }
}

/// 去除协议与 `www.` 前缀后的站点域名
fn site_domain(site_url: &str) -> String {
    if let Ok(url) = Url::parse(site_url)
        && let Some(host) = url.host_str()
    {
        return host.trim_start_matches("www.").to_string();
    }

    let stripped = site_url
        .split_once("://")
        .map_or(site_url, |(_, rest)| rest);
    stripped
        .trim_start_matches("www.")
        .trim_end_matches('/')
        .to_string()
}

/// 规则对应的全部占位值
pub fn placeholders(rule: &FieldRule) -> Extracted {
    rule.names
        .iter()
        .map(|name| (name.clone(), FieldValue::Missing))
        .collect()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn text_value(el: ElementRef<'_>) -> FieldValue {
    let text = visible_text(el);
    if text.is_empty() {
        FieldValue::Missing
    } else {
        FieldValue::Text(text)
    }
}

/// 单值输出绑定到最后一个字段名
fn bound_slot(out: &mut Extracted) -> Option<&mut FieldValue> {
    out.last_mut().map(|(_, value)| value)
}

/// 抽取一条字段规则
///
/// 元素缺失时输出全部占位值。除按下标绑定的文本容器外，值只写入最后一个字段名，
/// 其余字段名保持占位。
pub fn extract(element: Option<ElementRef<'_>>, rule: &FieldRule, site: &SiteUrl) -> Extracted {
    let mut out = placeholders(rule);
    let Some(element) = element else {
        return out;
    };

    match &rule.kind {
        FieldKind::Container { child, output } => {
            let children = find_all_fields(element, child);
            match output {
                ChildOutput::Images => {
                    let images = FieldValue::List(
                        children
                            .iter()
                            .filter_map(|c| non_empty(c.value().attr("src")))
                            .map(str::to_string)
                            .collect(),
                    );
                    if let Some(slot) = bound_slot(&mut out) {
                        *slot = images;
                    }
                }
                ChildOutput::Links => {
                    let links = FieldValue::List(
                        children
                            .iter()
                            .filter_map(|c| non_empty(c.value().attr("href")))
                            .map(|href| site.resolve(href))
                            .collect(),
                    );
                    if let Some(slot) = bound_slot(&mut out) {
                        *slot = links;
                    }
                }
                ChildOutput::Texts => {
                    // 多余的子元素被丢弃，不足时剩余字段名保持占位
                    for (slot, child) in out.iter_mut().zip(children) {
                        slot.1 = text_value(child);
                    }
                }
            }
        }
        FieldKind::Image => {
            if let Some(src) = non_empty(element.value().attr("src"))
                && let Some(slot) = bound_slot(&mut out)
            {
                *slot = FieldValue::Text(src.to_string());
            }
        }
        FieldKind::Link => {
            if let Some(href) = non_empty(element.value().attr("href"))
                && let Some(slot) = bound_slot(&mut out)
            {
                *slot = FieldValue::Text(site.resolve(href));
            }
        }
        FieldKind::Text => {
            if let Some(slot) = bound_slot(&mut out) {
                *slot = text_value(element);
            }
        }
    }

    out
}
