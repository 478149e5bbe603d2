use bon::Builder;
use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// URL 片段
///
/// 按顺序拼接为 `identifier` + `form_id`，`is_page` 标记页码占位片段。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlPatternSegment {
    pub identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_id: Option<String>,
    #[serde(default)]
    pub is_page: bool,
}

impl UrlPatternSegment {
    pub fn literal(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            form_id: None,
            is_page: false,
        }
    }

    pub fn with_form_id(identifier: impl Into<String>, form_id: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            form_id: Some(form_id.into()),
            is_page: false,
        }
    }

    /// 页码占位片段，`form_id` 在翻页时被替换
    pub fn page(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            form_id: None,
            is_page: true,
        }
    }
}

/// 字段描述
///
/// 与存储格式一一对应，使用前需经 `engine::template` 编译校验。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FieldDescriptor {
    pub tag: String,
    /// 属性名，空字符串表示仅按标签名匹配
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub attr_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    /// 逗号分隔的输出字段名
    pub title: String,
    #[serde(default)]
    pub is_container: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_identifier: Option<String>,
}

impl FieldDescriptor {
    /// 仅按标签名匹配的字段
    pub fn tag(tag: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    /// 按标签名与单个属性匹配的字段
    pub fn attr(
        tag: impl Into<String>,
        attr_name: impl Into<String>,
        identifier: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            tag: tag.into(),
            attr_name: Some(attr_name.into()),
            identifier: Some(identifier.into()),
            title: title.into(),
            ..Default::default()
        }
    }

    /// 将字段标记为容器，其输出取自子元素列表
    pub fn with_children(
        mut self,
        child_tag: impl Into<String>,
        child_attr: Option<(&str, &str)>,
    ) -> Self {
        self.is_container = true;
        self.child_tag = Some(child_tag.into());
        if let Some((name, value)) = child_attr {
            self.child_type = Some(name.to_string());
            self.child_identifier = Some(value.to_string());
        }
        self
    }
}

/// 站点抓取模板
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub guid: String,
    pub site_guid: String,
    /// 容器的 class 或 id 值
    #[serde(default)]
    pub container: Option<String>,
    pub container_tag: String,
    #[serde(default)]
    pub is_class: bool,
    #[serde(default)]
    pub is_id: bool,
    #[serde(default)]
    pub is_tag: bool,
    #[serde(default)]
    pub tag_data: Vec<FieldDescriptor>,
}

/// 抓取请求 (瞬态，不直接持久化)
#[derive(Debug, Clone, Serialize, Deserialize, Builder)]
pub struct ScrapeRequest {
    #[builder(into)]
    pub site_guid: String,
    #[builder(into)]
    pub account_guid: String,
    pub limit_data: usize,
    #[serde(default)]
    #[builder(into)]
    pub scrape_name: Option<String>,
    #[builder(into)]
    pub site_url: String,
    #[serde(default)]
    #[builder(default)]
    pub url_pattern: Vec<UrlPatternSegment>,
    #[serde(default)]
    #[builder(default, into)]
    pub space_rule: String,
}

/// 单个字段的抽取值
///
/// 占位值 (未匹配) 序列化为 `null`。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Missing,
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    pub fn is_missing(&self) -> bool {
        matches!(self, FieldValue::Missing)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            FieldValue::List(items) => Some(items),
            _ => None,
        }
    }
}

/// 记录中的保留字段名，模板字段不可占用
pub const RESERVED_FIELDS: [&str; 3] = ["index", "is_favourite", "note"];

/// 单条抓取记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub index: usize,
    #[serde(default)]
    pub is_favourite: bool,
    #[serde(default)]
    pub note: String,
    #[serde(flatten)]
    pub fields: IndexMap<String, FieldValue>,
}

impl Record {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            is_favourite: false,
            note: String::new(),
            fields: IndexMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }
}

/// 持久化的抓取结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeResult {
    pub guid: String,
    pub account_guid: String,
    pub site_guid: String,
    pub scrape_name: String,
    pub limit_data: usize,
    pub data_count: usize,
    #[serde(default)]
    pub favourite_count: usize,
    pub web_data: Vec<Record>,
    /// 耗时，格式 `HH:MM:SS`
    pub scrape_time: String,
    pub created_date: NaiveDateTime,
}

/// 完成度分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
pub enum Completeness {
    /// 采集数量未达到上限，但结果已保存
    Partial,
    Full,
}

impl Completeness {
    pub fn classify(data_count: usize, limit_data: usize) -> Self {
        if data_count < limit_data {
            Completeness::Partial
        } else {
            Completeness::Full
        }
    }

    /// 对外的数值响应码：部分为 0，完整为 1
    pub fn response(self) -> u8 {
        match self {
            Completeness::Partial => 0,
            Completeness::Full => 1,
        }
    }
}

/// 翻页循环的终止原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum StopReason {
    /// 已达到目标数量
    LimitReached,
    /// 页面获取失败
    #[strum(to_string = "FetchFailed(page {page})")]
    FetchFailed { page: usize },
    /// 页面中未找到容器
    #[strum(to_string = "ContainerMissing(page {page})")]
    ContainerMissing { page: usize },
    /// URL 模式没有页码片段，无后续页面
    NoMorePages,
    /// 达到翻页上限
    #[strum(to_string = "PageCeiling({pages})")]
    PageCeiling { pages: usize },
    Cancelled,
}

/// 一次抓取任务对外返回的结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScrapeOutcome {
    pub response: u8,
    pub completeness: Completeness,
    pub scrape_guid: String,
    pub scrape_name: String,
    pub created_date: NaiveDateTime,
    pub data_count: usize,
    pub stop_reason: StopReason,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_serializes_flat_with_null_placeholder() {
        let mut record = Record::new(2);
        record
            .fields
            .insert("name".into(), FieldValue::Text("Widget".into()));
        record.fields.insert("price".into(), FieldValue::Missing);
        record.fields.insert(
            "images".into(),
            FieldValue::List(vec!["a.png".into(), "b.png".into()]),
        );

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["index"], 2);
        assert_eq!(json["name"], "Widget");
        assert!(json["price"].is_null());
        assert_eq!(json["images"][1], "b.png");

        let back: Record = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn completeness_maps_to_response_code() {
        assert_eq!(Completeness::classify(30, 50), Completeness::Partial);
        assert_eq!(Completeness::classify(30, 50).response(), 0);
        assert_eq!(Completeness::classify(50, 50).response(), 1);
    }

    #[test]
    fn descriptor_reads_type_key() {
        let yaml = r#"
tag: span
type: class
identifier: price
title: Price
"#;
        let field: FieldDescriptor = serde_yml::from_str(yaml).unwrap();
        assert_eq!(field.attr_name.as_deref(), Some("class"));
        assert!(!field.is_container);
    }
}
