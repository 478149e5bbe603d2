//! 模板编译 (Template Compilation)
//!
//! 将存储格式的 `Template` 校验并转换为引擎内部使用的强类型规则：
//! 容器选择方式、字段种类与规范化后的输出字段名都只在此处解析一次。

use std::collections::HashSet;

use crate::core::error::{Result, ScrapeError};
use crate::core::model::{FieldDescriptor, RESERVED_FIELDS, Template};
use crate::engine::dom::{ContainerSelector, TagMatcher};

/// 容器字段的子元素输出方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildOutput {
    /// 每个子元素的 `src`
    Images,
    /// 每个子元素解析后的 `href`
    Links,
    /// 输出名按下标绑定子元素文本
    Texts,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Image,
    Link,
    Container { child: TagMatcher, output: ChildOutput },
}

/// 编译后的字段规则
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRule {
    /// 规范化后的输出字段名 (至少一个)
    pub names: Vec<String>,
    pub matcher: TagMatcher,
    pub kind: FieldKind,
}

/// 编译后的模板
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledTemplate {
    pub guid: String,
    pub site_guid: String,
    pub container_tag: String,
    pub selector: ContainerSelector,
    pub fields: Vec<FieldRule>,
}

impl CompiledTemplate {
    pub fn compile(template: &Template) -> Result<Self> {
        let container_tag = template.container_tag.trim();
        if container_tag.is_empty() {
            return Err(invalid(template, "container_tag is empty"));
        }

        let selector = resolve_selector(template)?;

        if template.tag_data.is_empty() {
            return Err(invalid(template, "tag_data is empty"));
        }

        let mut seen = HashSet::new();
        let mut fields = Vec::with_capacity(template.tag_data.len());
        for (idx, descriptor) in template.tag_data.iter().enumerate() {
            let rule = compile_field(descriptor)
                .map_err(|reason| invalid(template, &format!("field #{}: {}", idx, reason)))?;
            for name in &rule.names {
                if !seen.insert(name.clone()) {
                    return Err(invalid(template, &format!("duplicate field name `{}`", name)));
                }
            }
            fields.push(rule);
        }

        Ok(Self {
            guid: template.guid.clone(),
            site_guid: template.site_guid.clone(),
            container_tag: container_tag.to_ascii_lowercase(),
            selector,
            fields,
        })
    }

    /// 全部输出字段名 (模板顺序)
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .flat_map(|rule| rule.names.iter().map(String::as_str))
    }
}

fn invalid(template: &Template, reason: &str) -> ScrapeError {
    ScrapeError::InvalidTemplate(format!("{} (site {}): {}", template.guid, template.site_guid, reason))
}

fn resolve_selector(template: &Template) -> Result<ContainerSelector> {
    let flags = [template.is_class, template.is_id, template.is_tag];
    if flags.iter().filter(|f| **f).count() > 1 {
        return Err(invalid(template, "is_class, is_id and is_tag are mutually exclusive"));
    }

    let value = template
        .container
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty());

    match (template.is_class, template.is_id, value) {
        (true, _, Some(v)) => Ok(ContainerSelector::ByClass(v.to_string())),
        (_, true, Some(v)) => Ok(ContainerSelector::ById(v.to_string())),
        (true, _, None) | (_, true, None) => Err(invalid(template, "container value is empty")),
        _ => Ok(ContainerSelector::ByTag),
    }
}

/// 规范化输出字段名：去除首尾空白、转小写、空格替换为下划线
pub fn normalize_name(raw: &str) -> String {
    raw.trim().to_lowercase().replace(' ', "_")
}

fn compile_field(descriptor: &FieldDescriptor) -> std::result::Result<FieldRule, String> {
    let tag = descriptor.tag.trim();
    if tag.is_empty() {
        return Err("tag is empty".into());
    }

    let names: Vec<String> = descriptor.title.split(',').map(normalize_name).collect();
    if names.iter().any(String::is_empty) {
        return Err(format!("title `{}` contains an empty name", descriptor.title));
    }
    if let Some(reserved) = names.iter().find(|n| RESERVED_FIELDS.contains(&n.as_str())) {
        return Err(format!("`{}` is a reserved field name", reserved));
    }

    let matcher = TagMatcher::new(
        tag,
        descriptor.attr_name.as_deref(),
        descriptor.identifier.as_deref(),
    );

    let kind = if descriptor.is_container {
        let child_tag = descriptor
            .child_tag
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| "is_container requires child_tag".to_string())?;
        let child = TagMatcher::new(
            child_tag,
            descriptor.child_type.as_deref(),
            descriptor.child_identifier.as_deref(),
        );
        let output = match child.tag.as_str() {
            "img" => ChildOutput::Images,
            "a" => ChildOutput::Links,
            _ => ChildOutput::Texts,
        };
        FieldKind::Container { child, output }
    } else {
        match matcher.tag.as_str() {
            "img" => FieldKind::Image,
            "a" => FieldKind::Link,
            _ => FieldKind::Text,
        }
    };

    Ok(FieldRule {
        names,
        matcher,
        kind,
    })
}
