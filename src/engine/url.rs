//! URL 构建器 (URL Builder)
//!
//! 由基础 URL 与有序片段拼接出目标地址，翻页时替换页码片段。

use crate::core::model::UrlPatternSegment;

/// 拼接 URL
///
/// 片段为空时返回 `None`；否则依次追加 `identifier` 与 `form_id`，
/// `form_id` 中的空格替换为 `space_rule`。
pub fn build_url(base_url: &str, pattern: &[UrlPatternSegment], space_rule: &str) -> Option<String> {
    if pattern.is_empty() {
        return None;
    }

    let mut url = String::from(base_url);
    for segment in pattern {
        url.push_str(&segment.identifier);
        if let Some(form_id) = segment.form_id.as_deref().filter(|f| !f.is_empty()) {
            url.push_str(&form_id.replace(' ', space_rule));
        }
    }
    Some(url)
}

/// 生成指定页码的片段序列，页码从 1 开始
pub fn page_pattern(pattern: &[UrlPatternSegment], page: usize) -> Vec<UrlPatternSegment> {
    pattern
        .iter()
        .map(|segment| {
            if segment.is_page {
                UrlPatternSegment {
                    identifier: segment.identifier.clone(),
                    form_id: Some(page.to_string()),
                    is_page: true,
                }
            } else {
                segment.clone()
            }
        })
        .collect()
}

/// 分页 URL 生成器
#[derive(Debug, Clone)]
pub struct PageUrls<'a> {
    base_url: &'a str,
    pattern: &'a [UrlPatternSegment],
    space_rule: &'a str,
}

impl<'a> PageUrls<'a> {
    pub fn new(base_url: &'a str, pattern: &'a [UrlPatternSegment], space_rule: &'a str) -> Self {
        Self {
            base_url,
            pattern,
            space_rule,
        }
    }

    pub fn is_paginated(&self) -> bool {
        self.pattern.iter().any(|s| s.is_page)
    }

    /// 第 `page` 页的 URL
    ///
    /// 没有页码片段时只存在第一页：空模式直接使用基础 URL，
    /// 静态模式按原样拼接一次。
    pub fn page_url(&self, page: usize) -> Option<String> {
        if page == 0 || (page > 1 && !self.is_paginated()) {
            return None;
        }
        if self.pattern.is_empty() {
            return Some(self.base_url.to_string());
        }
        build_url(self.base_url, &page_pattern(self.pattern, page), self.space_rule)
    }
}
