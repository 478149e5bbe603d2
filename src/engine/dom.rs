//! DOM 查询引擎 (DOM Query Engine)
//!
//! 基于 `scraper` 的结构化查询：标签名 + 单个属性相等匹配，不依赖 CSS 选择器拼接。

use std::sync::OnceLock;

use scraper::{ElementRef, Html, Selector};

/// 容器选择方式，在模板编译时确定
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerSelector {
    ByClass(String),
    ById(String),
    ByTag,
}

/// 属性匹配条件，`value` 为空时只要求属性存在
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrMatch {
    pub name: String,
    pub value: Option<String>,
}

/// 标签匹配器
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagMatcher {
    pub tag: String,
    pub attr: Option<AttrMatch>,
}

impl TagMatcher {
    pub fn new(tag: &str, attr_name: Option<&str>, attr_value: Option<&str>) -> Self {
        let attr = attr_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| AttrMatch {
                name: name.to_ascii_lowercase(),
                value: attr_value.map(str::to_string),
            });
        Self {
            tag: tag.trim().to_ascii_lowercase(),
            attr,
        }
    }

    pub fn tag_only(tag: &str) -> Self {
        Self::new(tag, None, None)
    }

    pub fn matches(&self, el: &ElementRef<'_>) -> bool {
        let element = el.value();
        if !element.name().eq_ignore_ascii_case(&self.tag) {
            return false;
        }

        let Some(attr) = &self.attr else {
            return true;
        };
        let Some(actual) = element.attr(&attr.name) else {
            return false;
        };
        match &attr.value {
            None => true,
            // class 按空白分隔的任一 token 匹配
            Some(expected) if attr.name == "class" => {
                actual == expected || element.classes().any(|c| c == expected)
            }
            Some(expected) => actual == expected,
        }
    }
}

fn body_selector() -> &'static Selector {
    static BODY: OnceLock<Selector> = OnceLock::new();
    BODY.get_or_init(|| Selector::parse("body").expect("static selector"))
}

/// 已解析的页面
///
/// 解析时移除全部注释节点，所有查询都限定在 `<body>` 子树内。
pub struct Document {
    html: Html,
}

impl Document {
    pub fn parse(source: &str) -> Self {
        let mut html = Html::parse_document(source);

        let comments: Vec<_> = html
            .tree
            .nodes()
            .filter(|node| node.value().is_comment())
            .map(|node| node.id())
            .collect();
        for id in comments {
            if let Some(mut node) = html.tree.get_mut(id) {
                node.detach();
            }
        }

        Self { html }
    }

    pub fn body(&self) -> Option<ElementRef<'_>> {
        self.html.select(body_selector()).next()
    }

    /// 清理后的 `<body>` HTML
    pub fn body_html(&self) -> Option<String> {
        self.body().map(|body| body.html())
    }

    /// 查找全部容器元素 (文档顺序)
    pub fn find_container(&self, container_tag: &str, selector: &ContainerSelector) -> Vec<ElementRef<'_>> {
        let Some(body) = self.body() else {
            return Vec::new();
        };

        let matcher = match selector {
            ContainerSelector::ByClass(value) => TagMatcher::new(container_tag, Some("class"), Some(value)),
            ContainerSelector::ById(value) => TagMatcher::new(container_tag, Some("id"), Some(value)),
            ContainerSelector::ByTag => TagMatcher::tag_only(container_tag),
        };
        find_all_fields(body, &matcher)
    }

    /// 推测列表容器：直接子 `div` 最多的 `div`
    pub fn suggest_container(&self) -> Option<ContainerSuggestion> {
        let body = self.body()?;
        let div = TagMatcher::tag_only("div");

        descendants(body)
            .filter(|el| div.matches(el))
            .map(|el| {
                let children = el
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|child| div.matches(child))
                    .count();
                (el, children)
            })
            .filter(|(_, children)| *children > 0)
            // 并列时保留文档中靠前的元素
            .fold(None::<(ElementRef<'_>, usize)>, |best, candidate| match best {
                Some(b) if b.1 >= candidate.1 => Some(b),
                _ => Some(candidate),
            })
            .map(|(el, child_count)| ContainerSuggestion {
                id: el.value().id().map(str::to_string),
                classes: el.value().classes().map(str::to_string).collect(),
                child_count,
                html: el.html(),
            })
    }
}

/// 容器推测结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSuggestion {
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub child_count: usize,
    pub html: String,
}

/// 后代元素 (不含自身，文档顺序)
fn descendants<'a>(parent: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    parent.descendants().skip(1).filter_map(ElementRef::wrap)
}

/// 第一个匹配的后代元素
pub fn find_field<'a>(parent: ElementRef<'a>, matcher: &TagMatcher) -> Option<ElementRef<'a>> {
    descendants(parent).find(|el| matcher.matches(el))
}

/// 全部匹配的后代元素
pub fn find_all_fields<'a>(parent: ElementRef<'a>, matcher: &TagMatcher) -> Vec<ElementRef<'a>> {
    descendants(parent).filter(|el| matcher.matches(el)).collect()
}

/// 可见文本：逐个文本节点去除首尾空白，丢弃空节点后以单个空格连接
pub fn visible_text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
