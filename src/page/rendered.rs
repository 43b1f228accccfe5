//! 已渲染页面：静态HTML或HTTP抓取结果的查询实现
//! 信号来自HTML静态提取，不执行脚本

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use tracing::debug;
use url::Url;

use super::extractor::{ElementRecord, PageExtractor};
use super::selector;
use super::PageQuery;
use crate::error::{RstechscanError, RtsResult};

/// 已渲染页面：持有一次性提取结果，查询只读
pub struct RenderedPage {
    html: String,
    base_url: Option<Url>,
    request_urls: Vec<String>,
    elements: Vec<ElementRecord>,
    inline_script_text: String,
    inline_style_text: String,
    stylesheet_hrefs: Vec<String>,
    // 拉取同源外链样式表用；静态页面无网络能力
    client: Option<Client>,
}

impl RenderedPage {
    /// 从静态HTML构建（无网络能力，资源URL保持原样）
    pub fn from_html(html: &str) -> Self {
        Self::build(html, None, None)
    }

    /// 从抓取结果构建（资源URL基于页面URL解析为绝对形式）
    pub fn from_fetched(html: &str, base_url: Url, client: Client) -> Self {
        Self::build(html, Some(base_url), Some(client))
    }

    fn build(html: &str, base_url: Option<Url>, client: Option<Client>) -> Self {
        let extracted = PageExtractor::new().extract(html);

        // 页面自身URL是首个观测到的请求
        let mut request_urls = Vec::new();
        if let Some(base) = &base_url {
            request_urls.push(base.to_string());
        }
        for raw in extracted.resource_urls() {
            match &base_url {
                Some(base) => {
                    if let Ok(absolute) = base.join(&raw) {
                        request_urls.push(absolute.to_string());
                    }
                }
                None => request_urls.push(raw),
            }
        }

        Self {
            html: html.to_string(),
            request_urls,
            elements: extracted.elements(),
            inline_script_text: extracted.inline_script_text(),
            inline_style_text: extracted.inline_style_text(),
            stylesheet_hrefs: extracted.stylesheet_hrefs(),
            base_url,
            client,
        }
    }

    /// 全局标识符的声明模式（内联脚本文本启发式）
    /// 仅将带初始化的声明视为已定义（`var x;`声明后值仍为undefined）
    fn global_decl_regex(name: &str) -> Option<Regex> {
        let escaped = regex::escape(name);
        let pattern = format!(
            r#"\b(?:function|class)\s+{e}\b|\b(?:var|let|const)\s+{e}\s*=|\b(?:window|globalThis|self)\s*(?:\.\s*{e}\s*=|\[\s*["']{e}["']\s*\]\s*=)"#,
            e = escaped
        );
        Regex::new(&pattern).ok()
    }

    /// 同源外链样式表文本（跨域与拉取失败贡献空串）
    async fn linked_stylesheet_text(&self) -> String {
        let (Some(base), Some(client)) = (&self.base_url, &self.client) else {
            return String::new();
        };

        let mut text = String::new();
        for href in &self.stylesheet_hrefs {
            let Ok(absolute) = base.join(href) else {
                continue;
            };
            if absolute.origin() != base.origin() {
                // 跨域样式表不可读
                continue;
            }

            match client.get(absolute.clone()).send().await {
                Ok(response) if response.status().is_success() => {
                    if let Ok(body) = response.text().await {
                        text.push_str(&body);
                        text.push('\n');
                    }
                }
                Ok(response) => {
                    debug!("样式表[{}]返回状态码 {}", absolute, response.status());
                }
                Err(e) => {
                    debug!("样式表[{}]拉取失败：{}", absolute, e);
                }
            }
        }
        text
    }
}

#[async_trait]
impl PageQuery for RenderedPage {
    async fn content(&self) -> RtsResult<String> {
        Ok(self.html.clone())
    }

    async fn request_urls(&self) -> RtsResult<Vec<String>> {
        Ok(self.request_urls.clone())
    }

    async fn selector_exists(&self, sel: &str) -> RtsResult<bool> {
        selector::any_match(sel, &self.elements)
    }

    async fn global_defined(&self, name: &str) -> RtsResult<bool> {
        let Some(regex) = Self::global_decl_regex(name) else {
            return Err(RstechscanError::DetectorQuery(format!(
                "全局变量名[{}]无法构造匹配模式",
                name
            )));
        };
        Ok(regex.is_match(&self.inline_script_text))
    }

    async fn stylesheet_text(&self) -> RtsResult<String> {
        let mut text = self.inline_style_text.clone();
        let linked = self.linked_stylesheet_text().await;
        if !linked.is_empty() {
            text.push('\n');
            text.push_str(&linked);
        }
        Ok(text)
    }

    async fn close(&self) -> RtsResult<()> {
        // 无持久资源
        Ok(())
    }
}
