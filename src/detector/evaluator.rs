//! 检测评估器：按固定顺序评估六类检测策略
//! 任一策略命中即返回true（短路，后续策略不再查询页面）；
//! 单策略查询失败仅视为该策略未命中，不中断整个指纹的评估

use regex::Regex;
use tracing::debug;

use crate::error::{RstechscanError, RtsResult};
use crate::fingerprint::model::{Fingerprint, PatternList};
use crate::page::PageQuery;

/// 检测评估器
pub struct DetectionEvaluator;

impl DetectionEvaluator {
    /// 评估单个指纹是否命中
    /// 评估只读，不改变页面状态；对同一页面状态重复调用结果一致
    pub async fn detect(fingerprint: &Fingerprint, page: &dyn PageQuery) -> bool {
        let detectors = &fingerprint.detectors;
        // 策略1/2共用页面HTML，仅拉取一次
        let mut html_cache: Option<String> = None;

        // 1. HTML子串包含（任一命中，大小写敏感）
        if !detectors.html_contains.is_empty() {
            match Self::check_html_contains(&detectors.html_contains, page, &mut html_cache).await {
                Ok(true) => return true,
                Ok(false) => {}
                Err(e) => debug!("指纹[{}]策略htmlContains查询失败：{}", fingerprint.name, e),
            }
        }

        // 2. HTML正则
        if let Some(pattern) = &detectors.html_regex {
            match Self::check_html_regex(pattern, page, &mut html_cache).await {
                Ok(true) => return true,
                Ok(false) => {}
                Err(e) => debug!("指纹[{}]策略htmlRegex查询失败：{}", fingerprint.name, e),
            }
        }

        // 3. 请求URL正则（任一URL命中任一模式）
        if let Some(patterns) = &detectors.request_url_regex {
            match Self::check_request_urls(patterns, page).await {
                Ok(true) => return true,
                Ok(false) => {}
                Err(e) => debug!("指纹[{}]策略requestUrlRegex查询失败：{}", fingerprint.name, e),
            }
        }

        // 4. DOM选择器存在性（任一命中）
        if !detectors.selector_exists.is_empty() {
            match Self::check_selectors(&detectors.selector_exists, page).await {
                Ok(true) => return true,
                Ok(false) => {}
                Err(e) => debug!("指纹[{}]策略selectorExists查询失败：{}", fingerprint.name, e),
            }
        }

        // 5. 全局变量已定义（任一命中）
        if !detectors.global_variables.is_empty() {
            match Self::check_globals(&detectors.global_variables, page).await {
                Ok(true) => return true,
                Ok(false) => {}
                Err(e) => debug!("指纹[{}]策略globalVariables查询失败：{}", fingerprint.name, e),
            }
        }

        // 6. 样式表文本正则
        if let Some(pattern) = &detectors.css_comment_regex {
            match Self::check_css_text(pattern, page).await {
                Ok(true) => return true,
                Ok(false) => {}
                Err(e) => debug!("指纹[{}]策略cssCommentRegex查询失败：{}", fingerprint.name, e),
            }
        }

        false
    }

    /// 拉取并缓存页面HTML（同一指纹评估内复用）
    async fn page_html<'a>(
        page: &dyn PageQuery,
        cache: &'a mut Option<String>,
    ) -> RtsResult<&'a str> {
        if cache.is_none() {
            *cache = Some(page.content().await?);
        }
        Ok(cache.as_deref().unwrap_or_default())
    }

    async fn check_html_contains(
        needles: &[String],
        page: &dyn PageQuery,
        cache: &mut Option<String>,
    ) -> RtsResult<bool> {
        let html = Self::page_html(page, cache).await?;
        Ok(needles.iter().any(|needle| html.contains(needle.as_str())))
    }

    async fn check_html_regex(
        pattern: &str,
        page: &dyn PageQuery,
        cache: &mut Option<String>,
    ) -> RtsResult<bool> {
        let regex = Self::compile(pattern)?;
        let html = Self::page_html(page, cache).await?;
        Ok(regex.is_match(html))
    }

    async fn check_request_urls(patterns: &PatternList, page: &dyn PageQuery) -> RtsResult<bool> {
        let urls = page.request_urls().await?;
        for pattern in patterns.patterns() {
            // 单个坏模式只跳过该模式
            let regex = match Self::compile(pattern) {
                Ok(regex) => regex,
                Err(e) => {
                    debug!("请求URL正则[{}]编译失败，跳过：{}", pattern, e);
                    continue;
                }
            };
            if urls.iter().any(|url| regex.is_match(url)) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn check_selectors(selectors: &[String], page: &dyn PageQuery) -> RtsResult<bool> {
        for sel in selectors {
            // 单个坏选择器只跳过该选择器
            match page.selector_exists(sel).await {
                Ok(true) => return Ok(true),
                Ok(false) => {}
                Err(e) => debug!("选择器[{}]查询失败，跳过：{}", sel, e),
            }
        }
        Ok(false)
    }

    async fn check_globals(names: &[String], page: &dyn PageQuery) -> RtsResult<bool> {
        for name in names {
            match page.global_defined(name).await {
                Ok(true) => return Ok(true),
                Ok(false) => {}
                Err(e) => debug!("全局变量[{}]查询失败，跳过：{}", name, e),
            }
        }
        Ok(false)
    }

    async fn check_css_text(pattern: &str, page: &dyn PageQuery) -> RtsResult<bool> {
        let regex = Self::compile(pattern)?;
        let css = page.stylesheet_text().await?;
        Ok(regex.is_match(&css))
    }

    fn compile(pattern: &str) -> RtsResult<Regex> {
        Regex::new(pattern)
            .map_err(|e| RstechscanError::DetectorQuery(format!("正则[{}]编译失败：{}", pattern, e)))
    }
}
