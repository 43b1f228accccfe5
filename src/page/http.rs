//! HTTP页面后端：抓取页面并构建RenderedPage
//! 请求URL近似为HTML中引用的资源；需要完整渲染信号时可替换为浏览器后端

use std::time::Duration;
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use url::Url;

use super::rendered::RenderedPage;
use super::{NavigateOptions, PageBackend, PageQuery};
use crate::error::{RstechscanError, RtsResult};

/// HTTP抓取后端
#[derive(Debug, Default, Clone)]
pub struct HttpPageBackend;

impl HttpPageBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PageBackend for HttpPageBackend {
    async fn open(&self, url: &str, options: &NavigateOptions) -> RtsResult<Box<dyn PageQuery>> {
        let parsed = Url::parse(url)
            .map_err(|e| RstechscanError::Navigation(format!("URL[{}]解析失败：{}", url, e)))?;

        let client = Client::builder()
            .timeout(Duration::from_millis(options.timeout_ms))
            .build()
            .map_err(|e| RstechscanError::Navigation(format!("HTTP客户端构建失败：{}", e)))?;

        let response = client
            .get(parsed)
            .header("User-Agent", "Rstechscan/0.1.0")
            .header("Accept-Encoding", "gzip, deflate")
            .send()
            .await
            .map_err(|e| RstechscanError::Navigation(format!("页面[{}]请求失败：{}", url, e)))?;

        if !response.status().is_success() {
            return Err(RstechscanError::Navigation(format!(
                "页面[{}]返回状态码 {}",
                url,
                response.status()
            )));
        }

        // 跟随重定向后的最终URL作为资源解析基准
        let final_url = response.url().clone();
        let html = response
            .text()
            .await
            .map_err(|e| RstechscanError::Navigation(format!("页面[{}]读取响应失败：{}", url, e)))?;

        debug!("页面[{}]抓取完成，HTML长度：{}", final_url, html.len());

        Ok(Box::new(RenderedPage::from_fetched(&html, final_url, client)))
    }
}
