//! 页面查询能力抽象（外部协作者接口）与内置HTTP实现

use async_trait::async_trait;

use crate::error::RtsResult;

pub mod extractor;
pub mod selector;
pub mod rendered;
pub mod http;

pub use self::extractor::{ElementRecord, PageExtractor};
pub use self::rendered::RenderedPage;
pub use self::http::HttpPageBackend;

/// 页面导航选项
#[derive(Debug, Clone)]
pub struct NavigateOptions {
    // 导航超时（单位：毫秒）
    pub timeout_ms: u64,
    // 是否无头运行（仅浏览器后端生效）
    pub headless: bool,
}

impl Default for NavigateOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            headless: true,
        }
    }
}

/// 已渲染页面的查询能力
/// 所有查询均为只读，不得改变页面状态；单次查询失败由调用方隔离处理
#[async_trait]
pub trait PageQuery: Send + Sync {
    /// 页面完整HTML
    async fn content(&self) -> RtsResult<String>;

    /// 导航以来观测到的网络请求URL列表
    async fn request_urls(&self) -> RtsResult<Vec<String>>;

    /// 选择器是否命中至少一个元素
    async fn selector_exists(&self, selector: &str) -> RtsResult<bool>;

    /// 全局标识符是否已定义（非undefined）
    async fn global_defined(&self, name: &str) -> RtsResult<bool>;

    /// 可读样式表规则文本（不可读样式表贡献空串）
    async fn stylesheet_text(&self) -> RtsResult<String>;

    /// 释放页面资源
    async fn close(&self) -> RtsResult<()>;
}

/// 页面渲染后端：按URL打开页面，等待网络空闲后交出查询句柄
#[async_trait]
pub trait PageBackend: Send + Sync {
    async fn open(&self, url: &str, options: &NavigateOptions) -> RtsResult<Box<dyn PageQuery>>;
}
