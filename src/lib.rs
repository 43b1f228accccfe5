//! rstechscan - 基于页面渲染信号的网站技术栈识别库

// 导出全局错误类型
pub use self::error::{RstechscanError, RtsResult};

// 导出配置模块
pub use self::config::{ScanOptions, ConfigManager, CustomConfigBuilder};

// 导出指纹模块核心接口
pub use self::fingerprint::{
    Fingerprint, DetectorSpec, PatternList, FingerprintMap, DetectionOutcome,
    FingerprintResolver, FingerprintCache, UNIDENTIFIED_CATEGORY,
};

// 导出页面抽象核心接口（含内置HTTP后端）
pub use self::page::{
    PageQuery, PageBackend, NavigateOptions, RenderedPage, HttpPageBackend,
};

// 导出检测模块核心接口
pub use self::detector::DetectionEvaluator;

// 导出扫描编排核心接口
pub use self::scanner::{
    ScanOrchestrator, ProgressEvent, ProgressCallback, DetectedCallback, TechnologyHit,
};

// 声明所有子模块
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod page;
pub mod detector;
pub mod scanner;
