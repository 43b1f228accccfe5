//! 全局错误类型定义

use thiserror::Error;
use serde_json::Error as SerdeJsonError;
use std::io::Error as IoError;
use url::ParseError as UrlParseError;

#[derive(Error, Debug)]
pub enum RstechscanError {
    // 指纹源相关错误（单源隔离，仅记录日志，不向调用方传播）
    #[error("指纹源加载失败：{0}")]
    SourceLoad(String),
    #[error("指纹库为空：所有指纹源均加载失败或为空")]
    NoFingerprints,

    // 检测相关错误（单策略隔离，视为该策略未命中）
    #[error("检测查询失败：{0}")]
    DetectorQuery(String),

    // 页面导航错误（对单次扫描致命）
    #[error("页面导航失败：{0}")]
    Navigation(String),

    // 网络相关错误
    #[error("网络请求失败：{0}")]
    Http(#[from] reqwest::Error),

    // 序列化/反序列化错误
    #[error("JSON解析失败：{0}")]
    Json(#[from] SerdeJsonError),
    #[error("MessagePack序列化/反序列化失败：{0}")]
    MsgPack(String),

    // 基础错误
    #[error("IO操作失败：{0}")]
    Io(#[from] IoError),
    #[error("URL解析失败：{0}")]
    Url(#[from] UrlParseError),
    #[error("无效输入：{0}")]
    InvalidInput(String),
}

// 全局Result类型
pub type RtsResult<T> = Result<T, RstechscanError>;
