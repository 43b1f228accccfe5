//! 扫描进度事件与回调类型

use std::sync::Arc;
use serde::{Deserialize, Serialize};

/// 扫描生命周期进度事件
/// 每次扫描恰好一个processing开始事件与一个终态事件（completed与error二选一）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ProgressEvent {
    #[serde(rename_all = "camelCase")]
    Processing {
        current: usize,
        total: usize,
        current_url: String,
    },
    #[serde(rename_all = "camelCase")]
    Completed {
        current: usize,
        total: usize,
        current_url: String,
    },
    #[serde(rename_all = "camelCase")]
    Error {
        current: usize,
        total: usize,
        current_url: String,
        message: String,
    },
}

impl ProgressEvent {
    pub fn processing(current: usize, total: usize, url: &str) -> Self {
        Self::Processing {
            current,
            total,
            current_url: url.to_string(),
        }
    }

    pub fn completed(current: usize, total: usize, url: &str) -> Self {
        Self::Completed {
            current,
            total,
            current_url: url.to_string(),
        }
    }

    pub fn error(current: usize, total: usize, url: &str, message: String) -> Self {
        Self::Error {
            current,
            total,
            current_url: url.to_string(),
            message,
        }
    }
}

/// 技术命中通知（命中即回调，不等待扫描结束）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechnologyHit {
    pub name: String,
    pub categories: Vec<String>,
}

/// 进度事件回调
pub type ProgressCallback = Arc<dyn Fn(&ProgressEvent) + Send + Sync>;

/// 技术命中回调
pub type DetectedCallback = Arc<dyn Fn(&TechnologyHit) + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_event_wire_format() {
        let processing = ProgressEvent::processing(1, 3, "https://example.com");
        let json = serde_json::to_string(&processing).unwrap();
        assert!(json.contains(r#""status":"processing""#));
        assert!(json.contains(r#""currentUrl":"https://example.com""#));

        let error = ProgressEvent::error(2, 3, "https://example.com", "超时".to_string());
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains(r#""status":"error""#));
        assert!(json.contains(r#""message":"超时""#));
    }
}
