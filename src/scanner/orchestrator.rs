//! 扫描编排器：单URL扫描全流程
//! 解析指纹库 -> 分类过滤 -> 逐指纹评估 -> 聚合结果并发出进度事件

use std::sync::Arc;
use tracing::{debug, warn};

use super::events::{DetectedCallback, ProgressCallback, ProgressEvent, TechnologyHit};
use crate::config::ScanOptions;
use crate::detector::DetectionEvaluator;
use crate::error::{RstechscanError, RtsResult};
use crate::fingerprint::{DetectionOutcome, Fingerprint, FingerprintCache};
use crate::page::{NavigateOptions, PageBackend};

/// 扫描编排器
pub struct ScanOrchestrator {
    backend: Arc<dyn PageBackend>,
    cache: Arc<FingerprintCache>,
    progress: Option<ProgressCallback>,
    on_detected: Option<DetectedCallback>,
}

impl ScanOrchestrator {
    pub fn new(backend: Arc<dyn PageBackend>) -> Self {
        Self {
            backend,
            cache: Arc::new(FingerprintCache::new()),
            progress: None,
            on_detected: None,
        }
    }

    /// 使用外部共享的指纹缓存（多个编排器/多次扫描共享一次解析）
    pub fn with_cache(mut self, cache: Arc<FingerprintCache>) -> Self {
        self.cache = cache;
        self
    }

    /// 注册进度事件回调
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// 注册技术命中即时回调
    pub fn with_on_detected(mut self, callback: DetectedCallback) -> Self {
        self.on_detected = Some(callback);
        self
    }

    /// 扫描单个URL
    pub async fn scan(&self, url: &str, options: &ScanOptions) -> RtsResult<Vec<DetectionOutcome>> {
        self.scan_at(url, options, 1, 1).await
    }

    /// 批量扫描（顺序执行，事件携带批内进度位置；任一URL失败即中止）
    pub async fn scan_batch(
        &self,
        urls: &[String],
        options: &ScanOptions,
    ) -> RtsResult<Vec<Vec<DetectionOutcome>>> {
        let total = urls.len();
        let mut all = Vec::with_capacity(total);
        for (index, url) in urls.iter().enumerate() {
            all.push(self.scan_at(url, options, index + 1, total).await?);
        }
        Ok(all)
    }

    async fn scan_at(
        &self,
        url: &str,
        options: &ScanOptions,
        current: usize,
        total: usize,
    ) -> RtsResult<Vec<DetectionOutcome>> {
        // 1. 发出processing事件
        self.emit(ProgressEvent::processing(current, total, url));

        // 2. 解析指纹库（经缓存）
        let fingerprints = self.cache.get_or_resolve(options).await;

        // 3. 空库为致命前置条件
        if fingerprints.is_empty() {
            let err = RstechscanError::NoFingerprints;
            self.emit(ProgressEvent::error(current, total, url, err.to_string()));
            return Err(err);
        }
        debug!("指纹库就绪，指纹数：{}", fingerprints.len());

        // 4. 获取页面句柄（后端等待网络空闲后返回）
        let navigate = NavigateOptions {
            timeout_ms: options.timeout_ms,
            headless: options.headless,
        };
        let page = match self.backend.open(url, &navigate).await {
            Ok(page) => page,
            Err(e) => {
                self.emit(ProgressEvent::error(current, total, url, e.to_string()));
                return Err(e);
            }
        };

        // 5. 逐指纹评估（单指纹/单策略失败已在评估器内隔离，循环自身不会中断；
        //    评估失败降级为 detected=false，结果列表不缺条目）
        let mut outcomes = Vec::new();
        for (name, fingerprint) in fingerprints.iter() {
            if !Self::passes_filters(fingerprint, options) {
                continue;
            }

            let detected = DetectionEvaluator::detect(fingerprint, page.as_ref()).await;
            let categories = fingerprint.output_categories();

            if detected {
                if let Some(callback) = &self.on_detected {
                    callback(&TechnologyHit {
                        name: name.clone(),
                        categories: categories.clone(),
                    });
                }
            }

            outcomes.push(DetectionOutcome {
                name: name.clone(),
                categories,
                detected,
            });
        }

        // 6. 释放页面句柄（评估循环无致命错误出口，此处必达）
        if let Err(e) = page.close().await {
            warn!("页面[{}]释放失败：{}", url, e);
        }

        // 7. 发出completed事件
        self.emit(ProgressEvent::completed(current, total, url));
        Ok(outcomes)
    }

    /// 分类过滤：包含与排除独立判定，两者都通过才评估；
    /// 无分类的指纹不参与分类过滤
    fn passes_filters(fingerprint: &Fingerprint, options: &ScanOptions) -> bool {
        let categories = &fingerprint.categories;
        if categories.is_empty() {
            return true;
        }

        if let Some(include) = &options.categories {
            if !categories.iter().any(|category| include.contains(category)) {
                return false;
            }
        }
        if let Some(exclude) = &options.exclude_categories {
            if categories.iter().any(|category| exclude.contains(category)) {
                return false;
            }
        }
        true
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(callback) = &self.progress {
            callback(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use async_trait::async_trait;
    use crate::page::{PageQuery, RenderedPage};

    const PAGE_HTML: &str = r#"
        <html>
        <head><meta name="generator" content="WordPress 6.0"></head>
        <body class="wp-content-body">
            <p>powered by wp-content</p>
            <script>window.React = {};</script>
        </body>
        </html>
    "#;

    /// 固定HTML的后端（替代真实页面渲染协作者）
    struct StaticBackend;

    #[async_trait]
    impl PageBackend for StaticBackend {
        async fn open(
            &self,
            _url: &str,
            _options: &NavigateOptions,
        ) -> RtsResult<Box<dyn PageQuery>> {
            Ok(Box::new(RenderedPage::from_html(PAGE_HTML)))
        }
    }

    /// 导航必失败的后端
    struct UnreachableBackend;

    #[async_trait]
    impl PageBackend for UnreachableBackend {
        async fn open(
            &self,
            url: &str,
            _options: &NavigateOptions,
        ) -> RtsResult<Box<dyn PageQuery>> {
            Err(RstechscanError::Navigation(format!("页面[{}]连接被拒绝", url)))
        }
    }

    fn temp_dir(tag: &str) -> PathBuf {
        let dir =
            std::env::temp_dir().join(format!("rstechscan_scan_{}_{}", tag, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn options_with_fingerprints(tag: &str, combined_json: &str) -> ScanOptions {
        let root = temp_dir(tag);
        let file_path = root.join("fingerprints.json");
        fs::write(&file_path, combined_json).unwrap();

        let mut options = ScanOptions::default();
        options.custom_fingerprints_file = Some(file_path.to_string_lossy().to_string());
        options.corpus_dir = PathBuf::from("nonexistent_corpus_dir");
        options.artifact_paths = Vec::new();
        options
    }

    fn options_with_no_fingerprints() -> ScanOptions {
        let mut options = ScanOptions::default();
        options.corpus_dir = PathBuf::from("nonexistent_corpus_dir");
        options.artifact_paths = Vec::new();
        options
    }

    fn event_recorder() -> (ProgressCallback, Arc<Mutex<Vec<ProgressEvent>>>) {
        let events: Arc<Mutex<Vec<ProgressEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let callback: ProgressCallback = Arc::new(move |event: &ProgressEvent| {
            sink.lock().unwrap().push(event.clone());
        });
        (callback, events)
    }

    #[tokio::test]
    async fn test_scan_detects_global_variable_fingerprint() {
        // 端到端场景A：globalVariables命中，未分类指纹输出unidentified
        let options = options_with_fingerprints(
            "scenario_a",
            r#"{"react":{"detectors":{"globalVariables":["React"]}}}"#,
        );
        let orchestrator = ScanOrchestrator::new(Arc::new(StaticBackend));

        let outcomes = orchestrator.scan("https://example.com", &options).await.unwrap();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].name, "react");
        assert_eq!(outcomes[0].categories, vec!["unidentified".to_string()]);
        assert!(outcomes[0].detected);
    }

    #[tokio::test]
    async fn test_exclude_category_omits_fingerprint() {
        // 端到端场景B：排除过滤命中的指纹不进入结果列表
        let options_json = r#"{
            "wordpress":{"categories":["cms"],"detectors":{"htmlContains":["wp-content"]}},
            "react":{"detectors":{"globalVariables":["React"]}}
        }"#;
        let mut options = options_with_fingerprints("scenario_b", options_json);
        options.exclude_categories = Some(vec!["cms".to_string()]);

        let orchestrator = ScanOrchestrator::new(Arc::new(StaticBackend));
        let outcomes = orchestrator.scan("https://example.com", &options).await.unwrap();

        assert!(outcomes.iter().all(|outcome| outcome.name != "wordpress"));
        assert!(outcomes.iter().any(|outcome| outcome.name == "react"));
    }

    #[tokio::test]
    async fn test_empty_fingerprints_fails_with_events() {
        // 端到端场景C：空指纹库，一个processing后紧跟一个error
        let (callback, events) = event_recorder();
        let orchestrator =
            ScanOrchestrator::new(Arc::new(StaticBackend)).with_progress(callback);

        let result = orchestrator
            .scan("https://example.com", &options_with_no_fingerprints())
            .await;
        assert!(matches!(result, Err(RstechscanError::NoFingerprints)));

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], ProgressEvent::Processing { .. }));
        assert!(matches!(events[1], ProgressEvent::Error { .. }));
    }

    #[tokio::test]
    async fn test_navigation_failure_emits_error_and_propagates() {
        let options = options_with_fingerprints(
            "navfail",
            r#"{"react":{"detectors":{"globalVariables":["React"]}}}"#,
        );
        let (callback, events) = event_recorder();
        let orchestrator =
            ScanOrchestrator::new(Arc::new(UnreachableBackend)).with_progress(callback);

        let result = orchestrator.scan("https://unreachable.invalid", &options).await;
        assert!(matches!(result, Err(RstechscanError::Navigation(_))));

        let events = events.lock().unwrap();
        assert!(matches!(events.last(), Some(ProgressEvent::Error { .. })));
    }

    #[tokio::test]
    async fn test_exclude_wins_over_include() {
        let options_json =
            r#"{"wordpress":{"categories":["cms","blogs"],"detectors":{"htmlContains":["wp-content"]}}}"#;
        let mut options = options_with_fingerprints("exclude_wins", options_json);
        options.categories = Some(vec!["cms".to_string()]);
        options.exclude_categories = Some(vec!["blogs".to_string()]);

        let orchestrator = ScanOrchestrator::new(Arc::new(StaticBackend));
        let outcomes = orchestrator.scan("https://example.com", &options).await.unwrap();
        assert!(outcomes.is_empty());
    }

    #[tokio::test]
    async fn test_category_filter_commutes_with_detection() {
        let options_json = r#"{
            "wordpress":{"categories":["cms"],"detectors":{"htmlContains":["wp-content"]}},
            "shopify":{"categories":["ecommerce"],"detectors":{"htmlContains":["cdn.shopify.com"]}},
            "react":{"categories":["javascript-frameworks"],"detectors":{"globalVariables":["React"]}}
        }"#;

        // 先过滤后评估
        let mut filtered_options = options_with_fingerprints("commute_a", options_json);
        filtered_options.categories = Some(vec!["cms".to_string(), "ecommerce".to_string()]);
        let orchestrator = ScanOrchestrator::new(Arc::new(StaticBackend));
        let mut filtered = orchestrator
            .scan("https://example.com", &filtered_options)
            .await
            .unwrap();

        // 先评估后过滤
        let unfiltered_options = options_with_fingerprints("commute_b", options_json);
        let mut unfiltered = orchestrator
            .scan("https://example.com", &unfiltered_options)
            .await
            .unwrap();
        unfiltered.retain(|outcome| {
            outcome
                .categories
                .iter()
                .any(|category| category == "cms" || category == "ecommerce")
        });

        filtered.sort_by(|a, b| a.name.cmp(&b.name));
        unfiltered.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(filtered, unfiltered);
    }

    #[tokio::test]
    async fn test_detection_failure_degrades_to_false_not_missing() {
        let options_json = r#"{
            "broken":{"detectors":{"htmlRegex":"(unclosed"}},
            "wordpress":{"detectors":{"htmlContains":["wp-content"]}}
        }"#;
        let options = options_with_fingerprints("degrade", options_json);

        let orchestrator = ScanOrchestrator::new(Arc::new(StaticBackend));
        let outcomes = orchestrator.scan("https://example.com", &options).await.unwrap();

        // 坏指纹降级为未命中，条目不缺失
        assert_eq!(outcomes.len(), 2);
        let broken = outcomes.iter().find(|outcome| outcome.name == "broken").unwrap();
        assert!(!broken.detected);
    }

    #[tokio::test]
    async fn test_on_detected_callback_fires_for_hits_only() {
        let options_json = r#"{
            "wordpress":{"categories":["cms"],"detectors":{"htmlContains":["wp-content"]}},
            "vue":{"detectors":{"globalVariables":["Vue"]}}
        }"#;
        let options = options_with_fingerprints("hits", options_json);

        let hits: Arc<Mutex<Vec<TechnologyHit>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&hits);
        let callback: DetectedCallback = Arc::new(move |hit: &TechnologyHit| {
            sink.lock().unwrap().push(hit.clone());
        });

        let orchestrator =
            ScanOrchestrator::new(Arc::new(StaticBackend)).with_on_detected(callback);
        orchestrator.scan("https://example.com", &options).await.unwrap();

        let hits = hits.lock().unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "wordpress");
        assert_eq!(hits[0].categories, vec!["cms".to_string()]);
    }

    #[tokio::test]
    async fn test_scan_batch_threads_progress_positions() {
        let options = options_with_fingerprints(
            "batch",
            r#"{"react":{"detectors":{"globalVariables":["React"]}}}"#,
        );
        let (callback, events) = event_recorder();
        let orchestrator =
            ScanOrchestrator::new(Arc::new(StaticBackend)).with_progress(callback);

        let urls = vec![
            "https://a.example.com".to_string(),
            "https://b.example.com".to_string(),
        ];
        let results = orchestrator.scan_batch(&urls, &options).await.unwrap();
        assert_eq!(results.len(), 2);

        let events = events.lock().unwrap();
        // 每个URL一对processing/completed，位置递增
        assert_eq!(events.len(), 4);
        assert!(matches!(
            events[0],
            ProgressEvent::Processing { current: 1, total: 2, .. }
        ));
        assert!(matches!(
            events[3],
            ProgressEvent::Completed { current: 2, total: 2, .. }
        ));
    }
}
