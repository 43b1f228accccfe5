//! 扫描配置管理,存储所有可配置项

use std::path::PathBuf;

/// 扫描配置
#[derive(Debug, Clone)]
pub struct ScanOptions {
    // 浏览器后端是否无头运行（HTTP后端忽略该项）
    pub headless: bool,
    // 页面导航超时（单位：毫秒）
    pub timeout_ms: u64,
    // 分类包含过滤（None表示不过滤）
    pub categories: Option<Vec<String>>,
    // 分类排除过滤（与包含过滤独立判定）
    pub exclude_categories: Option<Vec<String>>,
    // 自定义指纹目录（每技术一个同名子目录）
    pub custom_fingerprints_dir: Option<PathBuf>,
    // 自定义指纹文件（本地路径或http(s) URL，合并格式）
    pub custom_fingerprints_file: Option<String>,
    // 本地开发指纹目录（子目录允许再嵌套一层）
    pub corpus_dir: PathBuf,
    // 合并指纹产物候选路径（打包位置在前，开发位置在后）
    pub artifact_paths: Vec<PathBuf>,
    // 指纹快照缓存路径（MessagePack）
    pub snapshot_path: PathBuf,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            headless: true,
            timeout_ms: 30_000,
            categories: None,
            exclude_categories: None,
            custom_fingerprints_dir: None,
            custom_fingerprints_file: None,
            corpus_dir: PathBuf::from("fingerprints"),
            artifact_paths: vec![
                PathBuf::from("data/fingerprints.json"),
                PathBuf::from("fingerprints/fingerprints.json"),
            ],
            snapshot_path: PathBuf::from("rstechscan_fingerprints.mp"),
        }
    }
}

/// 配置管理器（单例）
pub struct ConfigManager;

impl ConfigManager {
    /// 获取默认配置
    pub fn get_default() -> ScanOptions {
        ScanOptions::default()
    }

    /// 自定义配置
    pub fn custom() -> CustomConfigBuilder {
        CustomConfigBuilder::new()
    }
}

/// 配置构建器（便于自定义配置）
#[derive(Debug, Clone)]
pub struct CustomConfigBuilder {
    options: ScanOptions,
}

impl CustomConfigBuilder {
    pub fn new() -> Self {
        Self {
            options: ScanOptions::default(),
        }
    }

    pub fn headless(mut self, headless: bool) -> Self {
        self.options.headless = headless;
        self
    }

    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.options.timeout_ms = timeout_ms;
        self
    }

    pub fn categories(mut self, categories: Vec<String>) -> Self {
        self.options.categories = Some(categories);
        self
    }

    pub fn exclude_categories(mut self, categories: Vec<String>) -> Self {
        self.options.exclude_categories = Some(categories);
        self
    }

    pub fn custom_fingerprints_dir(mut self, dir: PathBuf) -> Self {
        self.options.custom_fingerprints_dir = Some(dir);
        self
    }

    pub fn custom_fingerprints_file(mut self, location: String) -> Self {
        self.options.custom_fingerprints_file = Some(location);
        self
    }

    pub fn corpus_dir(mut self, dir: PathBuf) -> Self {
        self.options.corpus_dir = dir;
        self
    }

    pub fn artifact_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.options.artifact_paths = paths;
        self
    }

    pub fn snapshot_path(mut self, path: PathBuf) -> Self {
        self.options.snapshot_path = path;
        self
    }

    pub fn build(self) -> ScanOptions {
        self.options
    }
}

impl Default for CustomConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
