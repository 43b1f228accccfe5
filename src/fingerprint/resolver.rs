//! 指纹源解析器
//! 按优先级依次尝试各指纹源，取第一个非空指纹库；任一源失败只记录日志

use std::path::{Path, PathBuf};
use std::time::Duration;
use reqwest::Client;
use tracing::{debug, warn};

use super::model::{normalize_map, Fingerprint, FingerprintMap};
use crate::config::ScanOptions;
use crate::error::{RstechscanError, RtsResult};

/// 指纹源解析器
pub struct FingerprintResolver;

impl FingerprintResolver {
    /// 解析指纹库（永不报错；全部失败返回空库，由调用方判定为致命前置条件）
    ///
    /// 优先级：自定义文件 > 自定义目录 > 本地开发指纹目录 > 合并指纹产物
    pub async fn resolve(options: &ScanOptions) -> FingerprintMap {
        // 1. 显式指定的单文件（URL或本地路径，合并格式）
        if let Some(location) = &options.custom_fingerprints_file {
            match Self::load_single_file(location, options.timeout_ms).await {
                Ok(map) if !map.is_empty() => {
                    debug!("自定义指纹文件[{}]加载成功，指纹数：{}", location, map.len());
                    return map;
                }
                Ok(_) => warn!("自定义指纹文件[{}]为空，尝试下一指纹源", location),
                Err(e) => warn!("自定义指纹文件[{}]加载失败：{}，尝试下一指纹源", location, e),
            }
        }

        // 2. 显式指定的自定义目录（每技术一个同名子目录）
        if let Some(dir) = &options.custom_fingerprints_dir {
            let map = Self::load_dir(dir, false).await;
            if !map.is_empty() {
                debug!("自定义指纹目录[{}]加载成功，指纹数：{}", dir.display(), map.len());
                return map;
            }
            warn!("自定义指纹目录[{}]为空或不可用，尝试下一指纹源", dir.display());
        }

        // 3. 本地开发指纹目录（子目录允许再嵌套一层）
        if options.corpus_dir.is_dir() {
            let map = Self::load_dir(&options.corpus_dir, true).await;
            if !map.is_empty() {
                debug!(
                    "本地开发指纹目录[{}]加载成功，指纹数：{}",
                    options.corpus_dir.display(),
                    map.len()
                );
                return map;
            }
            warn!("本地开发指纹目录[{}]为空，尝试下一指纹源", options.corpus_dir.display());
        }

        // 4. 预构建合并产物（打包位置优先于开发位置）
        for path in &options.artifact_paths {
            match Self::load_artifact(path).await {
                Ok(map) if !map.is_empty() => {
                    debug!("合并指纹产物[{}]加载成功，指纹数：{}", path.display(), map.len());
                    return map;
                }
                Ok(_) => warn!("合并指纹产物[{}]为空", path.display()),
                Err(e) => debug!("合并指纹产物[{}]不可用：{}", path.display(), e),
            }
        }

        // 5. 全部失败：返回空库
        warn!("所有指纹源均加载失败或为空");
        FingerprintMap::new()
    }

    /// 加载单个合并指纹文件（URL或本地路径）
    async fn load_single_file(location: &str, timeout_ms: u64) -> RtsResult<FingerprintMap> {
        let raw = if location.starts_with("http://") || location.starts_with("https://") {
            Self::fetch_remote_file(location, timeout_ms).await?
        } else {
            tokio::fs::read_to_string(location).await?
        };

        let map: FingerprintMap = serde_json::from_str(&raw)?;
        Ok(normalize_map(map))
    }

    /// 拉取远程合并指纹文件
    async fn fetch_remote_file(url: &str, timeout_ms: u64) -> RtsResult<String> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()?;

        let response = client.get(url)
            .header("User-Agent", "Rstechscan/0.1.0")
            .header("Accept-Encoding", "gzip, deflate")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RstechscanError::SourceLoad(format!(
                "URL {} 返回状态码 {}",
                url,
                response.status()
            )));
        }

        Ok(response.text().await?)
    }

    /// 按子目录枚举加载指纹目录：每个子目录x对应x/x.json
    /// nested为真时，无同名json的子目录再向下查找一层
    async fn load_dir(dir: &Path, nested: bool) -> FingerprintMap {
        let mut map = FingerprintMap::new();

        for (name, path) in Self::list_subdirs(dir).await {
            let json_path = path.join(format!("{}.json", name));
            if json_path.is_file() {
                Self::insert_tech_file(&mut map, &name, &json_path).await;
            } else if nested {
                for (sub_name, sub_path) in Self::list_subdirs(&path).await {
                    let sub_json = sub_path.join(format!("{}.json", sub_name));
                    if sub_json.is_file() {
                        Self::insert_tech_file(&mut map, &sub_name, &sub_json).await;
                    }
                }
            }
        }

        map
    }

    /// 枚举直接子目录（跳过点目录与非目录项）
    async fn list_subdirs(dir: &Path) -> Vec<(String, PathBuf)> {
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("指纹目录[{}]枚举失败：{}", dir.display(), e);
                return Vec::new();
            }
        };

        let mut subdirs = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!("指纹目录[{}]读取条目失败：{}", dir.display(), e);
                    break;
                }
            };

            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') {
                continue;
            }
            let is_dir = entry
                .file_type()
                .await
                .map(|file_type| file_type.is_dir())
                .unwrap_or(false);
            if !is_dir {
                continue;
            }

            subdirs.push((name, entry.path()));
        }

        subdirs.sort_by(|a, b| a.0.cmp(&b.0));
        subdirs
    }

    /// 加载单技术指纹文件并入库；失败只跳过该技术
    async fn insert_tech_file(map: &mut FingerprintMap, name: &str, path: &Path) {
        match Self::load_tech_file(path).await {
            Ok(mut fingerprint) => {
                // 键与内嵌name字段必须一致，以目录名为准
                fingerprint.name = name.to_string();
                map.insert(name.to_string(), fingerprint);
            }
            Err(e) => warn!("指纹文件[{}]解析失败，跳过：{}", path.display(), e),
        }
    }

    async fn load_tech_file(path: &Path) -> RtsResult<Fingerprint> {
        let raw = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// 加载合并指纹产物
    async fn load_artifact(path: &Path) -> RtsResult<FingerprintMap> {
        let raw = tokio::fs::read_to_string(path).await?;
        let map: FingerprintMap = serde_json::from_str(&raw)?;
        Ok(normalize_map(map))
    }
}
