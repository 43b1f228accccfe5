//! 指纹缓存管理
//! 显式缓存对象：进程内共享已解析指纹库，支持失效、重载与本地快照（MessagePack）

use std::sync::Arc;
use rmp_serde::{Serializer, from_slice};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;

use super::model::FingerprintMap;
use super::resolver::FingerprintResolver;
use crate::config::ScanOptions;
use crate::error::{RstechscanError, RtsResult};

/// 指纹缓存管理器
/// 并发读安全；扫描方持有Arc引用，缓存失效不影响进行中的扫描
#[derive(Default)]
pub struct FingerprintCache {
    inner: RwLock<Option<Arc<FingerprintMap>>>,
}

impl FingerprintCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 取缓存指纹库，未命中则解析并缓存（空库不缓存，下次访问重试）
    pub async fn get_or_resolve(&self, options: &ScanOptions) -> Arc<FingerprintMap> {
        if let Some(map) = self.inner.read().await.as_ref() {
            return Arc::clone(map);
        }

        let resolved = Arc::new(FingerprintResolver::resolve(options).await);

        let mut guard = self.inner.write().await;
        // 并发解析时保留先写入者
        if let Some(existing) = guard.as_ref() {
            return Arc::clone(existing);
        }
        if !resolved.is_empty() {
            *guard = Some(Arc::clone(&resolved));
        }
        resolved
    }

    /// 失效缓存（下次访问重新解析）
    pub async fn invalidate(&self) {
        *self.inner.write().await = None;
    }

    /// 强制重新解析并覆盖缓存
    pub async fn reload(&self, options: &ScanOptions) -> Arc<FingerprintMap> {
        let resolved = Arc::new(FingerprintResolver::resolve(options).await);

        let mut guard = self.inner.write().await;
        if resolved.is_empty() {
            *guard = None;
        } else {
            *guard = Some(Arc::clone(&resolved));
        }
        resolved
    }

    /// 将当前缓存保存为本地快照（MessagePack）
    pub async fn save_snapshot(&self, options: &ScanOptions) -> RtsResult<()> {
        let Some(map) = self.inner.read().await.as_ref().cloned() else {
            return Err(RstechscanError::InvalidInput("缓存为空，无快照可保存".to_string()));
        };

        let mut data = Vec::new();
        map.as_ref()
            .serialize(&mut Serializer::new(&mut data))
            .map_err(|e| RstechscanError::MsgPack(format!("序列化失败：{}", e)))?;

        debug!("指纹库序列化成功，快照大小：{} 字节", data.len());

        tokio::fs::write(&options.snapshot_path, data).await?;
        Ok(())
    }

    /// 从本地快照恢复缓存，返回指纹数
    pub async fn load_snapshot(&self, options: &ScanOptions) -> RtsResult<usize> {
        let data = tokio::fs::read(&options.snapshot_path).await?;

        let map: FingerprintMap = from_slice(&data)
            .map_err(|e| RstechscanError::MsgPack(format!("反序列化失败：{}", e)))?;
        let count = map.len();

        *self.inner.write().await = Some(Arc::new(map));
        debug!("快照恢复成功，指纹数：{}", count);
        Ok(count)
    }

    /// 清除本地快照
    pub async fn clear_snapshot(&self, options: &ScanOptions) -> RtsResult<()> {
        if options.snapshot_path.exists() {
            tokio::fs::remove_file(&options.snapshot_path).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("rstechscan_cache_{}_{}", tag, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn options_with_artifact(root: &PathBuf, body: &str) -> ScanOptions {
        let artifact = root.join("artifact.json");
        fs::write(&artifact, body).unwrap();

        let mut options = ScanOptions::default();
        options.corpus_dir = PathBuf::from("nonexistent_corpus_dir");
        options.artifact_paths = vec![artifact];
        options.snapshot_path = root.join("snapshot.mp");
        options
    }

    #[tokio::test]
    async fn test_get_or_resolve_caches_non_empty_map() {
        let root = temp_dir("resolve");
        let options = options_with_artifact(&root, r#"{"react":{"detectors":{}}}"#);

        let cache = FingerprintCache::new();
        let first = cache.get_or_resolve(&options).await;
        assert_eq!(first.len(), 1);

        // 源文件删除后仍命中缓存
        fs::remove_file(&options.artifact_paths[0]).unwrap();
        let second = cache.get_or_resolve(&options).await;
        assert_eq!(second.len(), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_reresolve() {
        let root = temp_dir("invalidate");
        let options = options_with_artifact(&root, r#"{"vue":{"detectors":{}}}"#);

        let cache = FingerprintCache::new();
        let held = cache.get_or_resolve(&options).await;

        fs::write(&options.artifact_paths[0], r#"{"vue":{"detectors":{}},"react":{"detectors":{}}}"#)
            .unwrap();
        cache.invalidate().await;

        let fresh = cache.get_or_resolve(&options).await;
        assert_eq!(fresh.len(), 2);
        // 失效前取得的引用不受影响
        assert_eq!(held.len(), 1);
    }

    #[tokio::test]
    async fn test_snapshot_round_trip() {
        let root = temp_dir("snapshot");
        let options = options_with_artifact(&root, r#"{"jquery":{"categories":["javascript-libraries"],"detectors":{}}}"#);

        let cache = FingerprintCache::new();
        cache.get_or_resolve(&options).await;
        cache.save_snapshot(&options).await.unwrap();

        let restored = FingerprintCache::new();
        let count = restored.load_snapshot(&options).await.unwrap();
        assert_eq!(count, 1);

        let map = restored.get_or_resolve(&options).await;
        assert_eq!(map.get("jquery").unwrap().categories, vec!["javascript-libraries".to_string()]);

        cache.clear_snapshot(&options).await.unwrap();
        assert!(!options.snapshot_path.exists());
    }
}
