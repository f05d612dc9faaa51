use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{AppError, AppResult};

/// Flat JSON key/value store persisted to a single file.
///
/// Every write rewrites the whole file (temp file + rename). There is no cross-process
/// locking: concurrent instances sharing a file race and the last writer wins.
#[derive(Clone)]
pub struct LocalStore {
    path: Option<PathBuf>,
    entries: Arc<RwLock<Map<String, Value>>>,
}

impl LocalStore {
    pub async fn open(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref().to_path_buf();

        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => match serde_json::from_str::<Map<String, Value>>(&raw) {
                Ok(map) => map,
                Err(e) => {
                    log::warn!(
                        "Local store {} is corrupt ({e}), starting empty",
                        path.display()
                    );
                    Map::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => {
                return Err(AppError::StorageError(format!(
                    "Unable to read {}: {e}",
                    path.display()
                )));
            }
        };

        log::debug!("Opened local store {} ({} keys)", path.display(), entries.len());

        Ok(Self {
            path: Some(path),
            entries: Arc::new(RwLock::new(entries)),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: Arc::new(RwLock::new(Map::new())),
        }
    }

    pub async fn get(&self, key: &str) -> Option<Value> {
        self.entries.read().await.get(key).cloned()
    }

    pub async fn set(&self, key: &str, value: Value) -> AppResult<()> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), value);
        self.persist(&entries).await
    }

    pub async fn remove(&self, key: &str) -> AppResult<()> {
        let mut entries = self.entries.write().await;
        if entries.remove(key).is_some() {
            self.persist(&entries).await?;
        }
        Ok(())
    }

    pub async fn remove_prefixed(&self, prefix: &str) -> AppResult<usize> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|k, _| !k.starts_with(prefix));
        let removed = before - entries.len();
        if removed > 0 {
            self.persist(&entries).await?;
        }
        Ok(removed)
    }

    pub async fn clear(&self) -> AppResult<()> {
        let mut entries = self.entries.write().await;
        entries.clear();
        self.persist(&entries).await
    }

    pub async fn keys(&self) -> Vec<String> {
        self.entries.read().await.keys().cloned().collect()
    }

    // 调用方持有写锁，保证同一进程内的写入串行
    async fn persist(&self, entries: &Map<String, Value>) -> AppResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let body = serde_json::to_vec_pretty(entries)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = LocalStore::open(&path).await.unwrap();
        store.set("authToken", json!("abc")).await.unwrap();
        store.set("numberTypes", json!({"value": [1, 2]})).await.unwrap();
        drop(store);

        let reopened = LocalStore::open(&path).await.unwrap();
        assert_eq!(reopened.get("authToken").await, Some(json!("abc")));
        assert_eq!(
            reopened.get("numberTypes").await,
            Some(json!({"value": [1, 2]}))
        );
    }

    #[tokio::test]
    async fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = LocalStore::open(&path).await.unwrap();
        assert!(store.keys().await.is_empty());

        // 下一次写入会覆盖损坏的文件
        store.set("k", json!(1)).await.unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"k\""));
    }

    #[tokio::test]
    async fn test_remove_prefixed_and_clear() {
        let store = LocalStore::in_memory();
        store.set("services_1_mtn_sms", json!([])).await.unwrap();
        store.set("services_2_glo_sms", json!([])).await.unwrap();
        store.set("countries_sms", json!([])).await.unwrap();

        assert_eq!(store.remove_prefixed("services_").await.unwrap(), 2);
        assert_eq!(store.keys().await, vec!["countries_sms".to_string()]);

        store.clear().await.unwrap();
        assert!(store.keys().await.is_empty());
    }
}
