use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{normalize_path, DataUrl, StorageError, StorageGateway, StoredObject};

#[derive(Debug, Clone)]
struct StoredBlob {
    content_type: Option<String>,
    bytes: Vec<u8>,
}

/// In-process object store; download URLs are minted under `base_url`.
#[derive(Debug)]
pub struct MemoryStorage {
    base_url: String,
    objects: Mutex<BTreeMap<String, StoredBlob>>,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new("memory://media")
    }
}

impl MemoryStorage {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            objects: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        let guard = self.objects.lock().expect("storage mutex poisoned");
        guard.contains_key(&normalize_path(path))
    }

    pub fn paths(&self) -> Vec<String> {
        let guard = self.objects.lock().expect("storage mutex poisoned");
        guard.keys().cloned().collect()
    }

    pub fn object_bytes(&self, path: &str) -> Option<Vec<u8>> {
        let guard = self.objects.lock().expect("storage mutex poisoned");
        guard.get(&normalize_path(path)).map(|blob| blob.bytes.clone())
    }

    fn store(&self, path: &str, blob: StoredBlob) -> StoredObject {
        let full_path = normalize_path(path);
        let stored = StoredObject {
            full_path: full_path.clone(),
            content_type: blob.content_type.clone(),
            size: blob.bytes.len(),
        };
        let mut guard = self.objects.lock().expect("storage mutex poisoned");
        guard.insert(full_path, blob);
        stored
    }
}

#[async_trait]
impl StorageGateway for MemoryStorage {
    async fn put_data_url(&self, path: &str, data_url: &str) -> Result<StoredObject, StorageError> {
        let decoded = DataUrl::parse(data_url)?;
        Ok(self.store(
            path,
            StoredBlob {
                content_type: Some(decoded.mime.essence_str().to_string()),
                bytes: decoded.bytes,
            },
        ))
    }

    async fn put_bytes(&self, path: &str, bytes: Vec<u8>) -> Result<StoredObject, StorageError> {
        Ok(self.store(
            path,
            StoredBlob {
                content_type: None,
                bytes,
            },
        ))
    }

    async fn download_url(&self, path: &str) -> Result<String, StorageError> {
        let full_path = normalize_path(path);
        if !self.contains(&full_path) {
            return Err(StorageError::NotFound(full_path));
        }
        Ok(format!("{}/{}", self.base_url, full_path))
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        let full_path = normalize_path(path);
        let mut guard = self.objects.lock().expect("storage mutex poisoned");
        guard
            .remove(&full_path)
            .map(|_| ())
            .ok_or(StorageError::NotFound(full_path))
    }
}
