use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use serde_json::{json, Value};

use crate::listings::ListingService;
use crate::storage::{MemoryStorage, StorageError, StorageGateway, StoredObject};
use crate::store::{
    DocumentStore, DocumentSubscription, Document, FieldWrites, Fields, MemoryDocumentStore, Query,
    StoreError,
};

pub(super) const PNG: &str = "data:image/png;base64,iVBORw0KGgo=";
pub(super) const MP4: &str = "data:video/mp4;base64,AAAAGGZ0eXA=";
pub(super) const PDF: &str = "data:application/pdf;base64,JVBERi0xLjQ=";

pub(super) fn fields(value: Value) -> Fields {
    value.as_object().cloned().expect("object fixture")
}

/// Brokers A, B and C; D is referenced by a listing but has no profile.
pub(super) fn seed_marketplace(store: &MemoryDocumentStore) {
    store.insert(
        "listings",
        "L1",
        fields(json!({ "owner_id": "A", "broker_ids": ["A", "B"], "title": "Harbor loft" })),
    );
    store.insert(
        "listings",
        "L2",
        fields(json!({ "owner_id": "B", "broker_ids": [], "title": "Garden flat" })),
    );
    store.insert(
        "listings",
        "L3",
        fields(json!({ "owner_id": "C", "broker_ids": ["B", "D"], "title": "Mill studio" })),
    );
    store.insert(
        "listings",
        "L4",
        fields(json!({ "owner_id": "C", "broker_ids": [], "title": "Canal house" })),
    );

    for (id, name) in [("A", "Avery"), ("B", "Blake"), ("C", "Casey")] {
        store.insert("broker_profiles", id, fields(json!({ "name": name })));
    }
}

pub(super) fn build_service() -> (
    ListingService<MemoryDocumentStore, MemoryStorage>,
    Arc<MemoryDocumentStore>,
    Arc<MemoryStorage>,
) {
    let store = Arc::new(MemoryDocumentStore::new());
    let storage = Arc::new(MemoryStorage::default());
    seed_marketplace(&store);
    let service = ListingService::new(store.clone(), storage.clone());
    (service, store, storage)
}

/// Storage double that can reject uploads, fail deletes, and finish uploads
/// in reverse staging order.
#[derive(Default)]
pub(super) struct ScriptedStorage {
    pub(super) inner: MemoryStorage,
    pub(super) reject_payload: Option<String>,
    pub(super) failing_deletes: HashSet<String>,
    pub(super) reverse_completion: bool,
    pub(super) started: AtomicUsize,
    pub(super) completed: Mutex<Vec<String>>,
}

impl ScriptedStorage {
    pub(super) fn completion_order(&self) -> Vec<String> {
        self.completed.lock().expect("completion mutex").clone()
    }
}

#[async_trait]
impl StorageGateway for ScriptedStorage {
    async fn put_data_url(&self, path: &str, data_url: &str) -> Result<StoredObject, StorageError> {
        let position = self.started.fetch_add(1, Ordering::SeqCst);
        if self.reverse_completion {
            let delay = 40u64.saturating_sub(position as u64 * 10);
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.reject_payload.as_deref() == Some(data_url) {
            return Err(StorageError::Rejected {
                path: path.to_string(),
                reason: "quota exceeded".to_string(),
            });
        }
        let stored = self.inner.put_data_url(path, data_url).await?;
        self.completed
            .lock()
            .expect("completion mutex")
            .push(stored.full_path.clone());
        Ok(stored)
    }

    async fn put_bytes(&self, path: &str, bytes: Vec<u8>) -> Result<StoredObject, StorageError> {
        self.inner.put_bytes(path, bytes).await
    }

    async fn download_url(&self, path: &str) -> Result<String, StorageError> {
        self.inner.download_url(path).await
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        if self.failing_deletes.contains(path) {
            return Err(StorageError::Unavailable("delete timed out".to_string()));
        }
        self.inner.delete(path).await
    }
}

/// Storage double whose first download URL is a fixed, already-known address.
pub(super) struct RepeatingUrlStorage {
    pub(super) inner: MemoryStorage,
    pub(super) repeated_url: String,
    pub(super) resolved: AtomicUsize,
}

impl RepeatingUrlStorage {
    pub(super) fn new(repeated_url: &str) -> Self {
        Self {
            inner: MemoryStorage::default(),
            repeated_url: repeated_url.to_string(),
            resolved: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl StorageGateway for RepeatingUrlStorage {
    async fn put_data_url(&self, path: &str, data_url: &str) -> Result<StoredObject, StorageError> {
        self.inner.put_data_url(path, data_url).await
    }

    async fn put_bytes(&self, path: &str, bytes: Vec<u8>) -> Result<StoredObject, StorageError> {
        self.inner.put_bytes(path, bytes).await
    }

    async fn download_url(&self, path: &str) -> Result<String, StorageError> {
        let url = self.inner.download_url(path).await?;
        if self.resolved.fetch_add(1, Ordering::SeqCst) == 0 {
            return Ok(self.repeated_url.clone());
        }
        Ok(url)
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        self.inner.delete(path).await
    }
}

/// Reads pass through; every write is rejected and counted.
#[derive(Default)]
pub(super) struct ReadOnlyStore {
    pub(super) inner: MemoryDocumentStore,
    pub(super) attempted_writes: AtomicUsize,
}

#[async_trait]
impl DocumentStore for ReadOnlyStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.inner.get(collection, id).await
    }

    async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
        self.inner.query(query).await
    }

    fn allocate_id(&self, collection: &str) -> String {
        self.inner.allocate_id(collection)
    }

    async fn set_merge(&self, _collection: &str, _id: &str, _fields: Fields) -> Result<(), StoreError> {
        self.attempted_writes.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::PermissionDenied("read only".to_string()))
    }

    async fn update(&self, _collection: &str, _id: &str, _writes: FieldWrites) -> Result<(), StoreError> {
        self.attempted_writes.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::PermissionDenied("read only".to_string()))
    }

    async fn subscribe(&self, collection: &str, id: &str) -> Result<DocumentSubscription, StoreError> {
        self.inner.subscribe(collection, id).await
    }
}

/// Every call fails as if the backend were offline.
pub(super) struct OfflineStore;

#[async_trait]
impl DocumentStore for OfflineStore {
    async fn get(&self, _collection: &str, _id: &str) -> Result<Option<Document>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    async fn query(&self, _query: &Query) -> Result<Vec<Document>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn allocate_id(&self, _collection: &str) -> String {
        "offline".to_string()
    }

    async fn set_merge(&self, _collection: &str, _id: &str, _fields: Fields) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    async fn update(&self, _collection: &str, _id: &str, _writes: FieldWrites) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    async fn subscribe(&self, _collection: &str, _id: &str) -> Result<DocumentSubscription, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }
}

pub(super) fn broker_names(brokers: &[crate::listings::BrokerProfile]) -> Vec<String> {
    let mut names: Vec<String> = brokers
        .iter()
        .map(|broker| broker.attributes["name"].as_str().unwrap_or_default().to_string())
        .collect();
    names.sort();
    names
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
