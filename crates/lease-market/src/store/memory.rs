use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::watch;
use uuid::Uuid;

use super::document::{compare_values, Direction, Document, Fields, Query};
use super::update::{apply_writes, deep_merge, FieldWrites};
use super::{DocumentStore, DocumentSubscription, StoreError};

type Collection = BTreeMap<String, Fields>;
type WatchKey = (String, String);

/// Process-local document store honoring the full [`DocumentStore`] contract.
///
/// Scans walk documents in ID order, which is also the tie-breaker for
/// ordered queries.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: Mutex<HashMap<String, Collection>>,
    watchers: Mutex<HashMap<WatchKey, watch::Sender<Option<Document>>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a document wholesale, bypassing merge semantics.
    pub fn insert(&self, collection: &str, id: &str, fields: Fields) {
        {
            let mut guard = self.collections.lock().expect("store mutex poisoned");
            guard
                .entry(collection.to_string())
                .or_default()
                .insert(id.to_string(), fields);
        }
        self.notify(collection, id);
    }

    pub fn document(&self, collection: &str, id: &str) -> Option<Document> {
        let guard = self.collections.lock().expect("store mutex poisoned");
        guard
            .get(collection)
            .and_then(|documents| documents.get(id))
            .map(|fields| Document::new(collection, id, fields.clone()))
    }

    pub fn len(&self, collection: &str) -> usize {
        let guard = self.collections.lock().expect("store mutex poisoned");
        guard.get(collection).map(BTreeMap::len).unwrap_or(0)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    /// Number of documents with a registered change channel.
    pub fn watched_documents(&self) -> usize {
        self.watchers.lock().expect("watch mutex poisoned").len()
    }

    // Snapshots are read under the watchers lock so a subscribe and a
    // notify for the same document can never publish out of order.
    fn notify(&self, collection: &str, id: &str) {
        let mut guard = self.watchers.lock().expect("watch mutex poisoned");
        let key = (collection.to_string(), id.to_string());
        let Some(sender) = guard.get(&key) else {
            return;
        };
        if sender.receiver_count() == 0 {
            guard.remove(&key);
            return;
        }
        sender.send_replace(self.document(collection, id));
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        Ok(self.document(collection, id))
    }

    async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
        let mut matches: Vec<Document> = {
            let guard = self.collections.lock().expect("store mutex poisoned");
            guard
                .get(&query.collection)
                .map(|documents| {
                    documents
                        .iter()
                        .filter(|(_, fields)| query.matches(fields))
                        .map(|(id, fields)| Document::new(&query.collection, id, fields.clone()))
                        .collect()
                })
                .unwrap_or_default()
        };

        if let Some(order) = &query.order_by {
            // Ordered scans only return documents that carry the ordering field.
            matches.retain(|document| document.fields.contains_key(&order.field));
            if let Some(bound) = &query.start_at {
                matches.retain(|document| {
                    let value = &document.fields[&order.field];
                    match order.direction {
                        Direction::Ascending => compare_values(value, bound).is_ge(),
                        Direction::Descending => compare_values(value, bound).is_le(),
                    }
                });
            }
            matches.sort_by(|left, right| {
                let ordering =
                    compare_values(&left.fields[&order.field], &right.fields[&order.field]);
                match order.direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                }
            });
        }

        Ok(matches)
    }

    fn allocate_id(&self, _collection: &str) -> String {
        Uuid::new_v4().simple().to_string()
    }

    async fn set_merge(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError> {
        {
            let mut guard = self.collections.lock().expect("store mutex poisoned");
            let target = guard
                .entry(collection.to_string())
                .or_default()
                .entry(id.to_string())
                .or_default();
            deep_merge(target, fields);
        }
        self.notify(collection, id);
        Ok(())
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        writes: FieldWrites,
    ) -> Result<(), StoreError> {
        {
            let mut guard = self.collections.lock().expect("store mutex poisoned");
            let target = guard
                .get_mut(collection)
                .and_then(|documents| documents.get_mut(id))
                .ok_or_else(|| StoreError::NotFound {
                    collection: collection.to_string(),
                    id: id.to_string(),
                })?;
            apply_writes(target, writes);
        }
        self.notify(collection, id);
        Ok(())
    }

    async fn subscribe(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<DocumentSubscription, StoreError> {
        let mut guard = self.watchers.lock().expect("watch mutex poisoned");
        guard.retain(|_, sender| sender.receiver_count() > 0);

        let snapshot = self.document(collection, id);
        let sender = guard
            .entry((collection.to_string(), id.to_string()))
            .or_insert_with(|| watch::channel(None).0);
        sender.send_replace(snapshot);
        Ok(DocumentSubscription::new(sender.subscribe()))
    }
}
