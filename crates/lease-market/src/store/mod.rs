//! Document store contract consumed by the aggregation layer.
//!
//! The hosted database is treated as an opaque collaborator; everything the
//! listing, activity and lease modules need from it is expressed through
//! [`DocumentStore`]. [`MemoryDocumentStore`] implements the full contract
//! for tests, demos and local serving.

pub mod document;
pub mod memory;
pub mod timestamp;
pub mod update;

use async_trait::async_trait;
use tokio::sync::watch;

pub use document::{compare_values, Direction, Document, Fields, Filter, OrderBy, Query};
pub use memory::MemoryDocumentStore;
pub use timestamp::{Timestamp, TimestampError};
pub use update::{merge_union, FieldInstruction, FieldWrite, FieldWrites};

/// Collection names shared by every module touching the store.
pub mod collections {
    pub const LISTINGS: &str = "listings";
    pub const BROKER_PROFILES: &str = "broker_profiles";
    pub const USER_PROFILES: &str = "user_profiles";
    pub const OFFERS: &str = "offers";
    pub const APPLICATIONS: &str = "applications";
    pub const APPOINTMENTS: &str = "appointments";
    pub const LISTING_VIEWS: &str = "listing_views";
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError>;

    /// Reserve a fresh document identifier without writing anything.
    fn allocate_id(&self, collection: &str) -> String;

    /// Create the document or deep-merge `fields` into the existing one.
    async fn set_merge(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError>;

    /// Apply field writes to an existing document; fails with
    /// [`StoreError::NotFound`] when it does not exist.
    async fn update(&self, collection: &str, id: &str, writes: FieldWrites)
        -> Result<(), StoreError>;

    async fn subscribe(&self, collection: &str, id: &str)
        -> Result<DocumentSubscription, StoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("document {collection}/{id} not found")]
    NotFound { collection: String, id: String },
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("document store unavailable: {0}")]
    Unavailable(String),
    #[error("document {collection}/{id} has an unexpected shape: {message}")]
    Decode {
        collection: String,
        id: String,
        message: String,
    },
    #[error("subscription closed")]
    SubscriptionClosed,
}

/// Live view of one document; dropping it unsubscribes.
///
/// The first call to [`next`](Self::next) yields the snapshot current at
/// subscription time, later calls wait for the next change. Bursts of writes
/// between two calls coalesce into the latest snapshot.
#[derive(Debug)]
pub struct DocumentSubscription {
    receiver: watch::Receiver<Option<Document>>,
    initial_delivered: bool,
}

impl DocumentSubscription {
    pub fn new(receiver: watch::Receiver<Option<Document>>) -> Self {
        Self {
            receiver,
            initial_delivered: false,
        }
    }

    pub async fn next(&mut self) -> Result<Option<Document>, StoreError> {
        if self.initial_delivered {
            self.receiver
                .changed()
                .await
                .map_err(|_| StoreError::SubscriptionClosed)?;
        }
        self.initial_delivered = true;
        Ok(self.receiver.borrow_and_update().clone())
    }
}
