//! Listing retrieval, enrichment and publishing.
//!
//! Reads join listings with broker profiles; writes stage media uploads in
//! the storage gateway before merging into the `listings` collection.

pub mod domain;
pub(crate) mod enrichment;
pub mod media;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

use axum::http::StatusCode;

use crate::storage::StorageError;
use crate::store::{StoreError, TimestampError};

pub use domain::{
    AskingOffer, BrokerId, BrokerProfile, EnrichedListing, Listing, ListingDraft, ListingId,
    ListingPatch, MarketListingUpdate, PublishedListing, TRANSIENT_FIELDS,
};
pub use media::MediaKind;
pub use router::listing_router;
pub use service::ListingService;

#[derive(Debug, thiserror::Error)]
pub enum ListingError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("invalid asking_offer.start_date: {0}")]
    InvalidTimestamp(#[from] TimestampError),
    #[error("invalid listing update: {0}")]
    InvalidUpdate(String),
    #[error("unable to encode listing: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ListingError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ListingError::Store(StoreError::NotFound { .. }) => StatusCode::NOT_FOUND,
            ListingError::Store(StoreError::PermissionDenied(_)) => StatusCode::FORBIDDEN,
            ListingError::Storage(StorageError::InvalidDataUrl(_))
            | ListingError::InvalidTimestamp(_)
            | ListingError::InvalidUpdate(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ListingError::Store(_) | ListingError::Storage(_) => StatusCode::BAD_GATEWAY,
            ListingError::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
