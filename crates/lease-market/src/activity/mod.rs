//! Offers, applications, appointments and view counters attached to a listing.

pub mod board;
pub mod domain;
pub mod router;
pub mod service;

pub use board::{ListingActivity, ListingActivityBoard};
pub use domain::{
    ActivityMerge, ActivityPatch, Application, Appointment, MergeMode, Offer, UserId,
    UserProfile, ViewCounters, ACCEPTED_STATE,
};
pub use router::activity_router;
pub use service::{ActivityService, DEFAULT_RECENT_WINDOW_DAYS};

use axum::http::StatusCode;

use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ActivityError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("recent window of {days} days reaches before the earliest representable date")]
    WindowOutOfRange { days: i64 },
}

impl ActivityError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ActivityError::Store(StoreError::NotFound { .. }) => StatusCode::NOT_FOUND,
            ActivityError::Store(StoreError::PermissionDenied(_)) => StatusCode::FORBIDDEN,
            ActivityError::Store(StoreError::Decode { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
            ActivityError::Store(_) => StatusCode::BAD_GATEWAY,
            ActivityError::WindowOutOfRange { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
