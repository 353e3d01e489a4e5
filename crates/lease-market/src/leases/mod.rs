//! Data side of the lease signature workflow: signer validation, the
//! provider send contract, and waiting for the provider to record the
//! resulting `lease_request` on the application.

pub mod domain;
pub mod router;
pub mod service;

use std::time::Duration;

use axum::http::StatusCode;

use crate::store::StoreError;

pub use domain::{
    LeaseValidationError, SignatureClaim, SignatureRequest, Signer, SignerField,
    SEND_FAILURE_MESSAGE,
};
pub use router::lease_router;
pub use service::{
    LeaseSignatureService, SignatureProvider, SignatureProviderError,
    DEFAULT_LEASE_REQUEST_TIMEOUT, LEASE_REQUEST_FIELD,
};

#[derive(Debug, thiserror::Error)]
pub enum LeaseError {
    #[error(transparent)]
    Invalid(#[from] LeaseValidationError),
    #[error("application {0} not found")]
    ApplicationNotFound(String),
    #[error(transparent)]
    Provider(#[from] SignatureProviderError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("no lease request for application {application_id} after {waited:?}")]
    TimedOut {
        application_id: String,
        waited: Duration,
    },
}

impl LeaseError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            LeaseError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
            LeaseError::ApplicationNotFound(_) | LeaseError::Store(StoreError::NotFound { .. }) => {
                StatusCode::NOT_FOUND
            }
            LeaseError::Store(StoreError::PermissionDenied(_)) => StatusCode::FORBIDDEN,
            LeaseError::Provider(_) | LeaseError::Store(_) => StatusCode::BAD_GATEWAY,
            LeaseError::TimedOut { .. } => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Text safe to show the person sending the lease.
    pub fn user_message(&self) -> String {
        match self {
            LeaseError::Provider(_) => SEND_FAILURE_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}
