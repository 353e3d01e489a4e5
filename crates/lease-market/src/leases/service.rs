use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::store::collections::APPLICATIONS;
use crate::store::{DocumentStore, DocumentSubscription};

use super::domain::{SignatureClaim, SignatureRequest};
use super::LeaseError;

pub const DEFAULT_LEASE_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Field the provider's webhook writes onto the application once the
/// envelope has actually been sent.
pub const LEASE_REQUEST_FIELD: &str = "lease_request";

#[async_trait]
pub trait SignatureProvider: Send + Sync {
    async fn send_lease(
        &self,
        request: &SignatureRequest,
    ) -> Result<SignatureClaim, SignatureProviderError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureProviderError {
    #[error("signature provider rejected the request: {0}")]
    Rejected(String),
    #[error("signature provider unavailable: {0}")]
    Unavailable(String),
}

/// Sends lease envelopes for applications and watches for the outcome.
pub struct LeaseSignatureService<S, P> {
    store: Arc<S>,
    provider: Arc<P>,
    lease_request_timeout: Duration,
}

impl<S, P> LeaseSignatureService<S, P>
where
    S: DocumentStore + 'static,
    P: SignatureProvider + 'static,
{
    pub fn new(store: Arc<S>, provider: Arc<P>) -> Self {
        Self {
            store,
            provider,
            lease_request_timeout: DEFAULT_LEASE_REQUEST_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, lease_request_timeout: Duration) -> Self {
        self.lease_request_timeout = lease_request_timeout;
        self
    }

    pub async fn send(&self, request: SignatureRequest) -> Result<SignatureClaim, LeaseError> {
        request.validate()?;
        self.ensure_application(&request.application_id).await?;

        match self.provider.send_lease(&request).await {
            Ok(claim) => {
                info!(
                    application_id = %request.application_id,
                    signers = request.signers.len(),
                    "lease sent for signature"
                );
                Ok(claim)
            }
            Err(error) => {
                warn!(
                    application_id = %request.application_id,
                    %error,
                    "lease send failed"
                );
                Err(LeaseError::Provider(error))
            }
        }
    }

    /// Resolve with the application's `lease_request` as soon as it is set.
    ///
    /// The subscription is dropped on return, so the listener never outlives
    /// the first non-null value.
    pub async fn await_lease_request(&self, application_id: &str) -> Result<Value, LeaseError> {
        let subscription = self.store.subscribe(APPLICATIONS, application_id).await?;

        tokio::time::timeout(
            self.lease_request_timeout,
            watch_for_lease_request(subscription, application_id),
        )
        .await
        .map_err(|_| LeaseError::TimedOut {
            application_id: application_id.to_string(),
            waited: self.lease_request_timeout,
        })?
    }

    async fn ensure_application(&self, application_id: &str) -> Result<(), LeaseError> {
        match self.store.get(APPLICATIONS, application_id).await? {
            Some(_) => Ok(()),
            None => Err(LeaseError::ApplicationNotFound(application_id.to_string())),
        }
    }
}

async fn watch_for_lease_request(
    mut subscription: DocumentSubscription,
    application_id: &str,
) -> Result<Value, LeaseError> {
    loop {
        let Some(document) = subscription.next().await? else {
            return Err(LeaseError::ApplicationNotFound(application_id.to_string()));
        };
        match document.get(LEASE_REQUEST_FIELD) {
            Some(value) if !value.is_null() => return Ok(value.clone()),
            _ => debug!(application_id, "application changed without lease request"),
        }
    }
}
