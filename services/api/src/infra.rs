use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use lease_market::config::MarketplaceConfig;
use lease_market::leases::{
    LeaseSignatureService, SignatureClaim, SignatureProvider, SignatureProviderError,
    SignatureRequest, LEASE_REQUEST_FIELD,
};
use lease_market::activity::ActivityService;
use lease_market::listings::ListingService;
use lease_market::storage::MemoryStorage;
use lease_market::store::collections::{
    APPLICATIONS, APPOINTMENTS, BROKER_PROFILES, LISTINGS, LISTING_VIEWS, OFFERS, USER_PROFILES,
};
use lease_market::store::{DocumentStore, Fields, MemoryDocumentStore, Timestamp};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{json, Value};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type MarketListingService = ListingService<MemoryDocumentStore, MemoryStorage>;
pub(crate) type MarketActivityService = ActivityService<MemoryDocumentStore>;
pub(crate) type MarketLeaseService =
    LeaseSignatureService<MemoryDocumentStore, DemoSignatureProvider<MemoryDocumentStore>>;

/// Services wired against one shared pair of in-memory adapters.
pub(crate) struct MarketplaceServices {
    pub(crate) store: Arc<MemoryDocumentStore>,
    pub(crate) listings: Arc<MarketListingService>,
    pub(crate) activity: Arc<MarketActivityService>,
    pub(crate) leases: Arc<MarketLeaseService>,
}

impl MarketplaceServices {
    pub(crate) fn in_memory(config: &MarketplaceConfig) -> Self {
        let store = Arc::new(MemoryDocumentStore::new());
        let storage = Arc::new(MemoryStorage::default());

        let listings =
            ListingService::with_media_root(Arc::clone(&store), storage, &config.media_root);
        let activity =
            ActivityService::with_recent_window(Arc::clone(&store), config.recent_window());
        let provider = DemoSignatureProvider::new(Arc::clone(&store), &config.signature_client_id);
        let leases = LeaseSignatureService::new(Arc::clone(&store), Arc::new(provider))
            .with_timeout(config.lease_request_timeout);

        Self {
            store,
            listings: Arc::new(listings),
            activity: Arc::new(activity),
            leases: Arc::new(leases),
        }
    }
}

/// Local stand-in for the e-signature provider.
///
/// Hands back a claim URL immediately and records the `lease_request` on the
/// application the way the provider's send callback does in production.
pub(crate) struct DemoSignatureProvider<S> {
    store: Arc<S>,
    client_id: String,
}

impl<S> DemoSignatureProvider<S> {
    pub(crate) fn new(store: Arc<S>, client_id: &str) -> Self {
        Self {
            store,
            client_id: client_id.to_string(),
        }
    }
}

#[async_trait]
impl<S> SignatureProvider for DemoSignatureProvider<S>
where
    S: DocumentStore + 'static,
{
    async fn send_lease(
        &self,
        request: &SignatureRequest,
    ) -> Result<SignatureClaim, SignatureProviderError> {
        let request_id = self.store.allocate_id(APPLICATIONS);
        let lease_request = json!({
            "signature_request_id": request_id,
            "template_id": request.template_id,
            "title": request.title,
            "signers": request.signers,
        });

        let mut fields = Fields::new();
        fields.insert(LEASE_REQUEST_FIELD.to_string(), lease_request);
        self.store
            .set_merge(APPLICATIONS, &request.application_id, fields)
            .await
            .map_err(|err| SignatureProviderError::Unavailable(err.to_string()))?;

        Ok(SignatureClaim {
            claim_url: format!("https://signing.invalid/claim/{request_id}"),
            client_id: self.client_id.clone(),
        })
    }
}

fn fields(value: Value) -> Fields {
    match value {
        Value::Object(map) => map,
        _ => Fields::new(),
    }
}

fn days_ago(now: DateTime<Utc>, days: i64) -> Value {
    Timestamp::from_datetime(now - Duration::days(days)).to_value()
}

/// Seed a small marketplace: three brokers, three listings and activity on
/// the first listing.
pub(crate) fn seed_marketplace(store: &MemoryDocumentStore, now: DateTime<Utc>) {
    for (id, name, agency) in [
        ("broker-a", "Avery Stone", "Harbor Realty"),
        ("broker-b", "Blake Mercer", "Harbor Realty"),
        ("broker-c", "Casey Lund", "Northside Lettings"),
    ] {
        store.insert(
            BROKER_PROFILES,
            id,
            fields(json!({ "name": name, "agency": agency })),
        );
    }

    store.insert(
        LISTINGS,
        "listing-harbor-loft",
        fields(json!({
            "owner_id": "broker-a",
            "broker_ids": ["broker-a", "broker-b"],
            "title": "Harbor loft",
            "unit_number": "4B",
            "images": [],
            "asking_offer": { "rent": 2400, "start_date": Timestamp::from_datetime(now + Duration::days(30)).to_value() },
        })),
    );
    store.insert(
        LISTINGS,
        "listing-garden-flat",
        fields(json!({
            "owner_id": "broker-b",
            "broker_ids": [],
            "title": "Garden flat",
        })),
    );
    store.insert(
        LISTINGS,
        "listing-mill-studio",
        fields(json!({
            "owner_id": "broker-c",
            "broker_ids": ["broker-a"],
            "title": "Mill studio",
        })),
    );

    for (id, name) in [("user-riley", "Riley Park"), ("user-jordan", "Jordan Vale")] {
        store.insert(USER_PROFILES, id, fields(json!({ "name": name })));
    }

    store.insert(
        OFFERS,
        "offer-1",
        fields(json!({
            "listing_id": "listing-harbor-loft",
            "user_id": "user-riley",
            "rent": 2350,
            "created": days_ago(now, 3),
        })),
    );
    store.insert(
        APPLICATIONS,
        "application-1",
        fields(json!({ "listing_id": "listing-harbor-loft", "user_id": "user-jordan" })),
    );
    store.insert(
        APPOINTMENTS,
        "appointment-1",
        fields(json!({
            "listing_id": "listing-harbor-loft",
            "user_id": "user-riley",
            "state": "accepted",
            "date": days_ago(now, 2),
        })),
    );
    store.insert(
        APPOINTMENTS,
        "appointment-2",
        fields(json!({
            "listing_id": "listing-harbor-loft",
            "user_id": "user-jordan",
            "state": "accepted",
            "date": days_ago(now, 40),
        })),
    );
    store.insert(
        LISTING_VIEWS,
        "listing-harbor-loft",
        fields(json!({ "total": 128, "last_7_days": 19 })),
    );

    info!(
        listings = store.len(LISTINGS),
        brokers = store.len(BROKER_PROFILES),
        "seeded in-memory marketplace"
    );
}
