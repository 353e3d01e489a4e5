use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde_json::json;

use crate::listings::ListingId;
use crate::store::DocumentStore;

use super::domain::ActivityMerge;
use super::service::ActivityService;
use super::ActivityError;

/// Router exposing the per-listing activity fetchers.
pub fn activity_router<S>(service: Arc<ActivityService<S>>) -> Router
where
    S: DocumentStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/listings/:listing_id/offers",
            get(offers_handler::<S>),
        )
        .route(
            "/api/v1/listings/:listing_id/applications",
            get(applications_handler::<S>),
        )
        .route(
            "/api/v1/listings/:listing_id/appointments",
            get(appointments_handler::<S>),
        )
        .route(
            "/api/v1/listings/:listing_id/appointments/recent",
            get(recent_appointments_handler::<S>),
        )
        .route(
            "/api/v1/listings/:listing_id/views",
            get(views_handler::<S>),
        )
        .with_state(service)
}

fn merge_response(result: Result<ActivityMerge, ActivityError>) -> Response {
    match result {
        Ok(merge) => (StatusCode::OK, Json(merge)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) fn error_response(error: ActivityError) -> Response {
    let payload = json!({ "error": error.to_string() });
    (error.status_code(), Json(payload)).into_response()
}

pub(crate) async fn offers_handler<S>(
    State(service): State<Arc<ActivityService<S>>>,
    Path(listing_id): Path<String>,
) -> Response
where
    S: DocumentStore + 'static,
{
    merge_response(service.fetch_offers(&ListingId(listing_id)).await)
}

pub(crate) async fn applications_handler<S>(
    State(service): State<Arc<ActivityService<S>>>,
    Path(listing_id): Path<String>,
) -> Response
where
    S: DocumentStore + 'static,
{
    merge_response(service.fetch_applications(&ListingId(listing_id)).await)
}

pub(crate) async fn appointments_handler<S>(
    State(service): State<Arc<ActivityService<S>>>,
    Path(listing_id): Path<String>,
) -> Response
where
    S: DocumentStore + 'static,
{
    merge_response(service.fetch_appointments(&ListingId(listing_id)).await)
}

pub(crate) async fn recent_appointments_handler<S>(
    State(service): State<Arc<ActivityService<S>>>,
    Path(listing_id): Path<String>,
) -> Response
where
    S: DocumentStore + 'static,
{
    let result = service
        .fetch_recent_appointments(&ListingId(listing_id), Utc::now())
        .await;
    merge_response(result)
}

pub(crate) async fn views_handler<S>(
    State(service): State<Arc<ActivityService<S>>>,
    Path(listing_id): Path<String>,
) -> Response
where
    S: DocumentStore + 'static,
{
    match service.fetch_views(&ListingId(listing_id.clone())).await {
        Ok(Some(merge)) => (StatusCode::OK, Json(merge)).into_response(),
        Ok(None) => {
            let payload = json!({
                "error": "no views recorded",
                "listing_id": listing_id,
            });
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Fields, MemoryDocumentStore};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().expect("object fixture")
    }

    fn router() -> Router {
        let store = Arc::new(MemoryDocumentStore::new());
        store.insert(
            "offers",
            "o-1",
            fields(json!({ "listing_id": "L1", "rent": 1800, "created": { "seconds": 10, "nanoseconds": 0 } })),
        );
        store.insert("listing_views", "L1", fields(json!({ "total": 3 })));
        activity_router(Arc::new(ActivityService::new(store)))
    }

    async fn get_json(router: Router, uri: &str) -> (StatusCode, Value) {
        let response = router
            .oneshot(Request::get(uri).body(Body::empty()).expect("request"))
            .await
            .expect("router responds");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    #[tokio::test]
    async fn offers_route_returns_additive_patch() {
        let (status, body) = get_json(router(), "/api/v1/listings/L1/offers").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["mode"], "additive");
        assert_eq!(body["listing_id"], "L1");
        assert_eq!(body["patch"]["offers"][0]["id"], "o-1");
        assert_eq!(body["patch"]["offers"][0]["rent"], 1800);
    }

    #[tokio::test]
    async fn views_route_reports_missing_counters() {
        let (status, body) = get_json(router(), "/api/v1/listings/L1/views").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["mode"], "replace");
        assert_eq!(body["patch"]["views"]["total"], 3);

        let (status, body) = get_json(router(), "/api/v1/listings/L9/views").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["listing_id"], "L9");
    }
}
