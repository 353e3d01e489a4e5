use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Deserialize;
use serde_json::json;

use crate::storage::StorageGateway;
use crate::store::{DocumentStore, Fields};

use super::domain::{BrokerId, ListingId, MarketListingUpdate};
use super::service::ListingService;
use super::ListingError;

#[derive(Debug, Deserialize)]
pub(crate) struct ReplaceImagesRequest {
    pub(crate) images: Vec<String>,
}

/// Raw image payloads, base64 encoded.
#[derive(Debug, Deserialize)]
pub(crate) struct AddImagesRequest {
    pub(crate) images: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AddBrokerRequest {
    pub(crate) broker_id: BrokerId,
}

/// Router exposing listing reads and writes.
pub fn listing_router<S, G>(service: Arc<ListingService<S, G>>) -> Router
where
    S: DocumentStore + 'static,
    G: StorageGateway + 'static,
{
    Router::new()
        .route(
            "/api/v1/brokers/:broker_id/listings",
            get(broker_listings_handler::<S, G>),
        )
        .route("/api/v1/listings", post(publish_handler::<S, G>))
        .route(
            "/api/v1/listings/:listing_id",
            get(listing_handler::<S, G>).patch(update_listing_handler::<S, G>),
        )
        .route(
            "/api/v1/listings/:listing_id/data",
            get(listing_data_handler::<S, G>),
        )
        .route(
            "/api/v1/listings/:listing_id/images",
            post(add_images_handler::<S, G>).put(replace_images_handler::<S, G>),
        )
        .route(
            "/api/v1/listings/:listing_id/brokers",
            post(add_broker_handler::<S, G>),
        )
        .with_state(service)
}

pub(crate) fn error_response(error: ListingError) -> Response {
    let payload = json!({ "error": error.to_string() });
    (error.status_code(), Json(payload)).into_response()
}

pub(crate) async fn broker_listings_handler<S, G>(
    State(service): State<Arc<ListingService<S, G>>>,
    Path(broker_id): Path<String>,
) -> Response
where
    S: DocumentStore + 'static,
    G: StorageGateway + 'static,
{
    match service.retrieve_listings(&BrokerId(broker_id)).await {
        Ok(listings) => (StatusCode::OK, Json(listings)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn listing_handler<S, G>(
    State(service): State<Arc<ListingService<S, G>>>,
    Path(listing_id): Path<String>,
) -> Response
where
    S: DocumentStore + 'static,
    G: StorageGateway + 'static,
{
    match service.fetch_listing(&ListingId(listing_id.clone())).await {
        Ok(Some(listing)) => (StatusCode::OK, Json(listing)).into_response(),
        Ok(None) => {
            let payload = json!({
                "error": "listing not found",
                "listing_id": listing_id,
            });
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn listing_data_handler<S, G>(
    State(service): State<Arc<ListingService<S, G>>>,
    Path(listing_id): Path<String>,
) -> Response
where
    S: DocumentStore + 'static,
    G: StorageGateway + 'static,
{
    match service.fetch_listing_data(&ListingId(listing_id)).await {
        Ok(listing) => (StatusCode::OK, Json(json!({ "listing": listing }))).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn publish_handler<S, G>(
    State(service): State<Arc<ListingService<S, G>>>,
    Json(update): Json<MarketListingUpdate>,
) -> Response
where
    S: DocumentStore + 'static,
    G: StorageGateway + 'static,
{
    let created = update.listing_id.is_none();
    match service.update_market_listing(update).await {
        Ok(published) => {
            let status = if created {
                StatusCode::CREATED
            } else {
                StatusCode::OK
            };
            (status, Json(published)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn update_listing_handler<S, G>(
    State(service): State<Arc<ListingService<S, G>>>,
    Path(listing_id): Path<String>,
    Json(data): Json<Fields>,
) -> Response
where
    S: DocumentStore + 'static,
    G: StorageGateway + 'static,
{
    match service.update_listing(&ListingId(listing_id), data).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn replace_images_handler<S, G>(
    State(service): State<Arc<ListingService<S, G>>>,
    Path(listing_id): Path<String>,
    Json(request): Json<ReplaceImagesRequest>,
) -> Response
where
    S: DocumentStore + 'static,
    G: StorageGateway + 'static,
{
    match service
        .update_images(&ListingId(listing_id), request.images)
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn add_images_handler<S, G>(
    State(service): State<Arc<ListingService<S, G>>>,
    Path(listing_id): Path<String>,
    Json(request): Json<AddImagesRequest>,
) -> Response
where
    S: DocumentStore + 'static,
    G: StorageGateway + 'static,
{
    let decoded: Result<Vec<Vec<u8>>, _> = request
        .images
        .iter()
        .map(|encoded| STANDARD.decode(encoded.trim()))
        .collect();
    let images = match decoded {
        Ok(images) => images,
        Err(error) => {
            let payload = json!({ "error": format!("images must be base64 encoded: {error}") });
            return (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response();
        }
    };

    match service.add_images(&ListingId(listing_id), images).await {
        Ok(urls) => (StatusCode::OK, Json(json!({ "image_urls": urls }))).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn add_broker_handler<S, G>(
    State(service): State<Arc<ListingService<S, G>>>,
    Path(listing_id): Path<String>,
    Json(request): Json<AddBrokerRequest>,
) -> Response
where
    S: DocumentStore + 'static,
    G: StorageGateway + 'static,
{
    match service
        .add_broker(&ListingId(listing_id), &request.broker_id)
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}
