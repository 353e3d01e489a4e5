use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::store::DocumentStore;

use super::domain::{SignatureRequest, Signer};
use super::service::{LeaseSignatureService, SignatureProvider};
use super::LeaseError;

#[derive(Debug, Deserialize)]
pub(crate) struct SendLeaseRequest {
    pub(crate) template_id: Option<String>,
    pub(crate) signers: Vec<Signer>,
    #[serde(default)]
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) subject: String,
    #[serde(default)]
    pub(crate) message: String,
}

pub fn lease_router<S, P>(service: Arc<LeaseSignatureService<S, P>>) -> Router
where
    S: DocumentStore + 'static,
    P: SignatureProvider + 'static,
{
    Router::new()
        .route(
            "/api/v1/applications/:application_id/lease",
            post(send_lease_handler::<S, P>),
        )
        .route(
            "/api/v1/applications/:application_id/lease-request",
            get(lease_request_handler::<S, P>),
        )
        .with_state(service)
}

fn error_response(error: LeaseError) -> Response {
    let payload = json!({ "error": error.user_message() });
    (error.status_code(), Json(payload)).into_response()
}

pub(crate) async fn send_lease_handler<S, P>(
    State(service): State<Arc<LeaseSignatureService<S, P>>>,
    Path(application_id): Path<String>,
    Json(body): Json<SendLeaseRequest>,
) -> Response
where
    S: DocumentStore + 'static,
    P: SignatureProvider + 'static,
{
    let request = SignatureRequest {
        application_id,
        template_id: body.template_id,
        signers: body.signers,
        title: body.title,
        subject: body.subject,
        message: body.message,
    };

    match service.send(request).await {
        Ok(claim) => (StatusCode::OK, Json(claim)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn lease_request_handler<S, P>(
    State(service): State<Arc<LeaseSignatureService<S, P>>>,
    Path(application_id): Path<String>,
) -> Response
where
    S: DocumentStore + 'static,
    P: SignatureProvider + 'static,
{
    match service.await_lease_request(&application_id).await {
        Ok(lease_request) => {
            let payload = json!({
                "application_id": application_id,
                "lease_request": lease_request,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}
