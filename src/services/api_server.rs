// src/services/api_server.rs
//! HTTP surface for the credential exchange services.
//!
//! The API is built using Axum and exposes two route families:
//! - `/issue`: the issuance exchange (fetch the presentation request,
//!   submit a credential for issuance)
//! - `/verify/:name`: the verification exchange for each named verifier
//!   deployment
//!
//! Handlers decode the body themselves so a parse failure is reported
//! through the same error taxonomy as everything else. Status codes are
//! derived from the error category: authentication failures are 401,
//! malformed payloads and business refusals are 400, and everything else
//! (resolution faults, signing faults) is a 500 whose body does not echo
//! internal detail.

use axum::{
    body::Bytes,
    extract::{Json, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::errors::{error_chain, ExchangeError};
use crate::models::VerifiableCredential;
use crate::services::issuer::IssuerService;
use crate::services::verifier::VerifierService;

/// Response for a passed verification exchange
#[derive(Serialize, Deserialize)]
struct VerifyResponse {
    success: bool,
}

/// Response body for any failed exchange
#[derive(Serialize, Deserialize)]
struct ErrorResponse {
    error: String,
}

/// API server state containing the deployed exchange services.
pub struct ApiServer {
    /// The issuance service for this deployment
    issuer: Arc<IssuerService>,

    /// Verification services, one per published verifier name
    verifiers: HashMap<String, Arc<VerifierService>>,
}

impl ApiServer {
    /// Creates a new instance of the API server.
    ///
    /// # Arguments
    /// * `issuer` - The issuance service
    /// * `verifiers` - Named verification services; each is served under
    ///   `/verify/{name}`
    pub fn new(
        issuer: Arc<IssuerService>,
        verifiers: HashMap<String, Arc<VerifierService>>,
    ) -> Self {
        ApiServer { issuer, verifiers }
    }

    /// Builds the route table over this server's state.
    pub fn router(self) -> Router {
        Router::new()
            .route("/issue", get(Self::issue_request_handler))
            .route("/issue", post(Self::issue_submit_handler))
            .route("/verify/:name", get(Self::verify_request_handler))
            .route("/verify/:name", post(Self::verify_submit_handler))
            .with_state(Arc::new(self))
    }

    /// Starts the API server and begins listening for requests.
    ///
    /// # Arguments
    /// * `addr` - Socket address to bind to (e.g., "127.0.0.1:3000")
    pub async fn run(self, addr: SocketAddr) -> std::io::Result<()> {
        let app = self.router();
        let listener = tokio::net::TcpListener::bind(addr).await?;
        log::info!("exchange API listening at http://{}", addr);
        axum::serve(listener, app).await
    }

    // =====================
    // Issuance Handlers
    // =====================

    /// Returns the issuer's signed presentation request
    ///
    /// # Endpoint
    /// GET /issue
    async fn issue_request_handler(State(state): State<Arc<ApiServer>>) -> Response {
        match state.issuer.create_request() {
            Ok(request) => (StatusCode::OK, Json(request)).into_response(),
            Err(e) => error_response(&e),
        }
    }

    /// Accepts a subject-signed submission and answers with the issued
    /// credential
    ///
    /// # Endpoint
    /// POST /issue
    ///
    /// # Responses
    /// - 200 OK: Returns the doubly signed credential
    /// - 400 Bad Request: Unparseable submission, or refused by policy
    /// - 401 Unauthorized: Signature checks failed
    /// - 500 Internal Server Error: Resolution or signing fault
    async fn issue_submit_handler(State(state): State<Arc<ApiServer>>, body: Bytes) -> Response {
        let submission: VerifiableCredential = match serde_json::from_slice(&body) {
            Ok(submission) => submission,
            Err(source) => {
                return error_response(&ExchangeError::Malformed {
                    context: "credential submission",
                    source,
                })
            }
        };

        match state.issuer.accept_submission(&submission).await {
            Ok(credential) => (StatusCode::OK, Json(credential)).into_response(),
            Err(e) => error_response(&e),
        }
    }

    // =====================
    // Verification Handlers
    // =====================

    /// Returns the named verifier's signed presentation request
    ///
    /// # Endpoint
    /// GET /verify/:name
    async fn verify_request_handler(
        Path(name): Path<String>,
        State(state): State<Arc<ApiServer>>,
    ) -> Response {
        let verifier = match state.verifiers.get(&name) {
            Some(verifier) => verifier,
            None => return unknown_verifier(&name),
        };

        match verifier.create_request() {
            Ok(request) => (StatusCode::OK, Json(request)).into_response(),
            Err(e) => error_response(&e),
        }
    }

    /// Accepts a presented credential for verification
    ///
    /// # Endpoint
    /// POST /verify/:name
    ///
    /// # Responses
    /// - 200 OK: The credential verified and was accepted
    /// - 400 Bad Request: Unparseable payload, or refused by policy
    /// - 401 Unauthorized: Signature checks failed
    /// - 404 Not Found: No verifier published under this name
    /// - 500 Internal Server Error: Resolution fault
    async fn verify_submit_handler(
        Path(name): Path<String>,
        State(state): State<Arc<ApiServer>>,
        body: Bytes,
    ) -> Response {
        let verifier = match state.verifiers.get(&name) {
            Some(verifier) => verifier,
            None => return unknown_verifier(&name),
        };

        let credential: VerifiableCredential = match serde_json::from_slice(&body) {
            Ok(credential) => credential,
            Err(source) => {
                return error_response(&ExchangeError::Malformed {
                    context: "presented credential",
                    source,
                })
            }
        };

        match verifier.verify_credential(&credential).await {
            Ok(()) => (StatusCode::OK, Json(VerifyResponse { success: true })).into_response(),
            Err(e) => error_response(&e),
        }
    }
}

/// Maps an exchange failure onto a status code and response body.
///
/// Client-attributable categories carry the error message; internal
/// categories are logged with their full cause chain and answered with a
/// fixed body.
fn error_response(err: &ExchangeError) -> Response {
    match err.category() {
        "authentication" => {
            log::warn!("exchange rejected: {}", error_chain(err));
            (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    error: err.to_string(),
                }),
            )
                .into_response()
        }
        "malformed" | "business" => {
            log::warn!("exchange refused: {}", error_chain(err));
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: err.to_string(),
                }),
            )
                .into_response()
        }
        _ => {
            log::error!("exchange failed: {}", error_chain(err));
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "internal error".into(),
                }),
            )
                .into_response()
        }
    }
}

fn unknown_verifier(name: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: format!("no verifier named '{}'", name),
        }),
    )
        .into_response()
}
