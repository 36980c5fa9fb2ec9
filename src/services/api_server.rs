// src/services/api_server.rs
//! API Server for the boarding pass service
//!
//! Thin axum layer over [`SessionOrchestrator`]: it decodes requests,
//! validates required fields and maps failures onto [`ApiError`].
//!
//! Endpoints:
//! - `POST   /api/tickets`                    create a ticket
//! - `GET    /api/tickets/:ticket_id`         fetch a ticket
//! - `POST   /api/start`                      start a chained disclosure session
//! - `GET    /api/result?sessionID=`          poll a session result
//! - `DELETE /api/session/:session_id`        close a session
//! - `POST   /api/irma/callback?ticketId=`    chained-session callback from the verifier

use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::models::ticket::{FlightOverride, NewTicket, Ticket};
use crate::services::orchestrator::{PassengerClaim, SessionOrchestrator, StartedSession, VerificationOutcome};
use crate::utils::url_helpers::public_base_url;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection, StringRejection},
        Json, Path, Query, State,
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Router,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;

/// Request payload for creating a ticket
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateTicketRequest {
    first_name: String,
    last_name: String,
    document_number: String,
    #[serde(default)]
    itinerary: Option<FlightOverride>,
}

/// Request payload for starting a verification session
#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct StartSessionRequest {
    ticket_id: String,
    first_name: String,
    last_name: String,
    document_number: String,
}

#[derive(Deserialize)]
struct ResultQuery {
    #[serde(rename = "sessionID")]
    session_id: Option<String>,
}

#[derive(Deserialize)]
struct CallbackQuery {
    #[serde(rename = "ticketId")]
    ticket_id: Option<String>,
}

/// API server state shared by all handlers
pub struct ApiServer {
    /// Verification/issuance state machine and its stores
    orchestrator: Arc<SessionOrchestrator>,

    server_config: Arc<ServerConfig>,
}

impl ApiServer {
    /// Creates a new instance of the API server
    ///
    /// # Arguments
    /// * `orchestrator` - Session state machine shared by all handlers
    /// * `server_config` - Listener settings and the public callback base
    pub fn new(orchestrator: Arc<SessionOrchestrator>, server_config: ServerConfig) -> Self {
        ApiServer {
            orchestrator,
            server_config: Arc::new(server_config),
        }
    }

    /// Builds the router with all API routes.
    #[allow(deprecated)]
    pub fn router(&self) -> Router {
        let timeout = Duration::from_secs(self.server_config.request_timeout_secs);

        Router::new()
            .route("/api/tickets", post(Self::create_ticket_handler))
            .route("/api/tickets/:ticket_id", get(Self::get_ticket_handler))
            .route("/api/start", post(Self::start_session_handler))
            .route("/api/result", get(Self::result_handler))
            .route("/api/session/:session_id", delete(Self::close_session_handler))
            .route("/api/irma/callback", post(Self::callback_handler))
            .layer(TimeoutLayer::new(timeout))
            .with_state(Arc::new(self.clone()))
    }

    /// Starts the API server and serves requests until Ctrl-C
    ///
    /// # Arguments
    /// * `addr` - Socket address to bind to (e.g., "127.0.0.1:8080")
    pub async fn run(&self, addr: SocketAddr) -> std::io::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        log::info!("API server listening on http://{}", addr);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    log::error!("failed to listen for shutdown signal: {}", e);
                }
                log::info!("shutting down");
            })
            .await
    }

    // =====================
    // Ticket Handlers
    // =====================

    /// Creates a ticket
    ///
    /// # Endpoint
    /// POST /api/tickets
    ///
    /// # Request Body
    /// JSON payload with `firstName`, `lastName`, `documentNumber` and an
    /// optional `itinerary` overriding the default flight fields
    ///
    /// # Responses
    /// - 200 OK: the stored ticket, including its generated id
    /// - 400 Bad Request: malformed body or blank identity fields
    async fn create_ticket_handler(
        State(state): State<Arc<ApiServer>>,
        payload: Result<Json<CreateTicketRequest>, JsonRejection>,
    ) -> Result<Json<Ticket>, ApiError> {
        let Json(payload) = payload.map_err(|e| ApiError::bad_request("invalid request", e.body_text()))?;

        let flight = payload.itinerary.unwrap_or_default().into_details();
        let ticket = NewTicket::normalized(&payload.first_name, &payload.last_name, &payload.document_number, flight)
            .ok_or_else(|| ApiError::bad_request("missing fields", "ticket request missing required fields"))?;

        let created = state.orchestrator.tickets().create(ticket);
        log::info!("created ticket {}", created.id);
        Ok(Json(created))
    }

    /// Fetches a ticket by id
    ///
    /// # Endpoint
    /// GET /api/tickets/:ticket_id
    ///
    /// # Parameters
    /// * `ticket_id` - Ticket identifier (path parameter)
    ///
    /// # Responses
    /// - 200 OK: the ticket
    /// - 404 Not Found: unknown ticket
    async fn get_ticket_handler(
        State(state): State<Arc<ApiServer>>,
        Path(ticket_id): Path<String>,
    ) -> Result<Json<Ticket>, ApiError> {
        Ok(Json(state.orchestrator.tickets().get(ticket_id.trim())?))
    }

    // =====================
    // Session Handlers
    // =====================

    /// Starts a chained disclosure session for a ticket
    ///
    /// # Endpoint
    /// POST /api/start
    ///
    /// # Request Body
    /// JSON payload with `ticketId` and the claimed `firstName`, `lastName`
    /// and `documentNumber`; unknown fields are rejected
    ///
    /// # Responses
    /// - 200 OK: `{sessionPtr, sessionId}`
    /// - 400 Bad Request: malformed body, missing fields or ticket mismatch
    /// - 404 Not Found: unknown ticket
    /// - 500 Internal Server Error: signing key problems
    /// - 502 Bad Gateway: verifier unreachable or misbehaving
    async fn start_session_handler(
        State(state): State<Arc<ApiServer>>,
        headers: HeaderMap,
        payload: Result<Json<StartSessionRequest>, JsonRejection>,
    ) -> Result<Json<StartedSession>, ApiError> {
        let Json(payload) = payload.map_err(|e| ApiError::bad_request("invalid request", e.body_text()))?;

        let ticket_id = payload.ticket_id.trim().to_string();
        if ticket_id.is_empty() {
            return Err(ApiError::bad_request("missing ticketId", "ticketId is required"));
        }
        if [&payload.first_name, &payload.last_name, &payload.document_number]
            .iter()
            .any(|field| field.trim().is_empty())
        {
            return Err(ApiError::bad_request("missing fields", "start request missing required fields"));
        }

        let public_base = public_base_url(state.server_config.next_session_url.as_deref(), &headers)
            .ok_or_else(|| ApiError::bad_request("invalid request", "cannot determine public callback base"))?;

        let claim = PassengerClaim {
            ticket_id,
            first_name: payload.first_name,
            last_name: payload.last_name,
            document_number: payload.document_number,
        };
        Ok(Json(state.orchestrator.start(&claim, &public_base).await?))
    }

    /// Returns the result of a session, verifying it against the linked ticket
    /// the first time it is requested
    ///
    /// # Endpoint
    /// GET /api/result?sessionID=
    ///
    /// # Parameters
    /// * `sessionID` - Session identifier returned by `/api/start` (query parameter)
    ///
    /// # Responses
    /// - 200 OK: `{sessionResult, verified, message?}`
    /// - 400 Bad Request: unreadable query, missing, unknown or expired sessionID
    /// - 502 Bad Gateway: verifier unreachable or misbehaving
    async fn result_handler(
        State(state): State<Arc<ApiServer>>,
        query: Result<Query<ResultQuery>, QueryRejection>,
    ) -> Result<Json<VerificationOutcome>, ApiError> {
        let Query(query) = query.map_err(|e| ApiError::bad_request("invalid request", e.body_text()))?;
        let session_id = query
            .session_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| ApiError::bad_request("missing sessionID", "sessionID query parameter is required"))?;

        Ok(Json(state.orchestrator.result(session_id.trim()).await?))
    }

    /// Closes a session, consuming its token
    ///
    /// # Endpoint
    /// DELETE /api/session/:session_id
    ///
    /// # Parameters
    /// * `session_id` - Session identifier (path parameter)
    ///
    /// # Responses
    /// - 204 No Content
    /// - 400 Bad Request: session unknown or already closed
    async fn close_session_handler(
        State(state): State<Arc<ApiServer>>,
        Path(session_id): Path<String>,
    ) -> Result<StatusCode, ApiError> {
        state.orchestrator.close(session_id.trim()).await?;
        Ok(StatusCode::NO_CONTENT)
    }

    /// Chained-session callback invoked by the verifier
    ///
    /// Always answers 200 once the payload could be read: with the boarding
    /// pass issuance request on a verified match, with an empty body otherwise.
    ///
    /// # Endpoint
    /// POST /api/irma/callback?ticketId=
    ///
    /// # Request Body
    /// The session result as a JWT signed by the verifier
    ///
    /// # Responses
    /// - 200 OK: issuance request JSON, or empty on no match
    /// - 400 Bad Request: unreadable query or body, missing ticketId, invalid JWT
    /// - 404 Not Found: unknown ticket
    async fn callback_handler(
        State(state): State<Arc<ApiServer>>,
        query: Result<Query<CallbackQuery>, QueryRejection>,
        body: Result<String, StringRejection>,
    ) -> Result<Response, ApiError> {
        let Query(query) = query.map_err(|e| ApiError::bad_request("invalid request", e.body_text()))?;
        let body = body.map_err(|e| ApiError::bad_request("invalid request", e.body_text()))?;
        let ticket_id = query
            .ticket_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| ApiError::bad_request("missing ticketId", "callback missing ticketId"))?;

        match state.orchestrator.callback(ticket_id.trim(), &body).await? {
            Some(issuance) => Ok(Json(issuance).into_response()),
            None => Ok(StatusCode::OK.into_response()),
        }
    }
}

// Implement Clone for ApiServer to use with Axum's State
impl Clone for ApiServer {
    fn clone(&self) -> Self {
        ApiServer {
            orchestrator: Arc::clone(&self.orchestrator),
            server_config: Arc::clone(&self.server_config),
        }
    }
}
