//! HTTP routes.
//!
//! - `GET /nonce`: mint a nonce and bind it to a fresh session cookie
//! - `POST /verify`: check a signed message against the session's nonce
//! - `GET /health`: liveness

use crate::error::ApiError;
use crate::session::{SessionCookie, SessionRegistry};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use qc_18_siwe_auth::{SiweAuthApi, VerificationResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Sign-in core
    pub auth: Arc<dyn SiweAuthApi>,
    /// Pending logins keyed by session cookie
    pub sessions: Arc<SessionRegistry>,
    /// Session cookie attributes
    pub cookie: Arc<SessionCookie>,
}

/// `POST /verify` body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyRequest {
    /// Exact message text that was signed
    pub message: String,
    /// `0x`-prefixed 65-byte signature
    pub signature: String,
}

#[derive(Debug, Serialize)]
struct NonceData {
    nonce: String,
}

#[derive(Debug, Serialize)]
struct DataEnvelope<T> {
    data: T,
}

/// Build the gateway router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/nonce", get(issue_nonce))
        .route("/verify", post(verify))
        .route("/health", get(health_check))
        .with_state(state)
}

async fn issue_nonce(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let nonce = state.auth.issue_nonce().await?;
    let session_id = state.sessions.open(nonce.clone(), Utc::now());

    let cookie = state.cookie.set_cookie(session_id);
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(DataEnvelope {
            data: NonceData { nonce },
        }),
    ))
}

async fn verify(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::invalid_body(e.body_text()))?;

    let session_id = session_id(&headers, &state.cookie.name);
    let session_nonce = session_id
        .and_then(|id| state.sessions.nonce_for(&id))
        .unwrap_or_default();
    let claims = state.auth.expected_claims(&session_nonce);

    match state
        .auth
        .verify(&request.message, &request.signature, &claims, Utc::now())
        .await?
    {
        VerificationResult::Accepted { address } => {
            if let Some(id) = session_id {
                state.sessions.close(&id);
            }
            info!(%address, "Login succeeded");
            Ok(StatusCode::NO_CONTENT)
        }
        VerificationResult::Rejected { reason } => {
            warn!(kind = reason.kind(), "Login refused");
            Err(ApiError::rejected(&reason))
        }
    }
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Session id from the `Cookie` header(s), if present and well-formed.
fn session_id(headers: &HeaderMap, cookie_name: &str) -> Option<Uuid> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == cookie_name)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
}
