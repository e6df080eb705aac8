//! REST surface over an in-memory authoritative store.
//!
//! | Method | Path | Operation |
//! |---|---|---|
//! | POST | `/api/matches` | create a match |
//! | POST | `/api/matches/automated` | create a match against the automated opponent |
//! | POST | `/api/matches/{id}/join` | join |
//! | POST | `/api/matches/{id}/moves` | submit a move |
//! | GET | `/api/matches/{id}/status` | poll the snapshot |
//! | POST | `/api/matches/{id}/control` | control action |
//!
//! Game rejections come back with 200 and `accepted: false`. Unknown ids
//! are 404; join rejections are 409.

use crate::authority::{
    ControlReceipt, ControlRequest, CreatedMatch, JoinedMatch, MatchAuthority, MoveReceipt,
    MoveRequest, SeatRequest, StatusSnapshot,
};
use crate::error::{MatchError, MatchErrorKind};
use crate::memory::{AutomatedOpponent, FirstLegalMove, InMemoryAuthority};
use crate::session::MatchId;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    authority: InMemoryAuthority,
    opponent: Arc<dyn AutomatedOpponent>,
}

impl AppState {
    /// State serving `authority`, with [`FirstLegalMove`] as the automated opponent.
    pub fn new(authority: InMemoryAuthority) -> Self {
        Self {
            authority,
            opponent: Arc::new(FirstLegalMove),
        }
    }

    /// Replaces the automated opponent.
    pub fn with_opponent(self, opponent: Arc<dyn AutomatedOpponent>) -> Self {
        Self { opponent, ..self }
    }
}

/// Builds the router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/matches", post(create_match))
        .route("/api/matches/automated", post(create_automated_match))
        .route("/api/matches/{id}/join", post(join_match))
        .route("/api/matches/{id}/moves", post(submit_move))
        .route("/api/matches/{id}/status", get(get_status))
        .route("/api/matches/{id}/control", post(control_action))
        .with_state(state)
}

/// Error body returned for out-of-band failures.
impl IntoResponse for MatchError {
    fn into_response(self) -> Response {
        let status = match self.kind {
            MatchErrorKind::MatchNotFound => StatusCode::NOT_FOUND,
            MatchErrorKind::MatchFull
            | MatchErrorKind::InvalidTransition
            | MatchErrorKind::GameNotActive => StatusCode::CONFLICT,
            MatchErrorKind::CollaboratorUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::BAD_REQUEST,
        };
        warn!(error = %self, %status, "Request failed");
        (
            status,
            Json(json!({ "error": self.kind, "reason": self.user_message() })),
        )
            .into_response()
    }
}

/// POST /api/matches
#[instrument(skip(state, req), fields(player_id = %req.player_id))]
async fn create_match(
    State(state): State<AppState>,
    Json(req): Json<SeatRequest>,
) -> Result<Json<CreatedMatch>, MatchError> {
    let created = state.authority.create_match(req.into()).await?;
    info!(match_id = created.match_id, "Match created");
    Ok(Json(created))
}

/// POST /api/matches/automated
#[instrument(skip(state, req), fields(player_id = %req.player_id))]
async fn create_automated_match(
    State(state): State<AppState>,
    Json(req): Json<SeatRequest>,
) -> Result<Json<CreatedMatch>, MatchError> {
    let created = state
        .authority
        .create_automated_match(req.into(), state.opponent.clone())
        .await?;
    Ok(Json(created))
}

/// POST /api/matches/{id}/join
#[instrument(skip(state, req), fields(player_id = %req.player_id))]
async fn join_match(
    State(state): State<AppState>,
    Path(id): Path<MatchId>,
    Json(req): Json<SeatRequest>,
) -> Result<Json<JoinedMatch>, MatchError> {
    Ok(Json(state.authority.join_match(id, req.into()).await?))
}

/// POST /api/matches/{id}/moves
#[instrument(skip(state, req), fields(player_id = %req.player_id))]
async fn submit_move(
    State(state): State<AppState>,
    Path(id): Path<MatchId>,
    Json(req): Json<MoveRequest>,
) -> Result<Json<MoveReceipt>, MatchError> {
    let receipt = state
        .authority
        .submit_move(id, &req.player_id, req.to_move())
        .await?;
    Ok(Json(receipt))
}

/// GET /api/matches/{id}/status
#[instrument(skip(state))]
async fn get_status(
    State(state): State<AppState>,
    Path(id): Path<MatchId>,
) -> Result<Json<StatusSnapshot>, MatchError> {
    Ok(Json(state.authority.get_status(id).await?))
}

/// POST /api/matches/{id}/control
#[instrument(skip(state, req), fields(player_id = %req.player_id, action = %req.action))]
async fn control_action(
    State(state): State<AppState>,
    Path(id): Path<MatchId>,
    Json(req): Json<ControlRequest>,
) -> Result<Json<ControlReceipt>, MatchError> {
    let receipt = state
        .authority
        .control_action(id, &req.player_id, req.action)
        .await?;
    Ok(Json(receipt))
}

/// Binds `host:port` and serves until the process exits.
///
/// # Errors
///
/// Returns the bind or serve I/O error.
#[instrument(skip(state))]
pub async fn serve(host: &str, port: u16, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    info!(addr = %listener.local_addr()?, "Match server ready");
    axum::serve(listener, router(state)).await
}
