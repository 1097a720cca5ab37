//! # Study Handlers
//!
//! Flashcard study sessions, card reviews and the public deck listing.

use axum::{
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use serde_json::json;
use utoipa::{IntoParams, ToSchema};

use crate::auth::CurrentUser;
use crate::error::{ApiError, validation_error};
use crate::models::{
    DeckSummary, NextReview, ReviewQuality, SessionType, StudySession, StudySessionSummary,
};
use crate::repositories::StudySessionRepository;
use crate::server::AppState;

const DEFAULT_DECK_LIMIT: usize = 20;
const MAX_DECK_LIMIT: usize = 100;

#[derive(Debug, Deserialize, ToSchema)]
pub struct StartSessionRequest {
    pub deck_id: String,
    #[serde(default)]
    pub session_type: SessionType,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReviewRequest {
    pub card_id: String,
    /// Recall quality from 0 (forgot) to 5 (perfect)
    #[schema(minimum = 0, maximum = 5)]
    pub quality: u8,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct DeckListParams {
    /// Maximum number of decks (1-100, default 20)
    pub limit: Option<usize>,
}

/// Start a study session
#[utoipa::path(
    post,
    path = "/study/sessions",
    request_body = StartSessionRequest,
    responses(
        (status = 201, description = "Session started", body = StudySession),
        (status = 400, description = "Missing deck ID", body = ApiError),
        (status = 401, description = "Not signed in", body = ApiError),
        (status = 502, description = "Backend request failed", body = ApiError)
    ),
    tag = "study"
)]
pub async fn start_session(
    State(state): State<AppState>,
    user: CurrentUser,
    payload: Result<Json<StartSessionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<StudySession>), ApiError> {
    let Json(request) = payload?;
    if request.deck_id.trim().is_empty() {
        return Err(validation_error(
            "deck_id is required",
            json!({ "deck_id": "must not be empty" }),
        ));
    }

    let session = StudySessionRepository::new(state.rows.clone())
        .start_session(user.id(), &request.deck_id, request.session_type)
        .await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// Finish a study session
#[utoipa::path(
    post,
    path = "/study/sessions/{id}/finish",
    params(
        ("id" = String, Path, description = "Study session ID")
    ),
    request_body = StudySessionSummary,
    responses(
        (status = 200, description = "Session closed", body = StudySession),
        (status = 401, description = "Not signed in", body = ApiError),
        (status = 404, description = "Session not found", body = ApiError)
    ),
    tag = "study"
)]
pub async fn finish_session(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    payload: Result<Json<StudySessionSummary>, JsonRejection>,
) -> Result<Json<StudySession>, ApiError> {
    let Json(summary) = payload?;
    let session = StudySessionRepository::new(state.rows.clone())
        .finish_session(user.id(), &id, &summary)
        .await?;
    Ok(Json(session))
}

/// Grade a card and schedule its next review
#[utoipa::path(
    post,
    path = "/study/reviews",
    request_body = ReviewRequest,
    responses(
        (status = 200, description = "Next review schedule", body = NextReview),
        (status = 400, description = "Quality outside 0-5", body = ApiError),
        (status = 401, description = "Not signed in", body = ApiError),
        (status = 502, description = "Backend request failed", body = ApiError)
    ),
    tag = "study"
)]
pub async fn review_card(
    State(state): State<AppState>,
    user: CurrentUser,
    payload: Result<Json<ReviewRequest>, JsonRejection>,
) -> Result<Json<NextReview>, ApiError> {
    let Json(request) = payload?;
    let Some(quality) = ReviewQuality::from_score(request.quality) else {
        return Err(validation_error(
            "quality must be between 0 and 5",
            json!({ "quality": request.quality }),
        ));
    };

    let next = StudySessionRepository::new(state.rows.clone())
        .review_card(user.id(), &request.card_id, quality)
        .await?;
    Ok(Json(next))
}

/// List public decks, best rated first
#[utoipa::path(
    get,
    path = "/decks",
    params(DeckListParams),
    responses(
        (status = 200, description = "Public decks", body = Vec<DeckSummary>),
        (status = 502, description = "Backend request failed", body = ApiError)
    ),
    tag = "study"
)]
pub async fn list_decks(
    State(state): State<AppState>,
    Query(params): Query<DeckListParams>,
) -> Result<Json<Vec<DeckSummary>>, ApiError> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_DECK_LIMIT)
        .clamp(1, MAX_DECK_LIMIT);
    let decks = StudySessionRepository::new(state.rows.clone())
        .public_decks(limit)
        .await?;
    Ok(Json(decks))
}
