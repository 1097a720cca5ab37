//! # Story Learning Handlers
//!
//! Page gate, generation and session feedback for adaptive story learning.

use axum::{
    body::Bytes,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;
use utoipa::ToSchema;

use crate::auth::{CurrentUser, MaybeUser};
use crate::error::{ApiError, validation_error};
use crate::models::{GeneratedStorySession, Profile};
use crate::repositories::story::{NewInteraction, StoryCompletion};
use crate::repositories::{ProfileRepository, StoryRepository};
use crate::server::AppState;
use crate::story::{StoryGenerator, StoryRequest};

pub const SIGN_IN_PATH: &str = "/auth";

/// Static metadata and learner context of the story-learning page
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StoryPageView {
    pub title: String,
    pub description: String,
    pub user_id: String,
    pub profile: Option<Profile>,
}

/// Open the story-learning page
#[utoipa::path(
    get,
    path = "/study/story",
    responses(
        (status = 200, description = "Story page view model", body = StoryPageView),
        (status = 307, description = "Not signed in; redirect to the sign-in page")
    ),
    tag = "story"
)]
pub async fn story_page(State(state): State<AppState>, MaybeUser(user): MaybeUser) -> Response {
    let Some(user) = user else {
        return Redirect::temporary(SIGN_IN_PATH).into_response();
    };

    let profile = match ProfileRepository::new(state.rows.clone(), state.auth.clone())
        .fetch_user_profile(user.id())
        .await
    {
        Ok(profile) => profile,
        Err(err) => {
            warn!(user_id = %user.id(), error = %err, "Profile unavailable for story page");
            None
        }
    };

    Json(StoryPageView {
        title: "Adaptive Story Learning | Anki AI".to_string(),
        description: "Learn vocabulary through engaging stories that incorporate current events and your personal learning goals".to_string(),
        user_id: user.user.id,
        profile,
    })
    .into_response()
}

/// Generate a story for the signed-in learner
#[utoipa::path(
    post,
    path = "/study/story",
    request_body = StoryRequest,
    responses(
        (status = 201, description = "Story generated and session recorded", body = GeneratedStorySession),
        (status = 400, description = "Malformed request body", body = ApiError),
        (status = 401, description = "Not signed in", body = ApiError),
        (status = 422, description = "No words are due for review", body = ApiError),
        (status = 502, description = "Backend or language model failed", body = ApiError)
    ),
    tag = "story"
)]
pub async fn generate_story(
    State(state): State<AppState>,
    user: CurrentUser,
    body: Bytes,
) -> Result<(StatusCode, Json<GeneratedStorySession>), ApiError> {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        StoryRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|err| {
            validation_error("Invalid story request", json!({ "body": err.to_string() }))
        })?
    };
    let generator = StoryGenerator::new(StoryRepository::new(state.rows.clone()), state.llm.clone());
    let session = generator.generate_adaptive_story(user.id(), request).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// Record a learner interaction with a story
#[utoipa::path(
    post,
    path = "/study/story/{session_id}/interactions",
    params(
        ("session_id" = String, Path, description = "Story session ID")
    ),
    request_body = NewInteraction,
    responses(
        (status = 204, description = "Interaction recorded"),
        (status = 401, description = "Not signed in", body = ApiError),
        (status = 404, description = "Session not found", body = ApiError),
        (status = 502, description = "Backend request failed", body = ApiError)
    ),
    tag = "story"
)]
pub async fn record_interaction(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(session_id): Path<String>,
    payload: Result<Json<NewInteraction>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(interaction) = payload?;
    StoryRepository::new(state.rows.clone())
        .record_user_interaction(user.id(), &session_id, &interaction)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Complete a story session and credit its words
#[utoipa::path(
    post,
    path = "/study/story/{session_id}/complete",
    params(
        ("session_id" = String, Path, description = "Story session ID")
    ),
    request_body = StoryCompletion,
    responses(
        (status = 204, description = "Session completed"),
        (status = 401, description = "Not signed in", body = ApiError),
        (status = 404, description = "Session not found", body = ApiError),
        (status = 502, description = "Backend request failed", body = ApiError)
    ),
    tag = "story"
)]
pub async fn complete_story(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(session_id): Path<String>,
    payload: Result<Json<StoryCompletion>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(completion) = payload?;
    StoryRepository::new(state.rows.clone())
        .complete_story_session(user.id(), &session_id, &completion)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
