//! # Repository Layer
//!
//! Server actions over the hosted backend. Each repository wraps the shared
//! [`RowStore`](crate::backend::RowStore) and returns plain [`ActionError`]
//! results, so callers never see raw backend errors.

use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::backend::RowStore;
use crate::error::ActionError;
use crate::models::NextReview;

pub mod profile;
pub mod recipe;
pub mod story;
pub mod study_session;

pub use profile::ProfileRepository;
pub use recipe::RecipeRepository;
pub use story::StoryRepository;
pub use study_session::StudySessionRepository;

/// Decodes a row (or rpc result) into a model.
pub(crate) fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ActionError> {
    serde_json::from_value(value)
        .map_err(|err| ActionError::service(format!("Unexpected response from backend: {err}")))
}

/// Decodes the first row, if any.
pub(crate) fn decode_first<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Option<T>, ActionError> {
    rows.into_iter().next().map(decode).transpose()
}

/// Runs the backend's spaced-repetition step for one card.
pub(crate) async fn calculate_next_review(
    rows: &dyn RowStore,
    current_ease: f64,
    current_interval: i64,
    quality: u8,
) -> Result<NextReview, ActionError> {
    let result = rows
        .rpc(
            "calculate_next_review",
            json!({
                "current_ease": current_ease,
                "current_interval": current_interval,
                "quality": quality,
            }),
        )
        .await
        .map_err(ActionError::database)?;

    let next = match result {
        Value::Array(rows) => decode_first(rows)?,
        Value::Null => None,
        row => Some(decode(row)?),
    };
    next.ok_or_else(|| ActionError::service("calculate_next_review returned no rows"))
}
