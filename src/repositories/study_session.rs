//! Study session repository
//!
//! Flashcard study sessions, per-card review scheduling through the
//! backend's `calculate_next_review` procedure, and the public deck catalogue.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::info;

use super::{calculate_next_review, decode, decode_first};
use crate::backend::{Filter, RowStore};
use crate::error::ActionError;
use crate::models::{
    CardReview, CardState, DeckSummary, NextReview, ReviewQuality, SessionType, StudySession,
    StudySessionSummary,
};

const DEFAULT_EASE: f64 = 2.5;

/// Repository for study sessions and card reviews
#[derive(Clone)]
pub struct StudySessionRepository {
    rows: Arc<dyn RowStore>,
}

impl StudySessionRepository {
    pub fn new(rows: Arc<dyn RowStore>) -> Self {
        Self { rows }
    }

    /// Opens a study session on a deck.
    pub async fn start_session(
        &self,
        user_id: &str,
        deck_id: &str,
        session_type: SessionType,
    ) -> Result<StudySession, ActionError> {
        let rows = self
            .rows
            .insert(
                "study_sessions",
                json!({
                    "user_id": user_id,
                    "deck_id": deck_id,
                    "session_type": session_type,
                    "start_time": Utc::now().to_rfc3339(),
                }),
            )
            .await
            .map_err(ActionError::database)?;

        let session: StudySession = decode_first(rows)?
            .ok_or_else(|| ActionError::service("study session insert returned no row"))?;
        info!(session_id = %session.id, deck_id, "Study session started");
        Ok(session)
    }

    /// Closes one of the user's study sessions, writing its counters and end time.
    pub async fn finish_session(
        &self,
        user_id: &str,
        session_id: &str,
        summary: &StudySessionSummary,
    ) -> Result<StudySession, ActionError> {
        let mut patch = json!(summary);
        patch["end_time"] = json!(Utc::now().to_rfc3339());

        let rows = self
            .rows
            .update(
                "study_sessions",
                &[Filter::eq("id", session_id), Filter::eq("user_id", user_id)],
                patch,
            )
            .await
            .map_err(ActionError::database)?;

        decode_first(rows)?
            .ok_or_else(|| ActionError::not_found(format!("Study session {session_id} not found")))
    }

    /// Grades one card and schedules its next review.
    ///
    /// Creates the user's review state for the card on first review.
    pub async fn review_card(
        &self,
        user_id: &str,
        card_id: &str,
        quality: ReviewQuality,
    ) -> Result<NextReview, ActionError> {
        let rows = self
            .rows
            .select(
                "card_reviews",
                "*",
                &[Filter::eq("card_id", card_id), Filter::eq("user_id", user_id)],
            )
            .await
            .map_err(ActionError::database)?;
        let existing: Option<CardReview> = decode_first(rows)?;

        let (ease, interval) = existing
            .as_ref()
            .map_or((DEFAULT_EASE, 0), |review| (review.ease_factor, review.interval));
        let next = calculate_next_review(self.rows.as_ref(), ease, interval, quality.score()).await?;

        let correct = quality.score() >= 3;
        let now = Utc::now().to_rfc3339();
        let mut row = json!({
            "ease_factor": next.new_ease,
            "interval": next.new_interval,
            "next_review": next.next_review,
            "last_quality": quality,
            "last_reviewed": now,
        });

        match existing {
            Some(review) => {
                row["card_state"] = json!(next_state(review.card_state, correct));
                row["repetitions"] = json!(review.repetitions + 1);
                row["total_reviews"] = json!(review.total_reviews + 1);
                row["correct_reviews"] = json!(review.correct_reviews + i64::from(correct));
                row["streak"] = json!(if correct { review.streak + 1 } else { 0 });
                self.rows
                    .update("card_reviews", &[Filter::eq("id", &review.id)], row)
                    .await
                    .map_err(ActionError::database)?;
            }
            None => {
                row["card_id"] = json!(card_id);
                row["user_id"] = json!(user_id);
                row["card_state"] = json!(next_state(CardState::New, correct));
                row["repetitions"] = json!(1);
                row["total_reviews"] = json!(1);
                row["correct_reviews"] = json!(i64::from(correct));
                row["streak"] = json!(i64::from(correct));
                self.rows
                    .insert("card_reviews", row)
                    .await
                    .map_err(ActionError::database)?;
            }
        }

        info!(card_id, quality = quality.score(), interval = next.new_interval, "Card reviewed");
        Ok(next)
    }

    /// Public decks, best rated first.
    pub async fn public_decks(&self, limit: usize) -> Result<Vec<DeckSummary>, ActionError> {
        self.rows
            .select(
                "decks_with_stats",
                "*",
                &[
                    Filter::eq("is_public", true),
                    Filter::order("average_rating", true),
                    Filter::limit(limit),
                ],
            )
            .await
            .map_err(ActionError::database)?
            .into_iter()
            .map(decode)
            .collect()
    }
}

/// Card state after a review: a lapse sends learned cards to relearning.
fn next_state(current: CardState, correct: bool) -> CardState {
    match (current, correct) {
        (CardState::Review | CardState::Mastered, false) => CardState::Relearning,
        (_, false) => CardState::Learning,
        (CardState::New | CardState::Learning | CardState::Relearning, true) => CardState::Review,
        (state, true) => state,
    }
}
