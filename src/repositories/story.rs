//! Story repository
//!
//! Rows and remote procedures behind story learning: due words, news, story
//! sessions with their word integrations and questions, learner interactions,
//! and the word-progress update run when a session completes.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use super::{calculate_next_review, decode, decode_first};
use crate::backend::{Filter, RowStore};
use crate::error::ActionError;
use crate::models::{
    CardReview, CulturalContext, DueWord, EmphasisType, IntegrationType, InteractionType,
    NewsArticle, QuestionType, ReviewQuality, StoryPreferences, StoryType,
};

/// Row inserted into `story_sessions` when a story is generated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewStorySession {
    pub user_id: String,
    pub target_words: Vec<String>,
    pub story_title: String,
    pub story_content: String,
    pub story_type: StoryType,
    pub complexity_level: u8,
    pub estimated_reading_time: u32,
    pub integrated_news_articles: Vec<String>,
    pub cultural_context: CulturalContext,
    pub status: &'static str,
}

/// Row of `story_word_integrations`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewWordIntegration {
    pub story_session_id: String,
    pub word_id: String,
    pub position_in_story: Option<i64>,
    pub integration_type: Option<IntegrationType>,
    pub emphasis_type: Option<EmphasisType>,
    pub context_strength: Option<f64>,
    pub word_form_used: String,
    pub alternative_forms: Vec<String>,
}

/// Row of `story_comprehension_questions`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewComprehensionQuestion {
    pub story_session_id: String,
    pub question: String,
    pub question_type: Option<QuestionType>,
    /// Word ids, not texts.
    pub target_words: Vec<String>,
    pub correct_answer: Option<String>,
    pub multiple_choice_options: Vec<String>,
    pub explanation: Option<String>,
    pub difficulty_level: Option<u8>,
}

/// A learner interaction recorded against a story session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct NewInteraction {
    #[serde(default)]
    pub word_id: Option<String>,
    pub interaction_type: InteractionType,
    #[serde(default)]
    pub user_response: Option<String>,
    #[serde(default)]
    pub correctness_score: Option<f64>,
    /// Milliseconds.
    #[serde(default)]
    pub time_taken: Option<u64>,
}

/// Learner feedback submitted when a story session ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StoryCompletion {
    /// Fraction of comprehension questions answered correctly, `0.0..=1.0`.
    pub comprehension_score: f64,
    /// Seconds.
    pub reading_time: u32,
    #[serde(default)]
    pub difficulty_rating: Option<u8>,
    #[serde(default)]
    pub relevance_rating: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct SessionTargets {
    user_id: String,
    #[serde(default)]
    target_words: Vec<String>,
}

fn session_not_found(session_id: &str) -> ActionError {
    ActionError::not_found(format!("Story session {session_id} not found"))
}

/// Review quality credited to every target word of a completed story.
pub fn quality_for_score(comprehension_score: f64) -> u8 {
    if comprehension_score >= 0.8 {
        4
    } else if comprehension_score >= 0.6 {
        3
    } else {
        2
    }
}

/// Repository for story-learning rows and procedures
#[derive(Clone)]
pub struct StoryRepository {
    rows: Arc<dyn RowStore>,
}

impl StoryRepository {
    pub fn new(rows: Arc<dyn RowStore>) -> Self {
        Self { rows }
    }

    /// Words due for review, via `get_user_words_for_story`.
    pub async fn due_words(
        &self,
        user_id: &str,
        max_words: u32,
    ) -> Result<Vec<DueWord>, ActionError> {
        let result = self
            .rows
            .rpc(
                "get_user_words_for_story",
                json!({ "p_user_id": user_id, "p_max_words": max_words }),
            )
            .await
            .map_err(ActionError::database)?;

        match result {
            Value::Null => Ok(Vec::new()),
            other => decode(other),
        }
    }

    /// `profiles.story_preferences`; a missing or null column yields defaults.
    pub async fn story_preferences(&self, user_id: &str) -> Result<StoryPreferences, ActionError> {
        let row = self
            .rows
            .select_single("profiles", "story_preferences", &[Filter::eq("id", user_id)])
            .await
            .map_err(ActionError::database)?;

        match row.get("story_preferences") {
            Some(Value::Null) | None => Ok(StoryPreferences::default()),
            Some(prefs) => decode(prefs.clone()),
        }
    }

    /// News articles relevant to the learner, via `get_relevant_news`.
    pub async fn relevant_news(
        &self,
        categories: &[String],
        max_articles: u32,
        days_back: u32,
        complexity_level: u8,
    ) -> Result<Vec<NewsArticle>, ActionError> {
        let result = self
            .rows
            .rpc(
                "get_relevant_news",
                json!({
                    "p_categories": categories,
                    "p_max_articles": max_articles,
                    "p_days_back": days_back,
                    "p_complexity_level": complexity_level,
                }),
            )
            .await
            .map_err(ActionError::database)?;

        match result {
            Value::Null => Ok(Vec::new()),
            other => decode(other),
        }
    }

    /// Inserts a story session and returns its id.
    pub async fn insert_session(&self, session: &NewStorySession) -> Result<String, ActionError> {
        let rows = self
            .rows
            .insert("story_sessions", json!(session))
            .await
            .map_err(ActionError::database)?;

        rows.first()
            .and_then(|row| row.get("id"))
            .and_then(|id| match id {
                Value::String(id) => Some(id.clone()),
                Value::Number(id) => Some(id.to_string()),
                _ => None,
            })
            .ok_or_else(|| ActionError::service("story session insert returned no id"))
    }

    pub async fn insert_word_integrations(
        &self,
        integrations: &[NewWordIntegration],
    ) -> Result<(), ActionError> {
        if integrations.is_empty() {
            return Ok(());
        }
        self.rows
            .insert("story_word_integrations", json!(integrations))
            .await
            .map_err(ActionError::database)?;
        Ok(())
    }

    pub async fn insert_comprehension_questions(
        &self,
        questions: &[NewComprehensionQuestion],
    ) -> Result<(), ActionError> {
        if questions.is_empty() {
            return Ok(());
        }
        self.rows
            .insert("story_comprehension_questions", json!(questions))
            .await
            .map_err(ActionError::database)?;
        Ok(())
    }

    /// Records a learner interaction with one of the user's story sessions.
    pub async fn record_user_interaction(
        &self,
        user_id: &str,
        session_id: &str,
        interaction: &NewInteraction,
    ) -> Result<(), ActionError> {
        let owned = self
            .rows
            .select(
                "story_sessions",
                "id",
                &[Filter::eq("id", session_id), Filter::eq("user_id", user_id)],
            )
            .await
            .map_err(ActionError::database)?;
        if owned.is_empty() {
            return Err(session_not_found(session_id));
        }

        let row = json!({
            "story_session_id": session_id,
            "word_id": interaction.word_id,
            "interaction_type": interaction.interaction_type,
            "user_response": interaction.user_response,
            "correctness_score": interaction.correctness_score,
            "time_taken": interaction.time_taken,
            "additional_context": {},
        });

        self.rows
            .insert("story_user_interactions", row)
            .await
            .map_err(ActionError::database)?;
        debug!(session_id, interaction_type = ?interaction.interaction_type, "Recorded story interaction");
        Ok(())
    }

    /// Marks one of the user's story sessions completed, then credits its
    /// target words.
    ///
    /// Only the session update can fail the call; word-progress problems are
    /// logged and skipped.
    pub async fn complete_story_session(
        &self,
        user_id: &str,
        session_id: &str,
        completion: &StoryCompletion,
    ) -> Result<(), ActionError> {
        let patch = json!({
            "status": "completed",
            "completed_at": Utc::now().to_rfc3339(),
            "actual_reading_time": completion.reading_time,
            "comprehension_score": completion.comprehension_score,
            "difficulty_rating": completion.difficulty_rating,
            "relevance_rating": completion.relevance_rating,
            "completion_percentage": 100,
        });

        let completed = self
            .rows
            .update(
                "story_sessions",
                &[Filter::eq("id", session_id), Filter::eq("user_id", user_id)],
                patch,
            )
            .await
            .map_err(ActionError::database)?;
        if completed.is_empty() {
            return Err(session_not_found(session_id));
        }

        let updated = self
            .update_word_progress(user_id, session_id, completion.comprehension_score)
            .await;
        info!(session_id, words_updated = updated, "Story session completed");
        Ok(())
    }

    /// Applies one spaced-repetition step to each target word that already has
    /// review state for the session's user. Returns how many were updated.
    async fn update_word_progress(
        &self,
        user_id: &str,
        session_id: &str,
        comprehension_score: f64,
    ) -> usize {
        let targets = match self
            .rows
            .select_single(
                "story_sessions",
                "user_id, target_words",
                &[Filter::eq("id", session_id), Filter::eq("user_id", user_id)],
            )
            .await
            .map_err(ActionError::database)
            .and_then(decode::<SessionTargets>)
        {
            Ok(targets) => targets,
            Err(err) => {
                warn!(session_id, error = %err, "Could not load story session for word progress");
                return 0;
            }
        };

        let quality = quality_for_score(comprehension_score);
        let mut updated = 0;
        for word_id in &targets.target_words {
            match self.credit_word(&targets.user_id, word_id, quality).await {
                Ok(true) => updated += 1,
                Ok(false) => debug!(session_id, word_id = %word_id, "No review state for word; skipped"),
                Err(err) => {
                    warn!(session_id, word_id = %word_id, error = %err, "Failed to update word progress")
                }
            }
        }
        updated
    }

    async fn credit_word(&self, user_id: &str, word_id: &str, quality: u8) -> Result<bool, ActionError> {
        let rows = self
            .rows
            .select(
                "card_reviews",
                "*",
                &[Filter::eq("card_id", word_id), Filter::eq("user_id", user_id)],
            )
            .await
            .map_err(ActionError::database)?;
        let Some(review) = decode_first::<CardReview>(rows)? else {
            return Ok(false);
        };

        let next =
            calculate_next_review(self.rows.as_ref(), review.ease_factor, review.interval, quality)
                .await?;

        self.rows
            .update(
                "card_reviews",
                &[Filter::eq("id", &review.id)],
                json!({
                    "ease_factor": next.new_ease,
                    "interval": next.new_interval,
                    "next_review": next.next_review,
                    "last_quality": ReviewQuality::from_score(quality),
                    "last_reviewed": Utc::now().to_rfc3339(),
                }),
            )
            .await
            .map_err(ActionError::database)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_thresholds() {
        assert_eq!(quality_for_score(1.0), 4);
        assert_eq!(quality_for_score(0.8), 4);
        assert_eq!(quality_for_score(0.79), 3);
        assert_eq!(quality_for_score(0.6), 3);
        assert_eq!(quality_for_score(0.59), 2);
        assert_eq!(quality_for_score(0.0), 2);
    }

    #[test]
    fn session_row_serializes_column_names() {
        let row = NewStorySession {
            user_id: "u1".to_string(),
            target_words: vec!["w1".to_string()],
            story_title: "Market Day".to_string(),
            story_content: "...".to_string(),
            story_type: StoryType::NarrativeAdventure,
            complexity_level: 2,
            estimated_reading_time: 3,
            integrated_news_articles: Vec::new(),
            cultural_context: CulturalContext::default(),
            status: "active",
        };
        let value = json!(row);
        assert_eq!(value["story_type"], "narrative_adventure");
        assert_eq!(value["status"], "active");
        assert_eq!(value["target_words"], json!(["w1"]));
    }
}
