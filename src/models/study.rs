//! Flashcard study models: decks, per-user card review state and study sessions.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use super::{lenient, number_or_string};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DeckCategory {
    #[default]
    Vocabulary,
    Grammar,
    Phrases,
    Idioms,
    Academic,
    Business,
    Casual,
    Technical,
    Other,
}

/// Row of the `decks_with_stats` view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DeckSummary {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub category: Option<DeckCategory>,
    #[serde(default, deserialize_with = "number_or_string")]
    pub difficulty_level: Option<u8>,
    #[serde(default, deserialize_with = "super::lenient_list")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub target_language: Option<String>,
    #[serde(default)]
    pub card_count: u32,
    #[serde(default)]
    pub study_count: u32,
    #[serde(default)]
    pub average_rating: f64,
    #[serde(default)]
    pub rating_count: u32,
    #[serde(default)]
    pub favorite_count: u32,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub created_by_profile: Option<Value>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Learning state of a card for one user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CardState {
    #[default]
    New,
    Learning,
    Review,
    Relearning,
    Mastered,
}

/// Self-graded recall quality, scored 1 (again) to 5 (perfect).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReviewQuality {
    Again,
    Hard,
    Good,
    Easy,
    Perfect,
}

impl ReviewQuality {
    pub fn score(self) -> u8 {
        match self {
            ReviewQuality::Again => 1,
            ReviewQuality::Hard => 2,
            ReviewQuality::Good => 3,
            ReviewQuality::Easy => 4,
            ReviewQuality::Perfect => 5,
        }
    }

    pub fn from_score(score: u8) -> Option<Self> {
        match score {
            1 => Some(ReviewQuality::Again),
            2 => Some(ReviewQuality::Hard),
            3 => Some(ReviewQuality::Good),
            4 => Some(ReviewQuality::Easy),
            5 => Some(ReviewQuality::Perfect),
            _ => None,
        }
    }
}

/// Row of the `card_reviews` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CardReview {
    pub id: String,
    pub card_id: String,
    pub user_id: String,
    #[serde(default = "default_ease")]
    pub ease_factor: f64,
    #[serde(default)]
    pub interval: i64,
    #[serde(default)]
    pub repetitions: i64,
    #[serde(default)]
    pub next_review: Option<String>,
    #[serde(default)]
    pub card_state: CardState,
    #[serde(default)]
    pub last_quality: Option<ReviewQuality>,
    #[serde(default)]
    pub total_reviews: i64,
    #[serde(default)]
    pub correct_reviews: i64,
    #[serde(default)]
    pub streak: i64,
    #[serde(default)]
    pub last_reviewed: Option<String>,
}

fn default_ease() -> f64 {
    2.5
}

/// Result of the `calculate_next_review` remote procedure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct NextReview {
    pub new_ease: f64,
    pub new_interval: i64,
    pub next_review: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    New,
    Review,
    #[default]
    Mixed,
    Cram,
    Practice,
}

/// Row of the `study_sessions` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StudySession {
    pub id: String,
    pub user_id: String,
    pub deck_id: String,
    pub session_type: SessionType,
    pub start_time: String,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub cards_studied: u32,
    #[serde(default)]
    pub new_cards: u32,
    #[serde(default)]
    pub review_cards: u32,
    #[serde(default)]
    pub relearning_cards: u32,
    #[serde(default)]
    pub correct_answers: u32,
    /// Seconds.
    #[serde(default)]
    pub total_time: u32,
    /// Seconds.
    #[serde(default)]
    pub average_response_time: f64,
}

/// Counters written when a study session ends.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StudySessionSummary {
    #[serde(default)]
    pub cards_studied: u32,
    #[serde(default)]
    pub new_cards: u32,
    #[serde(default)]
    pub review_cards: u32,
    #[serde(default)]
    pub relearning_cards: u32,
    #[serde(default)]
    pub correct_answers: u32,
    #[serde(default)]
    pub total_time: u32,
    #[serde(default)]
    pub average_response_time: f64,
}
