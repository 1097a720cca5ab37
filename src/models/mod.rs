//! # Data Models
//!
//! Serde mirrors of the rows, views and remote-procedure results exposed by
//! the hosted backend, plus the small view types served by the API.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

pub mod profile;
pub mod recipe;
pub mod story;
pub mod study;

pub use profile::{Profile, ProfileUpdate, ProfileWithRecipes, UnitSystem};
pub use recipe::{
    Ingredient, Instruction, NutrientValue, NutritionInfo, Recipe, RecipeComponent,
    RecipeHeartStats, RecipeWithAuthor,
};
pub use story::{
    ComprehensionQuestion, CulturalContext, DueWord, EmphasisType, GeneratedStory,
    GeneratedStorySession, IntegrationType, InteractionType, NewsArticle, NewsElement,
    NewsIntegrationPreferences, NewsRecency, QuestionType, StoryPreferences, StoryType,
    WordIntegrationPoint,
};
pub use study::{
    CardReview, CardState, DeckCategory, DeckSummary, NextReview, ReviewQuality, SessionType,
    StudySession, StudySessionSummary,
};

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "breaddie".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Deserializes a field that may hold garbage into `None` instead of failing
/// the whole document.
pub(crate) fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|value| serde_json::from_value(value).ok()))
}

/// Deserializes a list, dropping elements that do not fit `T`. A missing,
/// null or non-array value yields an empty list.
pub(crate) fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

/// Accepts `3`, `3.0` or `"3"` for columns stored as text enums of digits.
pub(crate) fn number_or_string<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().map(|f| f as u64))
            .and_then(|n| u8::try_from(n).ok()),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}
