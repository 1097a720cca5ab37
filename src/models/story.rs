//! Story-learning models: the due words and news fed into generation, the
//! learner's preferences, and the story the model sends back.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{lenient, lenient_list};

/// A word due for review, as returned by `get_user_words_for_story`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DueWord {
    pub word_id: String,
    pub word: String,
    #[serde(default)]
    pub definition: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub contexts: Vec<String>,
    /// Mastery in `0.0..=1.0`.
    #[serde(default, deserialize_with = "lenient")]
    pub mastery_score: Option<f64>,
}

/// A news article, as returned by `get_relevant_news`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct NewsArticle {
    pub article_id: String,
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub source_name: Option<String>,
    #[serde(default)]
    pub publish_date: Option<String>,
}

/// How far back to look for news.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NewsRecency {
    Today,
    #[default]
    ThisWeek,
    ThisMonth,
}

impl NewsRecency {
    pub fn days_back(self) -> u32 {
        match self {
            NewsRecency::Today => 1,
            NewsRecency::ThisWeek => 7,
            NewsRecency::ThisMonth => 30,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct NewsIntegrationPreferences {
    #[serde(default, deserialize_with = "lenient")]
    pub include_news: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub preferred_categories: Option<Vec<String>>,
    /// Unknown values fall back to a week.
    #[serde(default, deserialize_with = "lenient")]
    pub news_recency: Option<NewsRecency>,
    #[serde(default, deserialize_with = "lenient")]
    pub max_news_elements: Option<u32>,
}

/// `profiles.story_preferences`; every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StoryPreferences {
    #[serde(default, deserialize_with = "lenient")]
    pub interests: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient")]
    pub attention_span: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub cultural_background: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub learning_goals: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient")]
    pub news_integration: Option<NewsIntegrationPreferences>,
}

impl StoryPreferences {
    /// News is wanted unless the learner explicitly switched it off.
    pub fn wants_news(&self) -> bool {
        self.news_integration
            .as_ref()
            .and_then(|news| news.include_news)
            != Some(false)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StoryType {
    NewsAdaptation,
    ScenarioSimulation,
    #[default]
    NarrativeAdventure,
    DialogueConversation,
    DocumentaryStyle,
    PersonalJournal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationType {
    NaturalFlow,
    DefinitionEmbedded,
    ContrastComparison,
    RepetitionReinforcement,
    CulturalExplanation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EmphasisType {
    Subtle,
    Highlighted,
    Interactive,
    QuizIntegrated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    WordMeaning,
    StoryComprehension,
    WordUsage,
    ContextInference,
    CulturalUnderstanding,
    NewsConnection,
}

/// What a learner did while reading a story.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum InteractionType {
    WordClick,
    ComprehensionAnswer,
    WordUsageAttempt,
    PronunciationAttempt,
    ContextQuestion,
    StoryCompletion,
}

/// Where and how a target word shows up in the story text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WordIntegrationPoint {
    pub word: String,
    /// Character offset in the story.
    #[serde(default, deserialize_with = "lenient")]
    pub position: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub integration_type: Option<IntegrationType>,
    /// How naturally the word fits, 1-10.
    #[serde(default, deserialize_with = "lenient")]
    pub context_strength: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub learning_emphasis: Option<EmphasisType>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub alternative_forms: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct NewsElement {
    pub headline: String,
    #[serde(default, deserialize_with = "lenient")]
    pub source: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub relevance_score: Option<f64>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub integrated_words: Vec<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub context_adaptation: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub publish_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CulturalContext {
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub country_focus: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub cultural_elements: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub idiomatic_expressions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub social_context: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "lenient_list")]
    pub historical_references: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ComprehensionQuestion {
    pub question: String,
    #[serde(default, deserialize_with = "lenient")]
    pub question_type: Option<QuestionType>,
    /// Word texts the question exercises.
    #[serde(default, deserialize_with = "lenient_list")]
    pub target_words: Vec<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub correct_answer: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub multiple_choice_options: Vec<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub explanation: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub difficulty_level: Option<u8>,
}

/// A story as produced by the language model, with defaults filled in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GeneratedStory {
    pub title: String,
    pub content: String,
    pub story_type: StoryType,
    pub complexity_level: u8,
    /// Minutes.
    pub estimated_reading_time: u32,
    pub word_integration_points: Vec<WordIntegrationPoint>,
    pub news_elements: Vec<NewsElement>,
    pub cultural_context: CulturalContext,
    pub comprehension_questions: Vec<ComprehensionQuestion>,
}

/// A generated story and the id of the session row recorded for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GeneratedStorySession {
    pub story: GeneratedStory,
    pub session_id: String,
}
