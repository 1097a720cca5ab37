//! Adaptive story generation
//!
//! One linear pipeline: due words, preferences, optional news, prompt, model
//! call, reply parsing, then the session row and its child rows. Nothing is
//! retried or rolled back; child-row failures are logged against the session.

use std::sync::Arc;

use axum::http::StatusCode;
use metrics::counter;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::llm::{CompletionRequest, LanguageModel, LlmError};
use crate::models::{
    DueWord, GeneratedStory, GeneratedStorySession, NewsArticle, StoryPreferences,
};
use crate::repositories::StoryRepository;
use crate::repositories::story::{NewComprehensionQuestion, NewStorySession, NewWordIntegration};

pub mod prompt;
pub mod response;

const DEFAULT_NEWS_CATEGORIES: [&str; 3] = ["world_news", "technology", "culture"];
const DEFAULT_MAX_NEWS: u32 = 2;
const NEWS_COMPLEXITY_LEVEL: u8 = 3;
const STORY_TEMPERATURE: f32 = 0.8;
const STORY_MAX_TOKENS: u32 = 2000;

/// Errors surfaced by [`StoryGenerator::generate_adaptive_story`].
#[derive(Debug, Error)]
pub enum StoryError {
    #[error("Failed to fetch user words: {0}")]
    FetchWords(String),
    #[error("No words due for review found")]
    NoDueWords,
    #[error("Failed to generate story: {0}")]
    Model(#[from] LlmError),
    #[error("Failed to generate story: Invalid AI response format")]
    InvalidResponse,
    #[error("Failed to create story session: {0}")]
    CreateSession(String),
}

impl StoryError {
    fn outcome(&self) -> &'static str {
        match self {
            StoryError::FetchWords(_) => "fetch_words_failed",
            StoryError::NoDueWords => "no_due_words",
            StoryError::Model(_) => "model_failed",
            StoryError::InvalidResponse => "invalid_response",
            StoryError::CreateSession(_) => "session_insert_failed",
        }
    }
}

impl From<StoryError> for ApiError {
    fn from(error: StoryError) -> Self {
        let message = error.to_string();
        match error {
            StoryError::NoDueWords => {
                ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, "NO_DUE_WORDS", &message)
            }
            _ => ApiError::new(StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", &message),
        }
    }
}

/// Options for one generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(default)]
pub struct StoryRequest {
    pub max_words: u32,
    pub include_news: bool,
}

impl Default for StoryRequest {
    fn default() -> Self {
        Self {
            max_words: 5,
            include_news: true,
        }
    }
}

/// Generates vocabulary stories for a learner and records them.
#[derive(Clone)]
pub struct StoryGenerator {
    repo: StoryRepository,
    llm: Arc<dyn LanguageModel>,
}

impl StoryGenerator {
    pub fn new(repo: StoryRepository, llm: Arc<dyn LanguageModel>) -> Self {
        Self { repo, llm }
    }

    #[instrument(skip_all, fields(user_id = %user_id, max_words = request.max_words))]
    pub async fn generate_adaptive_story(
        &self,
        user_id: &str,
        request: StoryRequest,
    ) -> Result<GeneratedStorySession, StoryError> {
        let result = self.run(user_id, request).await;
        let outcome = match &result {
            Ok(_) => "success",
            Err(err) => err.outcome(),
        };
        counter!("story_generations_total", "outcome" => outcome).increment(1);
        result
    }

    async fn run(
        &self,
        user_id: &str,
        request: StoryRequest,
    ) -> Result<GeneratedStorySession, StoryError> {
        let words = self
            .repo
            .due_words(user_id, request.max_words)
            .await
            .map_err(|err| StoryError::FetchWords(err.message))?;
        if words.is_empty() {
            return Err(StoryError::NoDueWords);
        }

        let prefs = match self.repo.story_preferences(user_id).await {
            Ok(prefs) => prefs,
            Err(err) => {
                warn!(error = %err, "Could not load story preferences; using defaults");
                StoryPreferences::default()
            }
        };

        let news = if request.include_news && prefs.wants_news() {
            self.fetch_news(&prefs).await
        } else {
            Vec::new()
        };

        let story = self.write_story(&words, &news, &prefs).await?;

        let session_id = self
            .repo
            .insert_session(&NewStorySession {
                user_id: user_id.to_string(),
                target_words: words.iter().map(|w| w.word_id.clone()).collect(),
                story_title: story.title.clone(),
                story_content: story.content.clone(),
                story_type: story.story_type,
                complexity_level: story.complexity_level,
                estimated_reading_time: story.estimated_reading_time,
                integrated_news_articles: news.iter().map(|n| n.article_id.clone()).collect(),
                cultural_context: story.cultural_context.clone(),
                status: "active",
            })
            .await
            .map_err(|err| StoryError::CreateSession(err.message))?;

        let integrations = word_integrations(&session_id, &story, &words);
        if let Err(err) = self.repo.insert_word_integrations(&integrations).await {
            warn!(session_id = %session_id, error = %err, "Failed to store word integrations");
        }

        let questions = comprehension_questions(&session_id, &story, &words);
        if let Err(err) = self.repo.insert_comprehension_questions(&questions).await {
            warn!(session_id = %session_id, error = %err, "Failed to store comprehension questions");
        }

        info!(
            session_id = %session_id,
            words = words.len(),
            news = news.len(),
            integrations = integrations.len(),
            questions = questions.len(),
            "Story generated"
        );

        Ok(GeneratedStorySession { story, session_id })
    }

    async fn fetch_news(&self, prefs: &StoryPreferences) -> Vec<NewsArticle> {
        let news_prefs = prefs.news_integration.clone().unwrap_or_default();
        let categories = news_prefs
            .preferred_categories
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_NEWS_CATEGORIES.map(String::from).to_vec());
        let max_articles = news_prefs
            .max_news_elements
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_MAX_NEWS);
        let days_back = news_prefs.news_recency.unwrap_or_default().days_back();

        match self
            .repo
            .relevant_news(&categories, max_articles, days_back, NEWS_COMPLEXITY_LEVEL)
            .await
        {
            Ok(news) => news,
            Err(err) => {
                warn!(error = %err, "News lookup failed; continuing without news");
                Vec::new()
            }
        }
    }

    async fn write_story(
        &self,
        words: &[DueWord],
        news: &[NewsArticle],
        prefs: &StoryPreferences,
    ) -> Result<GeneratedStory, StoryError> {
        let reply = self
            .llm
            .complete(CompletionRequest {
                system: prompt::SYSTEM_PROMPT.to_string(),
                user: prompt::build_story_prompt(words, news, prefs),
                temperature: STORY_TEMPERATURE,
                max_tokens: STORY_MAX_TOKENS,
                json_output: true,
            })
            .await?;

        response::parse_story(&reply).ok_or_else(|| {
            warn!(reply_chars = reply.len(), "Model reply is not a valid story");
            StoryError::InvalidResponse
        })
    }
}

/// Case-insensitive lookup of a due word's id by its text.
fn word_id_for<'a>(words: &'a [DueWord], text: &str) -> Option<&'a str> {
    let text = text.to_lowercase();
    words
        .iter()
        .find(|w| w.word.to_lowercase() == text)
        .map(|w| w.word_id.as_str())
}

/// Integration rows for points whose word matches a due word; the rest are dropped.
fn word_integrations(
    session_id: &str,
    story: &GeneratedStory,
    words: &[DueWord],
) -> Vec<NewWordIntegration> {
    story
        .word_integration_points
        .iter()
        .filter_map(|point| {
            let word_id = word_id_for(words, &point.word)?;
            Some(NewWordIntegration {
                story_session_id: session_id.to_string(),
                word_id: word_id.to_string(),
                position_in_story: point.position,
                integration_type: point.integration_type,
                emphasis_type: point.learning_emphasis,
                context_strength: point.context_strength,
                word_form_used: point.word.clone(),
                alternative_forms: point.alternative_forms.clone(),
            })
        })
        .collect()
}

/// Question rows with target word texts replaced by ids; unknown words are dropped.
fn comprehension_questions(
    session_id: &str,
    story: &GeneratedStory,
    words: &[DueWord],
) -> Vec<NewComprehensionQuestion> {
    story
        .comprehension_questions
        .iter()
        .map(|q| NewComprehensionQuestion {
            story_session_id: session_id.to_string(),
            question: q.question.clone(),
            question_type: q.question_type,
            target_words: q
                .target_words
                .iter()
                .filter_map(|text| word_id_for(words, text).map(str::to_string))
                .collect(),
            correct_answer: q.correct_answer.clone(),
            multiple_choice_options: q.multiple_choice_options.clone(),
            explanation: q.explanation.clone(),
            difficulty_level: q.difficulty_level,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ComprehensionQuestion, WordIntegrationPoint};

    fn due(id: &str, word: &str) -> DueWord {
        DueWord {
            word_id: id.to_string(),
            word: word.to_string(),
            definition: None,
            contexts: Vec::new(),
            mastery_score: None,
        }
    }

    fn point(word: &str) -> WordIntegrationPoint {
        WordIntegrationPoint {
            word: word.to_string(),
            position: Some(0),
            integration_type: None,
            context_strength: None,
            learning_emphasis: None,
            alternative_forms: Vec::new(),
        }
    }

    fn story(points: Vec<WordIntegrationPoint>, questions: Vec<ComprehensionQuestion>) -> GeneratedStory {
        GeneratedStory {
            title: "T".to_string(),
            content: "C".to_string(),
            story_type: Default::default(),
            complexity_level: 2,
            estimated_reading_time: 3,
            word_integration_points: points,
            news_elements: Vec::new(),
            cultural_context: Default::default(),
            comprehension_questions: questions,
        }
    }

    #[test]
    fn word_lookup_ignores_case() {
        let words = [due("w1", "Knead")];
        assert_eq!(word_id_for(&words, "kNEAD"), Some("w1"));
        assert_eq!(word_id_for(&words, "bake"), None);
    }

    #[test]
    fn unmatched_integration_points_are_dropped() {
        let words = [due("w1", "knead"), due("w2", "proof")];
        let rows = word_integrations(
            "s1",
            &story(vec![point("Knead"), point("sourdough"), point("proof")], Vec::new()),
            &words,
        );

        let ids: Vec<&str> = rows.iter().map(|r| r.word_id.as_str()).collect();
        assert_eq!(ids, vec!["w1", "w2"]);
        assert_eq!(rows[0].word_form_used, "Knead");
        assert!(rows.iter().all(|r| r.story_session_id == "s1"));
    }

    #[test]
    fn padded_word_forms_do_not_match() {
        let words = [due("w1", "knead")];
        assert_eq!(word_id_for(&words, " Knead "), None);

        let rows = word_integrations("s1", &story(vec![point(" Knead ")], Vec::new()), &words);
        assert!(rows.is_empty());
    }

    #[test]
    fn question_targets_are_mapped_to_ids() {
        let words = [due("w1", "knead")];
        let question = ComprehensionQuestion {
            question: "Q".to_string(),
            question_type: None,
            target_words: vec!["knead".to_string(), "whisk".to_string()],
            correct_answer: None,
            multiple_choice_options: Vec::new(),
            explanation: None,
            difficulty_level: None,
        };
        let rows = comprehension_questions("s1", &story(Vec::new(), vec![question]), &words);
        assert_eq!(rows[0].target_words, vec!["w1"]);
    }

    #[test]
    fn story_errors_carry_user_facing_messages() {
        assert_eq!(StoryError::NoDueWords.to_string(), "No words due for review found");
        assert_eq!(
            StoryError::FetchWords("timeout".to_string()).to_string(),
            "Failed to fetch user words: timeout"
        );
        assert_eq!(
            StoryError::Model(LlmError::EmptyResponse).to_string(),
            "Failed to generate story: No response from OpenAI"
        );
        assert_eq!(
            StoryError::InvalidResponse.to_string(),
            "Failed to generate story: Invalid AI response format"
        );
    }
}
