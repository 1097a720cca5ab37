//! Parsing of the model's JSON reply into a [`GeneratedStory`].

use serde::Deserialize;

use crate::models::{
    ComprehensionQuestion, CulturalContext, GeneratedStory, NewsElement, StoryType,
    WordIntegrationPoint, lenient, lenient_list,
};

const DEFAULT_COMPLEXITY: u8 = 2;
const DEFAULT_READING_MINUTES: u32 = 3;

#[derive(Debug, Deserialize)]
struct StoryReply {
    #[serde(default, deserialize_with = "lenient")]
    title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    content: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    story_type: Option<StoryType>,
    #[serde(default, deserialize_with = "lenient")]
    complexity_level: Option<u8>,
    #[serde(default, deserialize_with = "lenient")]
    estimated_reading_time: Option<u32>,
    #[serde(default, deserialize_with = "lenient_list")]
    word_integration_points: Vec<WordIntegrationPoint>,
    #[serde(default, deserialize_with = "lenient_list")]
    news_elements: Vec<NewsElement>,
    #[serde(default, deserialize_with = "lenient")]
    cultural_context: Option<CulturalContext>,
    #[serde(default, deserialize_with = "lenient_list")]
    comprehension_questions: Vec<ComprehensionQuestion>,
}

/// Parses the reply. `None` when it is not a JSON object or lacks a title or
/// content; every other field falls back to a default.
pub fn parse_story(reply: &str) -> Option<GeneratedStory> {
    let reply: StoryReply = serde_json::from_str(reply.trim()).ok()?;

    let title = reply.title.filter(|t| !t.trim().is_empty())?;
    let content = reply.content.filter(|c| !c.trim().is_empty())?;

    Some(GeneratedStory {
        title,
        content,
        story_type: reply.story_type.unwrap_or_default(),
        complexity_level: reply
            .complexity_level
            .filter(|level| *level > 0)
            .unwrap_or(DEFAULT_COMPLEXITY),
        estimated_reading_time: reply
            .estimated_reading_time
            .filter(|minutes| *minutes > 0)
            .unwrap_or(DEFAULT_READING_MINUTES),
        word_integration_points: reply.word_integration_points,
        news_elements: reply.news_elements,
        cultural_context: reply.cultural_context.unwrap_or_default(),
        comprehension_questions: reply.comprehension_questions,
    })
}
