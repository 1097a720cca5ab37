//! Prompt text for adaptive story generation.

use crate::models::{DueWord, NewsArticle, StoryPreferences};

pub const SYSTEM_PROMPT: &str = "You are an expert language learning content creator. \
Create engaging, contextual stories that naturally integrate vocabulary learning with \
current events and user interests. Always respond with valid JSON.";

const RESPONSE_FORMAT: &str = r#"RESPONSE FORMAT: JSON object with:
{
  "title": "Engaging story title",
  "content": "The complete story text",
  "story_type": "news_adaptation|scenario_simulation|narrative_adventure|dialogue_conversation|documentary_style|personal_journal",
  "complexity_level": 1-5,
  "estimated_reading_time": minutes,
  "word_integration_points": [
    {
      "word": "target_word",
      "position": character_position_in_story,
      "integration_type": "natural_flow|definition_embedded|contrast_comparison|repetition_reinforcement|cultural_explanation",
      "context_strength": 1-10,
      "learning_emphasis": "subtle|highlighted|interactive|quiz_integrated",
      "alternative_forms": ["if applicable"]
    }
  ],
  "news_elements": [
    {
      "headline": "news headline used",
      "source": "source name",
      "category": "news category",
      "relevance_score": 1-10,
      "integrated_words": ["words from news"],
      "context_adaptation": "how news was adapted"
    }
  ],
  "cultural_context": {
    "cultural_elements": ["cultural aspects included"],
    "social_context": "social setting description",
    "idiomatic_expressions": ["any idioms used"]
  },
  "comprehension_questions": [
    {
      "question": "Question text",
      "question_type": "word_meaning|story_comprehension|word_usage|context_inference|cultural_understanding|news_connection",
      "target_words": ["words this tests"],
      "correct_answer": "correct answer",
      "multiple_choice_options": ["option A", "option B", "option C", "option D"],
      "explanation": "why this is correct",
      "difficulty_level": 1-5
    }
  ]
}"#;

/// Builds the user prompt from the due words, any news, and the learner's preferences.
pub fn build_story_prompt(
    words: &[DueWord],
    news: &[NewsArticle],
    prefs: &StoryPreferences,
) -> String {
    let mut prompt = String::from(
        "You are an AI language learning assistant that creates engaging, contextual stories \
         to help users learn vocabulary naturally.\n\n",
    );

    if !news.is_empty() {
        prompt.push_str("Recent news to potentially incorporate:\n");
        for article in news {
            prompt.push_str(&format!(
                "- {}: {}\n",
                article.headline,
                article.summary.as_deref().unwrap_or_default()
            ));
        }
        prompt.push('\n');
    }

    prompt.push_str(&user_context(prefs));
    prompt.push_str("\nTARGET WORDS TO INTEGRATE:\n");
    let numbered: Vec<String> = words
        .iter()
        .enumerate()
        .map(|(i, word)| {
            format!(
                "{}. \"{}\" - {} (mastery: {}%)",
                i + 1,
                word.word,
                word.definition.as_deref().unwrap_or_default(),
                mastery_percent(word.mastery_score)
            )
        })
        .collect();
    prompt.push_str(&numbered.join("\n"));

    let news_task = if news.is_empty() {
        "Uses current, relevant scenarios"
    } else {
        "Incorporates elements from the recent news provided"
    };
    prompt.push_str(&format!(
        "\n\nTASK: Create an engaging story that:\n\
         1. Naturally integrates ALL target words in meaningful contexts\n\
         2. {news_task}\n\
         3. Matches the user's interests and cultural background\n\
         4. Provides rich context clues for word meanings\n\
         5. Maintains narrative flow while emphasizing learning\n\n\
         REQUIREMENTS:\n\
         - Story length: 200-400 words (readable in 2-3 minutes)\n\
         - Include each target word at least once, some can appear multiple times\n\
         - Use varied sentence structures and contexts\n\
         - Make the story memorable and engaging\n\
         - Include subtle cultural elements when appropriate\n\n"
    ));
    prompt.push_str(RESPONSE_FORMAT);
    prompt
}

fn user_context(prefs: &StoryPreferences) -> String {
    let joined = |list: &Option<Vec<String>>, fallback: &str| match list {
        Some(items) if !items.is_empty() => items.join(", "),
        _ => fallback.to_string(),
    };
    let text = |value: &Option<String>, fallback: &str| {
        value
            .as_deref()
            .filter(|v| !v.is_empty())
            .unwrap_or(fallback)
            .to_string()
    };

    format!(
        "\nUser preferences:\n\
         - Interests: {}\n\
         - Attention span: {}\n\
         - Cultural background: {}\n\
         - Learning goals: {}\n",
        joined(&prefs.interests, "general"),
        text(&prefs.attention_span, "medium"),
        text(&prefs.cultural_background, "mixed"),
        joined(&prefs.learning_goals, "vocabulary building"),
    )
}

fn mastery_percent(score: Option<f64>) -> i64 {
    (score.unwrap_or(0.0) * 100.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(text: &str, definition: &str, mastery: f64) -> DueWord {
        DueWord {
            word_id: format!("id-{text}"),
            word: text.to_string(),
            definition: Some(definition.to_string()),
            contexts: Vec::new(),
            mastery_score: Some(mastery),
        }
    }

    #[test]
    fn numbers_target_words_with_mastery() {
        let prompt = build_story_prompt(
            &[word("knead", "to work dough", 0.426), word("proof", "to let rise", 0.0)],
            &[],
            &StoryPreferences::default(),
        );

        assert!(prompt.contains("1. \"knead\" - to work dough (mastery: 43%)"));
        assert!(prompt.contains("2. \"proof\" - to let rise (mastery: 0%)"));
        assert!(prompt.contains("2. Uses current, relevant scenarios"));
        assert!(!prompt.contains("Recent news"));
    }

    #[test]
    fn falls_back_to_default_preferences() {
        let prompt = build_story_prompt(&[word("a", "b", 0.5)], &[], &StoryPreferences::default());
        assert!(prompt.contains("- Interests: general"));
        assert!(prompt.contains("- Attention span: medium"));
        assert!(prompt.contains("- Cultural background: mixed"));
        assert!(prompt.contains("- Learning goals: vocabulary building"));
    }

    #[test]
    fn includes_news_context() {
        let news = NewsArticle {
            article_id: "n1".to_string(),
            headline: "Bakers strike".to_string(),
            summary: Some("Bread shortages loom".to_string()),
            category: None,
            source_name: None,
            publish_date: None,
        };
        let prefs = StoryPreferences {
            interests: Some(vec!["baking".to_string(), "travel".to_string()]),
            ..Default::default()
        };
        let prompt = build_story_prompt(&[word("a", "b", 0.5)], &[news], &prefs);

        assert!(prompt.contains("Recent news to potentially incorporate:\n- Bakers strike: Bread shortages loom"));
        assert!(prompt.contains("Incorporates elements from the recent news provided"));
        assert!(prompt.contains("- Interests: baking, travel"));
    }
}
