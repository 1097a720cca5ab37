mod test_utils;

use breaddie::repositories::StoryRepository;
use breaddie::repositories::story::StoryCompletion;
use breaddie::story::{StoryError, StoryGenerator, StoryRequest};
use serde_json::{Value, json};
use test_utils::{FakeRows, RowCall, ScriptedModel};

const STORY_REPLY: &str = r#"{
    "title": "The Night Market",
    "content": "Mara learned to knead dough while the market hummed.",
    "story_type": "news_adaptation",
    "complexity_level": 3,
    "estimated_reading_time": 4,
    "word_integration_points": [
        {"word": "Knead", "position": 3, "integration_type": "natural_flow", "context_strength": 0.9},
        {"word": "hummed", "position": 9, "integration_type": "definition_embedded"},
        {"word": "proof", "position": 12}
    ],
    "news_elements": [],
    "cultural_context": {"country_focus": "Taiwan", "cultural_elements": ["street food"]},
    "comprehension_questions": [
        {"question": "What did Mara learn?", "question_type": "word_meaning",
         "target_words": ["knead", "market"], "correct_answer": "To knead dough"}
    ]
}"#;

fn due_words() -> Value {
    json!([
        {"word_id": "w-knead", "word": "knead", "definition": "work dough", "contexts": [], "mastery_score": 0.25},
        {"word_id": "w-proof", "word": "proof", "definition": "let dough rise", "contexts": ["proof overnight"], "mastery_score": 0.6}
    ])
}

fn generator(rows: &std::sync::Arc<FakeRows>, model: &std::sync::Arc<ScriptedModel>) -> StoryGenerator {
    StoryGenerator::new(StoryRepository::new(rows.clone()), model.clone())
}

fn inserted(rows: &FakeRows, table: &str) -> Vec<Value> {
    rows.calls()
        .into_iter()
        .filter_map(|call| match call {
            RowCall::Insert { table: t, rows } if t == table => Some(rows),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn zero_due_words_fails_without_calling_the_model() {
    let rows = FakeRows::new();
    rows.on_rpc("get_user_words_for_story", json!([]));
    let model = ScriptedModel::replying(vec![STORY_REPLY]);

    let err = generator(&rows, &model)
        .generate_adaptive_story("user-1", StoryRequest::default())
        .await
        .unwrap_err();

    assert!(matches!(err, StoryError::NoDueWords));
    assert_eq!(err.to_string(), "No words due for review found");
    assert!(model.requests().is_empty());
    assert!(inserted(&rows, "story_sessions").is_empty());
}

#[tokio::test]
async fn word_lookup_failure_is_reported() {
    let rows = FakeRows::new();
    rows.fail_rpc("get_user_words_for_story", "permission denied");
    let model = ScriptedModel::replying(vec![STORY_REPLY]);

    let err = generator(&rows, &model)
        .generate_adaptive_story("user-1", StoryRequest::default())
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Failed to fetch user words: permission denied");
    assert!(model.requests().is_empty());
}

#[tokio::test]
async fn generates_and_records_a_story_session() {
    let rows = FakeRows::new();
    rows.on_rpc("get_user_words_for_story", due_words());
    rows.on_rpc(
        "get_relevant_news",
        json!([{"article_id": "n-1", "headline": "Bakers rally", "summary": "Flour prices fall", "category": "culture"}]),
    );
    rows.seed("profiles", vec![json!({"id": "user-1", "story_preferences": null})]);
    let model = ScriptedModel::replying(vec![STORY_REPLY]);

    let result = generator(&rows, &model)
        .generate_adaptive_story("user-1", StoryRequest::default())
        .await
        .expect("story generated");

    assert_eq!(result.story.title, "The Night Market");
    assert_eq!(result.story.complexity_level, 3);
    assert_eq!(result.session_id, "story_sessions-1");

    let requests = model.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].json_output);
    assert_eq!(requests[0].max_tokens, 2000);
    assert!(requests[0].user.contains("knead"));
    assert!(requests[0].user.contains("Bakers rally"));

    let news_args = rows.rpc_calls("get_relevant_news");
    assert_eq!(news_args.len(), 1);
    assert_eq!(news_args[0]["p_days_back"], 7);
    assert_eq!(news_args[0]["p_max_articles"], 2);
    assert_eq!(news_args[0]["p_complexity_level"], 3);

    let sessions = rows.rows("story_sessions");
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["status"], "active");
    assert_eq!(sessions[0]["user_id"], "user-1");
    assert_eq!(sessions[0]["target_words"], json!(["w-knead", "w-proof"]));
    assert_eq!(sessions[0]["integrated_news_articles"], json!(["n-1"]));
}

#[tokio::test]
async fn integration_points_for_unknown_words_are_not_persisted() {
    let rows = FakeRows::new();
    rows.on_rpc("get_user_words_for_story", due_words());
    let model = ScriptedModel::replying(vec![STORY_REPLY]);

    generator(&rows, &model)
        .generate_adaptive_story(
            "user-1",
            StoryRequest {
                max_words: 2,
                include_news: false,
            },
        )
        .await
        .expect("story generated");

    let integrations = rows.rows("story_word_integrations");
    let words: Vec<&str> = integrations
        .iter()
        .map(|row| row["word_id"].as_str().unwrap())
        .collect();
    assert_eq!(words, vec!["w-knead", "w-proof"]);
    assert!(integrations.iter().all(|row| row["story_session_id"] == "story_sessions-1"));

    let questions = rows.rows("story_comprehension_questions");
    assert_eq!(questions.len(), 1);
    assert_eq!(questions[0]["target_words"], json!(["w-knead"]));

    assert!(rows.rpc_calls("get_relevant_news").is_empty());
    assert_eq!(rows.rpc_calls("get_user_words_for_story")[0]["p_max_words"], 2);
}

#[tokio::test]
async fn news_opt_out_in_preferences_skips_news_lookup() {
    let rows = FakeRows::new();
    rows.on_rpc("get_user_words_for_story", due_words());
    rows.seed(
        "profiles",
        vec![json!({
            "id": "user-1",
            "story_preferences": {"interests": ["baking"], "news_integration": {"include_news": false}}
        })],
    );
    let model = ScriptedModel::replying(vec![STORY_REPLY]);

    generator(&rows, &model)
        .generate_adaptive_story("user-1", StoryRequest::default())
        .await
        .expect("story generated");

    assert!(rows.rpc_calls("get_relevant_news").is_empty());
    assert!(model.requests()[0].user.contains("baking"));
}

#[tokio::test]
async fn malformed_model_reply_creates_no_session() {
    let rows = FakeRows::new();
    rows.on_rpc("get_user_words_for_story", due_words());
    let model = ScriptedModel::replying(vec!["Once upon a time, not JSON."]);

    let err = generator(&rows, &model)
        .generate_adaptive_story("user-1", StoryRequest::default())
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "Failed to generate story: Invalid AI response format"
    );
    assert!(inserted(&rows, "story_sessions").is_empty());
}

#[tokio::test]
async fn model_failure_is_wrapped() {
    let rows = FakeRows::new();
    rows.on_rpc("get_user_words_for_story", due_words());
    let model = ScriptedModel::failing("rate limited");

    let err = generator(&rows, &model)
        .generate_adaptive_story("user-1", StoryRequest::default())
        .await
        .unwrap_err();

    assert!(err.to_string().starts_with("Failed to generate story: "));
    assert!(err.to_string().contains("rate limited"));
}

#[tokio::test]
async fn session_insert_failure_is_reported() {
    let rows = FakeRows::new();
    rows.on_rpc("get_user_words_for_story", due_words());
    rows.fail_writes_to("story_sessions");
    let model = ScriptedModel::replying(vec![STORY_REPLY]);

    let err = generator(&rows, &model)
        .generate_adaptive_story("user-1", StoryRequest::default())
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "Failed to create story session: insert into story_sessions rejected"
    );
}

#[tokio::test]
async fn failed_child_inserts_still_return_the_session() {
    let rows = FakeRows::new();
    rows.on_rpc("get_user_words_for_story", due_words());
    rows.fail_writes_to("story_word_integrations");
    rows.fail_writes_to("story_comprehension_questions");
    let model = ScriptedModel::replying(vec![STORY_REPLY]);

    let result = generator(&rows, &model)
        .generate_adaptive_story("user-1", StoryRequest::default())
        .await
        .expect("session returned despite child insert failures");

    assert_eq!(result.session_id, "story_sessions-1");
    assert_eq!(inserted(&rows, "story_word_integrations").len(), 1);
    assert_eq!(inserted(&rows, "story_comprehension_questions").len(), 1);
}

#[tokio::test]
async fn completing_a_session_credits_reviewed_words() {
    let rows = FakeRows::new();
    rows.seed(
        "story_sessions",
        vec![json!({"id": "s-1", "user_id": "user-1", "target_words": ["w-knead", "w-proof"], "status": "active"})],
    );
    rows.seed(
        "card_reviews",
        vec![json!({
            "id": "r-1", "card_id": "w-knead", "user_id": "user-1",
            "ease_factor": 2.5, "interval": 3, "repetitions": 2
        })],
    );
    rows.on_rpc(
        "calculate_next_review",
        json!([{"new_ease": 2.6, "new_interval": 8, "next_review": "2024-05-09T10:00:00Z"}]),
    );

    StoryRepository::new(rows.clone())
        .complete_story_session(
            "user-1",
            "s-1",
            &StoryCompletion {
                comprehension_score: 0.85,
                reading_time: 240,
                difficulty_rating: Some(3),
                relevance_rating: None,
            },
        )
        .await
        .expect("session completed");

    let session = &rows.rows("story_sessions")[0];
    assert_eq!(session["status"], "completed");
    assert_eq!(session["completion_percentage"], 100);
    assert!(session["completed_at"].is_string());

    // Only the word with existing review state is credited.
    let rpc = rows.rpc_calls("calculate_next_review");
    assert_eq!(rpc, vec![json!({"current_ease": 2.5, "current_interval": 3, "quality": 4})]);

    let review = &rows.rows("card_reviews")[0];
    assert_eq!(review["interval"], 8);
    assert_eq!(review["ease_factor"], 2.6);
    assert_eq!(review["next_review"], "2024-05-09T10:00:00Z");
}
