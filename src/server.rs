//! # Server Configuration
//!
//! Router, shared state and startup for the breaddie API.

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::backend::{AuthProvider, RowStore, supabase::SupabaseClient};
use crate::config::AppConfig;
use crate::handlers;
use crate::llm::{LanguageModel, OpenAiClient};
use crate::telemetry::trace_context_middleware;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub rows: Arc<dyn RowStore>,
    pub auth: Arc<dyn AuthProvider>,
    pub llm: Arc<dyn LanguageModel>,
}

impl AppState {
    /// Wires the hosted backend and language model clients from configuration.
    pub fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let supabase = Arc::new(SupabaseClient::from_config(&config)?);
        let llm = Arc::new(OpenAiClient::from_config(&config)?);
        Ok(Self {
            config: Arc::new(config),
            rows: supabase.clone(),
            auth: supabase,
            llm,
        })
    }
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/auth/callback", get(handlers::auth_callback::auth_callback))
        .route(
            "/profiles/{username}",
            get(handlers::profiles::get_profile_page),
        )
        .route("/profile", put(handlers::profiles::update_profile))
        .route(
            "/recipes/{id}/structured-data",
            get(handlers::recipes::get_recipe_structured_data),
        )
        .route(
            "/study/story",
            get(handlers::story::story_page).post(handlers::story::generate_story),
        )
        .route(
            "/study/story/{session_id}/interactions",
            post(handlers::story::record_interaction),
        )
        .route(
            "/study/story/{session_id}/complete",
            post(handlers::story::complete_story),
        )
        .route("/study/sessions", post(handlers::study::start_session))
        .route(
            "/study/sessions/{id}/finish",
            post(handlers::study::finish_session),
        )
        .route("/study/reviews", post(handlers::study::review_card))
        .route("/decks", get(handlers::study::list_decks))
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(middleware::from_fn(trace_context_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Starts the server with the given configuration
pub async fn run_server(config: AppConfig) -> anyhow::Result<()> {
    let addr = config
        .bind_addr()
        .map_err(|e| anyhow::anyhow!("Invalid server address: {e}"))?;
    let profile = config.profile.clone();

    let app = create_app(AppState::from_config(config)?);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, %profile, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::auth_callback::auth_callback,
        crate::handlers::profiles::get_profile_page,
        crate::handlers::profiles::update_profile,
        crate::handlers::recipes::get_recipe_structured_data,
        crate::handlers::story::story_page,
        crate::handlers::story::generate_story,
        crate::handlers::story::record_interaction,
        crate::handlers::story::complete_story,
        crate::handlers::study::start_session,
        crate::handlers::study::finish_session,
        crate::handlers::study::review_card,
        crate::handlers::study::list_decks,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::error::ApiError,
            crate::error::ActionError,
            crate::error::ErrorKind,
            crate::models::Profile,
            crate::models::ProfileUpdate,
            crate::models::UnitSystem,
            crate::models::Recipe,
            crate::models::GeneratedStory,
            crate::models::GeneratedStorySession,
            crate::models::StudySession,
            crate::models::StudySessionSummary,
            crate::models::NextReview,
            crate::models::DeckSummary,
            crate::handlers::profiles::ProfilePageView,
            crate::handlers::profiles::ProfileRecipe,
            crate::handlers::story::StoryPageView,
            crate::handlers::study::StartSessionRequest,
            crate::handlers::study::ReviewRequest,
            crate::repositories::story::NewInteraction,
            crate::repositories::story::StoryCompletion,
            crate::story::StoryRequest,
            crate::seo::RecipeStructuredData,
            crate::seo::PersonStructuredData,
            crate::seo::PageMetadata,
        )
    ),
    tags(
        (name = "root", description = "Service information"),
        (name = "auth", description = "Sign-in callback"),
        (name = "profiles", description = "Public profiles and profile editing"),
        (name = "recipes", description = "Recipe structured data"),
        (name = "story", description = "Adaptive story learning"),
        (name = "study", description = "Flashcard study sessions and decks"),
    ),
    info(
        title = "breaddie API",
        description = "Recipe sharing and vocabulary learning service",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
