//! # Recipe Handlers

use axum::{
    extract::{Path, State},
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Json},
};
use tracing::warn;

use crate::error::{ApiError, not_found};
use crate::repositories::RecipeRepository;
use crate::seo::{RecipeStructuredData, generate_recipe_structured_data};
use crate::server::AppState;
use crate::urls::{StorageUrls, site_url};

pub const JSON_LD: &str = "application/ld+json";

/// Get schema.org structured data for a recipe
#[utoipa::path(
    get,
    path = "/recipes/{id}/structured-data",
    params(
        ("id" = String, Path, description = "Recipe ID")
    ),
    responses(
        (status = 200, description = "Recipe JSON-LD", body = RecipeStructuredData, content_type = "application/ld+json"),
        (status = 404, description = "Recipe not found", body = ApiError),
        (status = 502, description = "Backend request failed", body = ApiError)
    ),
    tag = "recipes"
)]
pub async fn get_recipe_structured_data(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let recipes = RecipeRepository::new(state.rows.clone());
    let recipe = recipes
        .fetch_recipe_with_author(&id)
        .await?
        .ok_or_else(|| not_found("Recipe not found."))?;

    // A missing rating is better than a failed page.
    let hearts = match recipes.heart_count(&id).await {
        Ok(hearts) => Some(hearts),
        Err(err) => {
            warn!(recipe_id = %id, error = %err, "Heart count unavailable");
            None
        }
    };

    let data = generate_recipe_structured_data(
        &recipe,
        hearts,
        &site_url(&state.config, ""),
        &StorageUrls::from_config(&state.config),
    );
    Ok(([(CONTENT_TYPE, JSON_LD)], Json(data)))
}
