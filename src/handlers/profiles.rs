//! # Profile Handlers
//!
//! Public profile page view model and profile editing for the signed-in user.

use axum::{
    extract::{Path, State, rejection::JsonRejection},
    response::Json,
};
use serde::Serialize;
use serde_json::json;
use tracing::warn;
use utoipa::ToSchema;

use crate::auth::{CurrentUser, MaybeUser};
use crate::error::{ApiError, forbidden, not_found};
use crate::models::{Profile, ProfileUpdate, Recipe, RecipeHeartStats};
use crate::repositories::{ProfileRepository, RecipeRepository};
use crate::seo::{
    PageMetadata, PersonStructuredData, generate_person_structured_data,
    generate_structured_data_script, profile_page_metadata,
};
use crate::server::AppState;
use crate::urls::{StorageUrls, site_url};

pub const EMPTY_BIO: &str = "This user hasn't set a bio yet.";

/// A created recipe as listed on a profile page
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProfileRecipe {
    #[serde(flatten)]
    pub recipe: Recipe,
    /// Public URL of the recipe image
    pub image: Option<String>,
    /// Total hearts, zero when nobody hearted the recipe
    pub hearts: u32,
}

/// Everything a profile page renders
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProfilePageView {
    pub profile: Profile,
    /// Profile bio, or a placeholder when none is set
    pub bio: String,
    pub avatar_image: Option<String>,
    /// Whether the signed-in user is looking at their own profile
    pub is_own_profile: bool,
    pub recipes_created: Vec<ProfileRecipe>,
    pub metadata: PageMetadata,
    pub structured_data: PersonStructuredData,
    /// JSON-LD `<script>` tag for the page head
    pub structured_data_script: String,
}

fn hearts_for(stats: &[RecipeHeartStats], recipe_id: &str) -> u32 {
    stats
        .iter()
        .find(|stat| stat.id == recipe_id)
        .map_or(0, |stat| stat.total_hearts)
}

/// Get a public profile page
#[utoipa::path(
    get,
    path = "/profiles/{username}",
    params(
        ("username" = String, Path, description = "Profile username")
    ),
    responses(
        (status = 200, description = "Profile page view model", body = ProfilePageView),
        (status = 404, description = "No profile with this username", body = ApiError),
        (status = 502, description = "Backend request failed", body = ApiError)
    ),
    tag = "profiles"
)]
pub async fn get_profile_page(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(username): Path<String>,
) -> Result<Json<ProfilePageView>, ApiError> {
    let urls = StorageUrls::from_config(&state.config);
    let profiles = ProfileRepository::new(state.rows.clone(), state.auth.clone());

    let Some(found) = profiles.fetch_profile_with_recipes(&username).await? else {
        return Err(not_found("Profile not found.")
            .with_details(json!({ "metadata": profile_page_metadata(None, 0, &urls) })));
    };

    let recipe_ids: Vec<String> = found.recipes_created.iter().map(|r| r.id.clone()).collect();
    let stats = match RecipeRepository::new(state.rows.clone())
        .heart_stats(&recipe_ids)
        .await
    {
        Ok(stats) => stats,
        Err(err) => {
            warn!(username = %username, error = %err, "Heart stats unavailable; showing zero hearts");
            Vec::new()
        }
    };

    let profile = found.profile;
    let recipes_count = found.recipes_created.len();
    let base_url = site_url(&state.config, "");
    let structured_data =
        generate_person_structured_data(&profile, Some(recipes_count), &base_url, &urls);
    let structured_data_script = generate_structured_data_script(&structured_data)
        .map_err(|err| ApiError::from(anyhow::Error::from(err)))?;

    Ok(Json(ProfilePageView {
        bio: profile
            .bio
            .clone()
            .filter(|bio| !bio.trim().is_empty())
            .unwrap_or_else(|| EMPTY_BIO.to_string()),
        avatar_image: urls.avatar(profile.avatar_url.as_deref()),
        is_own_profile: viewer.is_some_and(|user| user.id() == profile.id),
        recipes_created: found
            .recipes_created
            .into_iter()
            .map(|recipe| ProfileRecipe {
                image: urls.recipe_image(recipe.image_url.as_deref(), recipe.updated_at.as_deref()),
                hearts: hearts_for(&stats, &recipe.id),
                recipe,
            })
            .collect(),
        metadata: profile_page_metadata(Some(&profile), recipes_count, &urls),
        structured_data,
        structured_data_script,
        profile,
    }))
}

/// Update the signed-in user's profile
#[utoipa::path(
    put,
    path = "/profile",
    request_body = ProfileUpdate,
    responses(
        (status = 200, description = "Updated profile", body = Profile),
        (status = 400, description = "Missing profile ID", body = ApiError),
        (status = 401, description = "Not signed in", body = ApiError),
        (status = 403, description = "Profile belongs to another user", body = ApiError),
        (status = 502, description = "Backend rejected the update", body = ApiError)
    ),
    tag = "profiles"
)]
pub async fn update_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    payload: Result<Json<ProfileUpdate>, JsonRejection>,
) -> Result<Json<Profile>, ApiError> {
    let Json(update) = payload?;
    if update.id.as_deref().is_some_and(|id| id != user.id()) {
        return Err(forbidden(Some("You can only edit your own profile")));
    }

    let profile = ProfileRepository::new(state.rows.clone(), state.auth.clone())
        .update_user_profile(update, Some(&user.access_token))
        .await?;
    Ok(Json(profile))
}
