//! Profile repository
//!
//! Reads public profiles and applies profile edits, keeping the auth user's
//! metadata in step with the preferred unit system.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{Value, json};
use tracing::{info, warn};

use super::{decode, decode_first};
use crate::backend::{AuthProvider, Filter, RowStore};
use crate::error::ActionError;
use crate::models::{Profile, ProfileUpdate, ProfileWithRecipes, Recipe};

/// Repository for profile operations
#[derive(Clone)]
pub struct ProfileRepository {
    rows: Arc<dyn RowStore>,
    auth: Arc<dyn AuthProvider>,
}

impl ProfileRepository {
    /// Creates a new ProfileRepository instance
    ///
    /// # Arguments
    ///
    /// * `rows` - Row store holding the `profiles` and `recipes` tables
    /// * `auth` - Auth service whose user metadata mirrors profile preferences
    pub fn new(rows: Arc<dyn RowStore>, auth: Arc<dyn AuthProvider>) -> Self {
        Self { rows, auth }
    }

    /// Fetches a profile by user ID
    ///
    /// # Returns
    ///
    /// `Ok(None)` when no profile row exists for the ID
    pub async fn fetch_user_profile(&self, id: &str) -> Result<Option<Profile>, ActionError> {
        let rows = self
            .rows
            .select("profiles", "*", &[Filter::eq("id", id)])
            .await
            .map_err(ActionError::database)?;
        decode_first(rows)
    }

    /// Fetches a profile by username together with the recipes it created
    ///
    /// # Returns
    ///
    /// `Ok(None)` when the username is unknown
    pub async fn fetch_profile_with_recipes(
        &self,
        username: &str,
    ) -> Result<Option<ProfileWithRecipes>, ActionError> {
        let rows = self
            .rows
            .select("profiles", "*", &[Filter::eq("username", username)])
            .await
            .map_err(ActionError::database)?;
        let Some(profile) = decode_first::<Profile>(rows)? else {
            return Ok(None);
        };

        let recipe_rows = self
            .rows
            .select(
                "recipes",
                "*",
                &[
                    Filter::eq("created_by", &profile.id),
                    Filter::order("created_at", true),
                ],
            )
            .await
            .map_err(ActionError::database)?;
        let recipes_created = recipe_rows
            .into_iter()
            .map(decode::<Recipe>)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(ProfileWithRecipes {
            profile,
            recipes_created,
        }))
    }

    /// Applies a partial profile update
    ///
    /// # Arguments
    ///
    /// * `update` - Fields to change; `id` is required
    /// * `access_token` - Session token of the signed-in user, used to mirror
    ///   `preferred_unit_system` into the auth user's metadata
    ///
    /// # Returns
    ///
    /// The updated profile row. A missing `id` fails with a `ValidationError`
    /// before any backend call. A failed metadata sync is logged and ignored.
    pub async fn update_user_profile(
        &self,
        update: ProfileUpdate,
        access_token: Option<&str>,
    ) -> Result<Profile, ActionError> {
        let Some(id) = update.id.clone().filter(|id| !id.trim().is_empty()) else {
            return Err(ActionError::validation("Profile ID is required for an update."));
        };

        let unit_system = update.preferred_unit_system;
        let payload = update_payload(&update, &Utc::now().to_rfc3339());

        let rows = self
            .rows
            .update("profiles", &[Filter::eq("id", &id)], payload)
            .await
            .map_err(|err| {
                warn!(profile_id = %id, error = %err, "Profile update failed");
                ActionError::database(err)
            })?;
        let profile: Profile = decode_first(rows)?
            .ok_or_else(|| ActionError::not_found(format!("Profile {id} not found")))?;

        if let Some(unit_system) = unit_system {
            match access_token {
                Some(token) => {
                    let data = json!({ "preferred_unit_system": unit_system });
                    if let Err(err) = self.auth.update_user_metadata(token, data).await {
                        warn!(
                            profile_id = %id,
                            error = %err,
                            "Failed to sync preferred unit system to auth metadata"
                        );
                    }
                }
                None => warn!(
                    profile_id = %id,
                    "No session token; preferred unit system not synced to auth metadata"
                ),
            }
        }

        info!(profile_id = %id, "Profile updated");
        Ok(profile)
    }
}

/// Row patch for an update: the supplied fields plus `updated_at`, never the id.
fn update_payload(update: &ProfileUpdate, updated_at: &str) -> Value {
    let mut payload = serde_json::to_value(update).unwrap_or_else(|_| json!({}));
    if let Value::Object(fields) = &mut payload {
        fields.remove("id");
        fields.insert("updated_at".to_string(), Value::String(updated_at.to_string()));
    }
    payload
}
