use std::sync::Arc;

use super::{decode, decode_first};
use crate::backend::{Filter, RowStore};
use crate::error::ActionError;
use crate::models::{RecipeHeartStats, RecipeWithAuthor};

/// Read access to recipes and their heart counts.
#[derive(Clone)]
pub struct RecipeRepository {
    rows: Arc<dyn RowStore>,
}

impl RecipeRepository {
    pub fn new(rows: Arc<dyn RowStore>) -> Self {
        Self { rows }
    }

    /// Fetches a recipe joined with its author's profile.
    pub async fn fetch_recipe_with_author(
        &self,
        id: &str,
    ) -> Result<Option<RecipeWithAuthor>, ActionError> {
        let rows = self
            .rows
            .select("recipes", "*, author:profiles(*)", &[Filter::eq("id", id)])
            .await
            .map_err(ActionError::database)?;
        decode_first(rows)
    }

    /// Heart totals for the given recipes. Recipes nobody hearted are absent
    /// from the result.
    pub async fn heart_stats(
        &self,
        recipe_ids: &[String],
    ) -> Result<Vec<RecipeHeartStats>, ActionError> {
        if recipe_ids.is_empty() {
            return Ok(Vec::new());
        }

        self.rows
            .select(
                "recipe_heart_stats",
                "id, total_hearts",
                &[Filter::is_in("id", recipe_ids)],
            )
            .await
            .map_err(ActionError::database)?
            .into_iter()
            .map(decode)
            .collect()
    }

    /// Total hearts for one recipe, zero when it has none.
    pub async fn heart_count(&self, recipe_id: &str) -> Result<u32, ActionError> {
        let stats = self.heart_stats(&[recipe_id.to_string()]).await?;
        Ok(stats
            .into_iter()
            .find(|stat| stat.id == recipe_id)
            .map_or(0, |stat| stat.total_hearts))
    }
}
