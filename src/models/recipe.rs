use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use super::profile::Profile;

/// Row of the `recipes` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Recipe {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub subcategory: Option<String>,
    #[serde(default, deserialize_with = "super::lenient")]
    pub servings: Option<u32>,
    /// Total preparation and cooking time in minutes.
    #[serde(default, deserialize_with = "super::lenient")]
    pub total_time: Option<u32>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default, deserialize_with = "super::lenient")]
    pub nutrition_info: Option<NutritionInfo>,
    #[serde(default, deserialize_with = "super::lenient_list")]
    pub components: Vec<RecipeComponent>,
    #[serde(default, deserialize_with = "super::lenient_list")]
    pub instructions: Vec<Instruction>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// A named group of ingredients ("For the dough", "For the glaze").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RecipeComponent {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "super::lenient_list")]
    pub ingredients: Vec<Ingredient>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Ingredient {
    /// Quantity as entered; numbers are kept in their textual form.
    #[serde(default, deserialize_with = "text_or_number")]
    pub amount: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl Ingredient {
    /// `amount unit name` with empty parts dropped.
    pub fn display(&self) -> String {
        [&self.amount, &self.unit, &self.name]
            .into_iter()
            .filter_map(|part| part.as_deref())
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A cooking step, stored either as plain text or as `{ "content": ... }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum Instruction {
    Step { content: String },
    Text(String),
}

impl Instruction {
    pub fn text(&self) -> &str {
        match self {
            Instruction::Step { content } => content,
            Instruction::Text(text) => text,
        }
    }
}

/// Per-serving nutrition facts keyed by schema.org property names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NutritionInfo {
    #[serde(default)]
    pub calories: Option<NutrientValue>,
    #[serde(default)]
    pub protein_content: Option<NutrientValue>,
    #[serde(default)]
    pub carbohydrate_content: Option<NutrientValue>,
    #[serde(default)]
    pub fat_content: Option<NutrientValue>,
    #[serde(default)]
    pub fiber_content: Option<NutrientValue>,
    #[serde(default)]
    pub sugar_content: Option<NutrientValue>,
    #[serde(default)]
    pub sodium_content: Option<NutrientValue>,
}

/// A nutrient amount: bare (`250`, `"250"`) or measured (`{ "value": 250, "unit": "kcal" }`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum NutrientValue {
    Measured {
        value: f64,
        #[serde(default)]
        unit: Option<String>,
    },
    Amount(f64),
    Text(String),
}

impl NutrientValue {
    /// The bare amount as text; zero and empty values count as absent.
    pub fn amount(&self) -> Option<String> {
        match self {
            NutrientValue::Measured { value, .. } | NutrientValue::Amount(value) => {
                (*value != 0.0).then(|| value.to_string())
            }
            NutrientValue::Text(text) => {
                let text = text.trim();
                (!text.is_empty()).then(|| text.to_string())
            }
        }
    }
}

/// Recipe joined with its author's profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RecipeWithAuthor {
    #[serde(flatten)]
    pub recipe: Recipe,
    #[serde(default)]
    pub author: Option<Profile>,
}

/// Row of the `recipe_heart_stats` view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RecipeHeartStats {
    pub id: String,
    #[serde(default)]
    pub total_hearts: u32,
}

fn text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(Value::Number(n)) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        _ => None,
    })
}
