//! # SEO metadata
//!
//! schema.org JSON-LD for recipes and people, plus the page metadata
//! (title, description, OpenGraph, Twitter card) of public profile pages.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Profile, RecipeWithAuthor};
use crate::urls::StorageUrls;

const SCHEMA_CONTEXT: &str = "https://schema.org";
const UNKNOWN_AUTHOR: &str = "Unknown Author";
const SITE_NAME: &str = "Recipe App";

/// schema.org `Recipe`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecipeStructuredData {
    #[serde(rename = "@context")]
    pub context: String,
    #[serde(rename = "@type")]
    pub kind: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<Vec<String>>,
    pub author: AuthorData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_published: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipe_yield: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipe_category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregate_rating: Option<AggregateRating>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nutrition: Option<NutritionData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipe_ingredient: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipe_instructions: Option<Vec<HowToStep>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AuthorData {
    #[serde(rename = "@type")]
    pub kind: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AggregateRating {
    #[serde(rename = "@type")]
    pub kind: String,
    pub rating_value: u32,
    pub review_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NutritionData {
    #[serde(rename = "@type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calories: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protein_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carbohydrate_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fat_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fiber_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sugar_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sodium_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serving_size: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HowToStep {
    #[serde(rename = "@type")]
    pub kind: String,
    pub text: String,
    pub name: String,
}

/// schema.org `Person`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PersonStructuredData {
    #[serde(rename = "@context")]
    pub context: String,
    #[serde(rename = "@type")]
    pub kind: String,
    pub name: String,
    pub url: String,
    pub identifier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub knows_about: Option<Vec<String>>,
}

/// Rating shown to search engines: one star per ten hearts, between 1 and 5.
pub fn hearts_to_rating(total_hearts: u32) -> u32 {
    total_hearts.div_ceil(10).clamp(1, 5)
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Builds schema.org `Recipe` data. `aggregateRating` is present only when the
/// recipe has at least one heart.
pub fn generate_recipe_structured_data(
    recipe_with_author: &RecipeWithAuthor,
    hearts: Option<u32>,
    base_url: &str,
    urls: &StorageUrls,
) -> RecipeStructuredData {
    let recipe = &recipe_with_author.recipe;
    let author = recipe_with_author.author.as_ref();
    let username = author.and_then(|a| non_empty(Some(a.username.as_str())));

    let author = AuthorData {
        kind: "Person".to_string(),
        name: author
            .and_then(|a| non_empty(Some(a.name.as_str())))
            .or_else(|| username.clone())
            .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string()),
        url: username
            .as_ref()
            .map(|username| format!("{base_url}/profiles/{username}")),
    };

    let keywords = [recipe.category.as_deref(), recipe.subcategory.as_deref()]
        .into_iter()
        .filter_map(non_empty)
        .collect::<Vec<_>>()
        .join(", ");

    let servings = recipe.servings.filter(|s| *s > 0);

    let nutrition = recipe.nutrition_info.as_ref().map(|info| {
        let amount = |value: &Option<crate::models::NutrientValue>, suffix: &str| {
            value
                .as_ref()
                .and_then(|v| v.amount())
                .map(|amount| format!("{amount}{suffix}"))
        };
        NutritionData {
            kind: "NutritionInformation".to_string(),
            calories: amount(&info.calories, " calories"),
            protein_content: amount(&info.protein_content, "g"),
            carbohydrate_content: amount(&info.carbohydrate_content, "g"),
            fat_content: amount(&info.fat_content, "g"),
            fiber_content: amount(&info.fiber_content, "g"),
            sugar_content: amount(&info.sugar_content, "g"),
            sodium_content: amount(&info.sodium_content, "mg"),
            serving_size: servings.map(|s| format!("1 serving (of {s})")),
        }
    });

    // Present whenever the recipe has components, even if they list nothing.
    let ingredients = (!recipe.components.is_empty()).then(|| {
        recipe
            .components
            .iter()
            .flat_map(|component| &component.ingredients)
            .map(|ingredient| ingredient.display())
            .collect::<Vec<_>>()
    });

    let steps: Vec<HowToStep> = recipe
        .instructions
        .iter()
        .enumerate()
        .map(|(i, step)| HowToStep {
            kind: "HowToStep".to_string(),
            text: step.text().to_string(),
            name: format!("Step {}", i + 1),
        })
        .collect();

    RecipeStructuredData {
        context: SCHEMA_CONTEXT.to_string(),
        kind: "Recipe".to_string(),
        name: recipe.name.clone(),
        image: urls
            .recipe_image(recipe.image_url.as_deref(), recipe.updated_at.as_deref())
            .map(|url| vec![url]),
        author,
        date_published: non_empty(recipe.created_at.as_deref()),
        description: non_empty(recipe.description.as_deref()),
        total_time: recipe
            .total_time
            .filter(|t| *t > 0)
            .map(|t| format!("PT{t}M")),
        keywords: (!keywords.is_empty()).then_some(keywords),
        recipe_yield: servings.map(|s| format!("{s} servings")),
        recipe_category: non_empty(recipe.category.as_deref()),
        aggregate_rating: hearts.filter(|h| *h > 0).map(|h| AggregateRating {
            kind: "AggregateRating".to_string(),
            rating_value: hearts_to_rating(h),
            review_count: h,
        }),
        nutrition,
        recipe_ingredient: ingredients,
        recipe_instructions: (!steps.is_empty()).then_some(steps),
    }
}

/// Builds schema.org `Person` data. Creators of at least one recipe are
/// described as recipe creators.
pub fn generate_person_structured_data(
    profile: &Profile,
    recipes_created: Option<usize>,
    base_url: &str,
    urls: &StorageUrls,
) -> PersonStructuredData {
    let is_creator = recipes_created.is_some_and(|n| n > 0);

    PersonStructuredData {
        context: SCHEMA_CONTEXT.to_string(),
        kind: "Person".to_string(),
        name: profile.name.clone(),
        url: format!("{base_url}/profiles/{}", profile.username),
        identifier: profile.username.clone(),
        image: urls.avatar(profile.avatar_url.as_deref()),
        job_title: is_creator.then(|| "Recipe Creator".to_string()),
        knows_about: is_creator.then(|| {
            ["Cooking", "Recipe Development", "Food"]
                .map(String::from)
                .to_vec()
        }),
    }
}

/// Wraps structured data in a JSON-LD `<script>` tag.
pub fn generate_structured_data_script<T: Serialize>(data: &T) -> serde_json::Result<String> {
    let json = serde_json::to_string(data)?.replace("</", "<\\/");
    Ok(format!(r#"<script type="application/ld+json">{json}</script>"#))
}

/// Title, description and social cards of a profile page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PageMetadata {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_graph: Option<OpenGraph>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitter: Option<TwitterCard>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OpenGraph {
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TwitterCard {
    pub card: String,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
}

pub fn profile_page_metadata(
    profile: Option<&Profile>,
    recipes_count: usize,
    urls: &StorageUrls,
) -> PageMetadata {
    let Some(profile) = profile else {
        return PageMetadata {
            title: "Profile Not Found".to_string(),
            description: None,
            open_graph: None,
            twitter: None,
        };
    };

    let bio = non_empty(profile.bio.as_deref());
    let short = bio
        .clone()
        .unwrap_or_else(|| format!("{} has shared {recipes_count} recipes", profile.name));
    let images: Vec<String> = urls.avatar(profile.avatar_url.as_deref()).into_iter().collect();

    PageMetadata {
        title: format!("{} (@{}) | {SITE_NAME}", profile.name, profile.username),
        description: Some(bio.unwrap_or_else(|| {
            format!(
                "{} has shared {recipes_count} recipes on {SITE_NAME}",
                profile.name
            )
        })),
        open_graph: Some(OpenGraph {
            title: profile.name.clone(),
            description: short.clone(),
            kind: "profile".to_string(),
            username: profile.username.clone(),
            images: images.clone(),
        }),
        twitter: Some(TwitterCard {
            card: "summary".to_string(),
            title: profile.name.clone(),
            description: short,
            images,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Ingredient, Instruction, Recipe, RecipeComponent};
    use serde_json::json;

    fn urls() -> StorageUrls {
        StorageUrls::new("https://abc.supabase.co", false)
    }

    fn profile(name: &str, username: &str) -> Profile {
        Profile {
            id: "u1".to_string(),
            name: name.to_string(),
            username: username.to_string(),
            avatar_url: None,
            bio: None,
            preferred_unit_system: None,
            timezone: None,
            created_at: None,
            updated_at: None,
        }
    }

    fn recipe() -> RecipeWithAuthor {
        RecipeWithAuthor {
            recipe: Recipe {
                id: "r1".to_string(),
                name: "Country Loaf".to_string(),
                description: Some("A crusty sourdough".to_string()),
                category: Some("Bread".to_string()),
                subcategory: None,
                servings: Some(8),
                total_time: Some(90),
                image_url: None,
                nutrition_info: None,
                components: vec![RecipeComponent {
                    name: None,
                    ingredients: vec![Ingredient {
                        amount: Some("500".to_string()),
                        unit: Some("g".to_string()),
                        name: Some("flour".to_string()),
                    }],
                }],
                instructions: vec![
                    Instruction::Text("Mix".to_string()),
                    Instruction::Step {
                        content: "Bake".to_string(),
                    },
                ],
                created_by: Some("u1".to_string()),
                created_at: Some("2024-05-01T10:00:00Z".to_string()),
                updated_at: None,
            },
            author: Some(profile("Jane Baker", "janebaker")),
        }
    }

    #[test]
    fn no_hearts_means_no_rating() {
        let data = generate_recipe_structured_data(&recipe(), None, "https://b.co", &urls());
        assert!(data.aggregate_rating.is_none());

        let data = generate_recipe_structured_data(&recipe(), Some(0), "https://b.co", &urls());
        let value = serde_json::to_value(&data).unwrap();
        assert!(value.get("aggregateRating").is_none());
    }

    #[test]
    fn twenty_three_hearts_rate_three() {
        let data = generate_recipe_structured_data(&recipe(), Some(23), "https://b.co", &urls());
        let value = serde_json::to_value(&data).unwrap();
        assert_eq!(
            value["aggregateRating"],
            json!({ "@type": "AggregateRating", "ratingValue": 3, "reviewCount": 23 })
        );
    }

    #[test]
    fn rating_is_clamped() {
        assert_eq!(hearts_to_rating(1), 1);
        assert_eq!(hearts_to_rating(10), 1);
        assert_eq!(hearts_to_rating(11), 2);
        assert_eq!(hearts_to_rating(500), 5);
    }

    #[test]
    fn recipe_fields_follow_schema_org_shapes() {
        let data = generate_recipe_structured_data(&recipe(), None, "https://b.co", &urls());
        let value = serde_json::to_value(&data).unwrap();

        assert_eq!(value["@context"], "https://schema.org");
        assert_eq!(value["@type"], "Recipe");
        assert_eq!(value["totalTime"], "PT90M");
        assert_eq!(value["recipeYield"], "8 servings");
        assert_eq!(value["keywords"], "Bread");
        assert_eq!(value["recipeIngredient"], json!(["500 g flour"]));
        assert_eq!(value["recipeInstructions"][1]["name"], "Step 2");
        assert_eq!(value["recipeInstructions"][1]["text"], "Bake");
        assert_eq!(
            value["author"],
            json!({ "@type": "Person", "name": "Jane Baker", "url": "https://b.co/profiles/janebaker" })
        );
        assert!(value.get("image").is_none());
        assert!(value.get("nutrition").is_none());
    }

    #[test]
    fn ingredient_list_follows_components() {
        let mut bare = recipe();
        bare.recipe.components[0].ingredients = vec![
            Ingredient {
                amount: None,
                unit: None,
                name: None,
            },
            Ingredient {
                amount: Some("2".to_string()),
                unit: None,
                name: Some("eggs".to_string()),
            },
        ];
        let value = serde_json::to_value(generate_recipe_structured_data(
            &bare,
            None,
            "https://b.co",
            &urls(),
        ))
        .unwrap();
        assert_eq!(value["recipeIngredient"], json!(["", "2 eggs"]));

        bare.recipe.components[0].ingredients.clear();
        let data = generate_recipe_structured_data(&bare, None, "https://b.co", &urls());
        assert_eq!(data.recipe_ingredient, Some(Vec::new()));

        bare.recipe.components.clear();
        let data = generate_recipe_structured_data(&bare, None, "https://b.co", &urls());
        assert_eq!(data.recipe_ingredient, None);
    }

    #[test]
    fn author_falls_back_to_username_then_unknown() {
        let mut with_username = recipe();
        with_username.author = Some(profile("", "janebaker"));
        let data = generate_recipe_structured_data(&with_username, None, "https://b.co", &urls());
        assert_eq!(data.author.name, "janebaker");

        let mut anonymous = recipe();
        anonymous.author = None;
        let data = generate_recipe_structured_data(&anonymous, None, "https://b.co", &urls());
        assert_eq!(data.author.name, "Unknown Author");
        assert_eq!(data.author.url, None);
    }

    #[test]
    fn person_without_recipes_has_no_job_title() {
        let data = generate_person_structured_data(
            &profile("Jane Baker", "janebaker"),
            Some(0),
            "https://b.co",
            &urls(),
        );
        let value = serde_json::to_value(&data).unwrap();
        assert!(value.get("jobTitle").is_none());
        assert!(value.get("knowsAbout").is_none());
        assert_eq!(value["url"], "https://b.co/profiles/janebaker");
        assert_eq!(value["identifier"], "janebaker");
    }

    #[test]
    fn person_with_recipes_is_a_recipe_creator() {
        let mut jane = profile("Jane Baker", "janebaker");
        jane.avatar_url = Some("jane.png".to_string());
        let data = generate_person_structured_data(&jane, Some(4), "https://b.co", &urls());

        assert_eq!(data.job_title.as_deref(), Some("Recipe Creator"));
        assert_eq!(data.knows_about.unwrap().len(), 3);
        assert_eq!(
            data.image.as_deref(),
            Some("https://abc.supabase.co/storage/v1/object/public/avatars/jane.png")
        );
    }

    #[test]
    fn script_tag_escapes_closing_tags() {
        let script =
            generate_structured_data_script(&json!({ "name": "</script><b>" })).unwrap();
        assert_eq!(
            script,
            r#"<script type="application/ld+json">{"name":"<\/script><b>"}</script>"#
        );
    }

    #[test]
    fn page_metadata_uses_bio_or_recipe_count() {
        let jane = profile("Jane Baker", "janebaker");
        let meta = profile_page_metadata(Some(&jane), 2, &urls());
        assert_eq!(meta.title, "Jane Baker (@janebaker) | Recipe App");
        assert_eq!(
            meta.description.as_deref(),
            Some("Jane Baker has shared 2 recipes on Recipe App")
        );
        assert_eq!(
            meta.open_graph.unwrap().description,
            "Jane Baker has shared 2 recipes"
        );

        let missing = profile_page_metadata(None, 0, &urls());
        assert_eq!(missing.title, "Profile Not Found");
        assert!(missing.twitter.is_none());
    }
}
