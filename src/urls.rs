//! Site and storage URL conventions.

use chrono::{DateTime, NaiveDateTime};

use crate::config::AppConfig;

pub const RECIPE_IMAGES_BUCKET: &str = "recipe_images";
pub const AVATARS_BUCKET: &str = "avatars";

const LOCAL_SITE_URL: &str = "http://localhost:3000/";

/// Absolute URL of a page on the public site.
///
/// Uses the configured site URL, then the deployment URL, then localhost.
/// Hosts given without a scheme are assumed to be https.
pub fn site_url(config: &AppConfig, path: &str) -> String {
    let base = [config.site_url.as_deref(), config.vercel_url.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|url| !url.is_empty())
        .unwrap_or(LOCAL_SITE_URL);

    let base = base.trim_end_matches('/');
    let base = if base.contains("http") {
        base.to_string()
    } else {
        format!("https://{base}")
    };

    match path.trim_start_matches('/') {
        "" => base,
        path => format!("{base}/{path}"),
    }
}

/// Builds public URLs for stored images.
///
/// A local stack serves seed images from the site's static folders; a hosted
/// stack serves them from public storage buckets.
#[derive(Debug, Clone)]
pub struct StorageUrls {
    supabase_url: String,
    development: bool,
}

impl StorageUrls {
    pub fn new(supabase_url: impl Into<String>, development: bool) -> Self {
        Self {
            supabase_url: supabase_url.into().trim_end_matches('/').to_string(),
            development,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.supabase_url.clone(), config.is_development())
    }

    /// Public URL of an object in a bucket, regardless of environment.
    pub fn public_object(&self, bucket: &str, filename: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.supabase_url, bucket, filename
        )
    }

    /// URL of a recipe image. In production the recipe's `updated_at` is
    /// appended as `?t=<epoch ms>` so caches refresh when the recipe changes.
    pub fn recipe_image(&self, filename: Option<&str>, updated_at: Option<&str>) -> Option<String> {
        let filename = filename.filter(|f| !f.is_empty())?;
        if self.development {
            return Some(format!("/recipes/{filename}"));
        }

        let url = self.public_object(RECIPE_IMAGES_BUCKET, filename);
        Some(match updated_at.and_then(epoch_millis) {
            Some(millis) => format!("{url}?t={millis}"),
            None => url,
        })
    }

    pub fn avatar(&self, filename: Option<&str>) -> Option<String> {
        let filename = filename.filter(|f| !f.is_empty())?;
        if self.development {
            Some(format!("/users/{filename}"))
        } else {
            Some(self.public_object(AVATARS_BUCKET, filename))
        }
    }
}

/// Milliseconds since the epoch for an RFC 3339 or naive ISO timestamp (read as UTC).
fn epoch_millis(timestamp: &str) -> Option<i64> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|dt| dt.timestamp_millis())
        .or_else(|_| {
            NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S%.f")
                .map(|dt| dt.and_utc().timestamp_millis())
        })
        .ok()
}
