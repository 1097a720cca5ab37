//! Seed image tooling
//!
//! Uploads the images referenced by the seed data file into the storage
//! buckets, and inspects what the buckets currently hold.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{error, info, warn};

use crate::backend::{BackendError, ObjectStorage, StoredObject, UploadObject};
use crate::urls::{AVATARS_BUCKET, RECIPE_IMAGES_BUCKET};

pub const CACHE_CONTROL_SECS: u32 = 3600;
pub const LIST_LIMIT: usize = 100;

const USER_IMAGES_DIR: &str = "public/users";
const RECIPE_IMAGES_DIR: &str = "public/recipes";

/// The parts of the seed data file that reference images.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedData {
    pub user: SeedUser,
    #[serde(default)]
    pub recipes: Vec<SeedRecipe>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedUser {
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedRecipe {
    #[serde(default)]
    pub image_url: Option<String>,
}

/// A local file and the bucket it belongs in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedUpload {
    pub bucket: &'static str,
    pub path: PathBuf,
}

impl PlannedUpload {
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|name| name.to_str())
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UploadReport {
    pub uploaded: usize,
    pub overwritten: usize,
    pub skipped_missing: usize,
    pub skipped_existing: usize,
    pub failed: usize,
}

/// Files to upload: the user's avatar, then each recipe image, resolved
/// against the site's static folders under `root`.
pub fn plan_uploads(seed: &SeedData, root: &Path) -> Vec<PlannedUpload> {
    let avatar = seed.user.avatar_url.iter().map(|file| PlannedUpload {
        bucket: AVATARS_BUCKET,
        path: root.join(USER_IMAGES_DIR).join(file),
    });
    let recipes = seed
        .recipes
        .iter()
        .filter_map(|recipe| recipe.image_url.as_ref())
        .map(|file| PlannedUpload {
            bucket: RECIPE_IMAGES_BUCKET,
            path: root.join(RECIPE_IMAGES_DIR).join(file),
        });
    avatar
        .chain(recipes)
        .filter(|upload| upload.file_name().is_some_and(|name| !name.is_empty()))
        .collect()
}

/// MIME type by file extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

/// Uploads every planned file that exists locally.
///
/// With `overwrite` off, objects already in the bucket are left alone. Upload
/// failures are counted and logged; the run continues with the next file.
pub async fn upload_images(
    storage: &dyn ObjectStorage,
    uploads: &[PlannedUpload],
    overwrite: bool,
) -> UploadReport {
    let mut report = UploadReport::default();

    for upload in uploads {
        let Some(name) = upload.file_name() else {
            continue;
        };

        let bytes = match tokio::fs::read(&upload.path).await {
            Ok(bytes) => bytes,
            Err(_) => {
                warn!(path = %upload.path.display(), "Local file not found, skipping");
                report.skipped_missing += 1;
                continue;
            }
        };

        let exists = match storage.list(upload.bucket, Some(name), LIST_LIMIT).await {
            Ok(objects) => objects.iter().any(|object| object.name == name),
            Err(err) => {
                warn!(bucket = upload.bucket, file = name, error = %err, "Could not check for existing object");
                false
            }
        };
        if exists && !overwrite {
            info!(bucket = upload.bucket, file = name, "Already in storage, skipping");
            report.skipped_existing += 1;
            continue;
        }

        let object = UploadObject {
            name: name.to_string(),
            bytes,
            content_type: content_type_for(&upload.path).to_string(),
            cache_control_secs: CACHE_CONTROL_SECS,
            upsert: true,
        };
        match storage.upload(upload.bucket, object).await {
            Ok(()) if exists => {
                info!(bucket = upload.bucket, file = name, "Overwrote existing file");
                report.overwritten += 1;
            }
            Ok(()) => {
                info!(bucket = upload.bucket, file = name, "Uploaded new file");
                report.uploaded += 1;
            }
            Err(err) => {
                error!(bucket = upload.bucket, file = name, error = %err, "Upload failed");
                report.failed += 1;
            }
        }
    }

    report
}

/// Lists the first objects of each image bucket.
pub async fn list_buckets(
    storage: &dyn ObjectStorage,
) -> Vec<(&'static str, Result<Vec<StoredObject>, BackendError>)> {
    let mut listings = Vec::new();
    for bucket in [RECIPE_IMAGES_BUCKET, AVATARS_BUCKET] {
        listings.push((bucket, storage.list(bucket, None, LIST_LIMIT).await));
    }
    listings
}
