//! # API Handlers
//!
//! HTTP endpoints of the breaddie service. Pages are served as JSON view models.

use crate::models::ServiceInfo;
use axum::response::Json;

pub mod auth_callback;
pub mod profiles;
pub mod recipes;
pub mod story;
pub mod study;

/// Root handler that returns basic service information
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service information", body = ServiceInfo)
    ),
    tag = "root"
)]
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo::default())
}
