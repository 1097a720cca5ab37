//! # breaddie
//!
//! Server side of the breaddie recipe-sharing site: server actions over the
//! hosted backend, the adaptive story-learning pipeline, SEO structured data
//! and storage URL conventions, served over HTTP.

pub mod auth;
pub mod backend;
pub mod config;
pub mod error;
pub mod handlers;
pub mod llm;
pub mod models;
pub mod repositories;
pub mod seed;
pub mod seo;
pub mod server;
pub mod story;
pub mod telemetry;
pub mod urls;
