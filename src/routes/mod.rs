use axum::{http::StatusCode, Json};
use serde_json::{json, Value};

pub mod auth;
pub mod discussions;
pub mod lists;
pub mod movies;
pub mod recommendations;
pub mod reviews;
pub mod search;
pub mod users;

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
