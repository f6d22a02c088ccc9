use axum::{extract::State, http::StatusCode, Json};
use uuid::Uuid;

use crate::{
    api::{
        extract::{AuthUser, JsonBody, PathParams},
        AppState,
    },
    error::AppResult,
    models::{Review, ReviewUpdate},
    services::reviews,
};

/// GET /api/v1/reviews/:id
pub async fn get(
    State(state): State<AppState>,
    PathParams(id): PathParams<Uuid>,
) -> AppResult<Json<Review>> {
    Ok(Json(reviews::get_review(&*state.store, id).await?))
}

/// PATCH /api/v1/reviews/:id
pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    PathParams(id): PathParams<Uuid>,
    JsonBody(body): JsonBody<ReviewUpdate>,
) -> AppResult<Json<Review>> {
    let store = &*state.store;
    let review = reviews::update_review(store, store, &auth.principal(), id, body).await?;
    Ok(Json(review))
}

/// DELETE /api/v1/reviews/:id
pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    PathParams(id): PathParams<Uuid>,
) -> AppResult<StatusCode> {
    let store = &*state.store;
    reviews::delete_review(store, store, &auth.principal(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
