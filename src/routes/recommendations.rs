use axum::{extract::State, Json};

use crate::{
    api::{extract::AuthUser, AppState},
    error::AppResult,
    models::Movie,
    services::recommendations,
};

/// GET /api/v1/recommendations
pub async fn for_me(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<Vec<Movie>>> {
    let store = &*state.store;
    let found = recommendations::for_user(store, store, user.id, &user.preferences).await?;
    Ok(Json(found))
}
