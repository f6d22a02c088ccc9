use axum::{extract::State, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    api::{
        extract::{AuthUser, JsonBody, MaybeAuthUser, PathParams, QueryParams},
        AppState, Page, Pagination,
    },
    error::AppResult,
    models::{
        Movie, MovieList, ProfileUpdate, PublicProfile, Review, Role, TasteProfile, User,
        UserMovieSet,
    },
    services::{lists, reviews, users},
};

/// GET /api/v1/users/me
pub async fn me(AuthUser(user): AuthUser) -> Json<User> {
    Json(user)
}

/// PATCH /api/v1/users/me
pub async fn update_me(
    State(state): State<AppState>,
    auth: AuthUser,
    JsonBody(body): JsonBody<ProfileUpdate>,
) -> AppResult<Json<User>> {
    let user = users::update_profile(&*state.store, &auth.principal(), body).await?;
    Ok(Json(user))
}

/// PUT /api/v1/users/me/preferences
pub async fn set_preferences(
    State(state): State<AppState>,
    auth: AuthUser,
    JsonBody(body): JsonBody<TasteProfile>,
) -> AppResult<Json<TasteProfile>> {
    let preferences = users::set_preferences(&*state.store, &auth.principal(), body).await?;
    Ok(Json(preferences))
}

/// GET /api/v1/users/me/wishlist
pub async fn wishlist(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<Vec<Movie>>> {
    let store = &*state.store;
    let movies = users::wishlist_movies(store, store, &auth.principal()).await?;
    Ok(Json(movies))
}

async fn add_to(
    state: &AppState,
    auth: &AuthUser,
    set: UserMovieSet,
    movie_id: Uuid,
) -> AppResult<Json<User>> {
    let store = &*state.store;
    let user = users::add_to_set(store, store, &auth.principal(), set, movie_id).await?;
    Ok(Json(user))
}

async fn remove_from(
    state: &AppState,
    auth: &AuthUser,
    set: UserMovieSet,
    movie_id: Uuid,
) -> AppResult<Json<User>> {
    let user = users::remove_from_set(&*state.store, &auth.principal(), set, movie_id).await?;
    Ok(Json(user))
}

/// POST /api/v1/users/me/wishlist/:movie_id
pub async fn add_to_wishlist(
    State(state): State<AppState>,
    auth: AuthUser,
    PathParams(movie_id): PathParams<Uuid>,
) -> AppResult<Json<User>> {
    add_to(&state, &auth, UserMovieSet::Wishlist, movie_id).await
}

/// DELETE /api/v1/users/me/wishlist/:movie_id
pub async fn remove_from_wishlist(
    State(state): State<AppState>,
    auth: AuthUser,
    PathParams(movie_id): PathParams<Uuid>,
) -> AppResult<Json<User>> {
    remove_from(&state, &auth, UserMovieSet::Wishlist, movie_id).await
}

/// POST /api/v1/users/me/watched/:movie_id
pub async fn add_to_watched(
    State(state): State<AppState>,
    auth: AuthUser,
    PathParams(movie_id): PathParams<Uuid>,
) -> AppResult<Json<User>> {
    add_to(&state, &auth, UserMovieSet::Watched, movie_id).await
}

/// DELETE /api/v1/users/me/watched/:movie_id
pub async fn remove_from_watched(
    State(state): State<AppState>,
    auth: AuthUser,
    PathParams(movie_id): PathParams<Uuid>,
) -> AppResult<Json<User>> {
    remove_from(&state, &auth, UserMovieSet::Watched, movie_id).await
}

/// GET /api/v1/users/:id
pub async fn profile(
    State(state): State<AppState>,
    PathParams(id): PathParams<Uuid>,
) -> AppResult<Json<PublicProfile>> {
    let user = users::get_user(&*state.store, id).await?;
    Ok(Json(PublicProfile::from(&user)))
}

/// GET /api/v1/users/:id/reviews
pub async fn user_reviews(
    State(state): State<AppState>,
    PathParams(id): PathParams<Uuid>,
    QueryParams(pagination): QueryParams<Pagination>,
) -> AppResult<Json<Page<Review>>> {
    let store = &*state.store;
    let found = reviews::user_reviews(store, store, id, pagination.window()).await?;
    Ok(Json(Page::new(found, &pagination)))
}

/// GET /api/v1/users/:id/lists
pub async fn user_lists(
    State(state): State<AppState>,
    viewer: MaybeAuthUser,
    PathParams(id): PathParams<Uuid>,
    QueryParams(pagination): QueryParams<Pagination>,
) -> AppResult<Json<Page<MovieList>>> {
    let store = &*state.store;
    let found = lists::user_lists(
        store,
        store,
        viewer.principal().as_ref(),
        id,
        pagination.window(),
    )
    .await?;
    Ok(Json(Page::new(found, &pagination)))
}

/// GET /api/v1/admin/users
pub async fn list_users(
    State(state): State<AppState>,
    auth: AuthUser,
    QueryParams(pagination): QueryParams<Pagination>,
) -> AppResult<Json<Page<User>>> {
    let found = users::list_users(&*state.store, &auth.principal(), pagination.window()).await?;
    Ok(Json(Page::new(found, &pagination)))
}

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: Role,
}

/// PUT /api/v1/admin/users/:id/role
pub async fn set_role(
    State(state): State<AppState>,
    auth: AuthUser,
    PathParams(id): PathParams<Uuid>,
    JsonBody(body): JsonBody<RoleRequest>,
) -> AppResult<Json<User>> {
    let user = users::set_role(&*state.store, &auth.principal(), id, body.role).await?;
    Ok(Json(user))
}
