use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    api::{
        extract::{AuthUser, JsonBody, MaybeAuthUser, PathParams, QueryParams},
        AppState, Page, Pagination,
    },
    error::AppResult,
    models::{ListUpdate, MovieList, NewList},
    services::{lists, membership::Membership},
};

/// GET /api/v1/lists
pub async fn public(
    State(state): State<AppState>,
    QueryParams(pagination): QueryParams<Pagination>,
) -> AppResult<Json<Page<MovieList>>> {
    let found = lists::public_lists(&*state.store, pagination.window()).await?;
    Ok(Json(Page::new(found, &pagination)))
}

/// POST /api/v1/lists
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    JsonBody(body): JsonBody<NewList>,
) -> AppResult<(StatusCode, Json<MovieList>)> {
    let list = lists::create_list(&*state.store, &auth.principal(), body).await?;
    Ok((StatusCode::CREATED, Json(list)))
}

/// GET /api/v1/lists/:id
pub async fn get(
    State(state): State<AppState>,
    viewer: MaybeAuthUser,
    PathParams(id): PathParams<Uuid>,
) -> AppResult<Json<MovieList>> {
    let list = lists::get_list(&*state.store, viewer.principal().as_ref(), id).await?;
    Ok(Json(list))
}

/// PATCH /api/v1/lists/:id
pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    PathParams(id): PathParams<Uuid>,
    JsonBody(body): JsonBody<ListUpdate>,
) -> AppResult<Json<MovieList>> {
    let list = lists::update_list(&*state.store, &auth.principal(), id, body).await?;
    Ok(Json(list))
}

/// DELETE /api/v1/lists/:id
pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    PathParams(id): PathParams<Uuid>,
) -> AppResult<StatusCode> {
    lists::delete_list(&*state.store, &auth.principal(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/lists/:id/movies/:movie_id
pub async fn add_movie(
    State(state): State<AppState>,
    auth: AuthUser,
    PathParams((id, movie_id)): PathParams<(Uuid, Uuid)>,
) -> AppResult<Json<MovieList>> {
    let store = &*state.store;
    let list = lists::add_movie(store, store, &auth.principal(), id, movie_id).await?;
    Ok(Json(list))
}

/// DELETE /api/v1/lists/:id/movies/:movie_id
pub async fn remove_movie(
    State(state): State<AppState>,
    auth: AuthUser,
    PathParams((id, movie_id)): PathParams<(Uuid, Uuid)>,
) -> AppResult<Json<MovieList>> {
    let list = lists::remove_movie(&*state.store, &auth.principal(), id, movie_id).await?;
    Ok(Json(list))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowResponse {
    pub status: Membership,
    pub follower_count: usize,
}

/// POST /api/v1/lists/:id/follow
pub async fn toggle_follow(
    State(state): State<AppState>,
    auth: AuthUser,
    PathParams(id): PathParams<Uuid>,
) -> AppResult<Json<FollowResponse>> {
    let (list, status) = lists::toggle_follow(&*state.store, &auth.principal(), id).await?;
    Ok(Json(FollowResponse {
        status,
        follower_count: list.followers.len(),
    }))
}
