use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    api::{
        extract::{AuthUser, JsonBody, PathParams, QueryParams},
        AppState, Page, Pagination,
    },
    error::{AppError, AppResult},
    models::{
        CommentUpdate, Discussion, DiscussionSubject, DiscussionUpdate, NewComment, NewDiscussion,
    },
    services::discussions,
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectParams {
    pub movie_id: Option<Uuid>,
    pub person_id: Option<Uuid>,
}

impl SubjectParams {
    fn subject(&self) -> AppResult<Option<DiscussionSubject>> {
        match (self.movie_id, self.person_id) {
            (Some(_), Some(_)) => Err(AppError::InvalidInput(
                "Filter by movieId or personId, not both".to_string(),
            )),
            (Some(id), None) => Ok(Some(DiscussionSubject::Movie(id))),
            (None, Some(id)) => Ok(Some(DiscussionSubject::Person(id))),
            (None, None) => Ok(None),
        }
    }
}

/// GET /api/v1/discussions
pub async fn list(
    State(state): State<AppState>,
    QueryParams(pagination): QueryParams<Pagination>,
    QueryParams(params): QueryParams<SubjectParams>,
) -> AppResult<Json<Page<Discussion>>> {
    let found =
        discussions::list_discussions(&*state.store, params.subject()?, pagination.window())
            .await?;
    Ok(Json(Page::new(found, &pagination)))
}

/// POST /api/v1/discussions
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    JsonBody(body): JsonBody<NewDiscussion>,
) -> AppResult<(StatusCode, Json<Discussion>)> {
    let store = &*state.store;
    let discussion = discussions::create_discussion(store, store, &auth.principal(), body).await?;
    Ok((StatusCode::CREATED, Json(discussion)))
}

/// GET /api/v1/discussions/:id
pub async fn get(
    State(state): State<AppState>,
    PathParams(id): PathParams<Uuid>,
) -> AppResult<Json<Discussion>> {
    Ok(Json(discussions::get_discussion(&*state.store, id).await?))
}

/// PATCH /api/v1/discussions/:id
pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    PathParams(id): PathParams<Uuid>,
    JsonBody(body): JsonBody<DiscussionUpdate>,
) -> AppResult<Json<Discussion>> {
    let discussion =
        discussions::update_discussion(&*state.store, &auth.principal(), id, body).await?;
    Ok(Json(discussion))
}

/// DELETE /api/v1/discussions/:id
pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    PathParams(id): PathParams<Uuid>,
) -> AppResult<StatusCode> {
    discussions::delete_discussion(&*state.store, &auth.principal(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/discussions/:id/comments
pub async fn add_comment(
    State(state): State<AppState>,
    auth: AuthUser,
    PathParams(id): PathParams<Uuid>,
    JsonBody(body): JsonBody<NewComment>,
) -> AppResult<(StatusCode, Json<Discussion>)> {
    let discussion = discussions::add_comment(&*state.store, &auth.principal(), id, body).await?;
    Ok((StatusCode::CREATED, Json(discussion)))
}

/// PATCH /api/v1/discussions/:id/comments/:comment_id
pub async fn update_comment(
    State(state): State<AppState>,
    auth: AuthUser,
    PathParams((id, comment_id)): PathParams<(Uuid, Uuid)>,
    JsonBody(body): JsonBody<CommentUpdate>,
) -> AppResult<Json<Discussion>> {
    let discussion =
        discussions::update_comment(&*state.store, &auth.principal(), id, comment_id, body)
            .await?;
    Ok(Json(discussion))
}

/// DELETE /api/v1/discussions/:id/comments/:comment_id
pub async fn delete_comment(
    State(state): State<AppState>,
    auth: AuthUser,
    PathParams((id, comment_id)): PathParams<(Uuid, Uuid)>,
) -> AppResult<Json<Discussion>> {
    let discussion =
        discussions::delete_comment(&*state.store, &auth.principal(), id, comment_id).await?;
    Ok(Json(discussion))
}
