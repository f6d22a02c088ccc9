use axum::{extract::State, Json};
use serde::Deserialize;

use crate::{
    api::{extract::QueryParams, AppState, Page, Pagination},
    db::CacheKey,
    error::AppResult,
    models::Movie,
    services::search,
};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    q: String,
}

/// GET /api/v1/search?q=
pub async fn movies(
    State(state): State<AppState>,
    QueryParams(pagination): QueryParams<Pagination>,
    QueryParams(params): QueryParams<SearchQuery>,
) -> AppResult<Json<Page<Movie>>> {
    let key = CacheKey::Search {
        query: params.q.clone(),
        page: pagination.page(),
        limit: pagination.limit(),
    };
    let page: Page<Movie> = crate::cached!(state.cache.as_ref(), key, async {
        let found = search::search_movies(&*state.store, &params.q, pagination.window()).await?;
        Ok::<_, crate::error::AppError>(Page::new(found, &pagination))
    })?;
    Ok(Json(page))
}
