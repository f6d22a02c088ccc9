use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    api::{
        extract::{AuthUser, JsonBody, PathParams, QueryParams},
        AppState, Page, Pagination,
    },
    db::{
        query::{MovieFilter, MovieQuery, MovieSort, MovieSortField, ReviewSort},
        CacheKey,
    },
    error::{AppError, AppResult},
    models::{Movie, MovieChild, MovieUpdate, NewMovie, NewReview, Review},
    services::{movies, recommendations, reviews},
};

/// Catalog filters accepted by `GET /movies`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieListParams {
    pub genre: Option<String>,
    pub language: Option<String>,
    pub content_rating: Option<String>,
    pub year: Option<i32>,
    pub q: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
}

impl MovieListParams {
    fn sort(&self) -> AppResult<MovieSort> {
        let field = match self.sort.as_deref() {
            None | Some("title") => MovieSortField::Title,
            Some("releaseDate") => MovieSortField::ReleaseDate,
            Some("averageRating") => MovieSortField::AverageRating,
            Some("totalRatings") => MovieSortField::TotalRatings,
            Some("createdAt") => MovieSortField::CreatedAt,
            Some(other) => {
                return Err(AppError::InvalidInput(format!("Unknown sort field: {}", other)))
            }
        };
        // Rating sorts read best-first unless asked otherwise
        let descending = match self.order.as_deref() {
            Some("asc") => false,
            Some("desc") => true,
            None => matches!(
                field,
                MovieSortField::AverageRating | MovieSortField::TotalRatings
            ),
            Some(other) => return Err(AppError::InvalidInput(format!("Unknown order: {}", other))),
        };
        Ok(MovieSort { field, descending })
    }

    fn filter(self) -> MovieFilter {
        let nonblank = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        MovieFilter {
            any_genre: nonblank(self.genre).map(|g| g.to_lowercase()).into_iter().collect(),
            languages: nonblank(self.language).map(|l| l.to_lowercase()).into_iter().collect(),
            content_ratings: nonblank(self.content_rating).into_iter().collect(),
            release_year: self.year,
            text: nonblank(self.q),
            ..Default::default()
        }
    }

    pub fn into_query(self, pagination: &Pagination) -> AppResult<MovieQuery> {
        let sort = self.sort()?;
        Ok(MovieQuery {
            filter: self.filter(),
            sort,
            window: pagination.window(),
        })
    }
}

/// GET /api/v1/movies
pub async fn list(
    State(state): State<AppState>,
    QueryParams(pagination): QueryParams<Pagination>,
    QueryParams(params): QueryParams<MovieListParams>,
) -> AppResult<Json<Page<Movie>>> {
    let query = params.into_query(&pagination)?;
    let found = movies::list_movies(&*state.store, &query).await?;
    Ok(Json(Page::new(found, &pagination)))
}

/// POST /api/v1/movies
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    JsonBody(body): JsonBody<NewMovie>,
) -> AppResult<(StatusCode, Json<Movie>)> {
    let movie = movies::create_movie(&*state.store, &auth.principal(), body).await?;
    Ok((StatusCode::CREATED, Json(movie)))
}

/// GET /api/v1/movies/top-rated
pub async fn top_rated(
    State(state): State<AppState>,
    QueryParams(pagination): QueryParams<Pagination>,
) -> AppResult<Json<Page<Movie>>> {
    let key = CacheKey::TopRated {
        page: pagination.page(),
        limit: pagination.limit(),
    };
    let page: Page<Movie> = crate::cached!(state.cache.as_ref(), key, async {
        let found = recommendations::top_rated(&*state.store, pagination.window()).await?;
        Ok::<_, AppError>(Page::new(found, &pagination))
    })?;
    Ok(Json(page))
}

/// GET /api/v1/movies/:id
pub async fn get(
    State(state): State<AppState>,
    PathParams(id): PathParams<Uuid>,
) -> AppResult<Json<Movie>> {
    Ok(Json(movies::get_movie(&*state.store, id).await?))
}

/// PATCH /api/v1/movies/:id
pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    PathParams(id): PathParams<Uuid>,
    JsonBody(body): JsonBody<MovieUpdate>,
) -> AppResult<Json<Movie>> {
    let movie = movies::update_movie(&*state.store, &auth.principal(), id, body).await?;
    Ok(Json(movie))
}

/// DELETE /api/v1/movies/:id
pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    PathParams(id): PathParams<Uuid>,
) -> AppResult<StatusCode> {
    let store = &*state.store;
    movies::delete_movie(store, store, &auth.principal(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/movies/:id/similar
pub async fn similar(
    State(state): State<AppState>,
    PathParams(id): PathParams<Uuid>,
) -> AppResult<Json<Vec<Movie>>> {
    let found: Vec<Movie> = crate::cached!(state.cache.as_ref(), CacheKey::Similar(id), async {
        let movie = movies::get_movie(&*state.store, id).await?;
        recommendations::similar_to(&*state.store, &movie).await
    })?;
    Ok(Json(found))
}

// Embedded children (cast, crew, trivia, goofs, soundtrack)

pub async fn add_child<T: MovieChild>(
    State(state): State<AppState>,
    auth: AuthUser,
    PathParams(movie_id): PathParams<Uuid>,
    JsonBody(input): JsonBody<T::Input>,
) -> AppResult<(StatusCode, Json<T>)> {
    let child = movies::add_child::<T, _>(&*state.store, &auth.principal(), movie_id, input).await?;
    Ok((StatusCode::CREATED, Json(child)))
}

pub async fn get_child<T: MovieChild>(
    State(state): State<AppState>,
    PathParams((movie_id, child_id)): PathParams<(Uuid, Uuid)>,
) -> AppResult<Json<T>> {
    let child = movies::get_child::<T, _>(&*state.store, movie_id, child_id).await?;
    Ok(Json(child))
}

pub async fn update_child<T: MovieChild>(
    State(state): State<AppState>,
    auth: AuthUser,
    PathParams((movie_id, child_id)): PathParams<(Uuid, Uuid)>,
    JsonBody(input): JsonBody<T::Input>,
) -> AppResult<Json<T>> {
    let child =
        movies::update_child::<T, _>(&*state.store, &auth.principal(), movie_id, child_id, input)
            .await?;
    Ok(Json(child))
}

pub async fn delete_child<T: MovieChild>(
    State(state): State<AppState>,
    auth: AuthUser,
    PathParams((movie_id, child_id)): PathParams<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    movies::delete_child::<T, _>(&*state.store, &auth.principal(), movie_id, child_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Reviews of a movie

#[derive(Debug, Default, Deserialize)]
pub struct ReviewListParams {
    pub sort: Option<String>,
}

fn review_sort(value: Option<&str>) -> AppResult<ReviewSort> {
    match value {
        None | Some("newest") => Ok(ReviewSort::Newest),
        Some("oldest") => Ok(ReviewSort::Oldest),
        Some("highest") => Ok(ReviewSort::Highest),
        Some("lowest") => Ok(ReviewSort::Lowest),
        Some(other) => Err(AppError::InvalidInput(format!(
            "Unknown review sort: {}",
            other
        ))),
    }
}

/// GET /api/v1/movies/:id/reviews
pub async fn list_reviews(
    State(state): State<AppState>,
    PathParams(movie_id): PathParams<Uuid>,
    QueryParams(pagination): QueryParams<Pagination>,
    QueryParams(params): QueryParams<ReviewListParams>,
) -> AppResult<Json<Page<Review>>> {
    let sort = review_sort(params.sort.as_deref())?;
    let store = &*state.store;
    let found = reviews::movie_reviews(store, store, movie_id, sort, pagination.window()).await?;
    Ok(Json(Page::new(found, &pagination)))
}

/// POST /api/v1/movies/:id/reviews
pub async fn create_review(
    State(state): State<AppState>,
    auth: AuthUser,
    PathParams(movie_id): PathParams<Uuid>,
    JsonBody(body): JsonBody<NewReview>,
) -> AppResult<(StatusCode, Json<Review>)> {
    let store = &*state.store;
    let review = reviews::create_review(store, store, &auth.principal(), movie_id, body).await?;
    Ok((StatusCode::CREATED, Json(review)))
}
