use crate::{
    db::{
        query::{MovieFilter, MovieQuery, MovieSort, MovieSortField, Window},
        store::MovieStore,
    },
    error::{AppError, AppResult},
    models::Movie,
};

const MAX_QUERY_CHARS: usize = 200;

/// Movies whose title or cast/crew names contain `text`, best rated first
pub async fn search_movies<M: MovieStore + ?Sized>(
    movies: &M,
    text: &str,
    window: Window,
) -> AppResult<(Vec<Movie>, u64)> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AppError::InvalidInput(
            "Search query must not be empty".to_string(),
        ));
    }
    if text.chars().count() > MAX_QUERY_CHARS {
        return Err(AppError::InvalidInput(format!(
            "Search query must be at most {} characters",
            MAX_QUERY_CHARS
        )));
    }

    let query = MovieQuery {
        filter: MovieFilter {
            text: Some(text.to_string()),
            ..Default::default()
        },
        sort: MovieSort {
            field: MovieSortField::AverageRating,
            descending: true,
        },
        window,
    };
    let (found, total) = movies.find_movies(&query).await?;
    tracing::debug!(query = %text, total, "Movie search");
    Ok((found, total))
}
