//! Movie rating aggregate maintenance.
//!
//! The aggregate is always recomputed from the full set of current reviews, so
//! concurrent review writes for the same movie converge on the next run.

use serde::Serialize;
use uuid::Uuid;

use crate::{
    db::store::{MovieStore, ReviewStore},
    error::{AppError, AppResult},
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingAggregate {
    pub average_rating: f64,
    pub total_ratings: i64,
}

impl RatingAggregate {
    /// Mean and count of `ratings`; an empty set averages to 0
    pub fn from_ratings(ratings: &[u8]) -> Self {
        if ratings.is_empty() {
            return Self {
                average_rating: 0.0,
                total_ratings: 0,
            };
        }
        let sum: u64 = ratings.iter().map(|r| u64::from(*r)).sum();
        Self {
            average_rating: sum as f64 / ratings.len() as f64,
            total_ratings: ratings.len() as i64,
        }
    }
}

/// Recomputes and persists the aggregate of one movie
pub async fn recompute_movie_rating<R, M>(
    reviews: &R,
    movies: &M,
    movie_id: Uuid,
) -> AppResult<RatingAggregate>
where
    R: ReviewStore + ?Sized,
    M: MovieStore + ?Sized,
{
    let ratings = reviews.ratings_for_movie(movie_id).await?;
    let aggregate = RatingAggregate::from_ratings(&ratings);

    movies
        .set_rating_aggregate(movie_id, aggregate.average_rating, aggregate.total_ratings)
        .await?
        .ok_or_else(|| AppError::not_found("Movie", movie_id))?;

    tracing::debug!(
        movie_id = %movie_id,
        average = aggregate.average_rating,
        total = aggregate.total_ratings,
        "Rating aggregate updated"
    );
    Ok(aggregate)
}

/// Runs the recompute after a review write. The review write has already happened and
/// stands; a failure here is logged and the next review write converges the aggregate.
pub async fn refresh_after_review_write<R, M>(reviews: &R, movies: &M, movie_id: Uuid)
where
    R: ReviewStore + ?Sized,
    M: MovieStore + ?Sized,
{
    if let Err(e) = recompute_movie_rating(reviews, movies, movie_id).await {
        tracing::error!(movie_id = %movie_id, error = %e, "Failed to refresh rating aggregate");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::{MockMovieStore, MockReviewStore};
    use crate::models::movie::fixtures;
    use mockall::predicate::eq;

    #[test]
    fn test_empty_ratings_average_to_zero() {
        let agg = RatingAggregate::from_ratings(&[]);
        assert_eq!(agg.average_rating, 0.0);
        assert_eq!(agg.total_ratings, 0);
    }

    #[test]
    fn test_mean_and_count() {
        let agg = RatingAggregate::from_ratings(&[5, 3]);
        assert_eq!(agg.average_rating, 4.0);
        assert_eq!(agg.total_ratings, 2);

        let agg = RatingAggregate::from_ratings(&[1, 2, 2]);
        assert!((agg.average_rating - 5.0 / 3.0).abs() < 1e-9);
        assert_eq!(agg.total_ratings, 3);
    }

    #[tokio::test]
    async fn test_recompute_persists_aggregate() {
        let movie = fixtures::movie("Heat", &["crime"]);
        let id = movie.id;

        let mut reviews = MockReviewStore::new();
        reviews
            .expect_ratings_for_movie()
            .with(eq(id))
            .times(1)
            .returning(|_| Ok(vec![5, 4]));

        let mut movies = MockMovieStore::new();
        movies
            .expect_set_rating_aggregate()
            .with(eq(id), eq(4.5), eq(2))
            .times(1)
            .returning(move |_, avg, total| {
                let mut m = movie.clone();
                m.average_rating = avg;
                m.total_ratings = total;
                Ok(Some(m))
            });

        let agg = recompute_movie_rating(&reviews, &movies, id).await.unwrap();
        assert_eq!(agg.average_rating, 4.5);
        assert_eq!(agg.total_ratings, 2);
    }

    #[tokio::test]
    async fn test_recompute_missing_movie_is_not_found() {
        let mut reviews = MockReviewStore::new();
        reviews.expect_ratings_for_movie().returning(|_| Ok(vec![]));
        let mut movies = MockMovieStore::new();
        movies
            .expect_set_rating_aggregate()
            .returning(|_, _, _| Ok(None));

        let result = recompute_movie_rating(&reviews, &movies, Uuid::new_v4()).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_refresh_swallows_store_failure() {
        let mut reviews = MockReviewStore::new();
        reviews
            .expect_ratings_for_movie()
            .returning(|_| Err(AppError::Internal("store down".to_string())));
        let mut movies = MockMovieStore::new();
        movies.expect_set_rating_aggregate().never();

        refresh_after_review_write(&reviews, &movies, Uuid::new_v4()).await;
    }
}
