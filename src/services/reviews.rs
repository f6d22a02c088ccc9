use uuid::Uuid;

use super::authorization::{classify_write_miss, Principal};
use super::ratings::refresh_after_review_write;
use crate::{
    db::{
        query::{ReviewQuery, ReviewScope, ReviewSort, Window},
        store::{MovieStore, ReviewStore, UserStore},
    },
    error::{AppError, AppResult},
    models::{NewReview, Review, ReviewUpdate},
};

/// Creates the principal's review of a movie and refreshes the movie's aggregate
pub async fn create_review<R, M>(
    reviews: &R,
    movies: &M,
    principal: &Principal,
    movie_id: Uuid,
    input: NewReview,
) -> AppResult<Review>
where
    R: ReviewStore + ?Sized,
    M: MovieStore + ?Sized,
{
    movies
        .find_movie(movie_id)
        .await?
        .ok_or_else(|| AppError::not_found("Movie", movie_id))?;

    let review = input.into_review(principal.id, movie_id)?;
    reviews.insert_review(&review).await?;
    tracing::info!(
        review_id = %review.id,
        movie_id = %movie_id,
        user_id = %principal.id,
        rating = review.rating,
        "Review created"
    );

    refresh_after_review_write(reviews, movies, movie_id).await;
    Ok(review)
}

pub async fn get_review<R: ReviewStore + ?Sized>(reviews: &R, id: Uuid) -> AppResult<Review> {
    reviews
        .find_review(id)
        .await?
        .ok_or_else(|| AppError::not_found("Review", id))
}

pub async fn movie_reviews<R, M>(
    reviews: &R,
    movies: &M,
    movie_id: Uuid,
    sort: ReviewSort,
    window: Window,
) -> AppResult<(Vec<Review>, u64)>
where
    R: ReviewStore + ?Sized,
    M: MovieStore + ?Sized,
{
    movies
        .find_movie(movie_id)
        .await?
        .ok_or_else(|| AppError::not_found("Movie", movie_id))?;

    reviews
        .find_reviews(&ReviewQuery {
            scope: ReviewScope::Movie(movie_id),
            sort,
            window,
        })
        .await
}

pub async fn user_reviews<R, U>(
    reviews: &R,
    users: &U,
    user_id: Uuid,
    window: Window,
) -> AppResult<(Vec<Review>, u64)>
where
    R: ReviewStore + ?Sized,
    U: UserStore + ?Sized,
{
    users
        .find_user(user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User", user_id))?;

    reviews
        .find_reviews(&ReviewQuery {
            scope: ReviewScope::User(user_id),
            sort: ReviewSort::Newest,
            window,
        })
        .await
}

/// Updates a review owned by the principal (any review for admins). The aggregate is
/// refreshed only when the rating actually changed.
pub async fn update_review<R, M>(
    reviews: &R,
    movies: &M,
    principal: &Principal,
    id: Uuid,
    input: ReviewUpdate,
) -> AppResult<Review>
where
    R: ReviewStore + ?Sized,
    M: MovieStore + ?Sized,
{
    let patch = input.validate()?;

    let Some((before, after)) = reviews
        .update_review(id, &patch, principal.write_scope())
        .await?
    else {
        let current = reviews.find_review(id).await?;
        return Err(classify_write_miss(current, "Review", id));
    };

    if before.rating != after.rating {
        refresh_after_review_write(reviews, movies, after.movie_id).await;
    }

    tracing::info!(review_id = %id, user_id = %principal.id, "Review updated");
    Ok(after)
}

pub async fn delete_review<R, M>(
    reviews: &R,
    movies: &M,
    principal: &Principal,
    id: Uuid,
) -> AppResult<()>
where
    R: ReviewStore + ?Sized,
    M: MovieStore + ?Sized,
{
    let Some(deleted) = reviews.delete_review(id, principal.write_scope()).await? else {
        let current = reviews.find_review(id).await?;
        return Err(classify_write_miss(current, "Review", id));
    };

    tracing::info!(review_id = %id, user_id = %principal.id, "Review deleted");
    refresh_after_review_write(reviews, movies, deleted.movie_id).await;
    Ok(())
}
