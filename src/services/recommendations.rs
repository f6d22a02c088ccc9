use uuid::Uuid;

use crate::{
    db::{
        query::{MovieFilter, MovieQuery, MovieSort, Window},
        store::{MovieStore, ReviewStore},
    },
    error::AppResult,
    models::{Movie, TasteProfile},
};

/// Most results any recommendation call returns
pub const RECOMMENDATION_LIMIT: u64 = 10;

/// Catalog filter for a taste profile: favorites are OR-combined, content ratings and
/// languages restrict, and already rated movies are excluded
pub fn preference_filter(profile: &TasteProfile, rated: Vec<Uuid>) -> MovieFilter {
    MovieFilter {
        any_genre: profile.favorite_genres.clone(),
        any_actor: profile.favorite_actors.clone(),
        any_director: profile.favorite_directors.clone(),
        content_ratings: profile.content_ratings.clone(),
        languages: profile.languages.clone(),
        exclude_ids: rated,
        ..Default::default()
    }
}

/// Recommends movies matching the user's taste profile that they have not rated yet.
///
/// A profile without any favorite genre, actor or director yields nothing; there is no
/// popularity fallback.
pub async fn for_user<R, M>(
    reviews: &R,
    movies: &M,
    user_id: Uuid,
    profile: &TasteProfile,
) -> AppResult<Vec<Movie>>
where
    R: ReviewStore + ?Sized,
    M: MovieStore + ?Sized,
{
    if profile.has_no_favorites() {
        tracing::debug!(user_id = %user_id, "No favorites set, nothing to recommend");
        return Ok(Vec::new());
    }

    let rated = reviews.rated_movie_ids(user_id).await?;
    let query = MovieQuery {
        filter: preference_filter(profile, rated),
        sort: MovieSort::best_rated(),
        window: Window::first(RECOMMENDATION_LIMIT),
    };
    let (found, _) = movies.find_movies(&query).await?;

    tracing::debug!(user_id = %user_id, count = found.len(), "Recommendations computed");
    Ok(found)
}

/// Movies sharing at least one genre with `movie`, best rated first
pub async fn similar_to<M: MovieStore + ?Sized>(movies: &M, movie: &Movie) -> AppResult<Vec<Movie>> {
    if movie.genres.is_empty() {
        return Ok(Vec::new());
    }
    let query = MovieQuery {
        filter: MovieFilter {
            any_genre: movie.genres.clone(),
            exclude_ids: vec![movie.id],
            ..Default::default()
        },
        sort: MovieSort::best_rated(),
        window: Window::first(RECOMMENDATION_LIMIT),
    };
    let (found, _) = movies.find_movies(&query).await?;
    Ok(found)
}

/// Rated movies of the whole catalog, best rated first
pub async fn top_rated<M: MovieStore + ?Sized>(
    movies: &M,
    window: Window,
) -> AppResult<(Vec<Movie>, u64)> {
    movies
        .find_movies(&MovieQuery {
            filter: MovieFilter {
                min_total_ratings: Some(1),
                ..Default::default()
            },
            sort: MovieSort::best_rated(),
            window,
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::{MockMovieStore, MockReviewStore};
    use crate::db::MemoryStore;
    use crate::models::movie::fixtures;

    fn action_fan() -> TasteProfile {
        TasteProfile {
            favorite_genres: vec!["action".to_string()],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_no_favorites_skips_store() {
        let mut reviews = MockReviewStore::new();
        reviews.expect_rated_movie_ids().never();
        let mut movies = MockMovieStore::new();
        movies.expect_find_movies().never();

        let profile = TasteProfile {
            content_ratings: vec!["PG".to_string()],
            ..Default::default()
        };
        let found = for_user(&reviews, &movies, Uuid::new_v4(), &profile)
            .await
            .unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_query_shape() {
        let user = Uuid::new_v4();
        let rated = Uuid::new_v4();

        let mut reviews = MockReviewStore::new();
        reviews
            .expect_rated_movie_ids()
            .returning(move |_| Ok(vec![rated]));
        let mut movies = MockMovieStore::new();
        movies
            .expect_find_movies()
            .withf(move |q| {
                q.filter.any_genre == vec!["action".to_string()]
                    && q.filter.exclude_ids == vec![rated]
                    && q.sort == MovieSort::best_rated()
                    && q.window == Window::first(RECOMMENDATION_LIMIT)
            })
            .times(1)
            .returning(|_| Ok((Vec::new(), 0)));

        for_user(&reviews, &movies, user, &action_fan()).await.unwrap();
    }

    #[tokio::test]
    async fn test_excludes_rated_and_caps_results() {
        let store = MemoryStore::new();
        let mut action = Vec::new();
        for i in 0..12 {
            let movie = fixtures::movie(&format!("Action {}", i), &["action"]);
            store.insert_movie(&movie).await.unwrap();
            action.push(movie);
        }
        let drama = fixtures::movie("Drama", &["drama"]);
        store.insert_movie(&drama).await.unwrap();

        let user = Uuid::new_v4();
        let seen = &action[0];
        store
            .insert_review(&crate::models::Review {
                id: Uuid::new_v4(),
                user_id: user,
                movie_id: seen.id,
                rating: 4,
                comment: None,
                created_at: chrono::Utc::now(),
                updated_at: chrono::Utc::now(),
            })
            .await
            .unwrap();

        let found = for_user(&store, &store, user, &action_fan()).await.unwrap();
        assert_eq!(found.len(), 10);
        assert!(found.iter().all(|m| m.genres.contains(&"action".to_string())));
        assert!(found.iter().all(|m| m.id != seen.id));
    }

    #[tokio::test]
    async fn test_sorted_by_rating_then_count() {
        let store = MemoryStore::new();
        let a = fixtures::movie("A", &["action"]);
        let b = fixtures::movie("B", &["action"]);
        let c = fixtures::movie("C", &["action"]);
        for m in [&a, &b, &c] {
            store.insert_movie(m).await.unwrap();
        }
        store.set_rating_aggregate(a.id, 4.0, 1).await.unwrap();
        store.set_rating_aggregate(b.id, 4.0, 3).await.unwrap();
        store.set_rating_aggregate(c.id, 5.0, 1).await.unwrap();

        let order: Vec<Uuid> = for_user(&store, &store, Uuid::new_v4(), &action_fan())
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(order, vec![c.id, b.id, a.id]);
    }

    #[tokio::test]
    async fn test_similar_excludes_itself() {
        let store = MemoryStore::new();
        let heat = fixtures::movie("Heat", &["crime", "thriller"]);
        let ronin = fixtures::movie("Ronin", &["thriller"]);
        let up = fixtures::movie("Up", &["animation"]);
        for m in [&heat, &ronin, &up] {
            store.insert_movie(m).await.unwrap();
        }

        let found = similar_to(&store, &heat).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, ronin.id);
    }

    #[tokio::test]
    async fn test_top_rated_skips_unrated() {
        let store = MemoryStore::new();
        let rated = fixtures::movie("Rated", &[]);
        let unrated = fixtures::movie("Unrated", &[]);
        store.insert_movie(&rated).await.unwrap();
        store.insert_movie(&unrated).await.unwrap();
        store.set_rating_aggregate(rated.id, 3.0, 1).await.unwrap();

        let (found, total) = top_rated(&store, Window::first(20)).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(found[0].id, rated.id);
    }
}
