use uuid::Uuid;

use super::authorization::{ensure_admin, ensure_can_mutate, Principal};
use crate::{
    db::{
        query::MovieQuery,
        store::{MovieStore, ReviewStore},
    },
    error::{AppError, AppResult},
    models::{
        movie::{find_child, find_child_mut, remove_child},
        Movie, MovieChild, MovieUpdate, NewMovie,
    },
};

pub async fn create_movie<M: MovieStore + ?Sized>(
    movies: &M,
    principal: &Principal,
    input: NewMovie,
) -> AppResult<Movie> {
    ensure_admin(principal)?;
    let movie = input.into_movie()?;
    movies.insert_movie(&movie).await?;
    tracing::info!(movie_id = %movie.id, title = %movie.title, "Movie created");
    Ok(movie)
}

pub async fn get_movie<M: MovieStore + ?Sized>(movies: &M, id: Uuid) -> AppResult<Movie> {
    movies
        .find_movie(id)
        .await?
        .ok_or_else(|| AppError::not_found("Movie", id))
}

pub async fn list_movies<M: MovieStore + ?Sized>(
    movies: &M,
    query: &MovieQuery,
) -> AppResult<(Vec<Movie>, u64)> {
    movies.find_movies(query).await
}

/// Updates a movie's own content; the rating aggregate is left alone
pub async fn update_movie<M: MovieStore + ?Sized>(
    movies: &M,
    principal: &Principal,
    id: Uuid,
    update: MovieUpdate,
) -> AppResult<Movie> {
    ensure_admin(principal)?;
    let stored = movies
        .edit_movie(id, Box::new(move |movie: &mut Movie| update.apply(movie)))
        .await?
        .ok_or_else(|| AppError::not_found("Movie", id))?;
    tracing::info!(movie_id = %id, "Movie updated");
    Ok(stored)
}

/// Deletes a movie together with its reviews
pub async fn delete_movie<M, R>(
    movies: &M,
    reviews: &R,
    principal: &Principal,
    id: Uuid,
) -> AppResult<()>
where
    M: MovieStore + ?Sized,
    R: ReviewStore + ?Sized,
{
    ensure_admin(principal)?;
    movies
        .delete_movie(id)
        .await?
        .ok_or_else(|| AppError::not_found("Movie", id))?;
    let removed = reviews.delete_reviews_for_movie(id).await?;
    tracing::info!(movie_id = %id, reviews_removed = removed, "Movie deleted");
    Ok(())
}

/// Who may edit or delete an existing child entry
fn ensure_can_edit_child<T: MovieChild>(principal: &Principal, child: &T) -> AppResult<()> {
    match child.contributor() {
        Some(contributor) if !T::ADMIN_ONLY => {
            ensure_can_mutate(principal, contributor, &T::KIND.to_lowercase())
        }
        _ => ensure_admin(principal),
    }
}

pub async fn add_child<T, M>(
    movies: &M,
    principal: &Principal,
    movie_id: Uuid,
    input: T::Input,
) -> AppResult<T>
where
    T: MovieChild,
    M: MovieStore + ?Sized,
{
    if T::ADMIN_ONLY {
        ensure_admin(principal)?;
    }
    let child = T::create(input, principal.id)?;
    let entry = child.clone();

    movies
        .edit_movie(
            movie_id,
            Box::new(move |movie: &mut Movie| {
                T::collection_mut(movie).push(entry);
                Ok(())
            }),
        )
        .await?
        .ok_or_else(|| AppError::not_found("Movie", movie_id))?;
    tracing::info!(movie_id = %movie_id, child_id = %child.id(), kind = T::KIND, "Movie entry added");
    Ok(child)
}

pub async fn get_child<T, M>(movies: &M, movie_id: Uuid, child_id: Uuid) -> AppResult<T>
where
    T: MovieChild,
    M: MovieStore + ?Sized,
{
    let movie = get_movie(movies, movie_id).await?;
    find_child::<T>(&movie, child_id)
        .cloned()
        .ok_or_else(|| AppError::not_found(T::KIND, child_id))
}

/// Replaces the content of one child entry, keyed by its id. The ownership check runs
/// against the locked document, in the same step as the write.
pub async fn update_child<T, M>(
    movies: &M,
    principal: &Principal,
    movie_id: Uuid,
    child_id: Uuid,
    input: T::Input,
) -> AppResult<T>
where
    T: MovieChild,
    M: MovieStore + ?Sized,
{
    let actor = *principal;
    let stored = movies
        .edit_movie(
            movie_id,
            Box::new(move |movie: &mut Movie| {
                let child = find_child_mut::<T>(movie, child_id)
                    .ok_or_else(|| AppError::not_found(T::KIND, child_id))?;
                ensure_can_edit_child(&actor, child)?;
                child.replace(input)
            }),
        )
        .await?
        .ok_or_else(|| AppError::not_found("Movie", movie_id))?;
    let updated = find_child::<T>(&stored, child_id)
        .cloned()
        .ok_or_else(|| AppError::not_found(T::KIND, child_id))?;
    tracing::info!(movie_id = %movie_id, child_id = %child_id, kind = T::KIND, "Movie entry updated");
    Ok(updated)
}

pub async fn delete_child<T, M>(
    movies: &M,
    principal: &Principal,
    movie_id: Uuid,
    child_id: Uuid,
) -> AppResult<()>
where
    T: MovieChild,
    M: MovieStore + ?Sized,
{
    let actor = *principal;
    movies
        .edit_movie(
            movie_id,
            Box::new(move |movie: &mut Movie| {
                let child = find_child::<T>(movie, child_id)
                    .ok_or_else(|| AppError::not_found(T::KIND, child_id))?;
                ensure_can_edit_child(&actor, child)?;
                remove_child::<T>(movie, child_id);
                Ok(())
            }),
        )
        .await?
        .ok_or_else(|| AppError::not_found("Movie", movie_id))?;
    tracing::info!(movie_id = %movie_id, child_id = %child_id, kind = T::KIND, "Movie entry removed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::{MockMovieStore, MovieEdit};
    use std::time::Duration;
    use crate::db::MemoryStore;
    use crate::models::{
        movie::fixtures, CastMember, CastMemberInput, Role, Trivia, TriviaInput,
    };

    fn principal(role: Role) -> Principal {
        Principal {
            id: Uuid::new_v4(),
            role,
        }
    }

    fn trivia(text: &str) -> TriviaInput {
        TriviaInput {
            text: text.to_string(),
            is_spoiler: false,
        }
    }

    #[tokio::test]
    async fn test_create_requires_admin() {
        let mut movies = MockMovieStore::new();
        movies.expect_insert_movie().never();
        let input = NewMovie {
            title: "Heat".to_string(),
            genres: vec!["crime".to_string()],
            cast: Vec::new(),
            crew: Vec::new(),
            release_date: None,
            runtime_minutes: None,
            synopsis: None,
            content_rating: None,
            language: None,
            financials: Default::default(),
            technical: Default::default(),
        };
        let result = create_movie(&movies, &principal(Role::User), input).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_update_keeps_rating_aggregate() {
        let store = MemoryStore::new();
        let movie = fixtures::movie("Heat", &["crime"]);
        store.insert_movie(&movie).await.unwrap();
        store.set_rating_aggregate(movie.id, 4.5, 2).await.unwrap();

        let update = MovieUpdate {
            title: Some("Heat (1995)".to_string()),
            ..Default::default()
        };
        let updated = update_movie(&store, &principal(Role::Admin), movie.id, update)
            .await
            .unwrap();
        assert_eq!(updated.title, "Heat (1995)");
        assert_eq!(updated.average_rating, 4.5);
        assert_eq!(updated.total_ratings, 2);
    }

    #[tokio::test]
    async fn test_cast_is_admin_only() {
        let store = MemoryStore::new();
        let movie = fixtures::movie("The Matrix", &["action"]);
        store.insert_movie(&movie).await.unwrap();
        let input = || CastMemberInput {
            name: "Keanu Reeves".to_string(),
            character: Some("Neo".to_string()),
            biography: None,
            awards: Vec::new(),
            filmography: Vec::new(),
        };

        let denied =
            add_child::<CastMember, _>(&store, &principal(Role::User), movie.id, input()).await;
        assert!(matches!(denied, Err(AppError::Forbidden(_))));

        let admin = principal(Role::Admin);
        let added = add_child::<CastMember, _>(&store, &admin, movie.id, input())
            .await
            .unwrap();
        let fetched = get_child::<CastMember, _>(&store, movie.id, added.id)
            .await
            .unwrap();
        assert_eq!(fetched.name, "Keanu Reeves");
    }

    #[tokio::test]
    async fn test_trivia_contributor_rules() {
        let store = MemoryStore::new();
        let movie = fixtures::movie("Alien", &["horror"]);
        store.insert_movie(&movie).await.unwrap();
        let (alice, bob) = (principal(Role::User), principal(Role::User));

        let entry = add_child::<Trivia, _>(&store, &alice, movie.id, trivia("Shot in 1978"))
            .await
            .unwrap();
        assert_eq!(entry.contributor_id, alice.id);

        let denied =
            update_child::<Trivia, _>(&store, &bob, movie.id, entry.id, trivia("nope")).await;
        assert!(matches!(denied, Err(AppError::Forbidden(_))));

        let edited =
            update_child::<Trivia, _>(&store, &alice, movie.id, entry.id, trivia("Shot in 1977"))
                .await
                .unwrap();
        assert_eq!(edited.text, "Shot in 1977");
        assert_eq!(edited.id, entry.id);
        assert_eq!(edited.contributor_id, alice.id);

        delete_child::<Trivia, _>(&store, &principal(Role::Admin), movie.id, entry.id)
            .await
            .unwrap();
        let missing = get_child::<Trivia, _>(&store, movie.id, entry.id).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    /// Memory store whose reads and writes take a while, so overlapping requests interleave
    struct SlowMovies(MemoryStore);

    #[async_trait::async_trait]
    impl MovieStore for SlowMovies {
        async fn insert_movie(&self, movie: &Movie) -> AppResult<()> {
            self.0.insert_movie(movie).await
        }

        async fn find_movie(&self, id: Uuid) -> AppResult<Option<Movie>> {
            let found = self.0.find_movie(id).await;
            tokio::time::sleep(Duration::from_millis(20)).await;
            found
        }

        async fn find_movies_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Movie>> {
            self.0.find_movies_by_ids(ids).await
        }

        async fn find_movies(&self, query: &MovieQuery) -> AppResult<(Vec<Movie>, u64)> {
            self.0.find_movies(query).await
        }

        async fn find_movie_by_person(&self, person_id: Uuid) -> AppResult<Option<Movie>> {
            self.0.find_movie_by_person(person_id).await
        }

        async fn edit_movie(&self, id: Uuid, edit: MovieEdit) -> AppResult<Option<Movie>> {
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.0.edit_movie(id, edit).await
        }

        async fn set_rating_aggregate(
            &self,
            id: Uuid,
            average_rating: f64,
            total_ratings: i64,
        ) -> AppResult<Option<Movie>> {
            self.0.set_rating_aggregate(id, average_rating, total_ratings).await
        }

        async fn delete_movie(&self, id: Uuid) -> AppResult<Option<Movie>> {
            self.0.delete_movie(id).await
        }
    }

    #[tokio::test]
    async fn test_concurrent_contributions_are_all_kept() {
        let store = SlowMovies(MemoryStore::new());
        let movie = fixtures::movie("Alien", &["horror"]);
        store.insert_movie(&movie).await.unwrap();
        let (alice, bob) = (principal(Role::User), principal(Role::User));

        let (first, second) = tokio::join!(
            add_child::<Trivia, _>(&store, &alice, movie.id, trivia("Shot in 1978")),
            add_child::<Trivia, _>(&store, &bob, movie.id, trivia("The chestburster was a secret")),
        );
        let (first, second) = (first.unwrap(), second.unwrap());

        let stored = store.find_movie(movie.id).await.unwrap().unwrap();
        assert_eq!(stored.trivia.len(), 2);
        assert!(find_child::<Trivia>(&stored, first.id).is_some());
        assert!(find_child::<Trivia>(&stored, second.id).is_some());
    }

    #[tokio::test]
    async fn test_movie_update_does_not_drop_concurrent_entry() {
        let store = SlowMovies(MemoryStore::new());
        let movie = fixtures::movie("Heat", &["crime"]);
        store.insert_movie(&movie).await.unwrap();
        let update = MovieUpdate {
            title: Some("Heat (1995)".to_string()),
            ..Default::default()
        };

        let (admin, fan) = (principal(Role::Admin), principal(Role::User));

        let (updated, added) = tokio::join!(
            update_movie(&store, &admin, movie.id, update),
            add_child::<Trivia, _>(&store, &fan, movie.id, trivia("Shot in LA")),
        );
        updated.unwrap();
        let added = added.unwrap();

        let stored = store.find_movie(movie.id).await.unwrap().unwrap();
        assert_eq!(stored.title, "Heat (1995)");
        assert_eq!(stored.trivia.len(), 1);
        assert_eq!(stored.trivia[0].id, added.id);
    }

    #[tokio::test]
    async fn test_edit_of_missing_entry_is_not_found() {
        let mut movies = MockMovieStore::new();
        let movie = fixtures::movie("Alien", &["horror"]);
        movies.expect_edit_movie().times(1).returning(move |_, edit| {
            let mut current = movie.clone();
            edit(&mut current)?;
            Ok(Some(current))
        });

        let result = update_child::<Trivia, _>(
            &movies,
            &principal(Role::Admin),
            Uuid::new_v4(),
            Uuid::new_v4(),
            trivia("Shot in 1978"),
        )
        .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_movie_removes_reviews() {
        let store = MemoryStore::new();
        let movie = fixtures::movie("Up", &["animation"]);
        store.insert_movie(&movie).await.unwrap();
        let alice = principal(Role::User);
        crate::services::reviews::create_review(
            &store,
            &store,
            &alice,
            movie.id,
            crate::models::NewReview {
                rating: 5,
                comment: None,
            },
        )
        .await
        .unwrap();

        delete_movie(&store, &store, &principal(Role::Admin), movie.id)
            .await
            .unwrap();
        assert!(store.find_movie(movie.id).await.unwrap().is_none());
        assert!(store.ratings_for_movie(movie.id).await.unwrap().is_empty());
    }
}
