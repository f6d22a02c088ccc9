use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::query::{
    DiscussionQuery, ListQuery, MovieQuery, MovieSortField, ReviewQuery, ReviewScope, ReviewSort,
    Window,
};
use super::store::{
    DiscussionStore, ListStore, MovieEdit, MovieStore, ReviewStore, UserStore,
};
use crate::{
    error::{AppError, AppResult},
    models::{
        Comment, Discussion, DiscussionPatch, ListPatch, Movie, MovieList, ProfileUpdate,
        Review, ReviewPatch, Role, TasteProfile, User, UserMovieSet,
    },
    services::{
        authorization::WriteScope,
        membership::{self, Membership},
    },
};

/// In-process store. Every write holds the write lock for its whole read-modify-write,
/// which gives the same per-document atomicity the database provides.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

#[derive(Default)]
struct Collections {
    users: HashMap<Uuid, User>,
    movies: HashMap<Uuid, Movie>,
    reviews: HashMap<Uuid, Review>,
    lists: HashMap<Uuid, MovieList>,
    discussions: HashMap<Uuid, Discussion>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn paginate<T>(items: Vec<T>, window: Window) -> (Vec<T>, u64) {
    let total = items.len() as u64;
    let page = items
        .into_iter()
        .skip(window.skip as usize)
        .take(window.limit as usize)
        .collect();
    (page, total)
}

fn compare_movies(a: &Movie, b: &Movie, field: MovieSortField) -> Ordering {
    match field {
        MovieSortField::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        MovieSortField::ReleaseDate => a.release_date.cmp(&b.release_date),
        MovieSortField::AverageRating => a
            .average_rating
            .partial_cmp(&b.average_rating)
            .unwrap_or(Ordering::Equal)
            .then(a.total_ratings.cmp(&b.total_ratings)),
        MovieSortField::TotalRatings => a.total_ratings.cmp(&b.total_ratings),
        MovieSortField::CreatedAt => a.created_at.cmp(&b.created_at),
    }
}

/// Movies without a release date trail in either direction
fn undated_last(a: &Movie, b: &Movie, field: MovieSortField) -> Ordering {
    match field {
        MovieSortField::ReleaseDate => a
            .release_date
            .is_none()
            .cmp(&b.release_date.is_none()),
        _ => Ordering::Equal,
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: &User) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        let taken = inner.users.values().any(|u| {
            u.username.eq_ignore_ascii_case(&user.username)
                || u.email.eq_ignore_ascii_case(&user.email)
        });
        if taken {
            return Err(AppError::InvalidInput(
                "Username or email already registered".to_string(),
            ));
        }
        inner.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_login(&self, login: &str) -> AppResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .values()
            .find(|u| u.username.eq_ignore_ascii_case(login) || u.email.eq_ignore_ascii_case(login))
            .cloned())
    }

    async fn list_users(&self, window: Window) -> AppResult<(Vec<User>, u64)> {
        let inner = self.inner.read().await;
        let mut users: Vec<User> = inner.users.values().cloned().collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(paginate(users, window))
    }

    async fn update_profile(&self, id: Uuid, update: &ProfileUpdate) -> AppResult<Option<User>> {
        let mut inner = self.inner.write().await;
        if let Some(email) = &update.email {
            let taken = inner
                .users
                .values()
                .any(|u| u.id != id && u.email.eq_ignore_ascii_case(email));
            if taken {
                return Err(AppError::InvalidInput("Email already registered".to_string()));
            }
        }
        let Some(user) = inner.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(email) = &update.email {
            user.email = email.clone();
        }
        if update.display_name.is_some() {
            user.display_name = update.display_name.clone();
        }
        if update.bio.is_some() {
            user.bio = update.bio.clone();
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn set_preferences(
        &self,
        id: Uuid,
        preferences: &TasteProfile,
    ) -> AppResult<Option<User>> {
        let mut inner = self.inner.write().await;
        Ok(inner.users.get_mut(&id).map(|user| {
            user.preferences = preferences.clone();
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    async fn set_role(&self, id: Uuid, role: Role) -> AppResult<Option<User>> {
        let mut inner = self.inner.write().await;
        Ok(inner.users.get_mut(&id).map(|user| {
            user.role = role;
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    async fn add_movie_ref(
        &self,
        id: Uuid,
        set: UserMovieSet,
        movie_id: Uuid,
    ) -> AppResult<Option<User>> {
        let mut inner = self.inner.write().await;
        Ok(inner.users.get_mut(&id).map(|user| {
            let target = match set {
                UserMovieSet::Wishlist => &mut user.wishlist,
                UserMovieSet::Watched => &mut user.watched,
            };
            if membership::add(target, movie_id) {
                user.updated_at = Utc::now();
            }
            user.clone()
        }))
    }

    async fn remove_movie_ref(
        &self,
        id: Uuid,
        set: UserMovieSet,
        movie_id: Uuid,
    ) -> AppResult<Option<User>> {
        let mut inner = self.inner.write().await;
        Ok(inner.users.get_mut(&id).map(|user| {
            let target = match set {
                UserMovieSet::Wishlist => &mut user.wishlist,
                UserMovieSet::Watched => &mut user.watched,
            };
            if membership::remove(target, &movie_id) {
                user.updated_at = Utc::now();
            }
            user.clone()
        }))
    }
}

#[async_trait]
impl MovieStore for MemoryStore {
    async fn insert_movie(&self, movie: &Movie) -> AppResult<()> {
        self.inner.write().await.movies.insert(movie.id, movie.clone());
        Ok(())
    }

    async fn find_movie(&self, id: Uuid) -> AppResult<Option<Movie>> {
        Ok(self.inner.read().await.movies.get(&id).cloned())
    }

    async fn find_movies_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Movie>> {
        let inner = self.inner.read().await;
        Ok(ids.iter().filter_map(|id| inner.movies.get(id).cloned()).collect())
    }

    async fn find_movies(&self, query: &MovieQuery) -> AppResult<(Vec<Movie>, u64)> {
        let inner = self.inner.read().await;
        let mut movies: Vec<Movie> = inner
            .movies
            .values()
            .filter(|m| query.filter.matches(m))
            .cloned()
            .collect();

        movies.sort_by(|a, b| {
            let ordering = compare_movies(a, b, query.sort.field);
            let ordering = if query.sort.descending {
                ordering.reverse()
            } else {
                ordering
            };
            undated_last(a, b, query.sort.field)
                .then(ordering)
                .then(a.id.cmp(&b.id))
        });

        Ok(paginate(movies, query.window))
    }

    async fn find_movie_by_person(&self, person_id: Uuid) -> AppResult<Option<Movie>> {
        let inner = self.inner.read().await;
        Ok(inner
            .movies
            .values()
            .find(|m| m.has_person(person_id))
            .cloned())
    }

    async fn edit_movie(&self, id: Uuid, edit: MovieEdit) -> AppResult<Option<Movie>> {
        let mut inner = self.inner.write().await;
        let Some(stored) = inner.movies.get_mut(&id) else {
            return Ok(None);
        };

        let mut edited = stored.clone();
        edit(&mut edited)?;
        *stored = Movie {
            id: stored.id,
            average_rating: stored.average_rating,
            total_ratings: stored.total_ratings,
            created_at: stored.created_at,
            updated_at: Utc::now(),
            ..edited
        };
        Ok(Some(stored.clone()))
    }

    async fn set_rating_aggregate(
        &self,
        id: Uuid,
        average_rating: f64,
        total_ratings: i64,
    ) -> AppResult<Option<Movie>> {
        let mut inner = self.inner.write().await;
        Ok(inner.movies.get_mut(&id).map(|movie| {
            movie.average_rating = average_rating;
            movie.total_ratings = total_ratings;
            movie.clone()
        }))
    }

    async fn delete_movie(&self, id: Uuid) -> AppResult<Option<Movie>> {
        Ok(self.inner.write().await.movies.remove(&id))
    }
}

#[async_trait]
impl ReviewStore for MemoryStore {
    async fn insert_review(&self, review: &Review) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        let duplicate = inner
            .reviews
            .values()
            .any(|r| r.user_id == review.user_id && r.movie_id == review.movie_id);
        if duplicate {
            return Err(AppError::InvalidInput(
                "You have already reviewed this movie".to_string(),
            ));
        }
        inner.reviews.insert(review.id, review.clone());
        Ok(())
    }

    async fn find_review(&self, id: Uuid) -> AppResult<Option<Review>> {
        Ok(self.inner.read().await.reviews.get(&id).cloned())
    }

    async fn find_reviews(&self, query: &ReviewQuery) -> AppResult<(Vec<Review>, u64)> {
        let inner = self.inner.read().await;
        let mut reviews: Vec<Review> = inner
            .reviews
            .values()
            .filter(|r| match query.scope {
                ReviewScope::Movie(id) => r.movie_id == id,
                ReviewScope::User(id) => r.user_id == id,
            })
            .cloned()
            .collect();

        reviews.sort_by(|a, b| {
            let ordering = match query.sort {
                ReviewSort::Newest => b.created_at.cmp(&a.created_at),
                ReviewSort::Oldest => a.created_at.cmp(&b.created_at),
                ReviewSort::Highest => b.rating.cmp(&a.rating).then(b.created_at.cmp(&a.created_at)),
                ReviewSort::Lowest => a.rating.cmp(&b.rating).then(b.created_at.cmp(&a.created_at)),
            };
            ordering.then(a.id.cmp(&b.id))
        });

        Ok(paginate(reviews, query.window))
    }

    async fn ratings_for_movie(&self, movie_id: Uuid) -> AppResult<Vec<u8>> {
        let inner = self.inner.read().await;
        Ok(inner
            .reviews
            .values()
            .filter(|r| r.movie_id == movie_id)
            .map(|r| r.rating)
            .collect())
    }

    async fn rated_movie_ids(&self, user_id: Uuid) -> AppResult<Vec<Uuid>> {
        let inner = self.inner.read().await;
        Ok(inner
            .reviews
            .values()
            .filter(|r| r.user_id == user_id)
            .map(|r| r.movie_id)
            .collect())
    }

    async fn update_review(
        &self,
        id: Uuid,
        patch: &ReviewPatch,
        scope: WriteScope,
    ) -> AppResult<Option<(Review, Review)>> {
        let mut inner = self.inner.write().await;
        match inner.reviews.get_mut(&id) {
            Some(review) if scope.permits(review.user_id) => {
                let before = review.clone();
                patch.apply(review);
                Ok(Some((before, review.clone())))
            }
            _ => Ok(None),
        }
    }

    async fn delete_review(&self, id: Uuid, scope: WriteScope) -> AppResult<Option<Review>> {
        let mut inner = self.inner.write().await;
        match inner.reviews.get(&id) {
            Some(review) if scope.permits(review.user_id) => Ok(inner.reviews.remove(&id)),
            _ => Ok(None),
        }
    }

    async fn delete_reviews_for_movie(&self, movie_id: Uuid) -> AppResult<u64> {
        let mut inner = self.inner.write().await;
        let before = inner.reviews.len();
        inner.reviews.retain(|_, r| r.movie_id != movie_id);
        Ok((before - inner.reviews.len()) as u64)
    }
}

#[async_trait]
impl ListStore for MemoryStore {
    async fn insert_list(&self, list: &MovieList) -> AppResult<()> {
        self.inner.write().await.lists.insert(list.id, list.clone());
        Ok(())
    }

    async fn find_list(&self, id: Uuid) -> AppResult<Option<MovieList>> {
        Ok(self.inner.read().await.lists.get(&id).cloned())
    }

    async fn find_lists(&self, query: &ListQuery) -> AppResult<(Vec<MovieList>, u64)> {
        let inner = self.inner.read().await;
        let mut lists: Vec<MovieList> = inner
            .lists
            .values()
            .filter(|l| query.creator_id.map_or(true, |c| l.creator_id == c))
            .filter(|l| !query.public_only || l.is_public)
            .cloned()
            .collect();
        lists.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(paginate(lists, query.window))
    }

    async fn update_list(
        &self,
        id: Uuid,
        patch: &ListPatch,
        scope: WriteScope,
    ) -> AppResult<Option<MovieList>> {
        let mut inner = self.inner.write().await;
        match inner.lists.get_mut(&id) {
            Some(list) if scope.permits(list.creator_id) => {
                patch.apply(list);
                Ok(Some(list.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete_list(&self, id: Uuid, scope: WriteScope) -> AppResult<Option<MovieList>> {
        let mut inner = self.inner.write().await;
        match inner.lists.get(&id) {
            Some(list) if scope.permits(list.creator_id) => Ok(inner.lists.remove(&id)),
            _ => Ok(None),
        }
    }

    async fn add_list_movie(
        &self,
        id: Uuid,
        movie_id: Uuid,
        scope: WriteScope,
    ) -> AppResult<Option<MovieList>> {
        let mut inner = self.inner.write().await;
        match inner.lists.get_mut(&id) {
            Some(list) if scope.permits(list.creator_id) => {
                if membership::add(&mut list.movies, movie_id) {
                    list.updated_at = Utc::now();
                }
                Ok(Some(list.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn remove_list_movie(
        &self,
        id: Uuid,
        movie_id: Uuid,
        scope: WriteScope,
    ) -> AppResult<Option<MovieList>> {
        let mut inner = self.inner.write().await;
        match inner.lists.get_mut(&id) {
            Some(list) if scope.permits(list.creator_id) => {
                if membership::remove(&mut list.movies, &movie_id) {
                    list.updated_at = Utc::now();
                }
                Ok(Some(list.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn toggle_follower(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Option<(MovieList, Membership)>> {
        let mut inner = self.inner.write().await;
        Ok(inner.lists.get_mut(&id).map(|list| {
            let outcome = membership::toggle(&mut list.followers, user_id);
            (list.clone(), outcome)
        }))
    }
}

#[async_trait]
impl DiscussionStore for MemoryStore {
    async fn insert_discussion(&self, discussion: &Discussion) -> AppResult<()> {
        self.inner
            .write()
            .await
            .discussions
            .insert(discussion.id, discussion.clone());
        Ok(())
    }

    async fn find_discussion(&self, id: Uuid) -> AppResult<Option<Discussion>> {
        Ok(self.inner.read().await.discussions.get(&id).cloned())
    }

    async fn find_discussions(
        &self,
        query: &DiscussionQuery,
    ) -> AppResult<(Vec<Discussion>, u64)> {
        let inner = self.inner.read().await;
        let mut discussions: Vec<Discussion> = inner
            .discussions
            .values()
            .filter(|d| query.subject.map_or(true, |s| d.subject == s))
            .cloned()
            .collect();
        discussions.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(paginate(discussions, query.window))
    }

    async fn update_discussion(
        &self,
        id: Uuid,
        patch: &DiscussionPatch,
        scope: WriteScope,
    ) -> AppResult<Option<Discussion>> {
        let mut inner = self.inner.write().await;
        match inner.discussions.get_mut(&id) {
            Some(discussion) if scope.permits(discussion.author_id) => {
                patch.apply(discussion);
                Ok(Some(discussion.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete_discussion(
        &self,
        id: Uuid,
        scope: WriteScope,
    ) -> AppResult<Option<Discussion>> {
        let mut inner = self.inner.write().await;
        match inner.discussions.get(&id) {
            Some(discussion) if scope.permits(discussion.author_id) => {
                Ok(inner.discussions.remove(&id))
            }
            _ => Ok(None),
        }
    }

    async fn push_comment(&self, id: Uuid, comment: &Comment) -> AppResult<Option<Discussion>> {
        let mut inner = self.inner.write().await;
        Ok(inner.discussions.get_mut(&id).map(|discussion| {
            discussion.comments.push(comment.clone());
            discussion.updated_at = Utc::now();
            discussion.clone()
        }))
    }

    async fn update_comment(
        &self,
        id: Uuid,
        comment_id: Uuid,
        body: &str,
        scope: WriteScope,
    ) -> AppResult<Option<Discussion>> {
        let mut inner = self.inner.write().await;
        let Some(discussion) = inner.discussions.get_mut(&id) else {
            return Ok(None);
        };
        match discussion.comments.iter_mut().find(|c| c.id == comment_id) {
            Some(comment) if scope.permits(comment.author_id) => {
                let now = Utc::now();
                comment.body = body.to_string();
                comment.updated_at = now;
                discussion.updated_at = now;
                Ok(Some(discussion.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete_comment(
        &self,
        id: Uuid,
        comment_id: Uuid,
        scope: WriteScope,
    ) -> AppResult<Option<Discussion>> {
        let mut inner = self.inner.write().await;
        let Some(discussion) = inner.discussions.get_mut(&id) else {
            return Ok(None);
        };
        let permitted = discussion
            .comment(comment_id)
            .is_some_and(|c| scope.permits(c.author_id));
        if !permitted {
            return Ok(None);
        }
        discussion.remove_comment_thread(comment_id);
        discussion.updated_at = Utc::now();
        Ok(Some(discussion.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::query::MovieSort;
    use crate::models::{movie::fixtures, NewList};
    use chrono::NaiveDate;

    fn user(name: &str) -> User {
        User::new(
            name.to_string(),
            format!("{}@example.com", name),
            "hash".to_string(),
            Role::User,
        )
    }

    fn review(user_id: Uuid, movie_id: Uuid, rating: u8) -> Review {
        let now = Utc::now();
        Review {
            id: Uuid::new_v4(),
            user_id,
            movie_id,
            rating,
            comment: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_user_uniqueness_is_case_insensitive() {
        let store = MemoryStore::new();
        store.insert_user(&user("critic")).await.unwrap();
        let mut clash = user("CRITIC");
        clash.email = "other@example.com".to_string();
        assert!(matches!(
            store.insert_user(&clash).await,
            Err(AppError::InvalidInput(_))
        ));
        assert!(store.find_user_by_login("Critic@Example.com").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_wishlist_membership_is_idempotent() {
        let store = MemoryStore::new();
        let u = user("critic");
        store.insert_user(&u).await.unwrap();
        let movie = Uuid::new_v4();

        store.add_movie_ref(u.id, UserMovieSet::Wishlist, movie).await.unwrap();
        let after = store
            .add_movie_ref(u.id, UserMovieSet::Wishlist, movie)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(after.wishlist, vec![movie]);
        assert!(after.watched.is_empty());

        let after = store
            .remove_movie_ref(u.id, UserMovieSet::Wishlist, Uuid::new_v4())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(after.wishlist, vec![movie]);
    }

    #[tokio::test]
    async fn test_duplicate_review_rejected() {
        let store = MemoryStore::new();
        let (u, m) = (Uuid::new_v4(), Uuid::new_v4());
        let first = review(u, m, 4);
        store.insert_review(&first).await.unwrap();
        assert!(store.insert_review(&review(u, m, 2)).await.is_err());
        assert_eq!(store.ratings_for_movie(m).await.unwrap(), vec![4]);
    }

    #[tokio::test]
    async fn test_scoped_review_writes() {
        let store = MemoryStore::new();
        let (owner, stranger, m) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let r = review(owner, m, 3);
        store.insert_review(&r).await.unwrap();
        let patch = ReviewPatch {
            rating: Some(5),
            comment: None,
        };

        assert!(store
            .update_review(r.id, &patch, WriteScope::OwnedBy(stranger))
            .await
            .unwrap()
            .is_none());
        assert!(store
            .delete_review(r.id, WriteScope::OwnedBy(stranger))
            .await
            .unwrap()
            .is_none());
        assert_eq!(store.find_review(r.id).await.unwrap().unwrap().rating, 3);

        let (before, after) = store
            .update_review(r.id, &patch, WriteScope::OwnedBy(owner))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(before.rating, 3);
        assert_eq!(after.rating, 5);

        assert!(store.delete_review(r.id, WriteScope::Any).await.unwrap().is_some());
        assert!(store.find_review(r.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_edit_movie_keeps_aggregate() {
        let store = MemoryStore::new();
        let movie = fixtures::movie("Heat", &["crime"]);
        store.insert_movie(&movie).await.unwrap();
        store.set_rating_aggregate(movie.id, 4.0, 2).await.unwrap();

        let stored = store
            .edit_movie(
                movie.id,
                Box::new(|m: &mut Movie| {
                    m.title = "Heat (1995)".to_string();
                    m.average_rating = 1.0;
                    Ok(())
                }),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.title, "Heat (1995)");
        assert_eq!(stored.average_rating, 4.0);
        assert_eq!(stored.total_ratings, 2);
    }

    #[tokio::test]
    async fn test_failed_edit_leaves_movie_unchanged() {
        let store = MemoryStore::new();
        let movie = fixtures::movie("Heat", &["crime"]);
        store.insert_movie(&movie).await.unwrap();

        let result = store
            .edit_movie(
                movie.id,
                Box::new(|m: &mut Movie| {
                    m.title = "Half-written".to_string();
                    Err(AppError::Forbidden("Not yours".to_string()))
                }),
            )
            .await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
        assert_eq!(store.find_movie(movie.id).await.unwrap().unwrap().title, "Heat");

        let missing = store
            .edit_movie(Uuid::new_v4(), Box::new(|_: &mut Movie| Ok(())))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_release_date_sort_puts_undated_last() {
        let store = MemoryStore::new();
        let mut older = fixtures::movie("Alien", &["horror"]);
        older.release_date = NaiveDate::from_ymd_opt(1979, 5, 25);
        let mut newer = fixtures::movie("Aliens", &["action"]);
        newer.release_date = NaiveDate::from_ymd_opt(1986, 7, 18);
        let undated = fixtures::movie("Alien 5", &["horror"]);
        for movie in [&undated, &older, &newer] {
            store.insert_movie(movie).await.unwrap();
        }

        for (descending, expected) in [
            (false, [older.id, newer.id, undated.id]),
            (true, [newer.id, older.id, undated.id]),
        ] {
            let query = MovieQuery {
                filter: Default::default(),
                sort: MovieSort {
                    field: MovieSortField::ReleaseDate,
                    descending,
                },
                window: Window::first(10),
            };
            let (movies, total) = store.find_movies(&query).await.unwrap();
            assert_eq!(total, 3);
            let ids: Vec<Uuid> = movies.iter().map(|m| m.id).collect();
            assert_eq!(ids, expected);
        }
    }

    #[tokio::test]
    async fn test_list_follow_toggle() {
        let store = MemoryStore::new();
        let list = NewList {
            name: "Noir".to_string(),
            description: None,
            is_public: true,
        }
        .into_list(Uuid::new_v4())
        .unwrap();
        store.insert_list(&list).await.unwrap();
        let follower = Uuid::new_v4();

        let (after, outcome) = store.toggle_follower(list.id, follower).await.unwrap().unwrap();
        assert_eq!(outcome, Membership::Added);
        assert_eq!(after.followers, vec![follower]);

        let (after, outcome) = store.toggle_follower(list.id, follower).await.unwrap().unwrap();
        assert_eq!(outcome, Membership::Removed);
        assert!(after.followers.is_empty());
    }
}
