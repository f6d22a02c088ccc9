//! Collection-level store abstraction.
//!
//! Each collection gets its own trait so services can depend on exactly what they
//! touch (and be tested against mocks of just those traits). Lookups by id resolve
//! to `Ok(None)` on a miss; the caller decides whether that is a 404. Writes that
//! carry a [`WriteScope`] are conditional: the ownership check and the write happen
//! in one step, and a scope mismatch looks exactly like a miss.

use async_trait::async_trait;
use uuid::Uuid;

use super::query::{DiscussionQuery, ListQuery, MovieQuery, ReviewQuery, Window};
use crate::{
    error::AppResult,
    models::{
        Comment, Discussion, DiscussionPatch, ListPatch, Movie, MovieList, ProfileUpdate,
        Review, ReviewPatch, Role, TasteProfile, User, UserMovieSet,
    },
    services::{authorization::WriteScope, membership::Membership},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `InvalidInput` when the username or email is taken
    async fn insert_user(&self, user: &User) -> AppResult<()>;
    async fn find_user(&self, id: Uuid) -> AppResult<Option<User>>;
    /// Matches either the username or the email (case-insensitive)
    async fn find_user_by_login(&self, login: &str) -> AppResult<Option<User>>;
    async fn list_users(&self, window: Window) -> AppResult<(Vec<User>, u64)>;
    async fn update_profile(&self, id: Uuid, update: &ProfileUpdate) -> AppResult<Option<User>>;
    async fn set_preferences(&self, id: Uuid, preferences: &TasteProfile)
        -> AppResult<Option<User>>;
    async fn set_role(&self, id: Uuid, role: Role) -> AppResult<Option<User>>;
    /// Idempotent add to the wishlist or watched set
    async fn add_movie_ref(&self, id: Uuid, set: UserMovieSet, movie_id: Uuid)
        -> AppResult<Option<User>>;
    /// Idempotent remove from the wishlist or watched set
    async fn remove_movie_ref(
        &self,
        id: Uuid,
        set: UserMovieSet,
        movie_id: Uuid,
    ) -> AppResult<Option<User>>;
}

/// An in-place change to a movie document, applied by [`MovieStore::edit_movie`]
pub type MovieEdit = Box<dyn FnOnce(&mut Movie) -> AppResult<()> + Send>;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MovieStore: Send + Sync {
    async fn insert_movie(&self, movie: &Movie) -> AppResult<()>;
    async fn find_movie(&self, id: Uuid) -> AppResult<Option<Movie>>;
    /// Movies with the given ids, in no particular order; unknown ids are skipped
    async fn find_movies_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Movie>>;
    async fn find_movies(&self, query: &MovieQuery) -> AppResult<(Vec<Movie>, u64)>;
    /// A movie whose cast or crew contains the entry with this id
    async fn find_movie_by_person(&self, person_id: Uuid) -> AppResult<Option<Movie>>;
    /// Runs `edit` on the current document and saves the result while the movie is
    /// locked, so concurrent edits never overwrite each other. The derived rating fields
    /// and `created_at` are kept. An `Err` from `edit` leaves the movie unchanged.
    async fn edit_movie(&self, id: Uuid, edit: MovieEdit) -> AppResult<Option<Movie>>;
    /// The only writer of `average_rating` / `total_ratings`
    async fn set_rating_aggregate(
        &self,
        id: Uuid,
        average_rating: f64,
        total_ratings: i64,
    ) -> AppResult<Option<Movie>>;
    async fn delete_movie(&self, id: Uuid) -> AppResult<Option<Movie>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// Fails with `InvalidInput` when the user already reviewed the movie
    async fn insert_review(&self, review: &Review) -> AppResult<()>;
    async fn find_review(&self, id: Uuid) -> AppResult<Option<Review>>;
    async fn find_reviews(&self, query: &ReviewQuery) -> AppResult<(Vec<Review>, u64)>;
    /// Ratings of every current review of the movie
    async fn ratings_for_movie(&self, movie_id: Uuid) -> AppResult<Vec<u8>>;
    /// Ids of movies the user has reviewed
    async fn rated_movie_ids(&self, user_id: Uuid) -> AppResult<Vec<Uuid>>;
    /// Returns the review before and after the update
    async fn update_review(
        &self,
        id: Uuid,
        patch: &ReviewPatch,
        scope: WriteScope,
    ) -> AppResult<Option<(Review, Review)>>;
    async fn delete_review(&self, id: Uuid, scope: WriteScope) -> AppResult<Option<Review>>;
    async fn delete_reviews_for_movie(&self, movie_id: Uuid) -> AppResult<u64>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ListStore: Send + Sync {
    async fn insert_list(&self, list: &MovieList) -> AppResult<()>;
    async fn find_list(&self, id: Uuid) -> AppResult<Option<MovieList>>;
    async fn find_lists(&self, query: &ListQuery) -> AppResult<(Vec<MovieList>, u64)>;
    async fn update_list(
        &self,
        id: Uuid,
        patch: &ListPatch,
        scope: WriteScope,
    ) -> AppResult<Option<MovieList>>;
    async fn delete_list(&self, id: Uuid, scope: WriteScope) -> AppResult<Option<MovieList>>;
    async fn add_list_movie(
        &self,
        id: Uuid,
        movie_id: Uuid,
        scope: WriteScope,
    ) -> AppResult<Option<MovieList>>;
    async fn remove_list_movie(
        &self,
        id: Uuid,
        movie_id: Uuid,
        scope: WriteScope,
    ) -> AppResult<Option<MovieList>>;
    async fn toggle_follower(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Option<(MovieList, Membership)>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DiscussionStore: Send + Sync {
    async fn insert_discussion(&self, discussion: &Discussion) -> AppResult<()>;
    async fn find_discussion(&self, id: Uuid) -> AppResult<Option<Discussion>>;
    async fn find_discussions(&self, query: &DiscussionQuery)
        -> AppResult<(Vec<Discussion>, u64)>;
    async fn update_discussion(
        &self,
        id: Uuid,
        patch: &DiscussionPatch,
        scope: WriteScope,
    ) -> AppResult<Option<Discussion>>;
    async fn delete_discussion(&self, id: Uuid, scope: WriteScope)
        -> AppResult<Option<Discussion>>;
    async fn push_comment(&self, id: Uuid, comment: &Comment) -> AppResult<Option<Discussion>>;
    /// Matches only when the comment exists and its author fits `scope`
    async fn update_comment(
        &self,
        id: Uuid,
        comment_id: Uuid,
        body: &str,
        scope: WriteScope,
    ) -> AppResult<Option<Discussion>>;
    /// Removes the comment and its replies; same matching rule as `update_comment`
    async fn delete_comment(
        &self,
        id: Uuid,
        comment_id: Uuid,
        scope: WriteScope,
    ) -> AppResult<Option<Discussion>>;
}

/// Every collection the service needs
pub trait Store: UserStore + MovieStore + ReviewStore + ListStore + DiscussionStore {}

impl<T> Store for T where T: UserStore + MovieStore + ReviewStore + ListStore + DiscussionStore {}
