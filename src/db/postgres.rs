use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{postgres::PgPoolOptions, types::Json, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::query::{
    DiscussionQuery, ListQuery, MovieFilter, MovieQuery, MovieSortField, ReviewQuery,
    ReviewScope, ReviewSort, Window,
};
use super::store::{
    DiscussionStore, ListStore, MovieEdit, MovieStore, ReviewStore, UserStore,
};
use crate::{
    error::{AppError, AppResult},
    models::{
        CastMember, Comment, CrewMember, Discussion, DiscussionPatch, DiscussionSubject,
        Financials, Goof, ListPatch, Movie, MovieList, ProfileUpdate, Review, ReviewPatch, Role,
        SoundtrackEntry, TasteProfile, Technical, Trivia, User, UserMovieSet,
    },
    services::{authorization::WriteScope, membership::Membership},
};

/// Creates a PostgreSQL connection pool
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Applies the embedded schema migrations
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Unique-constraint violations are client errors, everything else stays a database error
fn unique_violation(err: sqlx::Error, message: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::InvalidInput(message.to_string())
        }
        _ => AppError::Database(err),
    }
}

/// `LIKE` pattern matching `text` anywhere, with wildcards in the input escaped
fn contains_pattern(text: &str) -> String {
    let escaped = text
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

const USER_COLUMNS: &str = "id, username, email, password_hash, role, display_name, bio, \
     preferences, wishlist, watched, created_at, updated_at";

const MOVIE_COLUMNS: &str = "id, title, genres, cast_members, crew, release_date, \
     runtime_minutes, synopsis, content_rating, language, average_rating, total_ratings, \
     financials, technical, trivia, goofs, soundtrack, created_at, updated_at";

const REVIEW_COLUMNS: &str = "id, user_id, movie_id, rating, comment, created_at, updated_at";

const LIST_COLUMNS: &str =
    "id, creator_id, name, description, is_public, movies, followers, created_at, updated_at";

const DISCUSSION_COLUMNS: &str =
    "id, author_id, title, body, subject_kind, subject_id, comments, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    password_hash: String,
    role: String,
    display_name: Option<String>,
    bio: Option<String>,
    preferences: Json<TasteProfile>,
    wishlist: Vec<Uuid>,
    watched: Vec<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> AppResult<Self> {
        Ok(User {
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            role: Role::parse(&row.role)?,
            display_name: row.display_name,
            bio: row.bio,
            preferences: row.preferences.0,
            wishlist: row.wishlist,
            watched: row.watched,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct MovieRow {
    id: Uuid,
    title: String,
    genres: Vec<String>,
    cast_members: Json<Vec<CastMember>>,
    crew: Json<Vec<CrewMember>>,
    release_date: Option<NaiveDate>,
    runtime_minutes: Option<i32>,
    synopsis: Option<String>,
    content_rating: Option<String>,
    language: Option<String>,
    average_rating: f64,
    total_ratings: i64,
    financials: Json<Financials>,
    technical: Json<Technical>,
    trivia: Json<Vec<Trivia>>,
    goofs: Json<Vec<Goof>>,
    soundtrack: Json<Vec<SoundtrackEntry>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<MovieRow> for Movie {
    fn from(row: MovieRow) -> Self {
        Movie {
            id: row.id,
            title: row.title,
            genres: row.genres,
            cast: row.cast_members.0,
            crew: row.crew.0,
            release_date: row.release_date,
            runtime_minutes: row.runtime_minutes,
            synopsis: row.synopsis,
            content_rating: row.content_rating,
            language: row.language,
            average_rating: row.average_rating,
            total_ratings: row.total_ratings,
            financials: row.financials.0,
            technical: row.technical.0,
            trivia: row.trivia.0,
            goofs: row.goofs.0,
            soundtrack: row.soundtrack.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: Uuid,
    user_id: Uuid,
    movie_id: Uuid,
    rating: i16,
    comment: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ReviewRow> for Review {
    type Error = AppError;

    fn try_from(row: ReviewRow) -> AppResult<Self> {
        let rating = u8::try_from(row.rating)
            .map_err(|_| AppError::Internal(format!("Stored rating {} out of range", row.rating)))?;
        Ok(Review {
            id: row.id,
            user_id: row.user_id,
            movie_id: row.movie_id,
            rating,
            comment: row.comment,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ListRow {
    id: Uuid,
    creator_id: Uuid,
    name: String,
    description: Option<String>,
    is_public: bool,
    movies: Vec<Uuid>,
    followers: Vec<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ListRow> for MovieList {
    fn from(row: ListRow) -> Self {
        MovieList {
            id: row.id,
            creator_id: row.creator_id,
            name: row.name,
            description: row.description,
            is_public: row.is_public,
            movies: row.movies,
            followers: row.followers,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct FollowRow {
    #[sqlx(flatten)]
    list: ListRow,
    following: bool,
}

#[derive(sqlx::FromRow)]
struct DiscussionRow {
    id: Uuid,
    author_id: Uuid,
    title: String,
    body: String,
    subject_kind: String,
    subject_id: Uuid,
    comments: Json<Vec<Comment>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn subject_parts(subject: &DiscussionSubject) -> (&'static str, Uuid) {
    match subject {
        DiscussionSubject::Movie(id) => ("movie", *id),
        DiscussionSubject::Person(id) => ("person", *id),
    }
}

impl TryFrom<DiscussionRow> for Discussion {
    type Error = AppError;

    fn try_from(row: DiscussionRow) -> AppResult<Self> {
        let subject = match row.subject_kind.as_str() {
            "movie" => DiscussionSubject::Movie(row.subject_id),
            "person" => DiscussionSubject::Person(row.subject_id),
            other => {
                return Err(AppError::Internal(format!(
                    "Unknown discussion subject kind: {}",
                    other
                )))
            }
        };
        Ok(Discussion {
            id: row.id,
            author_id: row.author_id,
            title: row.title,
            body: row.body,
            subject,
            comments: row.comments.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_user(&self, sql: String, id: Uuid) -> AppResult<Option<User>> {
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }
}

fn push_movie_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &MovieFilter) {
    qb.push(" WHERE TRUE");

    if filter.has_taste_group() {
        qb.push(" AND (genres && ");
        qb.push_bind(filter.any_genre.clone());
        qb.push(" OR EXISTS (SELECT 1 FROM jsonb_array_elements(cast_members) c WHERE c->>'name' = ANY(");
        qb.push_bind(filter.any_actor.clone());
        qb.push(")) OR EXISTS (SELECT 1 FROM jsonb_array_elements(crew) c WHERE lower(c->>'job') = 'director' AND c->>'name' = ANY(");
        qb.push_bind(filter.any_director.clone());
        qb.push(")))");
    }

    if !filter.content_ratings.is_empty() {
        qb.push(" AND content_rating = ANY(");
        qb.push_bind(filter.content_ratings.clone());
        qb.push(")");
    }

    if !filter.languages.is_empty() {
        qb.push(" AND language = ANY(");
        qb.push_bind(filter.languages.clone());
        qb.push(")");
    }

    if !filter.exclude_ids.is_empty() {
        qb.push(" AND NOT (id = ANY(");
        qb.push_bind(filter.exclude_ids.clone());
        qb.push("))");
    }

    if let Some(year) = filter.release_year {
        qb.push(" AND EXTRACT(YEAR FROM release_date)::int = ");
        qb.push_bind(year);
    }

    if let Some(text) = &filter.text {
        let pattern = contains_pattern(text);
        qb.push(" AND (title ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR EXISTS (SELECT 1 FROM jsonb_array_elements(cast_members) c WHERE c->>'name' ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(") OR EXISTS (SELECT 1 FROM jsonb_array_elements(crew) c WHERE c->>'name' ILIKE ");
        qb.push_bind(pattern);
        qb.push("))");
    }

    if let Some(min) = filter.min_total_ratings {
        qb.push(" AND total_ratings >= ");
        qb.push_bind(min);
    }
}

fn movie_order(query: &MovieQuery) -> String {
    let direction = if query.sort.descending { "DESC" } else { "ASC" };
    let keys = match query.sort.field {
        MovieSortField::Title => format!("lower(title) {}", direction),
        MovieSortField::ReleaseDate => format!("release_date {} NULLS LAST", direction),
        MovieSortField::AverageRating => {
            format!("average_rating {d}, total_ratings {d}", d = direction)
        }
        MovieSortField::TotalRatings => format!("total_ratings {}", direction),
        MovieSortField::CreatedAt => format!("created_at {}", direction),
    };
    format!(" ORDER BY {}, id", keys)
}

fn push_window(qb: &mut QueryBuilder<'_, Postgres>, window: Window) -> AppResult<()> {
    let (limit, offset) = window.sql_bounds()?;
    qb.push(" LIMIT ");
    qb.push_bind(limit);
    qb.push(" OFFSET ");
    qb.push_bind(offset);
    Ok(())
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, user: &User) -> AppResult<()> {
        sqlx::query(&format!(
            "INSERT INTO users ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
            USER_COLUMNS
        ))
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(&user.display_name)
        .bind(&user.bio)
        .bind(Json(&user.preferences))
        .bind(&user.wishlist)
        .bind(&user.watched)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| unique_violation(e, "Username or email already registered"))?;
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> AppResult<Option<User>> {
        self.fetch_user(format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS), id)
            .await
    }

    async fn find_user_by_login(&self, login: &str) -> AppResult<Option<User>> {
        sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE lower(username) = lower($1) OR lower(email) = lower($1)",
            USER_COLUMNS
        ))
        .bind(login)
        .fetch_optional(&self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }

    async fn list_users(&self, window: Window) -> AppResult<(Vec<User>, u64)> {
        let (limit, offset) = window.sql_bounds()?;
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        let users = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users ORDER BY created_at, id LIMIT $1 OFFSET $2",
            USER_COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(User::try_from)
        .collect::<AppResult<Vec<_>>>()?;
        Ok((users, total as u64))
    }

    async fn update_profile(&self, id: Uuid, update: &ProfileUpdate) -> AppResult<Option<User>> {
        sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET email = COALESCE($2, email), \
             display_name = COALESCE($3, display_name), bio = COALESCE($4, bio), \
             updated_at = now() WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        ))
        .bind(id)
        .bind(&update.email)
        .bind(&update.display_name)
        .bind(&update.bio)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| unique_violation(e, "Email already registered"))?
        .map(User::try_from)
        .transpose()
    }

    async fn set_preferences(
        &self,
        id: Uuid,
        preferences: &TasteProfile,
    ) -> AppResult<Option<User>> {
        sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET preferences = $2, updated_at = now() WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        ))
        .bind(id)
        .bind(Json(preferences))
        .fetch_optional(&self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }

    async fn set_role(&self, id: Uuid, role: Role) -> AppResult<Option<User>> {
        sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET role = $2, updated_at = now() WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        ))
        .bind(id)
        .bind(role.as_str())
        .fetch_optional(&self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }

    async fn add_movie_ref(
        &self,
        id: Uuid,
        set: UserMovieSet,
        movie_id: Uuid,
    ) -> AppResult<Option<User>> {
        let column = set.column();
        sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET {c} = CASE WHEN $2 = ANY({c}) THEN {c} ELSE array_append({c}, $2) END, \
             updated_at = now() WHERE id = $1 RETURNING {cols}",
            c = column,
            cols = USER_COLUMNS
        ))
        .bind(id)
        .bind(movie_id)
        .fetch_optional(&self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }

    async fn remove_movie_ref(
        &self,
        id: Uuid,
        set: UserMovieSet,
        movie_id: Uuid,
    ) -> AppResult<Option<User>> {
        let column = set.column();
        sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET {c} = array_remove({c}, $2), updated_at = now() \
             WHERE id = $1 RETURNING {cols}",
            c = column,
            cols = USER_COLUMNS
        ))
        .bind(id)
        .bind(movie_id)
        .fetch_optional(&self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }
}

#[async_trait]
impl MovieStore for PgStore {
    async fn insert_movie(&self, movie: &Movie) -> AppResult<()> {
        sqlx::query(&format!(
            "INSERT INTO movies ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, \
             $13, $14, $15, $16, $17, $18, $19)",
            MOVIE_COLUMNS
        ))
        .bind(movie.id)
        .bind(&movie.title)
        .bind(&movie.genres)
        .bind(Json(&movie.cast))
        .bind(Json(&movie.crew))
        .bind(movie.release_date)
        .bind(movie.runtime_minutes)
        .bind(&movie.synopsis)
        .bind(&movie.content_rating)
        .bind(&movie.language)
        .bind(movie.average_rating)
        .bind(movie.total_ratings)
        .bind(Json(&movie.financials))
        .bind(Json(&movie.technical))
        .bind(Json(&movie.trivia))
        .bind(Json(&movie.goofs))
        .bind(Json(&movie.soundtrack))
        .bind(movie.created_at)
        .bind(movie.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_movie(&self, id: Uuid) -> AppResult<Option<Movie>> {
        let row = sqlx::query_as::<_, MovieRow>(&format!(
            "SELECT {} FROM movies WHERE id = $1",
            MOVIE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Movie::from))
    }

    async fn find_movies_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Movie>> {
        let rows = sqlx::query_as::<_, MovieRow>(&format!(
            "SELECT {} FROM movies WHERE id = ANY($1)",
            MOVIE_COLUMNS
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Movie::from).collect())
    }

    async fn find_movies(&self, query: &MovieQuery) -> AppResult<(Vec<Movie>, u64)> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM movies");
        push_movie_filter(&mut count, &query.filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select =
            QueryBuilder::<Postgres>::new(format!("SELECT {} FROM movies", MOVIE_COLUMNS));
        push_movie_filter(&mut select, &query.filter);
        select.push(movie_order(query));
        push_window(&mut select, query.window)?;

        let movies = select
            .build_query_as::<MovieRow>()
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Movie::from)
            .collect();

        Ok((movies, total as u64))
    }

    async fn find_movie_by_person(&self, person_id: Uuid) -> AppResult<Option<Movie>> {
        let row = sqlx::query_as::<_, MovieRow>(&format!(
            "SELECT {} FROM movies \
             WHERE EXISTS (SELECT 1 FROM jsonb_array_elements(cast_members) c WHERE c->>'id' = $1) \
             OR EXISTS (SELECT 1 FROM jsonb_array_elements(crew) c WHERE c->>'id' = $1) LIMIT 1",
            MOVIE_COLUMNS
        ))
        .bind(person_id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Movie::from))
    }

    async fn edit_movie(&self, id: Uuid, edit: MovieEdit) -> AppResult<Option<Movie>> {
        let mut tx = self.pool.begin().await?;
        let Some(mut movie) = Self::lock_movie(&mut tx, id).await? else {
            return Ok(None);
        };
        edit(&mut movie)?;

        let row = sqlx::query_as::<_, MovieRow>(&format!(
            "UPDATE movies SET title = $2, genres = $3, cast_members = $4, crew = $5, \
             release_date = $6, runtime_minutes = $7, synopsis = $8, content_rating = $9, \
             language = $10, financials = $11, technical = $12, trivia = $13, goofs = $14, \
             soundtrack = $15, updated_at = now() WHERE id = $1 RETURNING {}",
            MOVIE_COLUMNS
        ))
        .bind(id)
        .bind(&movie.title)
        .bind(&movie.genres)
        .bind(Json(&movie.cast))
        .bind(Json(&movie.crew))
        .bind(movie.release_date)
        .bind(movie.runtime_minutes)
        .bind(&movie.synopsis)
        .bind(&movie.content_rating)
        .bind(&movie.language)
        .bind(Json(&movie.financials))
        .bind(Json(&movie.technical))
        .bind(Json(&movie.trivia))
        .bind(Json(&movie.goofs))
        .bind(Json(&movie.soundtrack))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(Movie::from(row)))
    }

    async fn set_rating_aggregate(
        &self,
        id: Uuid,
        average_rating: f64,
        total_ratings: i64,
    ) -> AppResult<Option<Movie>> {
        let row = sqlx::query_as::<_, MovieRow>(&format!(
            "UPDATE movies SET average_rating = $2, total_ratings = $3 WHERE id = $1 RETURNING {}",
            MOVIE_COLUMNS
        ))
        .bind(id)
        .bind(average_rating)
        .bind(total_ratings)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Movie::from))
    }

    async fn delete_movie(&self, id: Uuid) -> AppResult<Option<Movie>> {
        let row = sqlx::query_as::<_, MovieRow>(&format!(
            "DELETE FROM movies WHERE id = $1 RETURNING {}",
            MOVIE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Movie::from))
    }
}

fn review_order(sort: ReviewSort) -> &'static str {
    match sort {
        ReviewSort::Newest => " ORDER BY created_at DESC, id",
        ReviewSort::Oldest => " ORDER BY created_at ASC, id",
        ReviewSort::Highest => " ORDER BY rating DESC, created_at DESC, id",
        ReviewSort::Lowest => " ORDER BY rating ASC, created_at DESC, id",
    }
}

#[async_trait]
impl ReviewStore for PgStore {
    async fn insert_review(&self, review: &Review) -> AppResult<()> {
        sqlx::query(&format!(
            "INSERT INTO reviews ({}) VALUES ($1, $2, $3, $4, $5, $6, $7)",
            REVIEW_COLUMNS
        ))
        .bind(review.id)
        .bind(review.user_id)
        .bind(review.movie_id)
        .bind(review.rating as i16)
        .bind(&review.comment)
        .bind(review.created_at)
        .bind(review.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| unique_violation(e, "You have already reviewed this movie"))?;
        Ok(())
    }

    async fn find_review(&self, id: Uuid) -> AppResult<Option<Review>> {
        sqlx::query_as::<_, ReviewRow>(&format!(
            "SELECT {} FROM reviews WHERE id = $1",
            REVIEW_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(Review::try_from)
        .transpose()
    }

    async fn find_reviews(&self, query: &ReviewQuery) -> AppResult<(Vec<Review>, u64)> {
        let (limit, offset) = query.window.sql_bounds()?;
        let (column, owner) = match query.scope {
            ReviewScope::Movie(id) => ("movie_id", id),
            ReviewScope::User(id) => ("user_id", id),
        };

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM reviews WHERE {} = $1",
            column
        ))
        .bind(owner)
        .fetch_one(&self.pool)
        .await?;

        let reviews = sqlx::query_as::<_, ReviewRow>(&format!(
            "SELECT {} FROM reviews WHERE {} = $1{} LIMIT $2 OFFSET $3",
            REVIEW_COLUMNS,
            column,
            review_order(query.sort)
        ))
        .bind(owner)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Review::try_from)
        .collect::<AppResult<Vec<_>>>()?;

        Ok((reviews, total as u64))
    }

    async fn ratings_for_movie(&self, movie_id: Uuid) -> AppResult<Vec<u8>> {
        let ratings: Vec<i16> = sqlx::query_scalar("SELECT rating FROM reviews WHERE movie_id = $1")
            .bind(movie_id)
            .fetch_all(&self.pool)
            .await?;
        ratings
            .into_iter()
            .map(|r| {
                u8::try_from(r)
                    .map_err(|_| AppError::Internal(format!("Stored rating {} out of range", r)))
            })
            .collect()
    }

    async fn rated_movie_ids(&self, user_id: Uuid) -> AppResult<Vec<Uuid>> {
        let ids = sqlx::query_scalar("SELECT movie_id FROM reviews WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    async fn update_review(
        &self,
        id: Uuid,
        patch: &ReviewPatch,
        scope: WriteScope,
    ) -> AppResult<Option<(Review, Review)>> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, ReviewRow>(&format!(
            "SELECT {} FROM reviews WHERE id = $1 AND ($2::uuid IS NULL OR user_id = $2) FOR UPDATE",
            REVIEW_COLUMNS
        ))
        .bind(id)
        .bind(scope.owner())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = current else {
            return Ok(None);
        };
        let before = Review::try_from(row)?;
        let mut after = before.clone();
        patch.apply(&mut after);

        sqlx::query("UPDATE reviews SET rating = $2, comment = $3, updated_at = $4 WHERE id = $1")
            .bind(id)
            .bind(after.rating as i16)
            .bind(&after.comment)
            .bind(after.updated_at)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(Some((before, after)))
    }

    async fn delete_review(&self, id: Uuid, scope: WriteScope) -> AppResult<Option<Review>> {
        sqlx::query_as::<_, ReviewRow>(&format!(
            "DELETE FROM reviews WHERE id = $1 AND ($2::uuid IS NULL OR user_id = $2) RETURNING {}",
            REVIEW_COLUMNS
        ))
        .bind(id)
        .bind(scope.owner())
        .fetch_optional(&self.pool)
        .await?
        .map(Review::try_from)
        .transpose()
    }

    async fn delete_reviews_for_movie(&self, movie_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM reviews WHERE movie_id = $1")
            .bind(movie_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl ListStore for PgStore {
    async fn insert_list(&self, list: &MovieList) -> AppResult<()> {
        sqlx::query(&format!(
            "INSERT INTO lists ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            LIST_COLUMNS
        ))
        .bind(list.id)
        .bind(list.creator_id)
        .bind(&list.name)
        .bind(&list.description)
        .bind(list.is_public)
        .bind(&list.movies)
        .bind(&list.followers)
        .bind(list.created_at)
        .bind(list.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_list(&self, id: Uuid) -> AppResult<Option<MovieList>> {
        let row = sqlx::query_as::<_, ListRow>(&format!(
            "SELECT {} FROM lists WHERE id = $1",
            LIST_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(MovieList::from))
    }

    async fn find_lists(&self, query: &ListQuery) -> AppResult<(Vec<MovieList>, u64)> {
        let (limit, offset) = query.window.sql_bounds()?;
        const FILTER: &str = "WHERE ($1::uuid IS NULL OR creator_id = $1) AND (NOT $2 OR is_public)";

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM lists {}", FILTER))
            .bind(query.creator_id)
            .bind(query.public_only)
            .fetch_one(&self.pool)
            .await?;

        let lists = sqlx::query_as::<_, ListRow>(&format!(
            "SELECT {} FROM lists {} ORDER BY created_at DESC, id LIMIT $3 OFFSET $4",
            LIST_COLUMNS, FILTER
        ))
        .bind(query.creator_id)
        .bind(query.public_only)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(MovieList::from)
        .collect();

        Ok((lists, total as u64))
    }

    async fn update_list(
        &self,
        id: Uuid,
        patch: &ListPatch,
        scope: WriteScope,
    ) -> AppResult<Option<MovieList>> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, ListRow>(&format!(
            "SELECT {} FROM lists WHERE id = $1 AND ($2::uuid IS NULL OR creator_id = $2) FOR UPDATE",
            LIST_COLUMNS
        ))
        .bind(id)
        .bind(scope.owner())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = current else {
            return Ok(None);
        };
        let mut list = MovieList::from(row);
        patch.apply(&mut list);

        sqlx::query(
            "UPDATE lists SET name = $2, description = $3, is_public = $4, updated_at = $5 WHERE id = $1",
        )
        .bind(id)
        .bind(&list.name)
        .bind(&list.description)
        .bind(list.is_public)
        .bind(list.updated_at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(Some(list))
    }

    async fn delete_list(&self, id: Uuid, scope: WriteScope) -> AppResult<Option<MovieList>> {
        let row = sqlx::query_as::<_, ListRow>(&format!(
            "DELETE FROM lists WHERE id = $1 AND ($2::uuid IS NULL OR creator_id = $2) RETURNING {}",
            LIST_COLUMNS
        ))
        .bind(id)
        .bind(scope.owner())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(MovieList::from))
    }

    async fn add_list_movie(
        &self,
        id: Uuid,
        movie_id: Uuid,
        scope: WriteScope,
    ) -> AppResult<Option<MovieList>> {
        let row = sqlx::query_as::<_, ListRow>(&format!(
            "UPDATE lists SET movies = CASE WHEN $2 = ANY(movies) THEN movies \
             ELSE array_append(movies, $2) END, updated_at = now() \
             WHERE id = $1 AND ($3::uuid IS NULL OR creator_id = $3) RETURNING {}",
            LIST_COLUMNS
        ))
        .bind(id)
        .bind(movie_id)
        .bind(scope.owner())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(MovieList::from))
    }

    async fn remove_list_movie(
        &self,
        id: Uuid,
        movie_id: Uuid,
        scope: WriteScope,
    ) -> AppResult<Option<MovieList>> {
        let row = sqlx::query_as::<_, ListRow>(&format!(
            "UPDATE lists SET movies = array_remove(movies, $2), updated_at = now() \
             WHERE id = $1 AND ($3::uuid IS NULL OR creator_id = $3) RETURNING {}",
            LIST_COLUMNS
        ))
        .bind(id)
        .bind(movie_id)
        .bind(scope.owner())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(MovieList::from))
    }

    async fn toggle_follower(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Option<(MovieList, Membership)>> {
        // RETURNING sees the new array, so membership after the write means it was added
        let row = sqlx::query_as::<_, FollowRow>(&format!(
            "UPDATE lists SET followers = CASE WHEN $2 = ANY(followers) \
             THEN array_remove(followers, $2) ELSE array_append(followers, $2) END \
             WHERE id = $1 RETURNING {}, ($2 = ANY(followers)) AS following",
            LIST_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| {
            let outcome = if r.following {
                Membership::Added
            } else {
                Membership::Removed
            };
            (MovieList::from(r.list), outcome)
        }))
    }
}

impl PgStore {
    /// Locks a movie row for a read-modify-write of its document
    async fn lock_movie(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        id: Uuid,
    ) -> AppResult<Option<Movie>> {
        let row = sqlx::query_as::<_, MovieRow>(&format!(
            "SELECT {} FROM movies WHERE id = $1 FOR UPDATE",
            MOVIE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(row.map(Movie::from))
    }

    /// Locks a discussion row for a read-modify-write of its embedded comments
    async fn lock_discussion(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        id: Uuid,
    ) -> AppResult<Option<Discussion>> {
        sqlx::query_as::<_, DiscussionRow>(&format!(
            "SELECT {} FROM discussions WHERE id = $1 FOR UPDATE",
            DISCUSSION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .map(Discussion::try_from)
        .transpose()
    }

    async fn write_comments(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        discussion: &Discussion,
    ) -> AppResult<()> {
        sqlx::query("UPDATE discussions SET comments = $2, updated_at = $3 WHERE id = $1")
            .bind(discussion.id)
            .bind(Json(&discussion.comments))
            .bind(discussion.updated_at)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl DiscussionStore for PgStore {
    async fn insert_discussion(&self, discussion: &Discussion) -> AppResult<()> {
        let (kind, subject_id) = subject_parts(&discussion.subject);
        sqlx::query(&format!(
            "INSERT INTO discussions ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            DISCUSSION_COLUMNS
        ))
        .bind(discussion.id)
        .bind(discussion.author_id)
        .bind(&discussion.title)
        .bind(&discussion.body)
        .bind(kind)
        .bind(subject_id)
        .bind(Json(&discussion.comments))
        .bind(discussion.created_at)
        .bind(discussion.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_discussion(&self, id: Uuid) -> AppResult<Option<Discussion>> {
        sqlx::query_as::<_, DiscussionRow>(&format!(
            "SELECT {} FROM discussions WHERE id = $1",
            DISCUSSION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(Discussion::try_from)
        .transpose()
    }

    async fn find_discussions(
        &self,
        query: &DiscussionQuery,
    ) -> AppResult<(Vec<Discussion>, u64)> {
        const FILTER: &str =
            "WHERE ($1::text IS NULL OR (subject_kind = $1 AND subject_id = $2))";
        let (limit, offset) = query.window.sql_bounds()?;
        let (kind, subject_id) = match &query.subject {
            Some(subject) => {
                let (kind, id) = subject_parts(subject);
                (Some(kind), Some(id))
            }
            None => (None, None),
        };

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM discussions {}", FILTER))
                .bind(kind)
                .bind(subject_id)
                .fetch_one(&self.pool)
                .await?;

        let discussions = sqlx::query_as::<_, DiscussionRow>(&format!(
            "SELECT {} FROM discussions {} ORDER BY created_at DESC, id LIMIT $3 OFFSET $4",
            DISCUSSION_COLUMNS, FILTER
        ))
        .bind(kind)
        .bind(subject_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Discussion::try_from)
        .collect::<AppResult<Vec<_>>>()?;

        Ok((discussions, total as u64))
    }

    async fn update_discussion(
        &self,
        id: Uuid,
        patch: &DiscussionPatch,
        scope: WriteScope,
    ) -> AppResult<Option<Discussion>> {
        let mut tx = self.pool.begin().await?;
        let Some(mut discussion) = Self::lock_discussion(&mut tx, id).await? else {
            return Ok(None);
        };
        if !scope.permits(discussion.author_id) {
            return Ok(None);
        }
        patch.apply(&mut discussion);

        sqlx::query("UPDATE discussions SET title = $2, body = $3, updated_at = $4 WHERE id = $1")
            .bind(id)
            .bind(&discussion.title)
            .bind(&discussion.body)
            .bind(discussion.updated_at)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(Some(discussion))
    }

    async fn delete_discussion(
        &self,
        id: Uuid,
        scope: WriteScope,
    ) -> AppResult<Option<Discussion>> {
        sqlx::query_as::<_, DiscussionRow>(&format!(
            "DELETE FROM discussions WHERE id = $1 AND ($2::uuid IS NULL OR author_id = $2) \
             RETURNING {}",
            DISCUSSION_COLUMNS
        ))
        .bind(id)
        .bind(scope.owner())
        .fetch_optional(&self.pool)
        .await?
        .map(Discussion::try_from)
        .transpose()
    }

    async fn push_comment(&self, id: Uuid, comment: &Comment) -> AppResult<Option<Discussion>> {
        sqlx::query_as::<_, DiscussionRow>(&format!(
            "UPDATE discussions SET comments = comments || jsonb_build_array($2::jsonb), \
             updated_at = now() WHERE id = $1 RETURNING {}",
            DISCUSSION_COLUMNS
        ))
        .bind(id)
        .bind(Json(comment))
        .fetch_optional(&self.pool)
        .await?
        .map(Discussion::try_from)
        .transpose()
    }

    async fn update_comment(
        &self,
        id: Uuid,
        comment_id: Uuid,
        body: &str,
        scope: WriteScope,
    ) -> AppResult<Option<Discussion>> {
        let mut tx = self.pool.begin().await?;
        let Some(mut discussion) = Self::lock_discussion(&mut tx, id).await? else {
            return Ok(None);
        };

        let now = Utc::now();
        match discussion.comments.iter_mut().find(|c| c.id == comment_id) {
            Some(comment) if scope.permits(comment.author_id) => {
                comment.body = body.to_string();
                comment.updated_at = now;
            }
            _ => return Ok(None),
        }
        discussion.updated_at = now;

        Self::write_comments(&mut tx, &discussion).await?;
        tx.commit().await?;
        Ok(Some(discussion))
    }

    async fn delete_comment(
        &self,
        id: Uuid,
        comment_id: Uuid,
        scope: WriteScope,
    ) -> AppResult<Option<Discussion>> {
        let mut tx = self.pool.begin().await?;
        let Some(mut discussion) = Self::lock_discussion(&mut tx, id).await? else {
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

        Self::write_comments(&mut tx, &discussion).await?;
        tx.commit().await?;
        Ok(Some(discussion))
    }
}
