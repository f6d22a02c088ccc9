use uuid::Uuid;

use super::auth::{hash_password, verify_password};
use super::authorization::{ensure_admin, Principal};
use crate::{
    config::AdminBootstrap,
    db::{
        query::Window,
        store::{MovieStore, UserStore},
    },
    error::{AppError, AppResult},
    models::{
        user::{validate_email, validate_password, validate_username},
        Movie, ProfileUpdate, Role, TasteProfile, User, UserMovieSet,
    },
};

/// Creates a regular account
pub async fn register<U: UserStore + ?Sized>(
    users: &U,
    username: &str,
    email: &str,
    password: &str,
    bcrypt_cost: u32,
) -> AppResult<User> {
    let username = username.trim();
    let email = email.trim().to_lowercase();
    validate_username(username)?;
    validate_email(&email)?;
    validate_password(password)?;

    let hash = hash_password(password.to_string(), bcrypt_cost).await?;
    let user = User::new(username.to_string(), email, hash, Role::User);
    users.insert_user(&user).await?;

    tracing::info!(user_id = %user.id, username = %user.username, "User registered");
    Ok(user)
}

/// Checks credentials; `login` is a username or an email
pub async fn login<U: UserStore + ?Sized>(
    users: &U,
    login: &str,
    password: &str,
) -> AppResult<User> {
    let invalid = || AppError::Unauthenticated("Invalid credentials".to_string());

    let user = users
        .find_user_by_login(login.trim())
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(password.to_string(), user.password_hash.clone()).await? {
        tracing::warn!(user_id = %user.id, "Failed login attempt");
        return Err(invalid());
    }

    tracing::info!(user_id = %user.id, "User logged in");
    Ok(user)
}

/// Makes sure the configured admin account exists and holds the admin role
pub async fn ensure_admin_account<U: UserStore + ?Sized>(
    users: &U,
    admin: &AdminBootstrap,
    bcrypt_cost: u32,
) -> AppResult<User> {
    if let Some(existing) = users.find_user_by_login(&admin.username).await? {
        if existing.role == Role::Admin {
            return Ok(existing);
        }
        let promoted = users
            .set_role(existing.id, Role::Admin)
            .await?
            .ok_or_else(|| AppError::not_found("User", existing.id))?;
        tracing::info!(user_id = %promoted.id, "Promoted configured admin account");
        return Ok(promoted);
    }

    let user = register(users, &admin.username, &admin.email, &admin.password, bcrypt_cost).await?;
    let admin = users
        .set_role(user.id, Role::Admin)
        .await?
        .ok_or_else(|| AppError::not_found("User", user.id))?;
    tracing::info!(user_id = %admin.id, "Created configured admin account");
    Ok(admin)
}

pub async fn get_user<U: UserStore + ?Sized>(users: &U, id: Uuid) -> AppResult<User> {
    users
        .find_user(id)
        .await?
        .ok_or_else(|| AppError::not_found("User", id))
}

pub async fn update_profile<U: UserStore + ?Sized>(
    users: &U,
    principal: &Principal,
    mut update: ProfileUpdate,
) -> AppResult<User> {
    update.email = update.email.map(|e| e.trim().to_lowercase());
    update.validate()?;
    users
        .update_profile(principal.id, &update)
        .await?
        .ok_or_else(|| AppError::not_found("User", principal.id))
}

/// Replaces the stored taste profile
pub async fn set_preferences<U: UserStore + ?Sized>(
    users: &U,
    principal: &Principal,
    preferences: TasteProfile,
) -> AppResult<TasteProfile> {
    let preferences = preferences.normalized()?;
    let user = users
        .set_preferences(principal.id, &preferences)
        .await?
        .ok_or_else(|| AppError::not_found("User", principal.id))?;
    tracing::debug!(user_id = %principal.id, "Preferences replaced");
    Ok(user.preferences)
}

/// Idempotently adds an existing movie to the wishlist or watched set
pub async fn add_to_set<U, M>(
    users: &U,
    movies: &M,
    principal: &Principal,
    set: UserMovieSet,
    movie_id: Uuid,
) -> AppResult<User>
where
    U: UserStore + ?Sized,
    M: MovieStore + ?Sized,
{
    movies
        .find_movie(movie_id)
        .await?
        .ok_or_else(|| AppError::not_found("Movie", movie_id))?;
    users
        .add_movie_ref(principal.id, set, movie_id)
        .await?
        .ok_or_else(|| AppError::not_found("User", principal.id))
}

/// Idempotently removes a movie reference from the wishlist or watched set
pub async fn remove_from_set<U: UserStore + ?Sized>(
    users: &U,
    principal: &Principal,
    set: UserMovieSet,
    movie_id: Uuid,
) -> AppResult<User> {
    users
        .remove_movie_ref(principal.id, set, movie_id)
        .await?
        .ok_or_else(|| AppError::not_found("User", principal.id))
}

/// Wishlist movies in the order they were added; deleted movies are skipped
pub async fn wishlist_movies<U, M>(
    users: &U,
    movies: &M,
    principal: &Principal,
) -> AppResult<Vec<Movie>>
where
    U: UserStore + ?Sized,
    M: MovieStore + ?Sized,
{
    let user = get_user(users, principal.id).await?;
    let mut found = movies.find_movies_by_ids(&user.wishlist).await?;
    found.sort_by_key(|m| user.wishlist.iter().position(|id| *id == m.id));
    Ok(found)
}

pub async fn list_users<U: UserStore + ?Sized>(
    users: &U,
    principal: &Principal,
    window: Window,
) -> AppResult<(Vec<User>, u64)> {
    ensure_admin(principal)?;
    users.list_users(window).await
}

pub async fn set_role<U: UserStore + ?Sized>(
    users: &U,
    principal: &Principal,
    id: Uuid,
    role: Role,
) -> AppResult<User> {
    ensure_admin(principal)?;
    let user = users
        .set_role(id, role)
        .await?
        .ok_or_else(|| AppError::not_found("User", id))?;
    tracing::info!(user_id = %id, role = role.as_str(), by = %principal.id, "Role changed");
    Ok(user)
}
