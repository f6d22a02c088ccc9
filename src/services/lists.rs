use uuid::Uuid;

use super::authorization::{can_mutate, classify_write_miss, Principal};
use super::membership::Membership;
use crate::{
    db::{
        query::{ListQuery, Window},
        store::{ListStore, MovieStore, UserStore},
    },
    error::{AppError, AppResult},
    models::{ListUpdate, MovieList, NewList},
};

/// Private lists are only visible to their creator and admins
fn visible_to(list: &MovieList, viewer: Option<&Principal>) -> bool {
    list.is_public || viewer.is_some_and(|p| can_mutate(p, list.creator_id))
}

pub async fn create_list<L: ListStore + ?Sized>(
    lists: &L,
    principal: &Principal,
    input: NewList,
) -> AppResult<MovieList> {
    let list = input.into_list(principal.id)?;
    lists.insert_list(&list).await?;
    tracing::info!(list_id = %list.id, creator_id = %principal.id, "List created");
    Ok(list)
}

/// Fetches a list; a private list looks absent to anyone but its creator or an admin
pub async fn get_list<L: ListStore + ?Sized>(
    lists: &L,
    viewer: Option<&Principal>,
    id: Uuid,
) -> AppResult<MovieList> {
    match lists.find_list(id).await? {
        Some(list) if visible_to(&list, viewer) => Ok(list),
        _ => Err(AppError::not_found("List", id)),
    }
}

pub async fn public_lists<L: ListStore + ?Sized>(
    lists: &L,
    window: Window,
) -> AppResult<(Vec<MovieList>, u64)> {
    lists
        .find_lists(&ListQuery {
            creator_id: None,
            public_only: true,
            window,
        })
        .await
}

pub async fn user_lists<L, U>(
    lists: &L,
    users: &U,
    viewer: Option<&Principal>,
    user_id: Uuid,
    window: Window,
) -> AppResult<(Vec<MovieList>, u64)>
where
    L: ListStore + ?Sized,
    U: UserStore + ?Sized,
{
    users
        .find_user(user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User", user_id))?;

    let include_private = viewer.is_some_and(|p| can_mutate(p, user_id));
    lists
        .find_lists(&ListQuery {
            creator_id: Some(user_id),
            public_only: !include_private,
            window,
        })
        .await
}

pub async fn update_list<L: ListStore + ?Sized>(
    lists: &L,
    principal: &Principal,
    id: Uuid,
    input: ListUpdate,
) -> AppResult<MovieList> {
    let patch = input.validate()?;
    match lists.update_list(id, &patch, principal.write_scope()).await? {
        Some(list) => {
            tracing::info!(list_id = %id, "List updated");
            Ok(list)
        }
        None => Err(classify_write_miss(lists.find_list(id).await?, "List", id)),
    }
}

pub async fn delete_list<L: ListStore + ?Sized>(
    lists: &L,
    principal: &Principal,
    id: Uuid,
) -> AppResult<()> {
    match lists.delete_list(id, principal.write_scope()).await? {
        Some(_) => {
            tracing::info!(list_id = %id, "List deleted");
            Ok(())
        }
        None => Err(classify_write_miss(lists.find_list(id).await?, "List", id)),
    }
}

/// Idempotently adds an existing movie to a list the principal may edit
pub async fn add_movie<L, M>(
    lists: &L,
    movies: &M,
    principal: &Principal,
    id: Uuid,
    movie_id: Uuid,
) -> AppResult<MovieList>
where
    L: ListStore + ?Sized,
    M: MovieStore + ?Sized,
{
    movies
        .find_movie(movie_id)
        .await?
        .ok_or_else(|| AppError::not_found("Movie", movie_id))?;

    match lists
        .add_list_movie(id, movie_id, principal.write_scope())
        .await?
    {
        Some(list) => Ok(list),
        None => Err(classify_write_miss(lists.find_list(id).await?, "List", id)),
    }
}

/// Idempotently removes a movie reference; unknown movie ids are a no-op
pub async fn remove_movie<L: ListStore + ?Sized>(
    lists: &L,
    principal: &Principal,
    id: Uuid,
    movie_id: Uuid,
) -> AppResult<MovieList> {
    match lists
        .remove_list_movie(id, movie_id, principal.write_scope())
        .await?
    {
        Some(list) => Ok(list),
        None => Err(classify_write_miss(lists.find_list(id).await?, "List", id)),
    }
}

/// Follows the list if the principal is not yet a follower, unfollows otherwise
pub async fn toggle_follow<L: ListStore + ?Sized>(
    lists: &L,
    principal: &Principal,
    id: Uuid,
) -> AppResult<(MovieList, Membership)> {
    get_list(lists, Some(principal), id).await?;

    let (list, outcome) = lists
        .toggle_follower(id, principal.id)
        .await?
        .ok_or_else(|| AppError::not_found("List", id))?;
    tracing::info!(list_id = %id, user_id = %principal.id, outcome = ?outcome, "List follow toggled");
    Ok((list, outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::{movie::fixtures, Role, User};

    fn principal(role: Role) -> Principal {
        Principal {
            id: Uuid::new_v4(),
            role,
        }
    }

    fn new_list(name: &str, is_public: bool) -> NewList {
        NewList {
            name: name.to_string(),
            description: None,
            is_public,
        }
    }

    #[tokio::test]
    async fn test_private_list_hidden_from_others() {
        let store = MemoryStore::new();
        let owner = principal(Role::User);
        let list = create_list(&store, &owner, new_list("Secret", false))
            .await
            .unwrap();

        assert!(get_list(&store, Some(&owner), list.id).await.is_ok());
        assert!(get_list(&store, Some(&principal(Role::Admin)), list.id)
            .await
            .is_ok());
        assert!(matches!(
            get_list(&store, None, list.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            get_list(&store, Some(&principal(Role::User)), list.id).await,
            Err(AppError::NotFound(_))
        ));

        let (public, total) = public_lists(&store, Window::first(20)).await.unwrap();
        assert!(public.is_empty());
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn test_user_lists_include_private_for_owner() {
        let store = MemoryStore::new();
        let user = User::new(
            "curator".to_string(),
            "curator@example.com".to_string(),
            "hash".to_string(),
            Role::User,
        );
        store.insert_user(&user).await.unwrap();
        let owner = Principal::from(&user);
        create_list(&store, &owner, new_list("Public", true)).await.unwrap();
        create_list(&store, &owner, new_list("Private", false)).await.unwrap();

        let (_, as_owner) = user_lists(&store, &store, Some(&owner), user.id, Window::first(20))
            .await
            .unwrap();
        let (_, as_guest) = user_lists(&store, &store, None, user.id, Window::first(20))
            .await
            .unwrap();
        assert_eq!(as_owner, 2);
        assert_eq!(as_guest, 1);
    }

    #[tokio::test]
    async fn test_membership_is_idempotent_and_owner_only() {
        let store = MemoryStore::new();
        let owner = principal(Role::User);
        let movie = fixtures::movie("Heat", &["crime"]);
        store.insert_movie(&movie).await.unwrap();
        let list = create_list(&store, &owner, new_list("Crime", true))
            .await
            .unwrap();

        add_movie(&store, &store, &owner, list.id, movie.id).await.unwrap();
        let after = add_movie(&store, &store, &owner, list.id, movie.id)
            .await
            .unwrap();
        assert_eq!(after.movies, vec![movie.id]);

        let denied = add_movie(&store, &store, &principal(Role::User), list.id, movie.id).await;
        assert!(matches!(denied, Err(AppError::Forbidden(_))));

        let unknown = add_movie(&store, &store, &owner, list.id, Uuid::new_v4()).await;
        assert!(matches!(unknown, Err(AppError::NotFound(_))));

        let after = remove_movie(&store, &owner, list.id, movie.id).await.unwrap();
        assert!(after.movies.is_empty());
        let after = remove_movie(&store, &owner, list.id, movie.id).await.unwrap();
        assert!(after.movies.is_empty());
    }

    #[tokio::test]
    async fn test_follow_toggle() {
        let store = MemoryStore::new();
        let list = create_list(&store, &principal(Role::User), new_list("Noir", true))
            .await
            .unwrap();
        let fan = principal(Role::User);

        let (after, outcome) = toggle_follow(&store, &fan, list.id).await.unwrap();
        assert_eq!(outcome, Membership::Added);
        assert_eq!(after.followers, vec![fan.id]);

        let (after, outcome) = toggle_follow(&store, &fan, list.id).await.unwrap();
        assert_eq!(outcome, Membership::Removed);
        assert!(after.followers.is_empty());
    }

    #[tokio::test]
    async fn test_cannot_follow_hidden_list() {
        let store = MemoryStore::new();
        let list = create_list(&store, &principal(Role::User), new_list("Mine", false))
            .await
            .unwrap();
        let result = toggle_follow(&store, &principal(Role::User), list.id).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
