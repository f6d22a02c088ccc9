use uuid::Uuid;

use super::authorization::{classify_write_miss, Principal};
use crate::{
    db::{
        query::{DiscussionQuery, Window},
        store::{DiscussionStore, MovieStore},
    },
    error::{AppError, AppResult},
    models::{CommentUpdate, Discussion, DiscussionSubject, DiscussionUpdate, NewComment, NewDiscussion},
};

async fn ensure_subject_exists<M: MovieStore + ?Sized>(
    movies: &M,
    subject: DiscussionSubject,
) -> AppResult<()> {
    match subject {
        DiscussionSubject::Movie(id) => {
            movies
                .find_movie(id)
                .await?
                .ok_or_else(|| AppError::not_found("Movie", id))?;
        }
        DiscussionSubject::Person(id) => {
            movies
                .find_movie_by_person(id)
                .await?
                .ok_or_else(|| AppError::not_found("Person", id))?;
        }
    }
    Ok(())
}

pub async fn create_discussion<D, M>(
    discussions: &D,
    movies: &M,
    principal: &Principal,
    input: NewDiscussion,
) -> AppResult<Discussion>
where
    D: DiscussionStore + ?Sized,
    M: MovieStore + ?Sized,
{
    ensure_subject_exists(movies, input.subject()?).await?;
    let discussion = input.into_discussion(principal.id)?;
    discussions.insert_discussion(&discussion).await?;
    tracing::info!(discussion_id = %discussion.id, author_id = %principal.id, "Discussion created");
    Ok(discussion)
}

pub async fn get_discussion<D: DiscussionStore + ?Sized>(
    discussions: &D,
    id: Uuid,
) -> AppResult<Discussion> {
    discussions
        .find_discussion(id)
        .await?
        .ok_or_else(|| AppError::not_found("Discussion", id))
}

pub async fn list_discussions<D: DiscussionStore + ?Sized>(
    discussions: &D,
    subject: Option<DiscussionSubject>,
    window: Window,
) -> AppResult<(Vec<Discussion>, u64)> {
    discussions
        .find_discussions(&DiscussionQuery { subject, window })
        .await
}

pub async fn update_discussion<D: DiscussionStore + ?Sized>(
    discussions: &D,
    principal: &Principal,
    id: Uuid,
    input: DiscussionUpdate,
) -> AppResult<Discussion> {
    let patch = input.validate()?;
    match discussions
        .update_discussion(id, &patch, principal.write_scope())
        .await?
    {
        Some(discussion) => Ok(discussion),
        None => Err(classify_write_miss(
            discussions.find_discussion(id).await?,
            "Discussion",
            id,
        )),
    }
}

pub async fn delete_discussion<D: DiscussionStore + ?Sized>(
    discussions: &D,
    principal: &Principal,
    id: Uuid,
) -> AppResult<()> {
    match discussions
        .delete_discussion(id, principal.write_scope())
        .await?
    {
        Some(_) => {
            tracing::info!(discussion_id = %id, "Discussion deleted");
            Ok(())
        }
        None => Err(classify_write_miss(
            discussions.find_discussion(id).await?,
            "Discussion",
            id,
        )),
    }
}

/// Adds a comment, or a reply when `parentId` names a top-level comment
pub async fn add_comment<D: DiscussionStore + ?Sized>(
    discussions: &D,
    principal: &Principal,
    id: Uuid,
    input: NewComment,
) -> AppResult<Discussion> {
    let discussion = get_discussion(discussions, id).await?;

    if let Some(parent_id) = input.parent_id {
        let parent = discussion
            .comment(parent_id)
            .ok_or_else(|| AppError::not_found("Comment", parent_id))?;
        if parent.parent_id.is_some() {
            return Err(AppError::InvalidInput(
                "Replies can only be made to top-level comments".to_string(),
            ));
        }
    }

    let comment = input.into_comment(principal.id)?;
    discussions
        .push_comment(id, &comment)
        .await?
        .ok_or_else(|| AppError::not_found("Discussion", id))
}

/// Distinguishes a missing discussion, a missing comment and a foreign comment
async fn classify_comment_miss<D: DiscussionStore + ?Sized>(
    discussions: &D,
    id: Uuid,
    comment_id: Uuid,
) -> AppResult<AppError> {
    let Some(discussion) = discussions.find_discussion(id).await? else {
        return Ok(AppError::not_found("Discussion", id));
    };
    Ok(classify_write_miss(
        discussion.comment(comment_id),
        "Comment",
        comment_id,
    ))
}

pub async fn update_comment<D: DiscussionStore + ?Sized>(
    discussions: &D,
    principal: &Principal,
    id: Uuid,
    comment_id: Uuid,
    input: CommentUpdate,
) -> AppResult<Discussion> {
    let body = input.validate()?;
    match discussions
        .update_comment(id, comment_id, &body, principal.write_scope())
        .await?
    {
        Some(discussion) => Ok(discussion),
        None => Err(classify_comment_miss(discussions, id, comment_id).await?),
    }
}

/// Deletes a comment and its replies
pub async fn delete_comment<D: DiscussionStore + ?Sized>(
    discussions: &D,
    principal: &Principal,
    id: Uuid,
    comment_id: Uuid,
) -> AppResult<Discussion> {
    match discussions
        .delete_comment(id, comment_id, principal.write_scope())
        .await?
    {
        Some(discussion) => Ok(discussion),
        None => Err(classify_comment_miss(discussions, id, comment_id).await?),
    }
}
