use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::movie::required_text;
use crate::error::{AppError, AppResult};

/// What a discussion thread is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "id")]
pub enum DiscussionSubject {
    Movie(Uuid),
    /// A cast or crew entry id
    Person(Uuid),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    pub author_id: Uuid,
    pub body: String,
    /// Replies point at a top-level comment
    pub parent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Discussion {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub body: String,
    pub subject: DiscussionSubject,
    pub comments: Vec<Comment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Discussion {
    pub fn comment(&self, comment_id: Uuid) -> Option<&Comment> {
        self.comments.iter().find(|c| c.id == comment_id)
    }

    /// Removes a comment together with its replies
    pub fn remove_comment_thread(&mut self, comment_id: Uuid) -> bool {
        let before = self.comments.len();
        self.comments
            .retain(|c| c.id != comment_id && c.parent_id != Some(comment_id));
        self.comments.len() != before
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDiscussion {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub movie_id: Option<Uuid>,
    #[serde(default)]
    pub person_id: Option<Uuid>,
}

impl NewDiscussion {
    pub fn subject(&self) -> AppResult<DiscussionSubject> {
        match (self.movie_id, self.person_id) {
            (Some(movie_id), None) => Ok(DiscussionSubject::Movie(movie_id)),
            (None, Some(person_id)) => Ok(DiscussionSubject::Person(person_id)),
            _ => Err(AppError::InvalidInput(
                "Exactly one of movieId or personId is required".to_string(),
            )),
        }
    }

    pub fn into_discussion(self, author_id: Uuid) -> AppResult<Discussion> {
        let subject = self.subject()?;
        let now = Utc::now();
        Ok(Discussion {
            id: Uuid::new_v4(),
            author_id,
            title: required_text("title", &self.title, 200)?,
            body: required_text("body", &self.body, 10_000)?,
            subject,
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscussionUpdate {
    pub title: Option<String>,
    pub body: Option<String>,
}

/// Validated form of [`DiscussionUpdate`]
#[derive(Debug, Clone, PartialEq)]
pub struct DiscussionPatch {
    pub title: Option<String>,
    pub body: Option<String>,
}

impl DiscussionUpdate {
    pub fn validate(self) -> AppResult<DiscussionPatch> {
        if self.title.is_none() && self.body.is_none() {
            return Err(AppError::InvalidInput("Nothing to update".to_string()));
        }
        Ok(DiscussionPatch {
            title: self
                .title
                .map(|t| required_text("title", &t, 200))
                .transpose()?,
            body: self
                .body
                .map(|b| required_text("body", &b, 10_000))
                .transpose()?,
        })
    }
}

impl DiscussionPatch {
    pub fn apply(&self, discussion: &mut Discussion) {
        if let Some(title) = &self.title {
            discussion.title = title.clone();
        }
        if let Some(body) = &self.body {
            discussion.body = body.clone();
        }
        discussion.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub body: String,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
}

impl NewComment {
    pub fn into_comment(self, author_id: Uuid) -> AppResult<Comment> {
        let now = Utc::now();
        Ok(Comment {
            id: Uuid::new_v4(),
            author_id,
            body: required_text("body", &self.body, 5000)?,
            parent_id: self.parent_id,
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentUpdate {
    pub body: String,
}

impl CommentUpdate {
    pub fn validate(self) -> AppResult<String> {
        required_text("body", &self.body, 5000)
    }
}
