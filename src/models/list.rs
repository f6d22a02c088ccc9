use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::movie::{optional_text, required_text};
use crate::error::{AppError, AppResult};

/// A creator-owned, named collection of movies
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MovieList {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub is_public: bool,
    pub movies: Vec<Uuid>,
    pub followers: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewList {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_public")]
    pub is_public: bool,
}

fn default_public() -> bool {
    true
}

impl NewList {
    pub fn into_list(self, creator_id: Uuid) -> AppResult<MovieList> {
        let now = Utc::now();
        Ok(MovieList {
            id: Uuid::new_v4(),
            creator_id,
            name: required_text("name", &self.name, 100)?,
            description: optional_text("description", self.description, 1000)?,
            is_public: self.is_public,
            movies: Vec::new(),
            followers: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_public: Option<bool>,
}

/// Validated form of [`ListUpdate`]
#[derive(Debug, Clone, PartialEq)]
pub struct ListPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub is_public: Option<bool>,
}

impl ListUpdate {
    pub fn validate(self) -> AppResult<ListPatch> {
        if self.name.is_none() && self.description.is_none() && self.is_public.is_none() {
            return Err(AppError::InvalidInput("Nothing to update".to_string()));
        }
        let name = self
            .name
            .map(|n| required_text("name", &n, 100))
            .transpose()?;
        let description = match self.description {
            Some(d) => Some(optional_text("description", Some(d), 1000)?),
            None => None,
        };
        Ok(ListPatch {
            name,
            description,
            is_public: self.is_public,
        })
    }
}

impl ListPatch {
    pub fn apply(&self, list: &mut MovieList) {
        if let Some(name) = &self.name {
            list.name = name.clone();
        }
        if let Some(description) = &self.description {
            list.description = description.clone();
        }
        if let Some(is_public) = self.is_public {
            list.is_public = is_public;
        }
        list.updated_at = Utc::now();
    }
}
