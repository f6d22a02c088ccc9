use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

const MAX_ENTRIES: usize = 50;

/// A user's stored taste profile used for recommendation filtering
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TasteProfile {
    /// Genres the user likes
    pub favorite_genres: Vec<String>,
    /// Actor names the user likes
    pub favorite_actors: Vec<String>,
    /// Director names the user likes
    pub favorite_directors: Vec<String>,
    /// Accepted content ratings (empty accepts all)
    pub content_ratings: Vec<String>,
    /// Accepted languages (empty accepts all)
    pub languages: Vec<String>,
}

impl TasteProfile {
    /// True when no favorite genre, actor or director is set
    pub fn has_no_favorites(&self) -> bool {
        self.favorite_genres.is_empty()
            && self.favorite_actors.is_empty()
            && self.favorite_directors.is_empty()
    }

    /// Trims entries, drops blanks and duplicates, and enforces size limits
    pub fn normalized(self) -> AppResult<Self> {
        Ok(Self {
            favorite_genres: normalize_entries("favoriteGenres", self.favorite_genres, true)?,
            favorite_actors: normalize_entries("favoriteActors", self.favorite_actors, false)?,
            favorite_directors: normalize_entries(
                "favoriteDirectors",
                self.favorite_directors,
                false,
            )?,
            content_ratings: normalize_entries("contentRatings", self.content_ratings, false)?,
            languages: normalize_entries("languages", self.languages, true)?,
        })
    }
}

/// Genres and languages are matched case-insensitively, so they are stored lowercased
fn normalize_entries(field: &str, entries: Vec<String>, lowercase: bool) -> AppResult<Vec<String>> {
    let mut out: Vec<String> = Vec::with_capacity(entries.len());
    for entry in entries {
        let trimmed = entry.trim();
        if trimmed.is_empty() {
            continue;
        }
        let value = if lowercase {
            trimmed.to_lowercase()
        } else {
            trimmed.to_string()
        };
        if !out.contains(&value) {
            out.push(value);
        }
    }

    if out.len() > MAX_ENTRIES {
        return Err(AppError::InvalidInput(format!(
            "{} may contain at most {} entries",
            field, MAX_ENTRIES
        )));
    }

    Ok(out)
}
