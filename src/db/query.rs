use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{DiscussionSubject, Movie},
};

/// Window into a sorted result set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub skip: u64,
    pub limit: u64,
}

impl Window {
    pub fn first(limit: u64) -> Self {
        Self { skip: 0, limit }
    }

    /// `(LIMIT, OFFSET)` as SQL bigints
    pub fn sql_bounds(&self) -> AppResult<(i64, i64)> {
        let out_of_range = |_| AppError::InvalidInput("Page is out of range".to_string());
        Ok((
            i64::try_from(self.limit).map_err(out_of_range)?,
            i64::try_from(self.skip).map_err(out_of_range)?,
        ))
    }
}

/// Filter over the movie catalog.
///
/// The taste group (`any_genre`, `any_actor`, `any_director`) is OR-combined and only
/// applied when at least one of its lists is non-empty. Every other field is an AND
/// restriction, skipped when empty/unset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MovieFilter {
    pub any_genre: Vec<String>,
    pub any_actor: Vec<String>,
    pub any_director: Vec<String>,
    pub content_ratings: Vec<String>,
    pub languages: Vec<String>,
    pub exclude_ids: Vec<Uuid>,
    pub release_year: Option<i32>,
    /// Case-insensitive substring of the title or of a cast/crew name
    pub text: Option<String>,
    pub min_total_ratings: Option<i64>,
}

impl MovieFilter {
    pub fn has_taste_group(&self) -> bool {
        !self.any_genre.is_empty() || !self.any_actor.is_empty() || !self.any_director.is_empty()
    }

    pub fn matches(&self, movie: &Movie) -> bool {
        if self.has_taste_group() {
            let taste = movie.shares_genre(&self.any_genre)
                || movie.has_actor(&self.any_actor)
                || movie.has_director(&self.any_director);
            if !taste {
                return false;
            }
        }

        if !self.content_ratings.is_empty() {
            match &movie.content_rating {
                Some(rating) if self.content_ratings.contains(rating) => {}
                _ => return false,
            }
        }

        if !self.languages.is_empty() {
            match &movie.language {
                Some(language) if self.languages.contains(language) => {}
                _ => return false,
            }
        }

        if self.exclude_ids.contains(&movie.id) {
            return false;
        }

        if let Some(year) = self.release_year {
            use chrono::Datelike;
            if movie.release_date.map(|d| d.year()) != Some(year) {
                return false;
            }
        }

        if let Some(text) = &self.text {
            let needle = text.to_lowercase();
            let hit = movie.title.to_lowercase().contains(&needle)
                || movie.cast.iter().any(|c| c.name.to_lowercase().contains(&needle))
                || movie.crew.iter().any(|c| c.name.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }

        if let Some(min) = self.min_total_ratings {
            if movie.total_ratings < min {
                return false;
            }
        }

        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovieSortField {
    Title,
    ReleaseDate,
    AverageRating,
    TotalRatings,
    CreatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovieSort {
    pub field: MovieSortField,
    pub descending: bool,
}

impl MovieSort {
    /// Highest rated first, ties broken by rating count
    pub fn best_rated() -> Self {
        Self {
            field: MovieSortField::AverageRating,
            descending: true,
        }
    }
}

impl Default for MovieSort {
    fn default() -> Self {
        Self {
            field: MovieSortField::Title,
            descending: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MovieQuery {
    pub filter: MovieFilter,
    pub sort: MovieSort,
    pub window: Window,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReviewSort {
    #[default]
    Newest,
    Oldest,
    Highest,
    Lowest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewScope {
    Movie(Uuid),
    User(Uuid),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewQuery {
    pub scope: ReviewScope,
    pub sort: ReviewSort,
    pub window: Window,
}

/// Which lists a listing may return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListQuery {
    pub creator_id: Option<Uuid>,
    /// When false, private lists are included too
    pub public_only: bool,
    pub window: Window,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscussionQuery {
    pub subject: Option<DiscussionSubject>,
    pub window: Window,
}
