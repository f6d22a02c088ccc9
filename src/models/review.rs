use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::movie::optional_text;
use crate::error::{AppError, AppResult};

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

/// A user's review of a movie; at most one per (user, movie) pair
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: Uuid,
    pub user_id: Uuid,
    pub movie_id: Uuid,
    pub rating: u8,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReview {
    pub rating: i64,
    #[serde(default)]
    pub comment: Option<String>,
}

impl NewReview {
    pub fn into_review(self, user_id: Uuid, movie_id: Uuid) -> AppResult<Review> {
        let now = Utc::now();
        Ok(Review {
            id: Uuid::new_v4(),
            user_id,
            movie_id,
            rating: validate_rating(self.rating)?,
            comment: optional_text("comment", self.comment, 5000)?,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial update of a review
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewUpdate {
    pub rating: Option<i64>,
    pub comment: Option<String>,
}

/// Validated form of [`ReviewUpdate`] handed to the store
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewPatch {
    pub rating: Option<u8>,
    pub comment: Option<Option<String>>,
}

impl ReviewUpdate {
    pub fn validate(self) -> AppResult<ReviewPatch> {
        if self.rating.is_none() && self.comment.is_none() {
            return Err(AppError::InvalidInput(
                "Nothing to update: provide rating or comment".to_string(),
            ));
        }
        let rating = self.rating.map(validate_rating).transpose()?;
        let comment = match self.comment {
            Some(c) => Some(optional_text("comment", Some(c), 5000)?),
            None => None,
        };
        Ok(ReviewPatch { rating, comment })
    }
}

impl ReviewPatch {
    pub fn apply(&self, review: &mut Review) {
        if let Some(rating) = self.rating {
            review.rating = rating;
        }
        if let Some(comment) = &self.comment {
            review.comment = comment.clone();
        }
        review.updated_at = Utc::now();
    }
}

pub fn validate_rating(rating: i64) -> AppResult<u8> {
    if rating < MIN_RATING as i64 || rating > MAX_RATING as i64 {
        return Err(AppError::InvalidInput(format!(
            "Rating must be an integer between {} and {}",
            MIN_RATING, MAX_RATING
        )));
    }
    Ok(rating as u8)
}
