use chrono::{DateTime, NaiveDate, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// An award won or nominated for by a cast or crew member
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Award {
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub won: bool,
}

/// A credit in a person's filmography
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FilmCredit {
    pub title: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CastMember {
    pub id: Uuid,
    pub name: String,
    pub character: Option<String>,
    pub biography: Option<String>,
    pub awards: Vec<Award>,
    pub filmography: Vec<FilmCredit>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CrewMember {
    pub id: Uuid,
    pub name: String,
    pub job: String,
    pub department: Option<String>,
    pub biography: Option<String>,
    pub awards: Vec<Award>,
    pub filmography: Vec<FilmCredit>,
}

impl CrewMember {
    pub fn is_director(&self) -> bool {
        self.job.eq_ignore_ascii_case("director")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Trivia {
    pub id: Uuid,
    pub text: String,
    pub is_spoiler: bool,
    pub contributor_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Goof {
    pub id: Uuid,
    pub text: String,
    pub category: Option<String>,
    pub contributor_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SoundtrackEntry {
    pub id: Uuid,
    pub title: String,
    pub performer: Option<String>,
    pub composer: Option<String>,
    pub contributor_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Financials {
    pub budget: Option<i64>,
    pub box_office_domestic: Option<i64>,
    pub box_office_worldwide: Option<i64>,
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Technical {
    pub aspect_ratio: Option<String>,
    pub sound_mix: Vec<String>,
    pub color: Option<String>,
    pub camera: Option<String>,
    pub filming_locations: Vec<String>,
}

/// Movie aggregate. Embedded collections are only reachable through the movie.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    pub id: Uuid,
    pub title: String,
    pub genres: Vec<String>,
    pub cast: Vec<CastMember>,
    pub crew: Vec<CrewMember>,
    pub release_date: Option<NaiveDate>,
    pub runtime_minutes: Option<i32>,
    pub synopsis: Option<String>,
    pub content_rating: Option<String>,
    pub language: Option<String>,
    pub average_rating: f64,
    pub total_ratings: i64,
    pub financials: Financials,
    pub technical: Technical,
    pub trivia: Vec<Trivia>,
    pub goofs: Vec<Goof>,
    pub soundtrack: Vec<SoundtrackEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Movie {
    pub fn has_actor(&self, names: &[String]) -> bool {
        self.cast.iter().any(|c| names.iter().any(|n| n == &c.name))
    }

    pub fn has_director(&self, names: &[String]) -> bool {
        self.crew
            .iter()
            .any(|c| c.is_director() && names.iter().any(|n| n == &c.name))
    }

    pub fn shares_genre(&self, genres: &[String]) -> bool {
        self.genres.iter().any(|g| genres.contains(g))
    }

    /// Whether `person_id` names a cast or crew entry of this movie
    pub fn has_person(&self, person_id: Uuid) -> bool {
        self.cast.iter().any(|c| c.id == person_id) || self.crew.iter().any(|c| c.id == person_id)
    }
}

/// Payload for creating a movie
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMovie {
    pub title: String,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub cast: Vec<CastMemberInput>,
    #[serde(default)]
    pub crew: Vec<CrewMemberInput>,
    #[serde(default)]
    pub release_date: Option<NaiveDate>,
    #[serde(default)]
    pub runtime_minutes: Option<i32>,
    #[serde(default)]
    pub synopsis: Option<String>,
    #[serde(default)]
    pub content_rating: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub financials: Financials,
    #[serde(default)]
    pub technical: Technical,
}

impl NewMovie {
    /// Validates the payload and builds a movie with an empty rating aggregate
    pub fn into_movie(self) -> AppResult<Movie> {
        let now = Utc::now();
        let cast = self
            .cast
            .into_iter()
            .map(CastMember::build)
            .collect::<AppResult<Vec<_>>>()?;
        let crew = self
            .crew
            .into_iter()
            .map(CrewMember::build)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Movie {
            id: Uuid::new_v4(),
            title: required_text("title", &self.title, 300)?,
            genres: normalize_genres(self.genres),
            cast,
            crew,
            release_date: self.release_date,
            runtime_minutes: validate_runtime(self.runtime_minutes)?,
            synopsis: optional_text("synopsis", self.synopsis, 5000)?,
            content_rating: optional_text("contentRating", self.content_rating, 20)?,
            language: optional_text("language", self.language, 40)?.map(|l| l.to_lowercase()),
            average_rating: 0.0,
            total_ratings: 0,
            financials: self.financials,
            technical: self.technical,
            trivia: Vec::new(),
            goofs: Vec::new(),
            soundtrack: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial update of a movie's own fields. Derived rating fields are not patchable.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieUpdate {
    pub title: Option<String>,
    pub genres: Option<Vec<String>>,
    pub release_date: Option<NaiveDate>,
    pub runtime_minutes: Option<i32>,
    pub synopsis: Option<String>,
    pub content_rating: Option<String>,
    pub language: Option<String>,
    pub financials: Option<Financials>,
    pub technical: Option<Technical>,
}

impl MovieUpdate {
    pub fn apply(self, movie: &mut Movie) -> AppResult<()> {
        if let Some(title) = self.title {
            movie.title = required_text("title", &title, 300)?;
        }
        if let Some(genres) = self.genres {
            movie.genres = normalize_genres(genres);
        }
        if self.release_date.is_some() {
            movie.release_date = self.release_date;
        }
        if self.runtime_minutes.is_some() {
            movie.runtime_minutes = validate_runtime(self.runtime_minutes)?;
        }
        if self.synopsis.is_some() {
            movie.synopsis = optional_text("synopsis", self.synopsis, 5000)?;
        }
        if self.content_rating.is_some() {
            movie.content_rating = optional_text("contentRating", self.content_rating, 20)?;
        }
        if self.language.is_some() {
            movie.language =
                optional_text("language", self.language, 40)?.map(|l| l.to_lowercase());
        }
        if let Some(financials) = self.financials {
            movie.financials = financials;
        }
        if let Some(technical) = self.technical {
            movie.technical = technical;
        }
        movie.updated_at = Utc::now();
        Ok(())
    }
}

// ============================================================================
// Embedded child collections
// ============================================================================

/// An embedded movie sub-document addressed by its own id
pub trait MovieChild: Clone + Serialize + Send + Sync + Sized + 'static {
    type Input: DeserializeOwned + Send + 'static;

    /// Singular name used in messages
    const KIND: &'static str;

    /// Only admins may create, edit or delete entries of this kind
    const ADMIN_ONLY: bool;

    fn id(&self) -> Uuid;

    /// The user who contributed the entry, if entries of this kind are owned
    fn contributor(&self) -> Option<Uuid>;

    fn create(input: Self::Input, contributor: Uuid) -> AppResult<Self>;

    /// Replaces the editable content, keeping id, contributor and timestamp
    fn replace(&mut self, input: Self::Input) -> AppResult<()>;

    fn collection(movie: &Movie) -> &Vec<Self>;

    fn collection_mut(movie: &mut Movie) -> &mut Vec<Self>;
}

pub fn find_child<T: MovieChild>(movie: &Movie, child_id: Uuid) -> Option<&T> {
    T::collection(movie).iter().find(|c| c.id() == child_id)
}

pub fn find_child_mut<T: MovieChild>(movie: &mut Movie, child_id: Uuid) -> Option<&mut T> {
    T::collection_mut(movie).iter_mut().find(|c| c.id() == child_id)
}

pub fn remove_child<T: MovieChild>(movie: &mut Movie, child_id: Uuid) -> Option<T> {
    let items = T::collection_mut(movie);
    let index = items.iter().position(|c| c.id() == child_id)?;
    Some(items.remove(index))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastMemberInput {
    pub name: String,
    #[serde(default)]
    pub character: Option<String>,
    #[serde(default)]
    pub biography: Option<String>,
    #[serde(default)]
    pub awards: Vec<Award>,
    #[serde(default)]
    pub filmography: Vec<FilmCredit>,
}

impl CastMember {
    fn build(input: CastMemberInput) -> AppResult<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            name: required_text("name", &input.name, 200)?,
            character: optional_text("character", input.character, 200)?,
            biography: optional_text("biography", input.biography, 5000)?,
            awards: input.awards,
            filmography: input.filmography,
        })
    }
}

impl MovieChild for CastMember {
    type Input = CastMemberInput;
    const KIND: &'static str = "Cast member";
    const ADMIN_ONLY: bool = true;

    fn id(&self) -> Uuid {
        self.id
    }

    fn contributor(&self) -> Option<Uuid> {
        None
    }

    fn create(input: Self::Input, _contributor: Uuid) -> AppResult<Self> {
        Self::build(input)
    }

    fn replace(&mut self, input: Self::Input) -> AppResult<()> {
        let built = Self::build(input)?;
        *self = Self { id: self.id, ..built };
        Ok(())
    }

    fn collection(movie: &Movie) -> &Vec<Self> {
        &movie.cast
    }

    fn collection_mut(movie: &mut Movie) -> &mut Vec<Self> {
        &mut movie.cast
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrewMemberInput {
    pub name: String,
    pub job: String,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub biography: Option<String>,
    #[serde(default)]
    pub awards: Vec<Award>,
    #[serde(default)]
    pub filmography: Vec<FilmCredit>,
}

impl CrewMember {
    fn build(input: CrewMemberInput) -> AppResult<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            name: required_text("name", &input.name, 200)?,
            job: required_text("job", &input.job, 100)?,
            department: optional_text("department", input.department, 100)?,
            biography: optional_text("biography", input.biography, 5000)?,
            awards: input.awards,
            filmography: input.filmography,
        })
    }
}

impl MovieChild for CrewMember {
    type Input = CrewMemberInput;
    const KIND: &'static str = "Crew member";
    const ADMIN_ONLY: bool = true;

    fn id(&self) -> Uuid {
        self.id
    }

    fn contributor(&self) -> Option<Uuid> {
        None
    }

    fn create(input: Self::Input, _contributor: Uuid) -> AppResult<Self> {
        Self::build(input)
    }

    fn replace(&mut self, input: Self::Input) -> AppResult<()> {
        let built = Self::build(input)?;
        *self = Self { id: self.id, ..built };
        Ok(())
    }

    fn collection(movie: &Movie) -> &Vec<Self> {
        &movie.crew
    }

    fn collection_mut(movie: &mut Movie) -> &mut Vec<Self> {
        &mut movie.crew
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriviaInput {
    pub text: String,
    #[serde(default)]
    pub is_spoiler: bool,
}

impl MovieChild for Trivia {
    type Input = TriviaInput;
    const KIND: &'static str = "Trivia";
    const ADMIN_ONLY: bool = false;

    fn id(&self) -> Uuid {
        self.id
    }

    fn contributor(&self) -> Option<Uuid> {
        Some(self.contributor_id)
    }

    fn create(input: Self::Input, contributor: Uuid) -> AppResult<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            text: required_text("text", &input.text, 2000)?,
            is_spoiler: input.is_spoiler,
            contributor_id: contributor,
            created_at: Utc::now(),
        })
    }

    fn replace(&mut self, input: Self::Input) -> AppResult<()> {
        self.text = required_text("text", &input.text, 2000)?;
        self.is_spoiler = input.is_spoiler;
        Ok(())
    }

    fn collection(movie: &Movie) -> &Vec<Self> {
        &movie.trivia
    }

    fn collection_mut(movie: &mut Movie) -> &mut Vec<Self> {
        &mut movie.trivia
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoofInput {
    pub text: String,
    #[serde(default)]
    pub category: Option<String>,
}

impl MovieChild for Goof {
    type Input = GoofInput;
    const KIND: &'static str = "Goof";
    const ADMIN_ONLY: bool = false;

    fn id(&self) -> Uuid {
        self.id
    }

    fn contributor(&self) -> Option<Uuid> {
        Some(self.contributor_id)
    }

    fn create(input: Self::Input, contributor: Uuid) -> AppResult<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            text: required_text("text", &input.text, 2000)?,
            category: optional_text("category", input.category, 100)?,
            contributor_id: contributor,
            created_at: Utc::now(),
        })
    }

    fn replace(&mut self, input: Self::Input) -> AppResult<()> {
        self.text = required_text("text", &input.text, 2000)?;
        self.category = optional_text("category", input.category, 100)?;
        Ok(())
    }

    fn collection(movie: &Movie) -> &Vec<Self> {
        &movie.goofs
    }

    fn collection_mut(movie: &mut Movie) -> &mut Vec<Self> {
        &mut movie.goofs
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoundtrackInput {
    pub title: String,
    #[serde(default)]
    pub performer: Option<String>,
    #[serde(default)]
    pub composer: Option<String>,
}

impl MovieChild for SoundtrackEntry {
    type Input = SoundtrackInput;
    const KIND: &'static str = "Soundtrack entry";
    const ADMIN_ONLY: bool = false;

    fn id(&self) -> Uuid {
        self.id
    }

    fn contributor(&self) -> Option<Uuid> {
        Some(self.contributor_id)
    }

    fn create(input: Self::Input, contributor: Uuid) -> AppResult<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            title: required_text("title", &input.title, 300)?,
            performer: optional_text("performer", input.performer, 200)?,
            composer: optional_text("composer", input.composer, 200)?,
            contributor_id: contributor,
            created_at: Utc::now(),
        })
    }

    fn replace(&mut self, input: Self::Input) -> AppResult<()> {
        self.title = required_text("title", &input.title, 300)?;
        self.performer = optional_text("performer", input.performer, 200)?;
        self.composer = optional_text("composer", input.composer, 200)?;
        Ok(())
    }

    fn collection(movie: &Movie) -> &Vec<Self> {
        &movie.soundtrack
    }

    fn collection_mut(movie: &mut Movie) -> &mut Vec<Self> {
        &mut movie.soundtrack
    }
}

// ============================================================================
// Field validation helpers
// ============================================================================

pub(crate) fn required_text(field: &str, value: &str, max_chars: usize) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidInput(format!("{} must not be empty", field)));
    }
    if trimmed.chars().count() > max_chars {
        return Err(AppError::InvalidInput(format!(
            "{} must be at most {} characters",
            field, max_chars
        )));
    }
    Ok(trimmed.to_string())
}

/// Blank strings collapse to `None`
pub(crate) fn optional_text(
    field: &str,
    value: Option<String>,
    max_chars: usize,
) -> AppResult<Option<String>> {
    match value {
        Some(v) if !v.trim().is_empty() => required_text(field, &v, max_chars).map(Some),
        _ => Ok(None),
    }
}

fn validate_runtime(runtime: Option<i32>) -> AppResult<Option<i32>> {
    match runtime {
        Some(minutes) if minutes <= 0 => Err(AppError::InvalidInput(
            "runtimeMinutes must be positive".to_string(),
        )),
        other => Ok(other),
    }
}

fn normalize_genres(genres: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(genres.len());
    for genre in genres {
        let genre = genre.trim().to_lowercase();
        if !genre.is_empty() && !out.contains(&genre) {
            out.push(genre);
        }
    }
    out
}
