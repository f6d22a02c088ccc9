pub mod discussion;
pub mod list;
pub mod movie;
pub mod review;
pub mod user;
pub mod user_preferences;

pub use discussion::{
    Comment, CommentUpdate, Discussion, DiscussionPatch, DiscussionSubject, DiscussionUpdate,
    NewComment, NewDiscussion,
};
pub use list::{ListPatch, ListUpdate, MovieList, NewList};
pub use movie::{
    Award, CastMember, CastMemberInput, CrewMember, CrewMemberInput, FilmCredit, Financials,
    Goof, GoofInput, Movie, MovieChild, MovieUpdate, NewMovie, SoundtrackEntry, SoundtrackInput,
    Technical, Trivia, TriviaInput,
};
pub use review::{NewReview, Review, ReviewPatch, ReviewUpdate};
pub use user::{ProfileUpdate, PublicProfile, Role, User, UserMovieSet};
pub use user_preferences::TasteProfile;
