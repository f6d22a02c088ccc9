pub mod auth;
pub mod authorization;
pub mod discussions;
pub mod lists;
pub mod membership;
pub mod movies;
pub mod ratings;
pub mod recommendations;
pub mod reviews;
pub mod search;
pub mod users;
