use axum::{
    middleware::from_fn,
    routing::{get, patch, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::AppState;
use crate::{
    middleware::{make_span_with_request_id, request_id_middleware},
    models::{CastMember, CrewMember, Goof, MovieChild, SoundtrackEntry, Trivia},
    routes::{
        auth, discussions, health_check, lists, movies, recommendations, reviews, search, users,
    },
};

/// Creates the application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        // Accounts
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/users/me", get(users::me).patch(users::update_me))
        .route("/users/me/preferences", put(users::set_preferences))
        .route("/users/me/wishlist", get(users::wishlist))
        .route(
            "/users/me/wishlist/:movie_id",
            post(users::add_to_wishlist).delete(users::remove_from_wishlist),
        )
        .route(
            "/users/me/watched/:movie_id",
            post(users::add_to_watched).delete(users::remove_from_watched),
        )
        .route("/users/:id", get(users::profile))
        .route("/users/:id/reviews", get(users::user_reviews))
        .route("/users/:id/lists", get(users::user_lists))
        .route("/admin/users", get(users::list_users))
        .route("/admin/users/:id/role", put(users::set_role))
        // Catalog
        .route("/movies", get(movies::list).post(movies::create))
        .route("/movies/top-rated", get(movies::top_rated))
        .route(
            "/movies/:id",
            get(movies::get).patch(movies::update).delete(movies::delete),
        )
        .route("/movies/:id/similar", get(movies::similar))
        .route(
            "/movies/:id/reviews",
            get(movies::list_reviews).post(movies::create_review),
        )
        .merge(movie_children::<CastMember>("cast"))
        .merge(movie_children::<CrewMember>("crew"))
        .merge(movie_children::<Trivia>("trivia"))
        .merge(movie_children::<Goof>("goofs"))
        .merge(movie_children::<SoundtrackEntry>("soundtrack"))
        .route(
            "/reviews/:id",
            get(reviews::get).patch(reviews::update).delete(reviews::delete),
        )
        // Lists
        .route("/lists", get(lists::public).post(lists::create))
        .route(
            "/lists/:id",
            get(lists::get).patch(lists::update).delete(lists::delete),
        )
        .route(
            "/lists/:id/movies/:movie_id",
            post(lists::add_movie).delete(lists::remove_movie),
        )
        .route("/lists/:id/follow", post(lists::toggle_follow))
        // Discussions
        .route("/discussions", get(discussions::list).post(discussions::create))
        .route(
            "/discussions/:id",
            get(discussions::get)
                .patch(discussions::update)
                .delete(discussions::delete),
        )
        .route("/discussions/:id/comments", post(discussions::add_comment))
        .route(
            "/discussions/:id/comments/:comment_id",
            patch(discussions::update_comment).delete(discussions::delete_comment),
        )
        // Discovery
        .route("/recommendations", get(recommendations::for_me))
        .route("/search", get(search::movies))
}

/// Keyed routes for one embedded child collection of a movie
fn movie_children<T: MovieChild>(segment: &str) -> Router<AppState> {
    Router::new()
        .route(
            &format!("/movies/:id/{}", segment),
            post(movies::add_child::<T>),
        )
        .route(
            &format!("/movies/:id/{}/:child_id", segment),
            get(movies::get_child::<T>)
                .put(movies::update_child::<T>)
                .delete(movies::delete_child::<T>),
        )
}
