pub mod extract;
pub mod pagination;
pub mod routes;
pub mod state;

pub use pagination::{Page, Pagination};
pub use routes::create_router;
pub use state::AppState;
