use axum::{
    middleware,
    routing::{delete, get, patch},
    Router,
};

use crate::auth::extractors::{protect, restrict_to, ADMIN_ONLY};
use crate::state::AppState;

pub mod dto;
pub mod handlers;
pub mod repo;

pub fn router(state: AppState) -> Router<AppState> {
    let admin = Router::new()
        .route("/users", get(handlers::list_users))
        .route("/users/:id", delete(handlers::delete_user))
        .route_layer(middleware::from_fn(restrict_to(ADMIN_ONLY)));

    Router::new()
        .route("/users/get-me", get(handlers::get_me))
        .route("/users/update-me", patch(handlers::update_me))
        .route("/users/delete-me", patch(handlers::delete_me))
        .route("/users/:id", get(handlers::get_user))
        .merge(admin)
        .route_layer(middleware::from_fn_with_state(state, protect))
}
