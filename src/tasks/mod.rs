use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use crate::auth::extractors::{protect, restrict_to, USER_ONLY};
use crate::state::AppState;

mod dto;
pub mod handlers;
pub mod repo;

pub fn router(state: AppState) -> Router<AppState> {
    let writer = Router::new()
        .route("/tasks", post(handlers::create_task))
        .route_layer(middleware::from_fn(restrict_to(USER_ONLY)));

    Router::new()
        .route("/tasks", get(handlers::list_tasks))
        .route(
            "/tasks/:id",
            get(handlers::get_task)
                .patch(handlers::update_task)
                .delete(handlers::delete_task),
        )
        .route("/tasks/:id/mark-complete", patch(handlers::mark_complete))
        .merge(writer)
        .route_layer(middleware::from_fn_with_state(state, protect))
}
