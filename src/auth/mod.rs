use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use crate::state::AppState;

mod dto;
pub mod extractors;
pub mod handlers;
pub mod jwt;
pub mod password;
pub mod reset;

pub fn router(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/users/logout", get(handlers::logout))
        .route("/users/update-password", patch(handlers::update_password))
        .route_layer(middleware::from_fn_with_state(state, extractors::protect));

    Router::new()
        .route("/users/signup", post(handlers::signup))
        .route("/users/login", post(handlers::login))
        .route("/users/forgot-password", post(handlers::forgot_password))
        .route("/users/reset-password/:token", patch(handlers::reset_password))
        .merge(protected)
}
