pub mod dto;
pub mod handlers;
pub mod repo;
pub mod services;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(handlers::list_users))
        .route("/api/users/register", post(handlers::register))
        .route("/api/users/login", post(handlers::login))
        .route(
            "/api/users/profile",
            get(handlers::get_profile).put(handlers::update_profile),
        )
        .route("/api/users/roommates", get(handlers::find_roommates))
}
