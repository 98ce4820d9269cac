use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderValue, Method, header};
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::store::UserStore;

use super::handlers::{get_score, healthz, list_users, login, signup, update_score};

#[derive(Clone)]
pub struct AppState {
    pub(crate) store: Arc<dyn UserStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }
}

pub fn router(state: AppState, cors_origin: HeaderValue) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(cors_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/healthz", get(healthz))
        .route("/users", get(list_users))
        .route("/users/signup", post(signup))
        .route("/users/login", post(login))
        .route("/users/score", post(update_score))
        .route("/users/highest", get(get_score))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
