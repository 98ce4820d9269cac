use std::collections::HashMap;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use tracing::{debug, info, instrument};

use super::state::AppState;
use super::types::{
    ApiError, Credentials, JsonBody, MessageBody, ScoreLookup, ScoreResponse, ScoreUpdate,
    UserRecord,
};

pub async fn healthz() -> &'static str {
    "ok"
}

#[instrument(skip_all)]
pub async fn signup(
    State(state): State<AppState>,
    JsonBody(credentials): JsonBody<Credentials>,
) -> Result<(StatusCode, &'static str), ApiError> {
    // TODO: passwords are stored and compared as plaintext; decide on a hashing scheme before
    // exposing this beyond local development.
    let created = state
        .store
        .create_user(&credentials.email, &credentials.password)
        .await?;
    if !created {
        return Err(ApiError::bad_request("User already exists"));
    }

    info!(email = %credentials.email, "user signed up");
    Ok((StatusCode::CREATED, "User signed up successfully"))
}

#[instrument(skip_all)]
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<UserRecord>>, ApiError> {
    let users = state.store.users().await?;
    let scores: HashMap<String, i64> = state.store.scores().await?;

    let records = users
        .into_iter()
        .map(|(email, password)| {
            let score = scores.get(&email).copied().unwrap_or_default();
            UserRecord {
                email,
                password,
                score,
            }
        })
        .collect();
    Ok(Json(records))
}

#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(credentials): JsonBody<Credentials>,
) -> Result<Json<MessageBody>, ApiError> {
    let Some(stored) = state.store.password(&credentials.email).await? else {
        return Err(ApiError::not_found("User not found"));
    };
    if stored != credentials.password {
        debug!(email = %credentials.email, "password mismatch");
        return Err(ApiError::unauthorized("Incorrect password"));
    }

    Ok(Json(MessageBody::new("Login successful")))
}

#[instrument(skip_all)]
pub async fn update_score(
    State(state): State<AppState>,
    JsonBody(update): JsonBody<ScoreUpdate>,
) -> Result<&'static str, ApiError> {
    if !state.store.user_exists(&update.email).await? {
        return Err(ApiError::not_found("User not found"));
    }

    let total = state
        .store
        .increment_score(&update.email, update.score)
        .await?;
    debug!(email = %update.email, delta = update.score, total, "score updated");
    Ok("User score updated successfully")
}

/// Returns the score of the single user named in the body. Despite the route
/// name this is not a maximum across users.
#[instrument(skip_all)]
pub async fn get_score(
    State(state): State<AppState>,
    JsonBody(lookup): JsonBody<ScoreLookup>,
) -> Result<Json<ScoreResponse>, ApiError> {
    let score = state.store.score(&lookup.email).await?;
    Ok(Json(ScoreResponse { score }))
}
