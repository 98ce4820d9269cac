use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use axum::{Json, http::StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Body shared by signup and login. Absent fields decode as empty strings.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ScoreUpdate {
    pub email: String,
    /// Signed amount added to the stored score.
    pub score: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ScoreLookup {
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoreResponse {
    pub score: i64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRecord {
    pub email: String,
    pub password: String,
    pub score: i64,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub detail: Option<anyhow::Error>,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            detail: None,
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: message.into(),
            detail: None,
        }
    }

    pub fn internal(err: anyhow::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "internal server error".to_string(),
            detail: Some(err),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
            detail: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageBody {
    pub message: String,
}

impl MessageBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        if let Some(detail) = &self.detail {
            tracing::error!(error = ?detail, "store operation failed");
        }
        (self.status, Json(MessageBody::new(self.message))).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(value: anyhow::Error) -> Self {
        ApiError::internal(value)
    }
}

/// JSON request body decoded regardless of the `Content-Type` header. Only the
/// first JSON value is read; anything after it is ignored.
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state).await.map_err(|err| {
            tracing::debug!(error = %err.body_text(), "failed to read request body");
            ApiError::bad_request("Invalid request body")
        })?;
        decode_first(&bytes).map(JsonBody)
    }
}

fn decode_first<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ApiError> {
    match serde_json::Deserializer::from_slice(bytes).into_iter::<T>().next() {
        Some(Ok(value)) => Ok(value),
        Some(Err(err)) => {
            tracing::debug!(error = %err, "rejected request body");
            Err(ApiError::bad_request("Invalid request body"))
        }
        None => {
            tracing::debug!("empty request body");
            Err(ApiError::bad_request("Invalid request body"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_data_after_first_value_is_ignored() {
        let lookup: ScoreLookup = decode_first(br#"{"email":"a@example.com"}{}"#).unwrap();
        assert_eq!(lookup.email, "a@example.com");
    }

    #[test]
    fn missing_fields_take_defaults() {
        let update: ScoreUpdate = decode_first(br#"{"email":"a@example.com"}"#).unwrap();
        assert_eq!(update.score, 0);
    }

    #[test]
    fn empty_and_malformed_bodies_are_bad_requests() {
        let bodies: [&[u8]; 4] = [b"", b"   ", b"{not json", br#"{"score":"five"}"#];
        for body in bodies {
            let err = decode_first::<ScoreUpdate>(body).unwrap_err();
            assert_eq!(err.status, StatusCode::BAD_REQUEST);
            assert_eq!(err.message, "Invalid request body");
        }
    }
}
