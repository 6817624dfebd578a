use crate::auth::AuthError;
use crate::ingest::IngestError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Ingest(#[from] IngestError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
            ApiError::Ingest(IngestError::RateLimited) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Ingest(IngestError::Decode(_) | IngestError::Validation(_)) => StatusCode::BAD_REQUEST,
            ApiError::Ingest(IngestError::Idempotency(_) | IngestError::PositionUpdate(_) | IngestError::Publish(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), self.to_string()).into_response()
    }
}
