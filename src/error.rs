use crate::model::InputError;
use crate::store::StoreError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

impl From<InputError> for AppError {
    fn from(err: InputError) -> Self {
        Self::bad_request(err.to_string())
    }
}

// Store failures are logged once, where the engine observes them.
impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        let message = match err {
            StoreError::Timeout(_) => "Storage timed out",
            StoreError::Unavailable(_) => "Storage unavailable",
        };
        Self::unavailable(message)
    }
}

pub type AppResult<T> = Result<T, AppError>;
