use axum::{Json, http::StatusCode, response::IntoResponse};
use thiserror::Error;

use super::models::ErrorResponse;
use crate::form::FormError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// A multipart body that could not be turned into form trees.
    #[error("{0}")]
    Form(#[from] FormError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Form(err) => err.status(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Form(err) => err.code(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let body = ErrorResponse {
            code: self.code(),
            message: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
