use axum::http::StatusCode;
use thiserror::Error;

use super::decoder::DecodeError;
use crate::tokenizer::TokenizerError;

/// Terminal failure of one form parse. Always a client fault.
#[derive(Debug, Error)]
pub enum FormError {
    #[error(transparent)]
    Tokenizer(#[from] TokenizerError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl FormError {
    /// 400 unless the tokenizer attached a more specific client error.
    pub fn status(&self) -> StatusCode {
        match self {
            FormError::Tokenizer(err) => err
                .status()
                .filter(StatusCode::is_client_error)
                .unwrap_or(StatusCode::BAD_REQUEST),
            FormError::Decode(_) => StatusCode::BAD_REQUEST,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            FormError::Tokenizer(TokenizerError::Malformed { .. }) => "MALFORMED_MULTIPART",
            FormError::Tokenizer(TokenizerError::LimitExceeded { .. }) => "LIMIT_EXCEEDED",
            FormError::Tokenizer(TokenizerError::Io { .. }) => "UPLOAD_FAILED",
            FormError::Decode(_) => "DECODE_CONFLICT",
        }
    }
}
