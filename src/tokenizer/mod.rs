//! Multipart tokenizer boundary.
//!
//! The form core never touches raw multipart bytes. It consumes
//! [`PartEvent`]s from a [`PartSource`]; [`MulterSource`] is the production
//! source, backed by `multer` and writing uploads to disk.
//!
//! ## Key Components
//!
//! - [`PartEvent`] - field, file, error and close notifications
//! - [`PartSource`] - pull-based event stream consumed by the completion driver
//! - [`InboundBody`] - request body shared between the parser and the drain step
//! - [`MulterSource`] - `multer` driven source enforcing [`UploadLimits`]

mod inbound;
mod source;

use async_trait::async_trait;
use axum::http::StatusCode;
use std::fmt;
use thiserror::Error;

use crate::form::FileHandle;

pub use inbound::InboundBody;
pub use source::{MulterSource, UploadLimits};

/// One notification from the tokenizer.
#[derive(Debug)]
pub enum PartEvent {
    Field { name: String, value: String },
    File { name: String, handle: FileHandle },
    Error(TokenizerError),
    Close,
}

/// Pull-based stream of part events.
///
/// A source ends with exactly one `Error` or `Close` and yields `None`
/// afterwards.
#[async_trait]
pub trait PartSource: Send {
    async fn next_event(&mut self) -> Option<PartEvent>;
}

/// Limit that a request ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    FileSize,
    FilesSize,
    FieldsSize,
    FieldCount,
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Limit::FileSize => f.write_str("max_file_size"),
            Limit::FilesSize => f.write_str("max_files_size"),
            Limit::FieldsSize => f.write_str("max_fields_size"),
            Limit::FieldCount => f.write_str("max_fields"),
        }
    }
}

#[derive(Debug, Error)]
pub enum TokenizerError {
    #[error("malformed multipart body: {message}")]
    Malformed {
        message: String,
        /// Status suggested by the layer that failed, if any.
        status: Option<StatusCode>,
    },

    #[error("{limit} exceeded (limit {max})")]
    LimitExceeded { limit: Limit, max: u64 },

    #[error("failed to store upload '{filename}': {source}")]
    Io {
        filename: String,
        #[source]
        source: std::io::Error,
    },
}

impl TokenizerError {
    pub fn malformed(message: impl Into<String>) -> Self {
        TokenizerError::Malformed {
            message: message.into(),
            status: None,
        }
    }

    /// Status the tokenizer attached to this error, if it chose one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            TokenizerError::Malformed { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<multer::Error> for TokenizerError {
    fn from(err: multer::Error) -> Self {
        let status = hit_body_limit(&err).then_some(StatusCode::PAYLOAD_TOO_LARGE);
        TokenizerError::Malformed {
            message: err.to_string(),
            status,
        }
    }
}

/// Detects an upstream `DefaultBodyLimit`/`RequestBodyLimit` rejection
/// surfacing through the body stream.
fn hit_body_limit(err: &multer::Error) -> bool {
    let mut current: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = current {
        if e.is::<http_body_util::LengthLimitError>() {
            return true;
        }
        current = e.source();
    }

    err.to_string().contains("length limit exceeded")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_error_message_names_the_option() {
        let err = TokenizerError::LimitExceeded {
            limit: Limit::FilesSize,
            max: 512,
        };
        assert_eq!(err.to_string(), "max_files_size exceeded (limit 512)");
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_multer_errors_are_malformed() {
        let err = TokenizerError::from(multer::Error::IncompleteStream);
        assert!(matches!(err, TokenizerError::Malformed { status: None, .. }));
    }
}
