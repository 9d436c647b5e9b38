//! Response payloads of the demo API.
//!
//! `/body` and `/files` echo the decoded trees as JSON. A decoded tree
//! serializes as plain JSON: strings for fields, objects for file handles,
//! arrays and objects for nested names.
//!
//! ```json
//! {
//!   "user": { "name": "Tobi", "age": "1" },
//!   "tags": ["ferret", "pet"]
//! }
//! ```

use serde::Serialize;
use std::path::PathBuf;

use crate::form::FileHandle;
use crate::observability::MetricsSnapshot;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
}

/// One line of the upload summary returned by `POST /`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UploadSummary {
    pub field: String,
    pub filename: String,
    pub size: u64,
    pub content_type: Option<String>,
    pub path: PathBuf,
}

impl From<&FileHandle> for UploadSummary {
    fn from(handle: &FileHandle) -> Self {
        Self {
            field: handle.field_name.clone(),
            filename: handle.original_filename.clone(),
            size: handle.size,
            content_type: handle.content_type.clone(),
            path: handle.path.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FormSummary {
    pub fields: usize,
    pub uploads: Vec<UploadSummary>,
    pub total_bytes: u64,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub metrics: MetricsSnapshot,
}
