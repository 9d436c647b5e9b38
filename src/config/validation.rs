use super::models::{Config, UploadConfig};
use crate::cleanup::DeletePolicy;
use crate::humanize::ByteSize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("upload.{field} must be greater than zero")]
    ZeroLimit { field: &'static str },

    #[error("upload.max_file_size ({file}) exceeds upload.max_files_size ({total})")]
    FileLimitAboveTotal { file: ByteSize, total: ByteSize },

    #[error("upload.delete_on_finish contains an empty field name")]
    EmptyDeleteName,

    #[error("upload.upload_dir '{0}' exists but is not a directory")]
    UploadDirNotDirectory(String),
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_limits(&config.upload)?;
    validate_delete_policy(&config.upload.delete_on_finish)?;
    validate_upload_dir(&config.upload)?;
    Ok(())
}

fn validate_limits(upload: &UploadConfig) -> Result<(), ValidationError> {
    let sizes = [
        ("max_file_size", upload.max_file_size),
        ("max_files_size", upload.max_files_size),
        ("max_fields_size", upload.max_fields_size),
    ];

    if let Some(&(field, _)) = sizes.iter().find(|(_, size)| size.is_zero()) {
        return Err(ValidationError::ZeroLimit { field });
    }

    if upload.max_fields == 0 {
        return Err(ValidationError::ZeroLimit {
            field: "max_fields",
        });
    }

    if upload.max_file_size > upload.max_files_size {
        return Err(ValidationError::FileLimitAboveTotal {
            file: upload.max_file_size,
            total: upload.max_files_size,
        });
    }

    Ok(())
}

fn validate_delete_policy(policy: &DeletePolicy) -> Result<(), ValidationError> {
    match policy {
        DeletePolicy::Named(names) if names.iter().any(|name| name.trim().is_empty()) => {
            Err(ValidationError::EmptyDeleteName)
        }
        _ => Ok(()),
    }
}

/// A missing directory is fine, the server creates it on startup.
fn validate_upload_dir(upload: &UploadConfig) -> Result<(), ValidationError> {
    match &upload.upload_dir {
        Some(dir) if dir.exists() && !dir.is_dir() => Err(ValidationError::UploadDirNotDirectory(
            dir.display().to_string(),
        )),
        _ => Ok(()),
    }
}
