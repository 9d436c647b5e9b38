//! Configuration management for formtree
//!
//! Settings are layered, highest priority last:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables
//!
//! # Usage
//!
//! ```no_run
//! use formtree::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Uploads limited to {} per file", config.upload.max_file_size);
//! ```
//!
//! # Environment Variables
//!
//! Any key can be overridden with `FORMTREE__<section>__<key>`:
//! - `FORMTREE__SERVER__BIND_ADDR=0.0.0.0:9000`
//! - `FORMTREE__UPLOAD__MAX_FILE_SIZE=10MB`
//! - `FORMTREE__UPLOAD__DELETE_ON_FINISH=all`
//!
//! # Configuration File
//!
//! By default the file is `config/formtree.toml`; `FORMTREE_CONFIG` points
//! elsewhere.

mod models;
mod sources;
mod validation;

pub use crate::humanize::ByteSize;
pub use models::{Config, ServerConfig, UploadConfig};
pub use validation::ValidationError;

use crate::tokenizer::UploadLimits;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// # Errors
    ///
    /// Returns an error if the file is malformed or validation fails.
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path plus the environment.
    pub fn load_from_path(path: PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }
}

impl UploadConfig {
    /// Limits handed to the tokenizer for every request.
    pub fn to_upload_limits(&self) -> UploadLimits {
        UploadLimits {
            upload_dir: self
                .upload_dir
                .clone()
                .unwrap_or_else(std::env::temp_dir),
            max_file_size: self.max_file_size.as_u64(),
            max_files_size: self.max_files_size.as_u64(),
            max_fields_size: self.max_fields_size.as_u64(),
            max_fields: self.max_fields,
        }
    }
}
