use crate::cleanup::DeletePolicy;
use crate::humanize::ByteSize;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upload: UploadConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

/// Where uploads go, how big a form may get and what is deleted afterwards.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UploadConfig {
    /// Defaults to the OS temp dir.
    #[serde(default)]
    pub upload_dir: Option<PathBuf>,
    #[serde(default = "default_max_file_size")]
    pub max_file_size: ByteSize,
    #[serde(default = "default_max_files_size")]
    pub max_files_size: ByteSize,
    #[serde(default = "default_max_fields_size")]
    pub max_fields_size: ByteSize,
    #[serde(default = "default_max_fields")]
    pub max_fields: usize,
    #[serde(default)]
    pub delete_on_finish: DeletePolicy,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            upload_dir: None,
            max_file_size: default_max_file_size(),
            max_files_size: default_max_files_size(),
            max_fields_size: default_max_fields_size(),
            max_fields: default_max_fields(),
            delete_on_finish: DeletePolicy::None,
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_max_file_size() -> ByteSize {
    ByteSize::mib(100)
}

fn default_max_files_size() -> ByteSize {
    ByteSize::gib(1)
}

fn default_max_fields_size() -> ByteSize {
    ByteSize::mib(2)
}

fn default_max_fields() -> usize {
    1000
}
