//! Observability (tracing setup, counters)

use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::EnvFilter;

/// Installs the global `tracing` subscriber. `RUST_LOG` wins over `default`.
pub fn init_tracing(default: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Counters for form processing and upload cleanup
#[derive(Debug, Default)]
pub struct Metrics {
    forms_parsed: AtomicU64,
    forms_failed: AtomicU64,
    files_received: AtomicU64,
    files_deleted: AtomicU64,
    cleanup_failures: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn form_parsed(&self, files: usize) {
        self.forms_parsed.fetch_add(1, Ordering::Relaxed);
        self.files_received.fetch_add(files as u64, Ordering::Relaxed);
        tracing::debug!(counter = "forms_parsed", files, "Metric incremented");
    }

    pub fn form_failed(&self) {
        self.forms_failed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "forms_failed", "Metric incremented");
    }

    pub fn file_deleted(&self) {
        self.files_deleted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cleanup_failed(&self) {
        self.cleanup_failures.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "cleanup_failures", "Metric incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            forms_parsed: self.forms_parsed.load(Ordering::Relaxed),
            forms_failed: self.forms_failed.load(Ordering::Relaxed),
            files_received: self.files_received.load(Ordering::Relaxed),
            files_deleted: self.files_deleted.load(Ordering::Relaxed),
            cleanup_failures: self.cleanup_failures.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    pub forms_parsed: u64,
    pub forms_failed: u64,
    pub files_received: u64,
    pub files_deleted: u64,
    pub cleanup_failures: u64,
}
