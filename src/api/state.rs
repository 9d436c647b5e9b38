use std::sync::Arc;

use crate::config::Config;
use crate::middleware::MultipartOptions;
use crate::observability::Metrics;

#[derive(Clone)]
pub struct AppState {
    pub options: Arc<MultipartOptions>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        let metrics = Arc::new(Metrics::new());
        let options = Arc::new(MultipartOptions::from_config(&config.upload, metrics.clone()));

        Self { options, metrics }
    }
}
