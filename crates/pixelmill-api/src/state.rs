//! Application state shared by every handler.

use std::time::{Duration, Instant};

use pixelmill_core::Config;
use pixelmill_processing::{ImageEngine, UploadValidator};

#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Config,
    pub engine: ImageEngine,
    pub upload_validator: UploadValidator,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self::with_engine(config, ImageEngine::default())
    }

    /// State with a custom engine (e.g. a different background remover)
    pub fn with_engine(config: Config, engine: ImageEngine) -> Self {
        let upload_validator = UploadValidator::new(config.max_file_size_bytes());
        Self {
            config,
            engine,
            upload_validator,
            started_at: Instant::now(),
        }
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn processing_timeout(&self) -> Duration {
        Duration::from_secs(self.config.processing_timeout_secs())
    }
}
