use crate::settings::{EngineSettings, SinkSettings};
use std::time::Duration;

/// Values supplied on the command line; each `Some` wins over the file.
#[derive(Debug, Default, Clone)]
pub struct SettingsOverrides {
    pub chunk_size: Option<usize>,
    pub grid_size: Option<usize>,
    pub max_attempts: Option<usize>,
    pub per_chunk_timeout: Option<Duration>,
    pub sink: Option<SinkSettings>,
}

impl SettingsOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = Some(chunk_size);
        self
    }

    pub fn grid_size(mut self, grid_size: usize) -> Self {
        self.grid_size = Some(grid_size);
        self
    }

    pub fn max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn per_chunk_timeout(mut self, timeout: Duration) -> Self {
        self.per_chunk_timeout = Some(timeout);
        self
    }

    pub fn sink(mut self, sink: SinkSettings) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn apply(self, settings: &mut EngineSettings) {
        if let Some(chunk_size) = self.chunk_size {
            settings.chunk_size = chunk_size;
        }
        if let Some(grid_size) = self.grid_size {
            settings.grid_size = grid_size;
        }
        if let Some(max_attempts) = self.max_attempts {
            settings.retry.max_attempts = max_attempts;
        }
        if let Some(timeout) = self.per_chunk_timeout {
            settings.per_chunk_timeout = Some(timeout);
        }
        if let Some(sink) = self.sink {
            settings.sink = sink;
        }
    }
}
