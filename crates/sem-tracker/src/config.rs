//! Tracker configuration.

/// Default OS thread name for the tracking worker.
pub const DEFAULT_THREAD_NAME: &str = "sem-tracker";

/// Configuration for a [`SemTracker`](crate::SemTracker).
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Name given to the tracking worker's OS thread.
    pub thread_name: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            thread_name: DEFAULT_THREAD_NAME.to_string(),
        }
    }
}

impl TrackerConfig {
    /// Create a config with default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the tracking thread's name.
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }
}
