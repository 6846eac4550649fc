//! Local store configuration.

/// Configuration for opening a local store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Whether to create the store if it doesn't exist.
    pub create_if_missing: bool,

    /// Whether to fsync the log after every write (safer but slower).
    pub sync_on_write: bool,

    /// Rewrite the log as a snapshot once this many frames have been
    /// appended since the last compaction (0 = never).
    pub compact_after: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            sync_on_write: true,
            compact_after: 10_000,
        }
    }
}

impl StoreConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to create the store if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets whether to fsync after every write.
    #[must_use]
    pub const fn sync_on_write(mut self, value: bool) -> Self {
        self.sync_on_write = value;
        self
    }

    /// Sets the automatic compaction threshold.
    #[must_use]
    pub const fn compact_after(mut self, frames: u64) -> Self {
        self.compact_after = frames;
        self
    }
}
