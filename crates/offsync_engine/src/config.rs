//! Engine configuration and environment settings.

use crate::error::{SyncError, SyncResult};
use offsync_remote::RemoteSettings;
use std::path::PathBuf;
use std::time::Duration;

/// Remote store URL.
pub const ENV_REMOTE_URL: &str = "OFFSYNC_REMOTE_URL";
/// Remote store bearer credential.
pub const ENV_REMOTE_TOKEN: &str = "OFFSYNC_REMOTE_TOKEN";
/// Scheduler period in seconds.
pub const ENV_SYNC_INTERVAL: &str = "OFFSYNC_SYNC_INTERVAL_SECS";
/// Local store directory.
pub const ENV_DATA_DIR: &str = "OFFSYNC_DATA_DIR";
/// Per-call remote timeout in seconds.
pub const ENV_REMOTE_TIMEOUT: &str = "OFFSYNC_REMOTE_TIMEOUT_SECS";

/// Default scheduler period.
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(30);

/// Default number of consecutive rejections before a row is parked.
pub const DEFAULT_MAX_REJECTIONS: u32 = 5;

/// Default local store directory.
pub const DEFAULT_DATA_DIR: &str = "offsync-data";

/// Configuration for the sync engine and scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Fixed period between scheduled attempts.
    pub sync_interval: Duration,
    /// Consecutive remote rejections after which a row stops being pushed
    /// by `push_all_pending` (0 = never park).
    pub max_rejections: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sync_interval: DEFAULT_SYNC_INTERVAL,
            max_rejections: DEFAULT_MAX_REJECTIONS,
        }
    }
}

impl EngineConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the scheduler period.
    #[must_use]
    pub fn with_sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = interval;
        self
    }

    /// Sets the parking threshold.
    #[must_use]
    pub fn with_max_rejections(mut self, max: u32) -> Self {
        self.max_rejections = max;
        self
    }
}

/// Everything read from the environment at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Remote connection parameters; may be unconfigured.
    pub remote: RemoteSettings,
    /// Engine configuration.
    pub engine: EngineConfig,
    /// Local store directory.
    pub data_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            remote: RemoteSettings::unconfigured(),
            engine: EngineConfig::default(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
        }
    }
}

impl Settings {
    /// Reads settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for unparsable numbers.
    pub fn from_env() -> SyncResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through an arbitrary lookup function.
    ///
    /// Missing remote values mean local-only mode, not an error.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for unparsable or zero durations.
    pub fn from_lookup<F>(lookup: F) -> SyncResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut settings = Settings::default();

        settings.remote.url = non_empty(ENV_REMOTE_URL);
        settings.remote.credential = non_empty(ENV_REMOTE_TOKEN);
        if let Some(raw) = non_empty(ENV_REMOTE_TIMEOUT) {
            settings.remote.timeout = parse_secs(ENV_REMOTE_TIMEOUT, &raw)?;
        }
        if let Some(raw) = non_empty(ENV_SYNC_INTERVAL) {
            settings.engine.sync_interval = parse_secs(ENV_SYNC_INTERVAL, &raw)?;
        }
        if let Some(dir) = non_empty(ENV_DATA_DIR) {
            settings.data_dir = PathBuf::from(dir);
        }

        Ok(settings)
    }
}

fn parse_secs(key: &str, raw: &str) -> SyncResult<Duration> {
    let secs: u64 = raw
        .trim()
        .parse()
        .map_err(|_| SyncError::config(key, format!("{raw:?} is not a whole number of seconds")))?;
    if secs == 0 {
        return Err(SyncError::config(key, "must be at least one second"));
    }
    Ok(Duration::from_secs(secs))
}
