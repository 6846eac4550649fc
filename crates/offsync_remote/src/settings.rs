//! Remote connection parameters.

use std::time::Duration;

/// Default per-call timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Where the remote lives and how to authenticate.
///
/// Missing values are a supported mode: the connector then stays
/// unavailable forever and the store runs local-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSettings {
    /// Base URL of the remote row store.
    pub url: Option<String>,
    /// Bearer credential.
    pub credential: Option<String>,
    /// Per-call timeout.
    pub timeout: Duration,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            url: None,
            credential: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl RemoteSettings {
    /// Creates configured settings.
    pub fn new(url: impl Into<String>, credential: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            credential: Some(credential.into()),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Creates settings for local-only mode.
    #[must_use]
    pub fn unconfigured() -> Self {
        Self::default()
    }

    /// Sets the per-call timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns true iff both URL and credential are present and non-empty.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.url) && present(&self.credential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_needs_both_values() {
        assert!(RemoteSettings::new("https://rows.example.com", "t").is_configured());
        assert!(!RemoteSettings::unconfigured().is_configured());
        assert!(!RemoteSettings::new("https://rows.example.com", "").is_configured());
        assert!(!RemoteSettings::new("  ", "t").is_configured());
    }

    #[test]
    fn timeout_builder() {
        let settings = RemoteSettings::default().with_timeout(Duration::from_secs(2));
        assert_eq!(settings.timeout, Duration::from_secs(2));
        assert_eq!(RemoteSettings::default().timeout, DEFAULT_TIMEOUT);
    }
}
