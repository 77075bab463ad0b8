//! Cache configuration.

use time::Duration;

const DEFAULT_PAGE_TTL_SECS: i64 = 300;
const DEFAULT_VERSION_TTL_SECS: i64 = 3600;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// When false every read goes straight to the data-access collaborator.
    pub enabled: bool,
    /// Lifetime of page, folder and site configuration entries.
    pub page_ttl: Duration,
    /// Lifetime of the external version entry.
    pub version_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            page_ttl: Duration::seconds(DEFAULT_PAGE_TTL_SECS),
            version_ttl: Duration::seconds(DEFAULT_VERSION_TTL_SECS),
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            page_ttl: seconds(settings.page_ttl_secs),
            version_ttl: seconds(settings.version_ttl_secs),
        }
    }
}

impl CacheConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

fn seconds(secs: u64) -> Duration {
    Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX))
}
