use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VersionLookupError {
    #[error("version registry request failed: {0}")]
    Request(String),
    #[error("version registry returned status {0}")]
    Status(u16),
    #[error("version registry response was malformed: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub package: String,
    pub version: String,
}

/// Looks up the newest published version of a package.
#[async_trait]
pub trait VersionLookup: Send + Sync {
    async fn latest_version(&self, package: &str) -> Result<VersionInfo, VersionLookupError>;
}
