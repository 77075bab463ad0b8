//! Version lookup against an npm-compatible package registry.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::application::version::{VersionInfo, VersionLookup, VersionLookupError};
use crate::infra::error::InfraError;

#[derive(Debug, Deserialize)]
struct LatestManifest {
    version: String,
}

#[derive(Clone, Debug)]
pub struct RegistryVersionLookup {
    client: Client,
    base: Url,
}

impl RegistryVersionLookup {
    pub fn new(registry: &str, timeout: Duration) -> Result<Self, InfraError> {
        let mut base = Url::parse(registry)
            .map_err(|err| InfraError::configuration(format!("invalid registry url: {err}")))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(timeout)
            .build()
            .map_err(|err| InfraError::http(err.to_string()))?;
        Ok(Self { client, base })
    }

    pub fn user_agent() -> &'static str {
        concat!("folio/", env!("CARGO_PKG_VERSION"))
    }

    /// `{registry}/{package}/latest`. Scoped names keep their `@scope/` prefix.
    pub fn latest_url(&self, package: &str) -> Result<Url, VersionLookupError> {
        self.base
            .join(&format!("{package}/latest"))
            .map_err(|err| VersionLookupError::Request(err.to_string()))
    }
}

#[async_trait]
impl VersionLookup for RegistryVersionLookup {
    #[instrument(skip(self))]
    async fn latest_version(&self, package: &str) -> Result<VersionInfo, VersionLookupError> {
        let url = self.latest_url(package)?;
        debug!(url = %url, "Querying package registry");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| VersionLookupError::Request(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(VersionLookupError::Status(status.as_u16()));
        }

        let manifest: LatestManifest = response
            .json()
            .await
            .map_err(|err| VersionLookupError::Malformed(err.to_string()))?;
        if manifest.version.trim().is_empty() {
            return Err(VersionLookupError::Malformed("empty version".to_string()));
        }

        Ok(VersionInfo {
            package: package.to_string(),
            version: manifest.version,
        })
    }
}
