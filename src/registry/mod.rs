//! Registry side of the reconciliation: resolving the source revision an image was built from.
use std::sync::Arc;

use base64::prelude::{Engine as _, BASE64_STANDARD};
use reqwest::header::HeaderMap;
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;

mod blobs;
pub use blobs::ImageConfigBlob;

mod manifests;
pub use manifests::MANIFEST_MEDIA_TYPES;

use crate::governor::RateLimitGovernor;
use crate::requests;
use crate::transport::Transport;
use crate::versions::Version;
use crate::{OciDigest, Result};

pub struct Registry<T: Transport> {
    governor: Arc<RateLimitGovernor<T>>,
    headers: HeaderMap,
}

impl<T: Transport> Registry<T> {
    /// GHCR accepts the base64 encoded API token as a registry bearer token.
    pub fn new(governor: Arc<RateLimitGovernor<T>>, token: &str) -> Result<Self> {
        let headers = requests::default_headers(
            requests::bearer(&BASE64_STANDARD.encode(token))?,
            requests::accept(&MANIFEST_MEDIA_TYPES)?,
        );
        Ok(Self { governor, headers })
    }

    /// The `org.opencontainers.image.revision` label of the version's image configuration.
    ///
    /// Fetch and decode failures are returned as errors; a missing label is `None`.
    pub async fn revision(&self, version: &Version) -> Result<Option<String>> {
        tracing::debug!("Getting revision for image {}", version.image);

        let manifest = self.manifest(version.manifest_url.clone()).await?;
        let config_digest = OciDigest::try_from(manifest.config().digest().to_string().as_str())?;
        let config_url = version.blob_base_url.join(&format!("./{config_digest}"))?;

        let config: ImageConfigBlob = self.get_json(config_url).await?;
        let revision = config.revision();
        tracing::debug!("Revision of {}: {:?}", version.image, revision);
        Ok(revision)
    }

    async fn get_json<D: DeserializeOwned>(&self, url: Url) -> Result<D> {
        let response = self
            .governor
            .send(requests::request(Method::GET, url, &self.headers))
            .await?;
        requests::json(response).await
    }
}
