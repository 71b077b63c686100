use oci_spec::image::ImageManifest;
use reqwest::Url;

use super::Registry;
use crate::transport::Transport;
use crate::Result;

pub const DOCKER_MANIFEST_V2: &str = "application/vnd.docker.distribution.manifest.v2+json";
pub const OCI_IMAGE_MANIFEST: &str = "application/vnd.oci.image.manifest.v1+json";

/// Single-platform manifest types; the revision lives in the config blob these reference.
pub const MANIFEST_MEDIA_TYPES: [&str; 2] = [DOCKER_MANIFEST_V2, OCI_IMAGE_MANIFEST];

impl<T: Transport> Registry<T> {
    pub(crate) async fn manifest(&self, url: Url) -> Result<ImageManifest> {
        let manifest: ImageManifest = self.get_json(url).await?;
        tracing::trace!(
            "manifest config {} ({})",
            manifest.config().digest(),
            manifest.config().media_type()
        );
        Ok(manifest)
    }
}
