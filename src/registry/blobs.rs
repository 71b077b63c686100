use std::collections::HashMap;

use oci_spec::image::ANNOTATION_REVISION;
use serde::Deserialize;

/// The parts of an image configuration blob the revision lookup reads. Everything else in the
/// blob is ignored so that configs written by any builder decode.
#[derive(Debug, Default, Deserialize)]
pub struct ImageConfigBlob {
    #[serde(default)]
    pub config: Option<ContainerConfig>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ContainerConfig {
    #[serde(rename = "Labels", default)]
    pub labels: Option<HashMap<String, String>>,
}

impl ImageConfigBlob {
    pub fn revision(&self) -> Option<String> {
        self.config
            .as_ref()
            .and_then(|c| c.labels.as_ref())
            .and_then(|labels| labels.get(ANNOTATION_REVISION))
            .filter(|revision| !revision.is_empty())
            .cloned()
    }
}
