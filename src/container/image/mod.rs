use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

pub mod docker;

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct History {
    /// Offset kept as written, legacy history re-emits it.
    pub created: Option<DateTime<FixedOffset>>,
    #[serde(rename = "created_by")]
    pub created_by: Option<String>,
    pub author: Option<String>,
    pub comment: Option<String>,
    #[serde(rename = "empty_layer")]
    pub empty_layer: Option<bool>,
}

impl History {
    pub fn is_empty_layer(&self) -> bool {
        self.empty_layer.unwrap_or(false)
    }
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rootfs {
    #[serde(rename = "diff_ids", default)]
    pub diff_ids: Vec<String>,
    #[serde(rename = "type", default)]
    pub type_field: String,
}

/// Format-independent summary of an image, as shown by `inspect`.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct ImageInspectInfo {
    pub tag: String,
    pub created: Option<DateTime<Utc>>,
    pub docker_version: String,
    pub labels: HashMap<String, String>,
    pub architecture: String,
    pub os: String,
    /// Uncompressed layer digests. Left unset here: manifests only know compressed blob digests.
    pub layers: Option<Vec<String>>,
}
