use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::container::error::{ManifestError, Result};
use crate::container::image::{History, ImageInspectInfo, Rootfs};

/// `application/vnd.docker.container.image.v1+json`
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DockerConfigBlob {
    pub created: Option<DateTime<Utc>>,
    pub author: Option<String>,
    pub architecture: Option<String>,
    pub os: Option<String>,
    #[serde(rename = "docker_version")]
    pub docker_version: Option<String>,
    #[serde(default)]
    pub config: Config,
    #[serde(default)]
    pub rootfs: Rootfs,
    #[serde(default)]
    pub history: Vec<History>,
}

impl DockerConfigBlob {
    pub fn from_slice(config_blob: &[u8]) -> Result<DockerConfigBlob> {
        serde_json::from_slice::<DockerConfigBlob>(config_blob).map_err(|e| ManifestError::InvalidConfig(e.to_string()))
    }

    pub fn inspect_info(self) -> ImageInspectInfo {
        ImageInspectInfo {
            tag: String::new(),
            created: self.created,
            docker_version: self.docker_version.unwrap_or_default(),
            labels: self.config.labels.unwrap_or_default(),
            architecture: self.architecture.unwrap_or_default(),
            os: self.os.unwrap_or_default(),
            layers: None,
        }
    }
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(rename = "User")]
    pub user: Option<String>,
    #[serde(rename = "ExposedPorts")]
    pub exposed_ports: Option<HashMap<String, Value>>,
    #[serde(rename = "Env")]
    pub env: Option<Vec<String>>,
    #[serde(rename = "Entrypoint")]
    pub entrypoint: Option<Vec<String>>,
    #[serde(rename = "Cmd")]
    pub cmd: Option<Vec<String>>,
    #[serde(rename = "Volumes")]
    pub volumes: Option<HashMap<String, Value>>,
    #[serde(rename = "WorkingDir")]
    pub working_dir: Option<String>,
    #[serde(rename = "Labels")]
    pub labels: Option<HashMap<String, String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_default_to_empty() {
        let blob = DockerConfigBlob::from_slice(br#"{"architecture":"arm64","os":"linux","config":{"Labels":null}}"#).unwrap();
        let info = blob.inspect_info();
        assert!(info.labels.is_empty());
        assert_eq!(info.architecture, "arm64");
        assert_eq!(info.docker_version, "");
        assert_eq!(info.created, None);
    }

    #[test]
    fn keeps_declared_labels() {
        let blob = DockerConfigBlob::from_slice(br#"{"config":{"Labels":{"maintainer":"ops"}}}"#).unwrap();
        assert_eq!(blob.inspect_info().labels.get("maintainer").map(String::as_str), Some("ops"));
    }

    #[test]
    fn history_marks_empty_layers() {
        let blob = DockerConfigBlob::from_slice(
            br#"{"history":[{"created_by":"ADD x /"},{"created_by":"CMD [\"sh\"]","empty_layer":true}]}"#,
        )
        .unwrap();
        let empty = blob.history.iter().map(History::is_empty_layer).collect::<Vec<bool>>();
        assert_eq!(empty, vec![false, true]);
    }

    #[test]
    fn rejects_non_json() {
        assert!(matches!(DockerConfigBlob::from_slice(b"invalid JSON"), Err(ManifestError::InvalidConfig(_))));
        assert!(matches!(DockerConfigBlob::from_slice(b""), Err(ManifestError::InvalidConfig(_))));
    }
}
