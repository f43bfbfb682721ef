use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::container::error::{ManifestError, Result};
use crate::container::image::docker::Config;
use crate::container::image::ImageInspectInfo;
use crate::container::manifest::{GenericManifest, ManifestUpdateOptions};
use crate::container::source::{DockerReference, ManifestSigner};
use crate::container::{BlobInfo, RegContentType};
use crate::util::json::to_docker_json_vec;

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FsLayer {
    pub blob_sum: String,
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct V1History {
    pub v1_compatibility: String,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct DockerManifestV1 {
    schema_version: usize,
    #[serde(default)]
    name: String,
    #[serde(default)]
    tag: String,
    #[serde(default)]
    architecture: String,
    fs_layers: Vec<FsLayer>,
    history: Vec<V1History>,
    #[serde(default, skip_serializing)]
    signatures: Vec<Value>,
}

/// The parts of a v1Compatibility entry inspection cares about.
#[derive(Deserialize, Default)]
struct V1Image {
    created: Option<DateTime<Utc>>,
    #[serde(rename = "docker_version")]
    docker_version: Option<String>,
    config: Option<Config>,
    architecture: Option<String>,
    os: Option<String>,
}

/// Docker image manifest V2, schema 1. Layers and history are listed from the top layer down.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct ManifestSchema1 {
    pub name: String,
    pub tag: String,
    pub architecture: String,
    pub fs_layers: Vec<FsLayer>,
    pub history: Vec<V1History>,
    signed: bool,
}

impl ManifestSchema1 {
    /// Parses a schema 1 manifest. Signatures, if any, are dropped.
    pub fn from_manifest(manifest: &[u8]) -> Result<ManifestSchema1> {
        let parsed =
            serde_json::from_slice::<DockerManifestV1>(manifest).map_err(|e| ManifestError::InvalidFormat(e.to_string()))?;
        if parsed.schema_version != 1 {
            return Err(ManifestError::InvalidFormat(format!(
                "unsupported schema version {} for a schema 1 manifest",
                parsed.schema_version
            )));
        }
        if parsed.fs_layers.len() != parsed.history.len() {
            return Err(ManifestError::InvalidFormat(format!(
                "{} fsLayers but {} history entries",
                parsed.fs_layers.len(),
                parsed.history.len()
            )));
        }
        Ok(ManifestSchema1 {
            name: parsed.name,
            tag: parsed.tag,
            architecture: parsed.architecture,
            fs_layers: parsed.fs_layers,
            history: parsed.history,
            signed: !parsed.signatures.is_empty(),
        })
    }

    pub fn from_components(
        reference: &DockerReference,
        fs_layers: Vec<FsLayer>,
        history: Vec<V1History>,
        architecture: String,
        signed: bool,
    ) -> ManifestSchema1 {
        ManifestSchema1 {
            name: reference.name.clone(),
            tag: reference.tag.clone().unwrap_or_default(),
            architecture,
            fs_layers,
            history,
            signed,
        }
    }

    pub fn is_signed(&self) -> bool {
        self.signed
    }

    /// Hands the unsigned envelope to `signer` and returns the signed document.
    pub fn sign(&self, signer: &dyn ManifestSigner) -> Result<Vec<u8>> {
        let unsigned = self.serialize()?;
        signer.sign(&unsigned).map_err(ManifestError::SigningFailed)
    }
}

impl GenericManifest for ManifestSchema1 {
    fn serialize(&self) -> Result<Vec<u8>> {
        let manifest = DockerManifestV1 {
            schema_version: 1,
            name: self.name.clone(),
            tag: self.tag.clone(),
            architecture: self.architecture.clone(),
            fs_layers: self.fs_layers.clone(),
            history: self.history.clone(),
            signatures: vec![],
        };
        to_docker_json_vec(&manifest).map_err(|e| ManifestError::InvalidFormat(e.to_string()))
    }

    fn manifest_mime_type(&self) -> &'static str {
        if self.signed {
            RegContentType::DOCKER_MANIFEST_V1_SIGNED.val()
        } else {
            RegContentType::DOCKER_MANIFEST_V1.val()
        }
    }

    /// Schema 1 has no separate config blob.
    fn config_info(&self) -> BlobInfo {
        BlobInfo::default()
    }

    fn config_blob(&self) -> Result<Bytes> {
        Ok(Bytes::new())
    }

    fn layer_infos(&self) -> Vec<BlobInfo> {
        self.fs_layers.iter().rev().map(|layer| BlobInfo::new(layer.blob_sum.clone(), -1)).collect::<Vec<BlobInfo>>()
    }

    fn image_inspect_info(&self) -> Result<ImageInspectInfo> {
        let top = self
            .history
            .first()
            .ok_or_else(|| ManifestError::InvalidFormat("manifest has no history".to_string()))?;
        let v1_image = serde_json::from_str::<V1Image>(&top.v1_compatibility)
            .map_err(|e| ManifestError::InvalidConfig(e.to_string()))?;
        Ok(ImageInspectInfo {
            tag: self.tag.clone(),
            created: v1_image.created,
            docker_version: v1_image.docker_version.unwrap_or_default(),
            labels: v1_image.config.and_then(|config| config.labels).unwrap_or_default(),
            architecture: v1_image.architecture.unwrap_or_default(),
            os: v1_image.os.unwrap_or_default(),
            layers: None,
        })
    }

    fn updated_image_needs_layer_diff_ids(&self, _options: &ManifestUpdateOptions<'_>) -> bool {
        false
    }

    fn updated_image(&self, options: ManifestUpdateOptions<'_>) -> Result<Box<dyn GenericManifest>> {
        let mut copy = self.clone();
        if let Some(layer_infos) = options.layer_infos {
            if layer_infos.len() != copy.fs_layers.len() {
                return Err(ManifestError::LayerCountMismatch {
                    expected: copy.fs_layers.len(),
                    actual: layer_infos.len(),
                });
            }
            // layer_infos is bottom-to-top, fsLayers is top-to-bottom
            for (fs_layer, info) in copy.fs_layers.iter_mut().rev().zip(layer_infos) {
                fs_layer.blob_sum = info.digest.clone();
            }
        }
        match options.manifest_mime_type {
            None => {}
            Some(mime_type) if RegContentType::is_schema1(mime_type) => {
                copy.signed = mime_type == RegContentType::DOCKER_MANIFEST_V1_SIGNED.val();
            }
            Some(mime_type) => {
                return Err(ManifestError::UnsupportedConversion {
                    from: self.manifest_mime_type().to_string(),
                    to: mime_type.to_string(),
                })
            }
        }
        Ok(Box::new(copy))
    }
}
