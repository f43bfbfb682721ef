use std::fmt::{Debug, Formatter};
use std::io::Read;
use std::sync::Arc;

use bytes::Bytes;
use log::debug;
use once_cell::sync::OnceCell;
use serde::Deserialize;
use serde::Serialize;

use crate::container::convert::convert_to_schema1;
use crate::container::error::{ManifestError, Result};
use crate::container::image::docker::DockerConfigBlob;
use crate::container::image::ImageInspectInfo;
use crate::container::manifest::{GenericManifest, ManifestUpdateOptions};
use crate::container::source::ImageSource;
use crate::container::{BlobInfo, Descriptor, RegContentType, RegDigest};
use crate::util::json::to_docker_json_vec;

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
struct DockerManifest {
    schema_version: usize,
    media_type: String,
    config: Descriptor,
    layers: Vec<Descriptor>,
}

/// Docker image manifest V2, schema 2.
#[derive(Clone)]
pub struct ManifestSchema2 {
    src: Option<Arc<dyn ImageSource>>,
    /// Set once, either at construction or after the first verified fetch.
    config_blob: OnceCell<Bytes>,
    schema_version: usize,
    media_type: String,
    config_descriptor: Descriptor,
    layers_descriptors: Vec<Descriptor>,
}

impl ManifestSchema2 {
    pub fn from_manifest(src: Option<Arc<dyn ImageSource>>, manifest: &[u8]) -> Result<ManifestSchema2> {
        let parsed =
            serde_json::from_slice::<DockerManifest>(manifest).map_err(|e| ManifestError::InvalidFormat(e.to_string()))?;
        Ok(ManifestSchema2 {
            src,
            config_blob: OnceCell::new(),
            schema_version: parsed.schema_version,
            media_type: parsed.media_type,
            config_descriptor: parsed.config,
            layers_descriptors: parsed.layers,
        })
    }

    /// Builds a manifest from parts. `config_blob` is trusted as is and never verified.
    pub fn from_components(config: Descriptor, config_blob: Bytes, layers: Vec<Descriptor>) -> ManifestSchema2 {
        ManifestSchema2 {
            src: None,
            config_blob: OnceCell::with_value(config_blob),
            schema_version: 2,
            media_type: RegContentType::DOCKER_MANIFEST.val().to_string(),
            config_descriptor: config,
            layers_descriptors: layers,
        }
    }

    pub fn config_descriptor(&self) -> &Descriptor {
        &self.config_descriptor
    }

    pub fn layers_descriptors(&self) -> &[Descriptor] {
        &self.layers_descriptors
    }

    pub(crate) fn config(&self) -> Result<DockerConfigBlob> {
        DockerConfigBlob::from_slice(&self.config_blob()?)
    }

    /// Uncompressed layer digests declared by the config, one per layer descriptor.
    pub fn layer_diff_ids(&self) -> Result<Vec<String>> {
        let diff_ids = self.config()?.rootfs.diff_ids;
        if diff_ids.len() != self.layers_descriptors.len() {
            return Err(ManifestError::LayerCountMismatch {
                expected: self.layers_descriptors.len(),
                actual: diff_ids.len(),
            });
        }
        Ok(diff_ids)
    }

    fn fetch_config_blob(&self) -> Result<Bytes> {
        let digest = &self.config_descriptor.digest;
        let src = self.src.as_ref().ok_or_else(|| ManifestError::NoSource { digest: digest.clone() })?;
        let expected = RegDigest::new_with_digest(digest)?;
        debug!("fetching config blob {}", digest);
        let (mut stream, size) = src.get_blob(digest).map_err(|source| ManifestError::FetchFailed {
            digest: digest.clone(),
            source,
        })?;
        // claimed size is informational only
        debug!("source reports {} bytes for {}", size, digest);
        let mut blob = Vec::new();
        stream.read_to_end(&mut blob).map_err(|source| ManifestError::ReadFailed {
            digest: digest.clone(),
            source,
        })?;
        drop(stream);
        expected.verify(&blob)?;
        Ok(Bytes::from(blob))
    }

    fn update_layers(&mut self, layer_infos: &[BlobInfo]) -> Result<()> {
        if layer_infos.len() != self.layers_descriptors.len() {
            return Err(ManifestError::LayerCountMismatch {
                expected: self.layers_descriptors.len(),
                actual: layer_infos.len(),
            });
        }
        for (descriptor, info) in self.layers_descriptors.iter_mut().zip(layer_infos) {
            descriptor.digest = info.digest.clone();
            descriptor.size = info.size;
            if let Some(media_type) = &info.media_type {
                descriptor.media_type = media_type.clone();
            }
        }
        Ok(())
    }
}

impl GenericManifest for ManifestSchema2 {
    fn serialize(&self) -> Result<Vec<u8>> {
        let manifest = DockerManifest {
            schema_version: self.schema_version,
            media_type: self.media_type.clone(),
            config: self.config_descriptor.clone(),
            layers: self.layers_descriptors.clone(),
        };
        to_docker_json_vec(&manifest).map_err(|e| ManifestError::InvalidFormat(e.to_string()))
    }

    fn manifest_mime_type(&self) -> &'static str {
        RegContentType::DOCKER_MANIFEST.val()
    }

    fn config_info(&self) -> BlobInfo {
        self.config_descriptor.blob_info()
    }

    fn config_blob(&self) -> Result<Bytes> {
        self.config_blob.get_or_try_init(|| self.fetch_config_blob()).cloned()
    }

    fn layer_infos(&self) -> Vec<BlobInfo> {
        self.layers_descriptors.iter().map(Descriptor::blob_info).collect::<Vec<BlobInfo>>()
    }

    fn image_inspect_info(&self) -> Result<ImageInspectInfo> {
        Ok(self.config()?.inspect_info())
    }

    fn updated_image_needs_layer_diff_ids(&self, _options: &ManifestUpdateOptions<'_>) -> bool {
        false
    }

    fn updated_image(&self, options: ManifestUpdateOptions<'_>) -> Result<Box<dyn GenericManifest>> {
        let mut copy = self.clone();
        if let Some(layer_infos) = options.layer_infos {
            copy.update_layers(layer_infos)?;
        }
        match options.manifest_mime_type {
            None => Ok(Box::new(copy)),
            Some(mime_type) if RegContentType::is_schema1(mime_type) => {
                let signed = mime_type == RegContentType::DOCKER_MANIFEST_V1_SIGNED.val();
                Ok(Box::new(convert_to_schema1(&copy, options.destination, signed)?))
            }
            Some(mime_type) => Err(ManifestError::UnsupportedConversion {
                from: self.manifest_mime_type().to_string(),
                to: mime_type.to_string(),
            }),
        }
    }
}

/// Compares the document only; the source handle and config cache are not part of a manifest's identity.
impl PartialEq for ManifestSchema2 {
    fn eq(&self, other: &Self) -> bool {
        self.schema_version == other.schema_version
            && self.media_type == other.media_type
            && self.config_descriptor == other.config_descriptor
            && self.layers_descriptors == other.layers_descriptors
    }
}

impl Debug for ManifestSchema2 {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManifestSchema2")
            .field("has_src", &self.src.is_some())
            .field("config_blob_cached", &self.config_blob.get().is_some())
            .field("media_type", &self.media_type)
            .field("config_descriptor", &self.config_descriptor)
            .field("layers_descriptors", &self.layers_descriptors)
            .finish()
    }
}
