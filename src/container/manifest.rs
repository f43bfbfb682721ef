use std::fmt::Debug;
use std::sync::Arc;

use bytes::Bytes;
use log::debug;
use serde::Deserialize;

use crate::container::error::{ManifestError, Result};
use crate::container::image::ImageInspectInfo;
use crate::container::schema1::ManifestSchema1;
use crate::container::schema2::ManifestSchema2;
use crate::container::source::{ImageDestination, ImageSource};
use crate::container::{BlobInfo, RegContentType, RegDigest};

/// What a caller may ask `updated_image` to change.
#[derive(Default, Clone, Copy)]
pub struct ManifestUpdateOptions<'a> {
    /// Replacement layers, same count and order as `layer_infos()`.
    pub layer_infos: Option<&'a [BlobInfo]>,
    /// Target format; `None` keeps the current one.
    pub manifest_mime_type: Option<&'a str>,
    /// Only consulted, never modified: receives blobs a format conversion has to synthesize.
    pub destination: Option<&'a dyn ImageDestination>,
}

/// Operations every manifest format supports. Callers should only depend on this.
pub trait GenericManifest: Debug + Send + Sync {
    fn serialize(&self) -> Result<Vec<u8>>;

    fn manifest_mime_type(&self) -> &'static str;

    fn config_info(&self) -> BlobInfo;

    fn config_blob(&self) -> Result<Bytes>;

    /// Layers from the bottom of the filesystem stack to the top.
    fn layer_infos(&self) -> Vec<BlobInfo>;

    fn image_inspect_info(&self) -> Result<ImageInspectInfo>;

    fn updated_image_needs_layer_diff_ids(&self, options: &ManifestUpdateOptions<'_>) -> bool;

    /// Returns a new manifest with `options` applied; `self` is left untouched.
    fn updated_image(&self, options: ManifestUpdateOptions<'_>) -> Result<Box<dyn GenericManifest>>;

    fn manifest(&self) -> Result<(Vec<u8>, &'static str)> {
        Ok((self.serialize()?, self.manifest_mime_type()))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManifestProbe {
    schema_version: Option<u32>,
    media_type: Option<String>,
    signatures: Option<serde_json::Value>,
}

/// Guesses the MIME type of a manifest from its content.
pub fn guess_mime_type(manifest: &[u8]) -> Option<&'static str> {
    let probe = serde_json::from_slice::<ManifestProbe>(manifest).ok()?;
    if let Some(media_type) = probe.media_type.as_deref() {
        return [
            RegContentType::DOCKER_MANIFEST,
            RegContentType::DOCKER_MANIFEST_LIST,
            RegContentType::DOCKER_MANIFEST_V1,
            RegContentType::DOCKER_MANIFEST_V1_SIGNED,
            RegContentType::OCI_MANIFEST,
            RegContentType::OCI_INDEX,
        ]
        .iter()
        .map(RegContentType::val)
        .find(|known| *known == media_type);
    }
    match probe.schema_version? {
        1 if probe.signatures.is_some() => Some(RegContentType::DOCKER_MANIFEST_V1_SIGNED.val()),
        1 => Some(RegContentType::DOCKER_MANIFEST_V1.val()),
        2 => Some(RegContentType::DOCKER_MANIFEST.val()),
        _ => None,
    }
}

/// Builds the manifest variant for `mime_type`. An empty `mime_type` is guessed from the content.
pub fn manifest_from_blob(src: Option<Arc<dyn ImageSource>>, manifest: &[u8], mime_type: &str) -> Result<Box<dyn GenericManifest>> {
    let mime_type = match mime_type {
        "" => guess_mime_type(manifest).ok_or_else(|| ManifestError::InvalidFormat("cannot determine manifest type".to_string()))?,
        mime_type => mime_type,
    };
    debug!("creating manifest of type {}", mime_type);
    if mime_type == RegContentType::DOCKER_MANIFEST.val() {
        Ok(Box::new(ManifestSchema2::from_manifest(src, manifest)?))
    } else if RegContentType::is_schema1(mime_type) {
        Ok(Box::new(ManifestSchema1::from_manifest(manifest)?))
    } else {
        Err(ManifestError::UnsupportedManifestType(mime_type.to_string()))
    }
}

/// Reads the manifest of `src` and builds the matching variant around it.
pub fn manifest_from_source(src: Arc<dyn ImageSource>) -> Result<Box<dyn GenericManifest>> {
    let (manifest, mime_type) = src.get_manifest().map_err(|source| ManifestError::FetchFailed {
        digest: src.reference().to_string(),
        source,
    })?;
    manifest_from_blob(Some(src), &manifest, &mime_type)
}

/// `sha256:` digest of the raw manifest bytes.
pub fn manifest_digest(manifest: &[u8]) -> String {
    RegDigest::from_bytes(manifest).digest
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn guesses_from_media_type() {
        let manifest = br#"{"schemaVersion":2,"mediaType":"application/vnd.oci.image.index.v1+json","manifests":[]}"#;
        assert_eq!(guess_mime_type(manifest), Some(RegContentType::OCI_INDEX.val()));
    }

    #[test]
    fn guesses_from_schema_version() {
        assert_eq!(guess_mime_type(br#"{"schemaVersion":1,"fsLayers":[]}"#), Some(RegContentType::DOCKER_MANIFEST_V1.val()));
        assert_eq!(
            guess_mime_type(br#"{"schemaVersion":1,"signatures":[]}"#),
            Some(RegContentType::DOCKER_MANIFEST_V1_SIGNED.val())
        );
        assert_eq!(guess_mime_type(br#"{"schemaVersion":2,"layers":[]}"#), Some(RegContentType::DOCKER_MANIFEST.val()));
        assert_eq!(guess_mime_type(br#"{"schemaVersion":3}"#), None);
        assert_eq!(guess_mime_type(b"not json"), None);
    }

    #[test]
    fn rejects_manifest_lists() {
        let list = br#"{"schemaVersion":2,"mediaType":"application/vnd.docker.distribution.manifest.list.v2+json","manifests":[]}"#;
        assert_matches!(manifest_from_blob(None, list, ""), Err(ManifestError::UnsupportedManifestType(_)));
    }

    #[test]
    fn rejects_unguessable_content() {
        assert_matches!(manifest_from_blob(None, b"{}", ""), Err(ManifestError::InvalidFormat(_)));
    }

    #[test]
    fn digest_of_raw_bytes() {
        assert_eq!(manifest_digest(b""), "sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855");
    }
}
