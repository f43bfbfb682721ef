use std::fmt::{Display, Formatter};

use log::debug;
use serde::Deserialize;
use serde::Serialize;

use crate::container::error::{ManifestError, Result};
use crate::util::sha::{bytes_sha256, bytes_sha512};

mod convert;
pub mod empty_layer;
pub mod error;
pub mod image;
pub mod manifest;
pub mod schema1;
pub mod schema2;
pub mod source;

/// Digest, size and (optionally) media type of a blob, detached from any manifest.
#[derive(Serialize, Deserialize, Default, PartialEq, Eq, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BlobInfo {
    pub digest: String,
    pub size: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
}

impl BlobInfo {
    pub fn new(digest: impl Into<String>, size: i64) -> BlobInfo {
        BlobInfo {
            digest: digest.into(),
            size,
            media_type: None,
        }
    }
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    pub media_type: String,
    pub size: i64,
    pub digest: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub urls: Vec<String>,
}

impl Descriptor {
    pub fn new(media_type: &str, digest: &str, size: i64) -> Descriptor {
        Descriptor {
            media_type: media_type.to_string(),
            size,
            digest: digest.to_string(),
            urls: vec![],
        }
    }

    pub fn blob_info(&self) -> BlobInfo {
        BlobInfo {
            digest: self.digest.clone(),
            size: self.size,
            media_type: Some(self.media_type.clone()),
        }
    }
}

/// 解析后的 `algorithm:hex` 摘要
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegDigest {
    pub algorithm: String,
    pub hex: String,
    pub digest: String,
}

impl RegDigest {
    pub const SHA256: &'static str = "sha256";
    pub const SHA512: &'static str = "sha512";

    pub fn new_with_sha256(sha256: String) -> RegDigest {
        RegDigest {
            algorithm: Self::SHA256.to_string(),
            digest: format!("sha256:{}", &sha256),
            hex: sha256,
        }
    }

    pub fn new_with_digest(digest: &str) -> Result<RegDigest> {
        let (algorithm, hex) = digest
            .split_once(':')
            .ok_or_else(|| ManifestError::InvalidDigest(format!("'{}' is not of the form algorithm:hex", digest)))?;
        let expected_len = match algorithm {
            Self::SHA256 => 64,
            Self::SHA512 => 128,
            _ => return Err(ManifestError::InvalidDigest(format!("unsupported algorithm in '{}'", digest))),
        };
        if hex.len() != expected_len || !hex.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)) {
            return Err(ManifestError::InvalidDigest(format!("malformed {} hex in '{}'", algorithm, digest)));
        }
        Ok(RegDigest {
            algorithm: algorithm.to_string(),
            hex: hex.to_string(),
            digest: digest.to_string(),
        })
    }

    pub fn from_bytes(bytes: &[u8]) -> RegDigest {
        Self::new_with_sha256(bytes_sha256(bytes))
    }

    /// Hashes `bytes` with this digest's algorithm.
    pub fn compute(&self, bytes: &[u8]) -> RegDigest {
        let hex = match self.algorithm.as_str() {
            Self::SHA512 => bytes_sha512(bytes),
            _ => bytes_sha256(bytes),
        };
        RegDigest {
            algorithm: self.algorithm.clone(),
            digest: format!("{}:{}", self.algorithm, hex),
            hex,
        }
    }

    pub fn verify(&self, bytes: &[u8]) -> Result<()> {
        let actual = self.compute(bytes);
        if actual.hex != self.hex {
            return Err(ManifestError::DigestMismatch {
                expected: self.digest.clone(),
                actual: actual.digest,
            });
        }
        debug!("verified {} bytes against {}", bytes.len(), self.digest);
        Ok(())
    }
}

impl Display for RegDigest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.digest)
    }
}

#[derive(Debug)]
pub struct RegContentType(pub &'static str);

impl RegContentType {
    /// Docker content-type
    pub const DOCKER_MANIFEST: Self = Self("application/vnd.docker.distribution.manifest.v2+json");
    pub const DOCKER_MANIFEST_LIST: Self = Self("application/vnd.docker.distribution.manifest.list.v2+json");
    pub const DOCKER_MANIFEST_V1: Self = Self("application/vnd.docker.distribution.manifest.v1+json");
    pub const DOCKER_MANIFEST_V1_SIGNED: Self = Self("application/vnd.docker.distribution.manifest.v1+prettyjws");
    pub const DOCKER_LAYER_TGZ: Self = Self("application/vnd.docker.image.rootfs.diff.tar.gzip");
    pub const DOCKER_CONTAINER_IMAGE: Self = Self("application/vnd.docker.container.image.v1+json");

    /// OCI content-type
    pub const OCI_INDEX: Self = Self("application/vnd.oci.image.index.v1+json");
    pub const OCI_MANIFEST: Self = Self("application/vnd.oci.image.manifest.v1+json");

    pub fn val(&self) -> &'static str {
        self.0
    }

    pub fn is_schema1(media_type: &str) -> bool {
        media_type == Self::DOCKER_MANIFEST_V1.0 || media_type == Self::DOCKER_MANIFEST_V1_SIGNED.0
    }
}
