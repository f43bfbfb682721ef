use std::fmt::{Display, Formatter};
use std::io::Read;

use anyhow::Result;

use crate::container::BlobInfo;

/// 已解析好的镜像名称，只用于填充 legacy manifest 的 name/tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockerReference {
    /// repository path, e.g. `library/httpd`
    pub name: String,
    pub tag: Option<String>,
}

impl DockerReference {
    pub fn new(name: impl Into<String>, tag: Option<&str>) -> DockerReference {
        DockerReference {
            name: name.into(),
            tag: tag.map(|t| t.to_string()),
        }
    }
}

impl Display for DockerReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.tag {
            None => format_args!("{}", self.name).fmt(f),
            Some(tag) => format_args!("{}:{}", self.name, tag).fmt(f),
        }
    }
}

/// Where manifests and blobs are read from. Implemented by the transport layer.
pub trait ImageSource: Send + Sync {
    fn reference(&self) -> DockerReference;

    /// Raw manifest bytes and their MIME type, if the source knows it.
    fn get_manifest(&self) -> Result<(Vec<u8>, String)>;

    /// Opens a stream over the blob and returns it with the size the source claims.
    /// A size of `-1` means unknown.
    fn get_blob(&self, digest: &str) -> Result<(Box<dyn Read + Send>, i64)>;
}

/// Where converted images are written to.
pub trait ImageDestination: Send + Sync {
    fn reference(&self) -> DockerReference;

    /// Stores a blob. Storing a digest that already exists must leave the stored content intact.
    fn put_blob(&self, stream: &mut dyn Read, input_info: &BlobInfo) -> Result<BlobInfo>;
}

/// Wraps an unsigned legacy manifest into a signed envelope.
pub trait ManifestSigner {
    fn sign(&self, unsigned_manifest: &[u8]) -> Result<Vec<u8>>;
}
