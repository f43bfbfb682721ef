//! Container image manifests: parsing, inspection, layer updates and schema 2 to schema 1 conversion.

pub mod container;
pub mod util;

pub use container::error::{ManifestError, Result};
pub use container::manifest::{
    guess_mime_type, manifest_digest, manifest_from_blob, manifest_from_source, GenericManifest, ManifestUpdateOptions,
};
pub use container::schema1::ManifestSchema1;
pub use container::schema2::ManifestSchema2;
pub use container::source::{DockerReference, ImageDestination, ImageSource, ManifestSigner};
pub use container::{BlobInfo, Descriptor, RegContentType, RegDigest};
