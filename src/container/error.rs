use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("invalid manifest: {0}")]
    InvalidFormat(String),

    #[error("no image source to fetch config blob {digest} from")]
    NoSource { digest: String },

    #[error("a destination is required to convert the manifest")]
    NoDestination,

    #[error("fetching blob {digest} failed")]
    FetchFailed {
        digest: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("reading blob {digest} failed")]
    ReadFailed {
        digest: String,
        #[source]
        source: std::io::Error,
    },

    #[error("blob digest mismatch, expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },

    #[error("layer count mismatch, expected {expected}, got {actual}")]
    LayerCountMismatch { expected: usize, actual: usize },

    #[error("conversion of {from} manifest to {to} is not supported")]
    UnsupportedConversion { from: String, to: String },

    #[error("invalid image config: {0}")]
    InvalidConfig(String),

    #[error("invalid digest: {0}")]
    InvalidDigest(String),

    #[error("storing blob {digest} at destination failed")]
    StoreFailed {
        digest: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("unsupported manifest type: {0}")]
    UnsupportedManifestType(String),

    #[error("signing manifest failed")]
    SigningFailed(#[source] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ManifestError>;
