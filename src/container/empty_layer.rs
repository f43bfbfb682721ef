use hex_literal::hex;

use crate::container::{BlobInfo, RegContentType};

/// gzip of a 1024-byte empty tar archive, as published by Docker registries.
pub static GZIPPED_EMPTY_LAYER: [u8; 32] = hex!("1f8b080000096e8800ff621805a360148c5800080000ffff2eafb5ef00040000");

pub const GZIPPED_EMPTY_LAYER_DIGEST: &str = "sha256:a3ed95caeb02ffe68cdd9fd84406680ae93d633cb16422d00e8a7c22955b46d4";

pub fn empty_layer_blob_info() -> BlobInfo {
    BlobInfo {
        digest: GZIPPED_EMPTY_LAYER_DIGEST.to_string(),
        size: GZIPPED_EMPTY_LAYER.len() as i64,
        media_type: Some(RegContentType::DOCKER_LAYER_TGZ.val().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use flate2::read::GzDecoder;

    use super::*;
    use crate::container::RegDigest;

    #[test]
    fn digest_matches_content() {
        let digest = RegDigest::new_with_digest(GZIPPED_EMPTY_LAYER_DIGEST).unwrap();
        assert!(digest.verify(&GZIPPED_EMPTY_LAYER).is_ok());
    }

    #[test]
    fn decompresses_to_empty_tar() {
        let mut tar_bytes = Vec::new();
        GzDecoder::new(&GZIPPED_EMPTY_LAYER[..]).read_to_end(&mut tar_bytes).unwrap();
        assert_eq!(tar_bytes, vec![0u8; 1024]);

        let mut archive = tar::Archive::new(&tar_bytes[..]);
        assert_eq!(archive.entries().unwrap().count(), 0);
    }
}
