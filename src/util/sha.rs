use sha2::{Digest, Sha256, Sha512};

pub fn bytes_sha256(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

pub fn bytes_sha512(bytes: &[u8]) -> String {
    hex::encode(Sha512::digest(bytes))
}
