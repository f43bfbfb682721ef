#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail, Result};
use bytes::Bytes;
use chrono::Local;
use env_logger::Env;

use ocimanifest::{BlobInfo, Descriptor, DockerReference, ImageDestination, ImageSource, ManifestSchema2, RegDigest};

pub const CONFIG_DIGEST: &str = "sha256:190f731bfa8650ac4396aafe63c5b358bad46ecef6b66edfb27c037968db63eb";

/// 测试日志，格式与 CLI 一致
pub fn log_init() {
    let env = Env::default().default_filter_or("debug");
    let _ = env_logger::Builder::from_env(env)
        .is_test(true)
        .format(|fmt, record| {
            writeln!(
                fmt,
                "[{} {}] {}",
                Local::now().format("%H:%M:%S%.3f"),
                record.level(),
                &record.args()
            )
        })
        .try_init();
}

pub fn fixture(name: &str) -> Vec<u8> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures").join(name);
    std::fs::read(&path).unwrap_or_else(|e| panic!("reading {}: {}", path.display(), e))
}

/// Every call is a test failure.
#[derive(Default)]
pub struct UnusedImageSource;

impl ImageSource for UnusedImageSource {
    fn reference(&self) -> DockerReference {
        panic!("unexpected call to reference()")
    }

    fn get_manifest(&self) -> Result<(Vec<u8>, String)> {
        panic!("unexpected call to get_manifest()")
    }

    fn get_blob(&self, digest: &str) -> Result<(Box<dyn Read + Send>, i64)> {
        panic!("unexpected call to get_blob({})", digest)
    }
}

/// Serves the fixture config blob. The knobs break it in the ways a transport can.
#[derive(Default)]
pub struct ConfigBlobImageSource {
    pub base: UnusedImageSource,
    pub fetch_error: bool,
    pub broken_stream: bool,
    pub corrupt: bool,
    /// Size reported next to the stream instead of the real one.
    pub claimed_size: Option<i64>,
    pub fetches: Mutex<usize>,
    /// Set once the last served stream has been dropped.
    pub stream_closed: Arc<AtomicBool>,
}

impl ImageSource for ConfigBlobImageSource {
    fn reference(&self) -> DockerReference {
        self.base.reference()
    }

    fn get_manifest(&self) -> Result<(Vec<u8>, String)> {
        self.base.get_manifest()
    }

    fn get_blob(&self, digest: &str) -> Result<(Box<dyn Read + Send>, i64)> {
        if digest != CONFIG_DIGEST {
            bail!("unexpected digest {}", digest);
        }
        *self.fetches.lock().unwrap() += 1;
        if self.fetch_error {
            return Err(anyhow!("config blob is unreachable"));
        }
        self.stream_closed.store(false, Ordering::SeqCst);
        if self.broken_stream {
            return Ok((Box::new(ClosingReader::new(BrokenReader, &self.stream_closed)), -1));
        }
        let mut blob = fixture("schema2-config.json");
        if self.corrupt {
            blob.push(b' ');
        }
        let size = self.claimed_size.unwrap_or(blob.len() as i64);
        Ok((Box::new(ClosingReader::new(Cursor::new(blob), &self.stream_closed)), size))
    }
}

/// Serves the fixture manifest and its config.
pub struct Schema2ImageSource {
    pub config: ConfigBlobImageSource,
}

impl Schema2ImageSource {
    pub fn new() -> Schema2ImageSource {
        Schema2ImageSource {
            config: ConfigBlobImageSource::default(),
        }
    }
}

impl ImageSource for Schema2ImageSource {
    fn reference(&self) -> DockerReference {
        DockerReference::new("library/httpd", Some("latest"))
    }

    fn get_manifest(&self) -> Result<(Vec<u8>, String)> {
        Ok((fixture("schema2.json"), String::new()))
    }

    fn get_blob(&self, digest: &str) -> Result<(Box<dyn Read + Send>, i64)> {
        self.config.get_blob(digest)
    }
}

/// Keeps blobs in memory, keyed by digest.
pub struct MemoryImageDest {
    pub reference: DockerReference,
    pub stored: Mutex<HashMap<String, Vec<u8>>>,
    pub fail: bool,
}

impl MemoryImageDest {
    pub fn new(reference: DockerReference) -> MemoryImageDest {
        MemoryImageDest {
            reference,
            stored: Mutex::new(HashMap::new()),
            fail: false,
        }
    }
}

impl ImageDestination for MemoryImageDest {
    fn reference(&self) -> DockerReference {
        self.reference.clone()
    }

    fn put_blob(&self, stream: &mut dyn Read, input_info: &BlobInfo) -> Result<BlobInfo> {
        if self.fail {
            bail!("put_blob is not allowed on {}", self.reference);
        }
        let mut contents = Vec::new();
        stream.read_to_end(&mut contents)?;
        let digest = RegDigest::from_bytes(&contents);
        if !input_info.digest.is_empty() && input_info.digest != digest.digest {
            bail!("expected {}, got {}", input_info.digest, digest.digest);
        }
        let size = contents.len() as i64;
        self.stored.lock().unwrap().entry(digest.digest.clone()).or_insert(contents);
        Ok(BlobInfo::new(digest.digest, size))
    }
}

/// Fails every read.
pub struct BrokenReader;

impl Read for BrokenReader {
    fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
        Err(std::io::Error::new(std::io::ErrorKind::Other, "connection reset"))
    }
}

/// Records when the wrapped stream is dropped.
pub struct ClosingReader<R> {
    inner: R,
    closed: Arc<AtomicBool>,
}

impl<R: Read> ClosingReader<R> {
    pub fn new(inner: R, closed: &Arc<AtomicBool>) -> ClosingReader<R> {
        ClosingReader {
            inner,
            closed: closed.clone(),
        }
    }
}

impl<R: Read> Read for ClosingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<R> Drop for ClosingReader<R> {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

pub fn fixture_layers() -> Vec<Descriptor> {
    [
        ("sha256:6a5a5368e0c2d3e5909184fa28ddfd56072e7ff3ee9a945876f7eee5896ef5bb", 51354364),
        ("sha256:1bbf5d58d24c47512e234a5623474acf65ae00d4d1414272a893204f44cc680c", 150),
        ("sha256:8f5dc8a4b12c307ac84de90cdd9a7f3915d1be04c9388868ca118831099c67a9", 11739507),
        ("sha256:bbd6b22eb11afce63cc76f6bc41042d99f10d6024c96b655dafba930b8d25909", 8841833),
        ("sha256:960e52ecf8200cbd84e70eb2ad8678f4367e50d14357021872c10fa3fc5935fa", 291),
    ]
    .into_iter()
    .map(|(digest, size)| Descriptor::new("application/vnd.docker.image.rootfs.diff.tar.gzip", digest, size))
    .collect()
}

/// Same document as `schema2.json`, built from parts around `config_blob`.
pub fn manifest_from_components_like_fixture(config_blob: Bytes) -> ManifestSchema2 {
    ManifestSchema2::from_components(
        Descriptor::new("application/octet-stream", CONFIG_DIGEST, 5683),
        config_blob,
        fixture_layers(),
    )
}
