use std::collections::BTreeMap;

use log::debug;
use serde::Serialize;
use serde_json::value::RawValue;

use crate::container::empty_layer::{empty_layer_blob_info, GZIPPED_EMPTY_LAYER, GZIPPED_EMPTY_LAYER_DIGEST};
use crate::container::error::{ManifestError, Result};
use crate::container::image::docker::DockerConfigBlob;
use crate::container::image::History;
use crate::container::manifest::GenericManifest;
use crate::container::schema1::{FsLayer, ManifestSchema1, V1History};
use crate::container::schema2::ManifestSchema2;
use crate::container::source::ImageDestination;
use crate::container::RegDigest;
use crate::util::json::{compact_docker_json, to_docker_json_string};
use crate::util::sha::bytes_sha256;
use crate::util::time::rfc3339_nano;

#[derive(Serialize)]
struct V1Compatibility<'a> {
    id: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    parent: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    comment: &'a str,
    created: String,
    container_config: V1ContainerConfig<'a>,
    #[serde(skip_serializing_if = "str::is_empty")]
    author: &'a str,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    throwaway: bool,
}

#[derive(Serialize)]
struct V1ContainerConfig<'a> {
    #[serde(rename = "Cmd")]
    cmd: [&'a str; 1],
}

/// Rewrites a schema 2 manifest as schema 1.
///
/// Every config history entry becomes one schema 1 layer. Entries marked `empty_layer` point at
/// the well-known empty gzip layer, which is stored at `dest` once per conversion; the others
/// consume the manifest's layers in order. The top entry carries the whole image config.
pub(crate) fn convert_to_schema1(
    manifest: &ManifestSchema2,
    dest: Option<&dyn ImageDestination>,
    signed: bool,
) -> Result<ManifestSchema1> {
    let dest = dest.ok_or(ManifestError::NoDestination)?;
    let config_blob = manifest.config_blob()?;
    let image_config = DockerConfigBlob::from_slice(&config_blob)?;
    let layers = manifest.layers_descriptors();

    if image_config.history.is_empty() {
        return Err(ManifestError::InvalidConfig(
            "cannot convert an image with 0 history entries to schema 1".to_string(),
        ));
    }
    let non_empty = image_config.history.iter().filter(|entry| !entry.is_empty_layer()).count();
    if non_empty != layers.len() {
        return Err(ManifestError::InvalidConfig(format!(
            "config history describes {} layers, manifest has {}",
            non_empty,
            layers.len()
        )));
    }
    debug!(
        "converting {} layers with {} history entries to schema 1",
        layers.len(),
        image_config.history.len()
    );

    let mut fs_layers = Vec::with_capacity(image_config.history.len());
    let mut history = Vec::with_capacity(image_config.history.len());
    let mut real_layers = layers.iter();
    let mut parent_v1_id = String::new();
    let mut v1_id = String::new();
    let mut stored_empty_layer = false;
    for entry in &image_config.history {
        parent_v1_id = std::mem::take(&mut v1_id);
        let blob_sum = if entry.is_empty_layer() {
            if !stored_empty_layer {
                store_empty_layer(dest)?;
                stored_empty_layer = true;
            }
            GZIPPED_EMPTY_LAYER_DIGEST.to_string()
        } else {
            let layer = real_layers.next().ok_or_else(|| {
                ManifestError::InvalidConfig(format!("config needs more than the {} layers in the manifest", layers.len()))
            })?;
            layer.digest.clone()
        };
        v1_id = v1_id_from_blob(&blob_sum, &parent_v1_id)?;
        history.push(V1History {
            v1_compatibility: fake_v1_compatibility(entry, &v1_id, &parent_v1_id)?,
        });
        fs_layers.push(FsLayer { blob_sum });
    }
    // schema 1 lists the top layer first
    fs_layers.reverse();
    history.reverse();

    let top_is_empty = image_config.history.last().map(History::is_empty_layer).unwrap_or(false);
    history[0].v1_compatibility = v1_config_from_config_json(&config_blob, &v1_id, &parent_v1_id, top_is_empty)?;

    let reference = dest.reference();
    debug!("schema 1 manifest named {}", reference);
    Ok(ManifestSchema1::from_components(
        &reference,
        fs_layers,
        history,
        image_config.architecture.unwrap_or_default(),
        signed,
    ))
}

fn store_empty_layer(dest: &dyn ImageDestination) -> Result<()> {
    debug!("uploading empty layer during conversion to schema 1");
    let info = empty_layer_blob_info();
    let stored = dest.put_blob(&mut &GZIPPED_EMPTY_LAYER[..], &info).map_err(|source| ManifestError::StoreFailed {
        digest: info.digest.clone(),
        source,
    })?;
    if stored.digest != GZIPPED_EMPTY_LAYER_DIGEST {
        return Err(ManifestError::DigestMismatch {
            expected: GZIPPED_EMPTY_LAYER_DIGEST.to_string(),
            actual: stored.digest,
        });
    }
    Ok(())
}

/// Same derivation Docker uses, so IDs line up across tools: sha256 of "<blob hex> <parent id>".
fn v1_id_from_blob(blob_sum: &str, parent_v1_id: &str) -> Result<String> {
    let blob_digest = RegDigest::new_with_digest(blob_sum)?;
    Ok(bytes_sha256(format!("{} {}", blob_digest.hex, parent_v1_id).as_bytes()))
}

fn fake_v1_compatibility(entry: &History, v1_id: &str, parent_v1_id: &str) -> Result<String> {
    let fake_image = V1Compatibility {
        id: v1_id,
        parent: parent_v1_id,
        comment: entry.comment.as_deref().unwrap_or_default(),
        created: rfc3339_nano(entry.created.as_ref()),
        container_config: V1ContainerConfig {
            cmd: [entry.created_by.as_deref().unwrap_or_default()],
        },
        author: entry.author.as_deref().unwrap_or_default(),
        throwaway: entry.is_empty_layer(),
    };
    to_docker_json_string(&fake_image).map_err(|e| ManifestError::InvalidFormat(e.to_string()))
}

/// The top v1Compatibility entry: the original config minus `rootfs`/`history`, plus v1 linkage.
/// Top-level keys are sorted; nested values are copied as written.
fn v1_config_from_config_json(config_blob: &[u8], v1_id: &str, parent_v1_id: &str, throwaway: bool) -> Result<String> {
    let raw_contents = serde_json::from_slice::<BTreeMap<String, Box<RawValue>>>(config_blob)
        .map_err(|e| ManifestError::InvalidConfig(e.to_string()))?;
    let mut v1_config = BTreeMap::new();
    for (key, value) in raw_contents {
        if key == "rootfs" || key == "history" {
            continue;
        }
        v1_config.insert(key, raw_json(compact_docker_json(value.get()))?);
    }
    v1_config.insert("id".to_string(), raw_json(format!("\"{}\"", v1_id))?);
    if !parent_v1_id.is_empty() {
        v1_config.insert("parent".to_string(), raw_json(format!("\"{}\"", parent_v1_id))?);
    }
    if throwaway {
        v1_config.insert("throwaway".to_string(), raw_json("true".to_string())?);
    }
    to_docker_json_string(&v1_config).map_err(|e| ManifestError::InvalidFormat(e.to_string()))
}

fn raw_json(json: String) -> Result<Box<RawValue>> {
    RawValue::from_string(json).map_err(|e| ManifestError::InvalidConfig(e.to_string()))
}
