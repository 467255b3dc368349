//! Loading glTF/GLB files into a [`Scene`].

use std::borrow::Cow;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use indexmap::IndexMap;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::host::scene::{ImageSource, NodeTree, Scene, SceneImage, SceneMaterial, SceneMesh};
use crate::normalize::HostVersion;

use super::{Backing, glb, synthesize, unique_name};

pub(super) fn load_scene(path: &Path, version: HostVersion) -> Result<Scene> {
    let load_err = |message: String| Error::AssetLoadFailed {
        path: path.to_path_buf(),
        message,
    };

    let bytes = std::fs::read(path)?;
    let gltf = gltf::Gltf::from_slice(&bytes).map_err(|e| load_err(e.to_string()))?;

    let json_bytes: Cow<'_, [u8]> = if glb::is_glb(&bytes) {
        gltf::Glb::from_slice(&bytes)
            .map_err(|e| load_err(e.to_string()))?
            .json
    } else {
        Cow::Borrowed(&bytes)
    };
    let document: Value = serde_json::from_slice(&json_bytes).map_err(|e| load_err(e.to_string()))?;

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let buffers: Vec<Vec<u8>> = gltf::import_buffers(&gltf.document, Some(base_dir), gltf.blob.clone())
        .map_err(|e| load_err(format!("failed to resolve buffers: {e}")))?
        .into_iter()
        .map(|data| data.0)
        .collect();

    let images = load_images(&gltf.document, &document, &buffers, base_dir)
        .map_err(load_err)?;
    let image_names: Vec<String> = images.keys().cloned().collect();

    let mut materials = IndexMap::new();
    let mut taken = HashSet::new();
    for material in gltf.document.materials() {
        let index = material.index().unwrap_or(materials.len());
        let base = material
            .name()
            .map_or_else(|| format!("Material.{index:03}"), str::to_string);
        let name = unique_name(&base, &mut taken);

        let extras = &document["materials"][index]["extras"];
        let stored = extras
            .get("node_tree")
            .map(|tree| serde_json::from_value::<NodeTree>(tree.clone()));
        let (node_tree, use_nodes) = match stored {
            Some(Ok(tree)) => {
                let use_nodes = extras.get("use_nodes").and_then(Value::as_bool).unwrap_or(true);
                (tree, use_nodes)
            }
            Some(Err(e)) => {
                tracing::warn!("Material '{name}': stored node tree unreadable ({e}), rebuilding from PBR");
                (synthesize::synthesize(&material, &image_names, version)?, true)
            }
            None => (synthesize::synthesize(&material, &image_names, version)?, true),
        };
        materials.insert(
            name.clone(),
            SceneMaterial {
                name,
                use_nodes,
                node_tree,
            },
        );
    }
    let material_names: Vec<String> = materials.keys().cloned().collect();

    let mut meshes = Vec::new();
    let mut taken = HashSet::new();
    for mesh in gltf.document.meshes() {
        let base = mesh
            .name()
            .map_or_else(|| format!("Mesh.{:03}", mesh.index()), str::to_string);
        let name = unique_name(&base, &mut taken);
        let used: Vec<Option<String>> = mesh
            .primitives()
            .map(|p| p.material().index().and_then(|i| material_names.get(i).cloned()))
            .collect();
        let extras = &document["meshes"][mesh.index()]["extras"];
        meshes.push(mesh_slots(name, &used, extras));
    }

    tracing::debug!(
        "Loaded {}: {} meshes, {} materials, {} images",
        path.display(),
        meshes.len(),
        materials.len(),
        images.len()
    );

    Ok(Scene {
        meshes,
        materials,
        images,
        backing: Some(Backing { document, buffers }),
    })
}

/// Slot layout for one mesh.
///
/// Slots stored in `extras` win when they agree with what the primitives
/// actually use; otherwise slots are derived from the primitives.
fn mesh_slots(name: String, used: &[Option<String>], extras: &Value) -> SceneMesh {
    let stored_slots: Option<Vec<Option<String>>> = extras
        .get("material_slots")
        .and_then(|v| serde_json::from_value(v.clone()).ok());
    let stored_prims: Option<Vec<usize>> = extras
        .get("primitive_slots")
        .and_then(|v| serde_json::from_value(v.clone()).ok());

    if let (Some(material_slots), Some(primitive_slots)) = (stored_slots, stored_prims) {
        let mesh = SceneMesh {
            name: name.clone(),
            material_slots,
            primitive_slots,
        };
        let consistent = mesh.primitive_slots.len() == used.len()
            && used
                .iter()
                .enumerate()
                .all(|(i, material)| mesh.primitive_material(i) == material.as_deref())
            && mesh.primitive_slots.iter().all(|s| *s < mesh.material_slots.len());
        if consistent {
            return mesh;
        }
    }

    let mut material_slots: Vec<Option<String>> = Vec::new();
    let mut primitive_slots = Vec::with_capacity(used.len());
    for material in used {
        let slot = material_slots
            .iter()
            .position(|s| s == material)
            .unwrap_or_else(|| {
                material_slots.push(material.clone());
                material_slots.len() - 1
            });
        primitive_slots.push(slot);
    }
    SceneMesh {
        name,
        material_slots,
        primitive_slots,
    }
}

fn load_images(
    document: &gltf::Document,
    json: &Value,
    buffers: &[Vec<u8>],
    base_dir: &Path,
) -> std::result::Result<IndexMap<String, SceneImage>, String> {
    let linear = linear_images(document);
    let mut images = IndexMap::new();
    let mut taken = HashSet::new();

    for image in document.images() {
        let index = image.index();
        let (source, base) = match image.source() {
            gltf::image::Source::View { view, mime_type } => {
                let start = view.offset();
                let bytes = buffers
                    .get(view.buffer().index())
                    .and_then(|b| b.get(start..start + view.length()))
                    .ok_or_else(|| format!("image {index} points outside its buffer"))?;
                let source = ImageSource::Packed {
                    bytes: bytes.to_vec(),
                    mime_type: mime_type.to_string(),
                };
                (source, None)
            }
            gltf::image::Source::Uri { uri, mime_type } => {
                if let Some((header, payload)) = uri.strip_prefix("data:").and_then(|r| r.split_once(',')) {
                    let bytes = BASE64
                        .decode(payload)
                        .map_err(|e| format!("image {index}: bad data URI ({e})"))?;
                    let mime_type = mime_type
                        .or_else(|| header.split(';').next())
                        .unwrap_or("image/png")
                        .to_string();
                    (ImageSource::Packed { bytes, mime_type }, None)
                } else {
                    let path: PathBuf = base_dir.join(uri);
                    let stem = path.file_stem().and_then(|s| s.to_str()).map(str::to_string);
                    (ImageSource::External(path), stem)
                }
            }
        };

        let base = image
            .name()
            .map(str::to_string)
            .or(base)
            .unwrap_or_else(|| format!("Image.{index:03}"));
        let name = unique_name(&base, &mut taken);

        let color_space = json["images"][index]["extras"]["color_space"]
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| {
                if linear.contains(&index) { "Non-Color" } else { "sRGB" }.to_string()
            });

        images.insert(
            name.clone(),
            SceneImage {
                name,
                source,
                color_space,
            },
        );
    }
    Ok(images)
}

/// Images used as normal or metallic-roughness maps hold linear data.
fn linear_images(document: &gltf::Document) -> HashSet<usize> {
    let mut linear = HashSet::new();
    for material in document.materials() {
        if let Some(normal) = material.normal_texture() {
            linear.insert(normal.texture().source().index());
        }
        if let Some(mr) = material.pbr_metallic_roughness().metallic_roughness_texture() {
            linear.insert(mr.texture().source().index());
        }
    }
    linear
}
