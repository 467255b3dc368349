//! Writing a [`Scene`] back out as a self-contained GLB.
//!
//! Geometry is carried over from the loaded document untouched; materials,
//! textures, images and samplers are rebuilt from the scene. All buffers
//! are merged into the single GLB binary chunk, and image data from the
//! original asset is dropped before the scene's images are appended.

use std::collections::HashSet;
use std::io::Write;
use std::path::Path;

use image::ImageFormat;
use image::codecs::png::PngEncoder;
use indexmap::IndexMap;
use serde_json::{Value, json};

use crate::error::{Error, Result};
use crate::host::SaveOptions;
use crate::host::scene::{ImageSource, Scene, SceneImage};

use super::materials::{GltfImage, GltfMaterial, GltfSampler, GltfTexture};
use super::{bake, glb};

const GENERATOR: &str = concat!("MatKeep ", env!("CARGO_PKG_VERSION"));

/// Extension prefixes describing material data this exporter rewrites.
const MATERIAL_EXTENSION_PREFIXES: &[&str] = &["KHR_materials_", "KHR_texture_", "EXT_texture_"];

pub(super) fn save_scene(scene: &Scene, path: &Path, options: &SaveOptions) -> Result<u64> {
    let export_err = |message: String| Error::ExportFailed { message };
    let backing = scene
        .backing
        .as_ref()
        .ok_or_else(|| export_err("scene was not loaded from a glTF asset".to_string()))?;

    let mut document = backing.document.clone();
    let mut builder = BinBuilder::default();

    // Carry over every non-image buffer view into the merged buffer.
    let image_views: HashSet<u64> = document["images"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|image| image["bufferView"].as_u64())
        .collect();
    let views = document["bufferViews"].as_array().cloned().unwrap_or_default();
    let mut remap: Vec<Option<usize>> = vec![None; views.len()];
    for (index, view) in views.into_iter().enumerate() {
        if image_views.contains(&(index as u64)) {
            continue;
        }
        let buffer = view["buffer"].as_u64().unwrap_or(0) as usize;
        let offset = view["byteOffset"].as_u64().unwrap_or(0) as usize;
        let length = view["byteLength"].as_u64().unwrap_or(0) as usize;
        let data = backing
            .buffers
            .get(buffer)
            .and_then(|b| b.get(offset..offset + length))
            .ok_or_else(|| export_err(format!("bufferView {index} is out of range")))?;
        remap[index] = Some(builder.push_view(data, Some(view)));
    }
    remap_accessors(&mut document, &remap);

    // Images, one texture each.
    let mut images = Vec::new();
    let mut textures = Vec::new();
    let mut texture_of: IndexMap<String, usize> = IndexMap::new();
    for image in scene.images.values() {
        let Some((bytes, mime_type)) = embeddable(image, options)? else {
            continue;
        };
        let buffer_view = builder.push_view(&bytes, None);
        images.push(GltfImage {
            buffer_view,
            mime_type,
            name: Some(image.name.clone()),
            extras: Some(json!({ "color_space": image.color_space })),
        });
        texture_of.insert(image.name.clone(), textures.len());
        textures.push(GltfTexture {
            source: images.len() - 1,
            sampler: Some(0),
            name: Some(image.name.clone()),
        });
    }

    let materials = scene
        .materials
        .values()
        .map(|m| bake::bake_material(m, &texture_of))
        .collect::<Result<Vec<GltfMaterial>>>()?;

    assign_primitive_materials(&mut document, scene)?;

    let root = document
        .as_object_mut()
        .ok_or_else(|| export_err("document root is not an object".to_string()))?;
    set_or_remove(root, "materials", serde_json::to_value(&materials)?);
    set_or_remove(root, "textures", serde_json::to_value(&textures)?);
    set_or_remove(root, "images", serde_json::to_value(&images)?);
    let samplers = if textures.is_empty() {
        Vec::new()
    } else {
        vec![GltfSampler::default()]
    };
    set_or_remove(root, "samplers", serde_json::to_value(&samplers)?);
    set_or_remove(root, "bufferViews", Value::Array(builder.views));
    let buffers = if builder.data.is_empty() {
        json!([])
    } else {
        json!([{ "byteLength": builder.data.len() }])
    };
    set_or_remove(root, "buffers", buffers);
    for key in ["extensionsUsed", "extensionsRequired"] {
        if let Some(Value::Array(names)) = root.get_mut(key) {
            names.retain(|name| {
                name.as_str()
                    .is_none_or(|n| !MATERIAL_EXTENSION_PREFIXES.iter().any(|p| n.starts_with(p)))
            });
        }
    }
    if let Some(asset) = root.get_mut("asset").and_then(Value::as_object_mut) {
        asset.insert("generator".to_string(), json!(GENERATOR));
    }

    let json_bytes = serde_json::to_vec(&document)?;
    let glb_data = glb::write_glb(&json_bytes, &builder.data)?;
    write_atomically(path, &glb_data)?;

    tracing::debug!(
        "Saved {} ({} bytes, {} materials, {} images)",
        path.display(),
        glb_data.len(),
        materials.len(),
        images.len()
    );
    Ok(glb_data.len() as u64)
}

/// Write `bytes` to a temporary file next to `path`, then rename it over
/// `path`. A failed write leaves nothing behind.
fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut staged = tempfile::NamedTempFile::new_in(dir)?;
    staged.write_all(bytes)?;
    staged.flush()?;
    staged.persist(path).map_err(|e| Error::ExportFailed {
        message: format!("cannot write {}: {}", path.display(), e.error),
    })?;
    Ok(())
}

/// Merged binary buffer under construction.
#[derive(Default)]
struct BinBuilder {
    data: Vec<u8>,
    views: Vec<Value>,
}

impl BinBuilder {
    /// Append `bytes` as a new buffer view (4-byte aligned). `template`
    /// keeps attributes such as `byteStride` and `target` of a carried-over view.
    fn push_view(&mut self, bytes: &[u8], template: Option<Value>) -> usize {
        while self.data.len() % 4 != 0 {
            self.data.push(0);
        }
        let mut view = template.unwrap_or_else(|| json!({}));
        view["buffer"] = json!(0);
        view["byteOffset"] = json!(self.data.len());
        view["byteLength"] = json!(bytes.len());
        self.data.extend_from_slice(bytes);
        self.views.push(view);
        self.views.len() - 1
    }
}

fn remap_accessors(document: &mut Value, remap: &[Option<usize>]) {
    let Some(accessors) = document["accessors"].as_array_mut() else {
        return;
    };
    let fix = |slot: &mut Value| {
        if let Some(old) = slot.as_u64() {
            *slot = remap
                .get(old as usize)
                .copied()
                .flatten()
                .map_or(Value::Null, |new| json!(new));
        }
    };
    for accessor in accessors {
        if let Some(view) = accessor.get_mut("bufferView") {
            fix(view);
        }
        if let Some(sparse) = accessor.get_mut("sparse") {
            for part in ["indices", "values"] {
                if let Some(view) = sparse.get_mut(part).and_then(|p| p.get_mut("bufferView")) {
                    fix(view);
                }
            }
        }
    }
}

fn assign_primitive_materials(document: &mut Value, scene: &Scene) -> Result<()> {
    let Some(meshes) = document["meshes"].as_array_mut() else {
        return Ok(());
    };
    if meshes.len() != scene.meshes.len() {
        return Err(Error::ExportFailed {
            message: format!(
                "scene has {} meshes but the asset has {}",
                scene.meshes.len(),
                meshes.len()
            ),
        });
    }

    for (json_mesh, mesh) in meshes.iter_mut().zip(&scene.meshes) {
        if let Some(primitives) = json_mesh["primitives"].as_array_mut() {
            for (index, primitive) in primitives.iter_mut().enumerate() {
                let material = mesh
                    .primitive_material(index)
                    .and_then(|name| scene.materials.get_index_of(name));
                match (material, primitive.as_object_mut()) {
                    (Some(material), Some(object)) => {
                        object.insert("material".to_string(), json!(material));
                    }
                    (None, Some(object)) => {
                        object.remove("material");
                    }
                    _ => {}
                }
            }
        }
        if !json_mesh["extras"].is_object() {
            json_mesh["extras"] = json!({});
        }
        json_mesh["extras"]["material_slots"] = json!(mesh.material_slots);
        json_mesh["extras"]["primitive_slots"] = json!(mesh.primitive_slots);
    }
    Ok(())
}

fn set_or_remove(root: &mut serde_json::Map<String, Value>, key: &str, value: Value) {
    let empty = value.as_array().is_some_and(Vec::is_empty);
    if empty {
        root.remove(key);
    } else {
        root.insert(key.to_string(), value);
    }
}

/// Bytes and MIME type to embed for `image`, downscaled if requested.
///
/// Returns `None` for external files that no longer exist.
fn embeddable(image: &SceneImage, options: &SaveOptions) -> Result<Option<(Vec<u8>, String)>> {
    let bytes = match &image.source {
        ImageSource::Packed { bytes, .. } => bytes.clone(),
        ImageSource::External(path) => match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("Image '{}' not found at {}, not embedded", image.name, path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        },
    };

    let format = image::guess_format(&bytes).ok();
    let native = matches!(format, Some(ImageFormat::Png | ImageFormat::Jpeg));
    let oversized = |(w, h): (u32, u32)| options.max_texture_size.is_some_and(|max| w.max(h) > max);

    let needs_decode = !native
        || image::ImageReader::new(std::io::Cursor::new(&bytes))
            .with_guessed_format()
            .ok()
            .and_then(|r| r.into_dimensions().ok())
            .is_some_and(oversized);
    if !needs_decode {
        let mime = format.map_or("image/png", |f| f.to_mime_type());
        return Ok(Some((bytes, mime.to_string())));
    }

    let decoded = match image::load_from_memory(&bytes) {
        Ok(decoded) => decoded,
        Err(e) => {
            tracing::warn!("Image '{}' cannot be decoded ({e}), not embedded", image.name);
            return Ok(None);
        }
    };
    let decoded = match options.max_texture_size {
        Some(max) if decoded.width().max(decoded.height()) > max => {
            decoded.resize(max, max, image::imageops::FilterType::Triangle)
        }
        _ => decoded,
    };
    let mut png = Vec::new();
    decoded.write_with_encoder(PngEncoder::new(&mut png))?;
    Ok(Some((png, "image/png".to_string())))
}
