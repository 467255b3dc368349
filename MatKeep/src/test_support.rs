//! Fixture builders for unit tests.

use std::path::Path;

use image::{ImageEncoder, Rgba, RgbaImage};
use image::codecs::png::PngEncoder;
use serde_json::{Value, json};

use crate::host::gltf::glb;

/// Solid-color square PNG.
pub fn png_bytes(size: u32, color: [u8; 4]) -> Vec<u8> {
    let img = RgbaImage::from_pixel(size, size, Rgba(color));
    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(img.as_raw(), size, size, image::ExtendedColorType::Rgba8)
        .unwrap();
    out
}

pub struct FixtureMaterial {
    pub name: String,
    pub base_color: [f32; 4],
    /// Base color image name and size.
    pub texture: Option<(String, u32)>,
}

impl FixtureMaterial {
    pub fn textured(name: &str, image: &str, size: u32) -> Self {
        Self {
            name: name.to_string(),
            base_color: [1.0; 4],
            texture: Some((image.to_string(), size)),
        }
    }

    pub fn plain(name: &str, base_color: [f32; 4]) -> Self {
        Self {
            name: name.to_string(),
            base_color,
            texture: None,
        }
    }
}

pub struct FixtureMesh {
    pub name: String,
    /// Material index per primitive.
    pub primitives: Vec<Option<usize>>,
}

impl FixtureMesh {
    pub fn new(name: &str, primitives: &[Option<usize>]) -> Self {
        Self {
            name: name.to_string(),
            primitives: primitives.to_vec(),
        }
    }
}

/// Write a GLB with one triangle per primitive.
pub fn write_fixture_glb(path: &Path, materials: &[FixtureMaterial], meshes: &[FixtureMesh]) {
    let mut bin: Vec<u8> = Vec::new();
    for v in [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0] {
        bin.extend_from_slice(&v.to_le_bytes());
    }
    let mut buffer_views = vec![json!({"buffer": 0, "byteOffset": 0, "byteLength": 36, "target": 34962})];

    let mut images = Vec::new();
    let mut textures = Vec::new();
    let mut gltf_materials = Vec::new();
    for material in materials {
        let mut pbr = json!({
            "baseColorFactor": material.base_color,
            "metallicFactor": 0.0,
            "roughnessFactor": 0.5
        });
        if let Some((image, size)) = &material.texture {
            let png = png_bytes(*size, [200, 120, 90, 255]);
            while bin.len() % 4 != 0 {
                bin.push(0);
            }
            buffer_views.push(json!({"buffer": 0, "byteOffset": bin.len(), "byteLength": png.len()}));
            bin.extend_from_slice(&png);
            images.push(json!({"bufferView": buffer_views.len() - 1, "mimeType": "image/png", "name": image}));
            textures.push(json!({"source": images.len() - 1, "sampler": 0}));
            pbr["baseColorTexture"] = json!({"index": textures.len() - 1});
        }
        gltf_materials.push(json!({"name": material.name, "pbrMetallicRoughness": pbr}));
    }

    let gltf_meshes: Vec<Value> = meshes
        .iter()
        .map(|mesh| {
            let primitives: Vec<Value> = mesh
                .primitives
                .iter()
                .map(|material| {
                    let mut p = json!({"attributes": {"POSITION": 0}});
                    if let Some(m) = material {
                        p["material"] = json!(m);
                    }
                    p
                })
                .collect();
            json!({"name": mesh.name, "primitives": primitives})
        })
        .collect();
    let nodes: Vec<Value> = (0..meshes.len()).map(|i| json!({"mesh": i})).collect();

    let mut document = json!({
        "asset": {"version": "2.0"},
        "scene": 0,
        "scenes": [{"nodes": (0..meshes.len()).collect::<Vec<_>>()}],
        "nodes": nodes,
        "meshes": gltf_meshes,
        "accessors": [{
            "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
            "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]
        }],
        "bufferViews": buffer_views,
        "buffers": [{"byteLength": bin.len()}]
    });
    if !gltf_materials.is_empty() {
        document["materials"] = json!(gltf_materials);
    }
    if !images.is_empty() {
        document["images"] = json!(images);
        document["textures"] = json!(textures);
        document["samplers"] = json!([{}]);
    }

    let json_bytes = serde_json::to_vec(&document).unwrap();
    std::fs::write(path, glb::write_glb(&json_bytes, &bin).unwrap()).unwrap();
}
