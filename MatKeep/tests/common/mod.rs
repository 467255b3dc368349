//! Asset fixtures shared by the integration tests.
#![allow(dead_code)]

use std::path::Path;

use image::codecs::png::PngEncoder;
use image::{ImageEncoder, Rgba, RgbaImage};
use matkeep::host::gltf::glb::write_glb;
use serde_json::{Value, json};

pub const MATERIAL: &str = "Skin";
pub const IMAGE: &str = "skin_diffuse";
pub const MESH: &str = "Body";

fn png_bytes(size: u32) -> Vec<u8> {
    let img = RgbaImage::from_pixel(size, size, Rgba([180, 110, 80, 255]));
    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(img.as_raw(), size, size, image::ExtendedColorType::Rgba8)
        .unwrap();
    out
}

fn triangle() -> Vec<u8> {
    [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]
        .iter()
        .flat_map(|v| v.to_le_bytes())
        .collect()
}

fn write(path: &Path, mut document: Value, bin: &[u8]) {
    document["buffers"] = json!([{"byteLength": bin.len()}]);
    let json_bytes = serde_json::to_vec(&document).unwrap();
    std::fs::write(path, write_glb(&json_bytes, bin).unwrap()).unwrap();
}

fn base_document(primitive: Value) -> Value {
    json!({
        "asset": {"version": "2.0"},
        "scene": 0,
        "scenes": [{"nodes": [0]}],
        "nodes": [{"mesh": 0}],
        "meshes": [{"name": MESH, "primitives": [primitive]}],
        "accessors": [{
            "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
            "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]
        }],
        "bufferViews": [{"buffer": 0, "byteOffset": 0, "byteLength": 36, "target": 34962}]
    })
}

/// The source asset: one mesh using one material whose base color samples
/// an embedded PNG.
pub fn write_source_asset(path: &Path) {
    let mut bin = triangle();
    let png = png_bytes(64);
    let png_offset = bin.len();
    bin.extend_from_slice(&png);

    let mut document = base_document(json!({"attributes": {"POSITION": 0}, "material": 0}));
    document["bufferViews"]
        .as_array_mut()
        .unwrap()
        .push(json!({"buffer": 0, "byteOffset": png_offset, "byteLength": png.len()}));
    document["images"] = json!([{"bufferView": 1, "mimeType": "image/png", "name": IMAGE}]);
    document["samplers"] = json!([{}]);
    document["textures"] = json!([{"source": 0, "sampler": 0}]);
    document["materials"] = json!([{
        "name": MATERIAL,
        "pbrMetallicRoughness": {
            "baseColorFactor": [1.0, 1.0, 1.0, 1.0],
            "baseColorTexture": {"index": 0},
            "metallicFactor": 0.0,
            "roughnessFactor": 0.6
        }
    }]);
    write(path, document, &bin);
}

/// What the retargeting pipeline hands back: the same mesh with every
/// material stripped.
pub fn write_retargeted_asset(path: &Path) {
    let document = base_document(json!({"attributes": {"POSITION": 0}}));
    write(path, document, &triangle());
}
