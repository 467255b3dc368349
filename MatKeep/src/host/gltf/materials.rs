//! glTF 2.0 material, texture and image objects written on export.
//!
//! Only the fields the exporter fills are modelled; everything optional is
//! left out of the JSON when unset.

use serde::Serialize;

// Sampler enums from the glTF 2.0 schema
const FILTER_LINEAR: u32 = 9729;
const FILTER_LINEAR_MIPMAP_LINEAR: u32 = 9987;
const WRAP_REPEAT: u32 = 10497;

/// Image whose bytes live in a buffer view of the binary chunk.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GltfImage {
    pub buffer_view: usize,
    pub mime_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Host color space, read back on load.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extras: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GltfSampler {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mag_filter: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_filter: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wrap_s: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wrap_t: Option<u32>,
}

impl Default for GltfSampler {
    /// Trilinear, repeating.
    fn default() -> Self {
        Self {
            mag_filter: Some(FILTER_LINEAR),
            min_filter: Some(FILTER_LINEAR_MIPMAP_LINEAR),
            wrap_s: Some(WRAP_REPEAT),
            wrap_t: Some(WRAP_REPEAT),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GltfTexture {
    pub source: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sampler: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Reference from a material slot to a texture.
#[derive(Debug, Clone, Serialize)]
pub struct GltfTextureInfo {
    pub index: usize,
}

/// Normal map reference; `scale` multiplies the tangent-space XY.
#[derive(Debug, Clone, Serialize)]
pub struct GltfNormalTextureInfo {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<f32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GltfPbrMetallicRoughness {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_color_factor: Option<[f32; 4]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_color_texture: Option<GltfTextureInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metallic_factor: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roughness_factor: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metallic_roughness_texture: Option<GltfTextureInfo>,
}

impl Default for GltfPbrMetallicRoughness {
    /// The schema defaults, written out explicitly.
    fn default() -> Self {
        Self {
            base_color_factor: Some([1.0; 4]),
            base_color_texture: None,
            metallic_factor: Some(1.0),
            roughness_factor: Some(1.0),
            metallic_roughness_texture: None,
        }
    }
}

/// A glTF material. The baked PBR fields are what other viewers render;
/// `extras` carries the full node tree for a round trip through MatKeep.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GltfMaterial {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pbr_metallic_roughness: Option<GltfPbrMetallicRoughness>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normal_texture: Option<GltfNormalTextureInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emissive_texture: Option<GltfTextureInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emissive_factor: Option<[f32; 3]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alpha_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub double_sided: Option<bool>,
    /// Host node tree (`node_tree`, `use_nodes`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extras: Option<serde_json::Value>,
}

impl GltfMaterial {
    /// Default PBR block, nothing else set.
    #[must_use]
    pub fn named(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            pbr_metallic_roughness: Some(GltfPbrMetallicRoughness::default()),
            normal_texture: None,
            emissive_texture: None,
            emissive_factor: None,
            alpha_mode: None,
            double_sided: None,
            extras: None,
        }
    }
}
