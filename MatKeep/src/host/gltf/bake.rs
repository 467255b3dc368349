//! Baking a host node tree down to a glTF PBR material.
//!
//! Only the patterns a glTF material can express are traced: image
//! textures wired (directly, or through a channel split / normal map node)
//! into the surface shader. Everything else falls back to factors. The
//! full tree is always stored in `extras`, so nothing is lost for hosts
//! that read it back.

use indexmap::IndexMap;
use serde_json::json;

use crate::error::Result;
use crate::host::scene::{NodeTree, SceneMaterial, SceneNode};
use crate::value::ParamValue;

use super::materials::{
    GltfMaterial, GltfNormalTextureInfo, GltfPbrMetallicRoughness, GltfTextureInfo,
};

const TEX_IMAGE: &str = "ShaderNodeTexImage";

/// Build the glTF material for `material`.
///
/// `textures` maps image names to glTF texture indices.
pub(super) fn bake_material(
    material: &SceneMaterial,
    textures: &IndexMap<String, usize>,
) -> Result<GltfMaterial> {
    let mut out = GltfMaterial::named(&material.name);
    out.extras = Some(json!({
        "use_nodes": material.use_nodes,
        "node_tree": serde_json::to_value(&material.node_tree)?,
    }));
    if !material.use_nodes {
        return Ok(out);
    }

    let tree = &material.node_tree;
    let Some(shader) = surface_shader(tree) else {
        return Ok(out);
    };
    let baker = Baker { tree, textures };
    let mut pbr = GltfPbrMetallicRoughness::default();

    match shader.type_id.as_str() {
        "ShaderNodeBsdfPrincipled" => {
            let (color, texture) = baker.color_input(shader, &["Base Color"]);
            pbr.base_color_factor = Some(color);
            pbr.base_color_texture = texture;
            pbr.metallic_factor = Some(scalar(shader, &["Metallic"], 0.0));
            pbr.roughness_factor = Some(scalar(shader, &["Roughness"], 0.5));

            if let Some(texture) = baker.channel_split_texture(shader, &["Roughness", "Metallic"]) {
                pbr.metallic_roughness_texture = Some(texture);
                pbr.metallic_factor = Some(1.0);
                pbr.roughness_factor = Some(1.0);
            }

            let alpha_linked = tree.is_linked(&shader.name, "Alpha");
            let alpha = scalar(shader, &["Alpha"], 1.0);
            if alpha_linked || alpha < 1.0 {
                out.alpha_mode = Some("BLEND".to_string());
                if let Some(factor) = pbr.base_color_factor.as_mut() {
                    factor[3] = if alpha_linked { 1.0 } else { alpha };
                }
            }

            out.normal_texture = baker.normal_texture(shader);

            let strength = scalar(shader, &["Emission Strength"], 1.0).clamp(0.0, 1.0);
            let (emission, texture) = baker.color_input(shader, &["Emission Color", "Emission"]);
            if texture.is_some() {
                out.emissive_texture = texture;
                out.emissive_factor = Some([strength; 3]);
            } else if strength > 0.0 && emission[..3].iter().any(|c| *c > 0.0) {
                out.emissive_factor = Some([
                    emission[0] * strength,
                    emission[1] * strength,
                    emission[2] * strength,
                ]);
            }
        }
        "ShaderNodeBsdfDiffuse" | "ShaderNodeBsdfSheen" => {
            let (color, texture) = baker.color_input(shader, &["Color"]);
            pbr.base_color_factor = Some(color);
            pbr.base_color_texture = texture;
            pbr.metallic_factor = Some(0.0);
            pbr.roughness_factor = Some(scalar(shader, &["Roughness"], 0.5).max(0.5));
            out.normal_texture = baker.normal_texture(shader);
        }
        "ShaderNodeEmission" => {
            let (color, texture) = baker.color_input(shader, &["Color"]);
            pbr.base_color_factor = Some([0.0, 0.0, 0.0, 1.0]);
            out.emissive_factor = Some([color[0], color[1], color[2]]);
            out.emissive_texture = texture;
        }
        "ShaderNodeBsdfTransparent" => {
            pbr.base_color_factor = Some([1.0, 1.0, 1.0, 0.0]);
            out.alpha_mode = Some("BLEND".to_string());
        }
        _ => {}
    }

    out.pbr_metallic_roughness = Some(pbr);
    Ok(out)
}

/// The shader plugged into the material output's surface, looking through
/// one Mix Shader.
fn surface_shader(tree: &NodeTree) -> Option<&SceneNode> {
    let output = tree
        .nodes
        .iter()
        .find(|n| n.type_id == "ShaderNodeOutputMaterial")?;
    let link = tree.link_into(&output.name, "Surface")?;
    let shader = tree.node(&link.from_node)?;
    if shader.type_id != "ShaderNodeMixShader" {
        return Some(shader);
    }
    ["Shader", "Shader_001"]
        .iter()
        .find_map(|socket| tree.link_into(&shader.name, socket))
        .and_then(|link| tree.node(&link.from_node))
}

fn scalar(node: &SceneNode, names: &[&str], fallback: f32) -> f32 {
    node.input_value(names)
        .and_then(ParamValue::as_scalar)
        .unwrap_or(fallback)
}

struct Baker<'a> {
    tree: &'a NodeTree,
    textures: &'a IndexMap<String, usize>,
}

impl Baker<'_> {
    /// Node feeding the first linked input among `sockets`.
    fn upstream(&self, node: &SceneNode, sockets: &[&str]) -> Option<&SceneNode> {
        sockets
            .iter()
            .find_map(|socket| self.tree.link_into(&node.name, socket))
            .and_then(|link| self.tree.node(&link.from_node))
    }

    /// Texture index of an image node.
    fn texture_of(&self, node: &SceneNode) -> Option<GltfTextureInfo> {
        if node.type_id != TEX_IMAGE {
            return None;
        }
        let index = *self.textures.get(node.image.as_deref()?)?;
        Some(GltfTextureInfo { index })
    }

    /// Constant value and directly linked texture of a color input.
    fn color_input(&self, node: &SceneNode, sockets: &[&str]) -> ([f32; 4], Option<GltfTextureInfo>) {
        let texture = self
            .upstream(node, sockets)
            .and_then(|upstream| self.texture_of(upstream));
        let color = if texture.is_some() {
            [1.0; 4]
        } else {
            node.input_value(sockets)
                .and_then(|v| v.as_array::<4>(1.0))
                .unwrap_or([1.0; 4])
        };
        (color, texture)
    }

    /// Texture feeding a Separate RGB / Separate Color node wired into any of `sockets`.
    fn channel_split_texture(&self, node: &SceneNode, sockets: &[&str]) -> Option<GltfTextureInfo> {
        let split = self.upstream(node, sockets)?;
        if !matches!(split.type_id.as_str(), "ShaderNodeSeparateRGB" | "ShaderNodeSeparateColor") {
            return None;
        }
        self.upstream(split, &["Color", "Image"])
            .and_then(|image| self.texture_of(image))
    }

    /// Texture behind a Normal Map node wired into `Normal`.
    fn normal_texture(&self, node: &SceneNode) -> Option<GltfNormalTextureInfo> {
        let map = self.upstream(node, &["Normal"])?;
        if map.type_id != "ShaderNodeNormalMap" {
            return None;
        }
        let texture = self.upstream(map, &["Color"]).and_then(|image| self.texture_of(image))?;
        Some(GltfNormalTextureInfo {
            index: texture.index,
            scale: Some(scalar(map, &["Strength"], 1.0)),
        })
    }
}
