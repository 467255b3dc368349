//! Building a host node tree from glTF PBR metallic-roughness fields.
//!
//! The layout matches what a host importer produces for the same material:
//! a Principled BSDF feeding the Material Output, one Image Texture per
//! texture slot, a channel split for the packed metallic-roughness map and
//! a Normal Map node for the normal texture.

use crate::error::Result;
use crate::host::scene::{NodeTree, SceneNode};
use crate::normalize::HostVersion;
use crate::value::ParamValue;

use super::instantiate;

const SEPARATE_COLOR_SINCE: HostVersion = HostVersion::new(3, 3);
const RENAMED_PRINCIPLED_SINCE: HostVersion = HostVersion::new(4, 0);

pub(super) fn synthesize(
    material: &gltf::Material<'_>,
    image_names: &[String],
    version: HostVersion,
) -> Result<NodeTree> {
    let mut tree = NodeTree::default();
    let pbr = material.pbr_metallic_roughness();
    let image_of = |texture: gltf::Texture<'_>| image_names.get(texture.source().index()).cloned();

    let mut output = instantiate(version, "ShaderNodeOutputMaterial", "Material Output")?;
    output.location = [300.0, 300.0];
    let output = tree.add_node(output);

    let mut bsdf = instantiate(version, "ShaderNodeBsdfPrincipled", "Principled BSDF")?;
    bsdf.location = [10.0, 300.0];
    bsdf.set_input("Base Color", ParamValue::rgba(pbr.base_color_factor()));
    bsdf.set_input("Metallic", ParamValue::Scalar(pbr.metallic_factor()));
    bsdf.set_input("Roughness", ParamValue::Scalar(pbr.roughness_factor()));
    let blended = material.alpha_mode() != gltf::material::AlphaMode::Opaque;
    if blended {
        bsdf.set_input("Alpha", ParamValue::Scalar(pbr.base_color_factor()[3]));
    }
    let emission_socket = if version >= RENAMED_PRINCIPLED_SINCE {
        "Emission Color"
    } else {
        "Emission"
    };
    let emissive = material.emissive_factor();
    let [r, g, b] = emissive;
    bsdf.set_input(emission_socket, ParamValue::rgba([r, g, b, 1.0]));
    if emissive.iter().any(|c| *c > 0.0) || material.emissive_texture().is_some() {
        bsdf.set_input("Emission Strength", ParamValue::Scalar(1.0));
    }
    let bsdf = tree.add_node(bsdf);
    tree.link(&bsdf, "BSDF", &output, "Surface")?;

    let mut row = 300.0;
    let mut image_node = |tree: &mut NodeTree, image: Option<String>| -> Result<String> {
        let mut node: SceneNode = instantiate(version, "ShaderNodeTexImage", "Image Texture")?;
        node.location = [-560.0, row];
        node.image = image;
        row -= 300.0;
        Ok(tree.add_node(node))
    };

    if let Some(info) = pbr.base_color_texture() {
        let tex = image_node(&mut tree, image_of(info.texture()))?;
        tree.link(&tex, "Color", &bsdf, "Base Color")?;
        if blended {
            tree.link(&tex, "Alpha", &bsdf, "Alpha")?;
        }
    }

    if let Some(info) = pbr.metallic_roughness_texture() {
        let tex = image_node(&mut tree, image_of(info.texture()))?;
        let (type_id, input, green, blue) = if version >= SEPARATE_COLOR_SINCE {
            ("ShaderNodeSeparateColor", "Color", "Green", "Blue")
        } else {
            ("ShaderNodeSeparateRGB", "Image", "G", "B")
        };
        let label = if version >= SEPARATE_COLOR_SINCE { "Separate Color" } else { "Separate RGB" };
        let mut split = instantiate(version, type_id, label)?;
        split.location = [-240.0, 0.0];
        let split = tree.add_node(split);
        tree.link(&tex, "Color", &split, input)?;
        tree.link(&split, green, &bsdf, "Roughness")?;
        tree.link(&split, blue, &bsdf, "Metallic")?;
    }

    if let Some(normal) = material.normal_texture() {
        let tex = image_node(&mut tree, image_of(normal.texture()))?;
        let mut map = instantiate(version, "ShaderNodeNormalMap", "Normal Map")?;
        map.location = [-240.0, -300.0];
        map.set_input("Strength", ParamValue::Scalar(normal.scale()));
        let map = tree.add_node(map);
        tree.link(&tex, "Color", &map, "Color")?;
        tree.link(&map, "Normal", &bsdf, "Normal")?;
    }

    if let Some(info) = material.emissive_texture() {
        let tex = image_node(&mut tree, image_of(info.texture()))?;
        tree.link(&tex, "Color", &bsdf, emission_socket)?;
    }

    Ok(tree)
}
