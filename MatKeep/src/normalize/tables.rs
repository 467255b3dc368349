//! Runtime identifier tables.
//!
//! Each entry is keyed on the first host version that uses the identifier.
//! Older identifiers stay in the tables after they are superseded so that
//! reading an asset authored on an old host still normalizes.

use super::version::HostVersion;
use super::vocabulary::CanonicalNodeType as N;
use super::vocabulary::CanonicalSocketName as S;
use super::vocabulary::SocketDirection::{self, Input as In, Output as Out};

/// One runtime node identifier.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeNode {
    pub id: &'static str,
    pub canonical: N,
    pub since: HostVersion,
}

/// One runtime socket name on one runtime node type.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeSocket {
    pub node: &'static str,
    pub direction: SocketDirection,
    pub canonical: S,
    pub name: &'static str,
    pub since: HostVersion,
}

const BASE: HostVersion = HostVersion::BASELINE;
const V3_3: HostVersion = HostVersion::new(3, 3);
const V3_4: HostVersion = HostVersion::new(3, 4);
const V4_0: HostVersion = HostVersion::new(4, 0);

const fn node(id: &'static str, canonical: N, since: HostVersion) -> RuntimeNode {
    RuntimeNode { id, canonical, since }
}

const fn sock(
    node: &'static str,
    direction: SocketDirection,
    canonical: S,
    name: &'static str,
) -> RuntimeSocket {
    RuntimeSocket { node, direction, canonical, name, since: BASE }
}

const fn sock_since(
    node: &'static str,
    direction: SocketDirection,
    canonical: S,
    name: &'static str,
    since: HostVersion,
) -> RuntimeSocket {
    RuntimeSocket { node, direction, canonical, name, since }
}

pub const RUNTIME_NODES: &[RuntimeNode] = &[
    node("ShaderNodeBsdfPrincipled", N::PrincipledSurface, BASE),
    node("ShaderNodeBsdfDiffuse", N::DiffuseSurface, BASE),
    node("ShaderNodeEmission", N::EmissionSurface, BASE),
    node("ShaderNodeBsdfTransparent", N::TransparentSurface, BASE),
    node("ShaderNodeBsdfSheen", N::SheenSurface, V4_0),
    node("ShaderNodeMixShader", N::MixSurface, BASE),
    node("ShaderNodeOutputMaterial", N::SurfaceOutput, BASE),
    node("ShaderNodeTexImage", N::ImageSample, BASE),
    node("ShaderNodeMixRGB", N::ColorMix, BASE),
    node("ShaderNodeMix", N::ColorMix, V3_4),
    node("ShaderNodeSeparateRGB", N::SeparateChannels, BASE),
    node("ShaderNodeSeparateColor", N::SeparateChannels, V3_3),
    node("ShaderNodeCombineRGB", N::CombineChannels, BASE),
    node("ShaderNodeCombineColor", N::CombineChannels, V3_3),
    node("ShaderNodeNormalMap", N::NormalFromTangentMap, BASE),
    node("ShaderNodeBump", N::Bump, BASE),
    node("ShaderNodeTexCoord", N::TextureCoordinate, BASE),
    node("ShaderNodeValue", N::Value, BASE),
    node("ShaderNodeRGB", N::Rgb, BASE),
];

const PRINCIPLED: &str = "ShaderNodeBsdfPrincipled";
const DIFFUSE: &str = "ShaderNodeBsdfDiffuse";
const EMISSION: &str = "ShaderNodeEmission";
const TRANSPARENT: &str = "ShaderNodeBsdfTransparent";
const SHEEN: &str = "ShaderNodeBsdfSheen";
const MIX_SHADER: &str = "ShaderNodeMixShader";
const OUTPUT: &str = "ShaderNodeOutputMaterial";
const TEX_IMAGE: &str = "ShaderNodeTexImage";
const MIX_RGB: &str = "ShaderNodeMixRGB";
const MIX: &str = "ShaderNodeMix";
const SEPARATE_RGB: &str = "ShaderNodeSeparateRGB";
const SEPARATE_COLOR: &str = "ShaderNodeSeparateColor";
const COMBINE_RGB: &str = "ShaderNodeCombineRGB";
const COMBINE_COLOR: &str = "ShaderNodeCombineColor";
const NORMAL_MAP: &str = "ShaderNodeNormalMap";
const BUMP: &str = "ShaderNodeBump";
const TEX_COORD: &str = "ShaderNodeTexCoord";
const VALUE: &str = "ShaderNodeValue";
const RGB: &str = "ShaderNodeRGB";

pub const RUNTIME_SOCKETS: &[RuntimeSocket] = &[
    // Principled BSDF; 4.0 renamed several inputs
    sock(PRINCIPLED, In, S::BaseColor, "Base Color"),
    sock(PRINCIPLED, In, S::Metallic, "Metallic"),
    sock(PRINCIPLED, In, S::Roughness, "Roughness"),
    sock(PRINCIPLED, In, S::Ior, "IOR"),
    sock(PRINCIPLED, In, S::Alpha, "Alpha"),
    sock(PRINCIPLED, In, S::Normal, "Normal"),
    sock(PRINCIPLED, In, S::SpecularLevel, "Specular"),
    sock_since(PRINCIPLED, In, S::SpecularLevel, "Specular IOR Level", V4_0),
    sock(PRINCIPLED, In, S::EmissionColor, "Emission"),
    sock_since(PRINCIPLED, In, S::EmissionColor, "Emission Color", V4_0),
    sock(PRINCIPLED, In, S::EmissionStrength, "Emission Strength"),
    sock(PRINCIPLED, In, S::SubsurfaceWeight, "Subsurface"),
    sock_since(PRINCIPLED, In, S::SubsurfaceWeight, "Subsurface Weight", V4_0),
    sock(PRINCIPLED, Out, S::Shader, "BSDF"),
    // Diffuse BSDF
    sock(DIFFUSE, In, S::Color, "Color"),
    sock(DIFFUSE, In, S::Roughness, "Roughness"),
    sock(DIFFUSE, In, S::Normal, "Normal"),
    sock(DIFFUSE, Out, S::Shader, "BSDF"),
    // Emission
    sock(EMISSION, In, S::Color, "Color"),
    sock(EMISSION, In, S::Strength, "Strength"),
    sock(EMISSION, Out, S::Shader, "Emission"),
    // Transparent BSDF
    sock(TRANSPARENT, In, S::Color, "Color"),
    sock(TRANSPARENT, Out, S::Shader, "BSDF"),
    // Sheen BSDF
    sock_since(SHEEN, In, S::Color, "Color", V4_0),
    sock_since(SHEEN, In, S::Roughness, "Roughness", V4_0),
    sock_since(SHEEN, In, S::Normal, "Normal", V4_0),
    sock_since(SHEEN, Out, S::Shader, "BSDF", V4_0),
    // Mix Shader; both shader inputs share a label, so the identifiers are used
    sock(MIX_SHADER, In, S::Factor, "Fac"),
    sock(MIX_SHADER, In, S::ShaderA, "Shader"),
    sock(MIX_SHADER, In, S::ShaderB, "Shader_001"),
    sock(MIX_SHADER, Out, S::Shader, "Shader"),
    // Material Output
    sock(OUTPUT, In, S::Surface, "Surface"),
    sock(OUTPUT, In, S::Volume, "Volume"),
    sock(OUTPUT, In, S::Displacement, "Displacement"),
    // Image Texture
    sock(TEX_IMAGE, In, S::Vector, "Vector"),
    sock(TEX_IMAGE, Out, S::Color, "Color"),
    sock(TEX_IMAGE, Out, S::Alpha, "Alpha"),
    // Legacy MixRGB
    sock(MIX_RGB, In, S::Factor, "Fac"),
    sock(MIX_RGB, In, S::ColorA, "Color1"),
    sock(MIX_RGB, In, S::ColorB, "Color2"),
    sock(MIX_RGB, Out, S::Color, "Color"),
    // Mix (3.4+), color mode
    sock_since(MIX, In, S::Factor, "Factor", V3_4),
    sock_since(MIX, In, S::ColorA, "A", V3_4),
    sock_since(MIX, In, S::ColorB, "B", V3_4),
    sock_since(MIX, Out, S::Color, "Result", V3_4),
    // Legacy Separate RGB
    sock(SEPARATE_RGB, In, S::Color, "Image"),
    sock(SEPARATE_RGB, Out, S::Red, "R"),
    sock(SEPARATE_RGB, Out, S::Green, "G"),
    sock(SEPARATE_RGB, Out, S::Blue, "B"),
    // Separate Color (3.3+)
    sock_since(SEPARATE_COLOR, In, S::Color, "Color", V3_3),
    sock_since(SEPARATE_COLOR, Out, S::Red, "Red", V3_3),
    sock_since(SEPARATE_COLOR, Out, S::Green, "Green", V3_3),
    sock_since(SEPARATE_COLOR, Out, S::Blue, "Blue", V3_3),
    // Legacy Combine RGB
    sock(COMBINE_RGB, In, S::Red, "R"),
    sock(COMBINE_RGB, In, S::Green, "G"),
    sock(COMBINE_RGB, In, S::Blue, "B"),
    sock(COMBINE_RGB, Out, S::Color, "Image"),
    // Combine Color (3.3+)
    sock_since(COMBINE_COLOR, In, S::Red, "Red", V3_3),
    sock_since(COMBINE_COLOR, In, S::Green, "Green", V3_3),
    sock_since(COMBINE_COLOR, In, S::Blue, "Blue", V3_3),
    sock_since(COMBINE_COLOR, Out, S::Color, "Color", V3_3),
    // Normal Map
    sock(NORMAL_MAP, In, S::Strength, "Strength"),
    sock(NORMAL_MAP, In, S::Color, "Color"),
    sock(NORMAL_MAP, Out, S::Normal, "Normal"),
    // Bump
    sock(BUMP, In, S::Strength, "Strength"),
    sock(BUMP, In, S::Distance, "Distance"),
    sock(BUMP, In, S::Height, "Height"),
    sock(BUMP, In, S::Normal, "Normal"),
    sock(BUMP, Out, S::Normal, "Normal"),
    // Texture Coordinate
    sock(TEX_COORD, Out, S::Generated, "Generated"),
    sock(TEX_COORD, Out, S::Normal, "Normal"),
    sock(TEX_COORD, Out, S::Uv, "UV"),
    sock(TEX_COORD, Out, S::Object, "Object"),
    // Value / RGB
    sock(VALUE, Out, S::Value, "Value"),
    sock(RGB, Out, S::Color, "Color"),
];

/// Pick the entry in effect at `version`: the newest one introduced at or
/// before it, or the oldest one when `version` predates them all.
pub fn in_effect<T, F>(entries: impl Iterator<Item = T>, version: HostVersion, since: F) -> Option<T>
where
    T: Copy,
    F: Fn(&T) -> HostVersion,
{
    let mut current: Option<T> = None;
    let mut earliest: Option<T> = None;
    for entry in entries {
        let introduced = since(&entry);
        if introduced <= version && current.is_none_or(|c| since(&c) < introduced) {
            current = Some(entry);
        }
        if earliest.is_none_or(|e| introduced < since(&e)) {
            earliest = Some(entry);
        }
    }
    current.or(earliest)
}
