//! Node types the host can instantiate, per host version.
//!
//! This is the host's own view of its node library: availability windows,
//! socket names and default values, including types that were removed or
//! renamed between releases.

use indexmap::IndexMap;

use crate::normalize::HostVersion;
use crate::value::ParamValue;

use super::scene::SceneNode;

const V3_3: HostVersion = HostVersion::new(3, 3);
const V3_4: HostVersion = HostVersion::new(3, 4);
const V4_0: HostVersion = HostVersion::new(4, 0);

/// Every node type this host has ever known, available or not.
pub const NODE_TYPES: &[&str] = &[
    "ShaderNodeBsdfPrincipled",
    "ShaderNodeBsdfDiffuse",
    "ShaderNodeEmission",
    "ShaderNodeBsdfTransparent",
    "ShaderNodeBsdfSheen",
    "ShaderNodeMixShader",
    "ShaderNodeOutputMaterial",
    "ShaderNodeTexImage",
    "ShaderNodeMixRGB",
    "ShaderNodeMix",
    "ShaderNodeSeparateRGB",
    "ShaderNodeSeparateColor",
    "ShaderNodeCombineRGB",
    "ShaderNodeCombineColor",
    "ShaderNodeNormalMap",
    "ShaderNodeBump",
    "ShaderNodeTexCoord",
    "ShaderNodeValue",
    "ShaderNodeRGB",
];

/// Sockets and label of one node type at one host version.
#[derive(Debug, Clone)]
pub struct NodeSpec {
    pub type_id: &'static str,
    /// Default node name in a new tree.
    pub label: &'static str,
    pub inputs: Vec<(&'static str, Option<ParamValue>)>,
    pub outputs: Vec<(&'static str, Option<ParamValue>)>,
}

impl NodeSpec {
    /// Instantiate a node with default values.
    #[must_use]
    pub fn instantiate(&self, name: &str) -> SceneNode {
        SceneNode {
            name: name.to_string(),
            type_id: self.type_id.to_string(),
            location: [0.0, 0.0],
            inputs: to_map(&self.inputs),
            outputs: to_map(&self.outputs),
            image: None,
        }
    }
}

fn to_map(sockets: &[(&'static str, Option<ParamValue>)]) -> IndexMap<String, Option<ParamValue>> {
    sockets
        .iter()
        .map(|(name, value)| ((*name).to_string(), value.clone()))
        .collect()
}

/// Whether `type_id` can be instantiated on a host of `version`.
#[must_use]
pub fn is_available(type_id: &str, version: HostVersion) -> bool {
    match type_id {
        "ShaderNodeBsdfSheen" => version >= V4_0,
        "ShaderNodeSeparateColor" | "ShaderNodeCombineColor" => version >= V3_3,
        "ShaderNodeMix" => version >= V3_4,
        "ShaderNodeSeparateRGB" | "ShaderNodeCombineRGB" => version < V4_0,
        other => NODE_TYPES.contains(&other),
    }
}

fn scalar(v: f32) -> Option<ParamValue> {
    Some(ParamValue::Scalar(v))
}

fn color(r: f32, g: f32, b: f32) -> Option<ParamValue> {
    Some(ParamValue::rgba([r, g, b, 1.0]))
}

/// Socket layout of `type_id` at `version`, or `None` if unavailable.
#[must_use]
pub fn node_spec(type_id: &str, version: HostVersion) -> Option<NodeSpec> {
    if !is_available(type_id, version) {
        return None;
    }
    let modern = version >= V4_0;

    let spec = match type_id {
        "ShaderNodeBsdfPrincipled" => NodeSpec {
            type_id: "ShaderNodeBsdfPrincipled",
            label: "Principled BSDF",
            inputs: vec![
                ("Base Color", color(0.8, 0.8, 0.8)),
                ("Metallic", scalar(0.0)),
                ("Roughness", scalar(0.5)),
                ("IOR", scalar(if modern { 1.5 } else { 1.45 })),
                ("Alpha", scalar(1.0)),
                ("Normal", None),
                (if modern { "Subsurface Weight" } else { "Subsurface" }, scalar(0.0)),
                (if modern { "Specular IOR Level" } else { "Specular" }, scalar(0.5)),
                (
                    if modern { "Emission Color" } else { "Emission" },
                    if modern { color(1.0, 1.0, 1.0) } else { color(0.0, 0.0, 0.0) },
                ),
                ("Emission Strength", scalar(if modern { 0.0 } else { 1.0 })),
            ],
            outputs: vec![("BSDF", None)],
        },
        "ShaderNodeBsdfDiffuse" => NodeSpec {
            type_id: "ShaderNodeBsdfDiffuse",
            label: "Diffuse BSDF",
            inputs: vec![
                ("Color", color(0.8, 0.8, 0.8)),
                ("Roughness", scalar(0.0)),
                ("Normal", None),
            ],
            outputs: vec![("BSDF", None)],
        },
        "ShaderNodeEmission" => NodeSpec {
            type_id: "ShaderNodeEmission",
            label: "Emission",
            inputs: vec![("Color", color(1.0, 1.0, 1.0)), ("Strength", scalar(1.0))],
            outputs: vec![("Emission", None)],
        },
        "ShaderNodeBsdfTransparent" => NodeSpec {
            type_id: "ShaderNodeBsdfTransparent",
            label: "Transparent BSDF",
            inputs: vec![("Color", color(1.0, 1.0, 1.0))],
            outputs: vec![("BSDF", None)],
        },
        "ShaderNodeBsdfSheen" => NodeSpec {
            type_id: "ShaderNodeBsdfSheen",
            label: "Sheen BSDF",
            inputs: vec![
                ("Color", color(0.8, 0.8, 0.8)),
                ("Roughness", scalar(0.5)),
                ("Normal", None),
            ],
            outputs: vec![("BSDF", None)],
        },
        "ShaderNodeMixShader" => NodeSpec {
            type_id: "ShaderNodeMixShader",
            label: "Mix Shader",
            inputs: vec![("Fac", scalar(0.5)), ("Shader", None), ("Shader_001", None)],
            outputs: vec![("Shader", None)],
        },
        "ShaderNodeOutputMaterial" => NodeSpec {
            type_id: "ShaderNodeOutputMaterial",
            label: "Material Output",
            inputs: vec![("Surface", None), ("Volume", None), ("Displacement", None)],
            outputs: vec![],
        },
        "ShaderNodeTexImage" => NodeSpec {
            type_id: "ShaderNodeTexImage",
            label: "Image Texture",
            inputs: vec![("Vector", None)],
            outputs: vec![("Color", None), ("Alpha", None)],
        },
        "ShaderNodeMixRGB" => NodeSpec {
            type_id: "ShaderNodeMixRGB",
            label: "Mix",
            inputs: vec![
                ("Fac", scalar(0.5)),
                ("Color1", color(0.5, 0.5, 0.5)),
                ("Color2", color(0.5, 0.5, 0.5)),
            ],
            outputs: vec![("Color", None)],
        },
        "ShaderNodeMix" => NodeSpec {
            type_id: "ShaderNodeMix",
            label: "Mix",
            inputs: vec![
                ("Factor", scalar(0.5)),
                ("A", color(0.5, 0.5, 0.5)),
                ("B", color(0.5, 0.5, 0.5)),
            ],
            outputs: vec![("Result", None)],
        },
        "ShaderNodeSeparateRGB" => NodeSpec {
            type_id: "ShaderNodeSeparateRGB",
            label: "Separate RGB",
            inputs: vec![("Image", color(0.8, 0.8, 0.8))],
            outputs: vec![("R", None), ("G", None), ("B", None)],
        },
        "ShaderNodeSeparateColor" => NodeSpec {
            type_id: "ShaderNodeSeparateColor",
            label: "Separate Color",
            inputs: vec![("Color", color(0.8, 0.8, 0.8))],
            outputs: vec![("Red", None), ("Green", None), ("Blue", None)],
        },
        "ShaderNodeCombineRGB" => NodeSpec {
            type_id: "ShaderNodeCombineRGB",
            label: "Combine RGB",
            inputs: vec![("R", scalar(0.0)), ("G", scalar(0.0)), ("B", scalar(0.0))],
            outputs: vec![("Image", None)],
        },
        "ShaderNodeCombineColor" => NodeSpec {
            type_id: "ShaderNodeCombineColor",
            label: "Combine Color",
            inputs: vec![("Red", scalar(0.0)), ("Green", scalar(0.0)), ("Blue", scalar(0.0))],
            outputs: vec![("Color", None)],
        },
        "ShaderNodeNormalMap" => NodeSpec {
            type_id: "ShaderNodeNormalMap",
            label: "Normal Map",
            inputs: vec![("Strength", scalar(1.0)), ("Color", color(0.5, 0.5, 1.0))],
            outputs: vec![("Normal", None)],
        },
        "ShaderNodeBump" => NodeSpec {
            type_id: "ShaderNodeBump",
            label: "Bump",
            inputs: vec![
                ("Strength", scalar(1.0)),
                ("Distance", scalar(1.0)),
                ("Height", scalar(1.0)),
                ("Normal", None),
            ],
            outputs: vec![("Normal", None)],
        },
        "ShaderNodeTexCoord" => NodeSpec {
            type_id: "ShaderNodeTexCoord",
            label: "Texture Coordinate",
            inputs: vec![],
            outputs: vec![("Generated", None), ("Normal", None), ("UV", None), ("Object", None)],
        },
        "ShaderNodeValue" => NodeSpec {
            type_id: "ShaderNodeValue",
            label: "Value",
            inputs: vec![],
            outputs: vec![("Value", scalar(0.5))],
        },
        "ShaderNodeRGB" => NodeSpec {
            type_id: "ShaderNodeRGB",
            label: "RGB",
            inputs: vec![],
            outputs: vec![("Color", color(0.5, 0.5, 0.5))],
        },
        _ => return None,
    };
    Some(spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{self, SocketDirection};

    #[test]
    fn test_availability_windows() {
        let v36 = HostVersion::new(3, 6);
        let v41 = HostVersion::new(4, 1);
        assert!(node_spec("ShaderNodeBsdfSheen", v36).is_none());
        assert!(node_spec("ShaderNodeBsdfSheen", v41).is_some());
        assert!(node_spec("ShaderNodeSeparateRGB", v36).is_some());
        assert!(node_spec("ShaderNodeSeparateRGB", v41).is_none());
        assert!(node_spec("ShaderNodeMix", HostVersion::new(3, 3)).is_none());
        assert!(node_spec("ShaderNodeTexVoronoi", v41).is_none());
    }

    #[test]
    fn test_every_socket_is_known_to_normalization() {
        for &version in HostVersion::KNOWN {
            for type_id in NODE_TYPES {
                let Some(spec) = node_spec(type_id, version) else {
                    continue;
                };
                for (name, _) in &spec.inputs {
                    normalize::socket_to_canonical(type_id, SocketDirection::Input, name)
                        .unwrap_or_else(|e| panic!("{version}: {e}"));
                }
                for (name, _) in &spec.outputs {
                    normalize::socket_to_canonical(type_id, SocketDirection::Output, name)
                        .unwrap_or_else(|e| panic!("{version}: {e}"));
                }
            }
        }
    }

    #[test]
    fn test_written_identifiers_are_instantiable() {
        // The identifier normalization picks for a version must exist on that
        // host, except for types the host does not have yet.
        for &version in HostVersion::KNOWN {
            for &canonical in normalize::CanonicalNodeType::ALL {
                let id = normalize::from_canonical(canonical, version).unwrap();
                let expect = canonical != normalize::CanonicalNodeType::SheenSurface
                    || version >= V4_0;
                assert_eq!(node_spec(id, version).is_some(), expect, "{id} at {version}");
            }
        }
    }

    #[test]
    fn test_principled_socket_names_drift() {
        let old = node_spec("ShaderNodeBsdfPrincipled", HostVersion::new(3, 6)).unwrap();
        let new = node_spec("ShaderNodeBsdfPrincipled", HostVersion::new(4, 0)).unwrap();
        assert!(old.inputs.iter().any(|(n, _)| *n == "Emission"));
        assert!(new.inputs.iter().any(|(n, _)| *n == "Emission Color"));
        assert!(!new.inputs.iter().any(|(n, _)| *n == "Emission"));
    }
}
