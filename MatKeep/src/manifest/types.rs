//! Manifest record types.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::archive::ArchiveStrategy;
use crate::diagnostics::Diagnostic;
use crate::normalize::{CanonicalNodeType, ColorInterpretation, HostVersion, SocketKey};
use crate::value::ParamValue;

/// Schema version written by this build. Older manifests are read as-is,
/// newer ones are rejected.
pub const MANIFEST_VERSION: u32 = 1;

/// Portable description of every material of one source asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialManifest {
    pub metadata_version: u32,
    pub source_asset_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_version: Option<HostVersion>,
    /// RFC 3339 timestamp of the extraction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_at: Option<String>,
    pub materials: Vec<MaterialRecord>,
    pub textures: Vec<TextureRecord>,
    /// Mesh name to its material slots in order; `null` is an empty slot.
    pub mesh_materials: IndexMap<String, Vec<Option<String>>>,
    /// Mesh name to the slot index of each primitive. A mesh left out here
    /// has its primitives mapped onto slots by position.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub mesh_primitive_slots: IndexMap<String, Vec<usize>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl MaterialManifest {
    /// An empty manifest for `source_asset_id` at the current schema version.
    #[must_use]
    pub fn new(source_asset_id: impl Into<String>) -> Self {
        Self {
            metadata_version: MANIFEST_VERSION,
            source_asset_id: source_asset_id.into(),
            host_version: None,
            extracted_at: None,
            materials: Vec::new(),
            textures: Vec::new(),
            mesh_materials: IndexMap::new(),
            mesh_primitive_slots: IndexMap::new(),
            diagnostics: Vec::new(),
        }
    }

    #[must_use]
    pub fn material(&self, name: &str) -> Option<&MaterialRecord> {
        self.materials.iter().find(|m| m.name == name)
    }

    #[must_use]
    pub fn texture(&self, name: &str) -> Option<&TextureRecord> {
        self.textures.iter().find(|t| t.name == name)
    }

    /// Sum of archived texture sizes in bytes.
    #[must_use]
    pub fn payload_bytes(&self) -> u64 {
        self.textures.iter().map(|t| t.payload_bytes).sum()
    }

    /// Total node count across all materials.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.materials.iter().map(|m| m.nodes.len()).sum()
    }

    /// Total link count across all materials.
    #[must_use]
    pub fn link_count(&self) -> usize {
        self.materials.iter().map(|m| m.links.len()).sum()
    }

    /// Number of image-sampling nodes that reference an archived texture.
    #[must_use]
    pub fn texture_binding_count(&self) -> usize {
        self.materials
            .iter()
            .flat_map(|m| &m.nodes)
            .filter(|n| n.bound_texture_name.is_some())
            .count()
    }
}

/// One material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialRecord {
    pub name: String,
    /// Whether the host renders this material through its node tree.
    pub uses_graph: bool,
    pub nodes: Vec<NodeRecord>,
    pub links: Vec<LinkRecord>,
}

impl MaterialRecord {
    #[must_use]
    pub fn node(&self, name: &str) -> Option<&NodeRecord> {
        self.nodes.iter().find(|n| n.name == name)
    }
}

/// One shader node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub name: String,
    pub canonical_type: CanonicalNodeType,
    /// Runtime identifier, kept only for [`CanonicalNodeType::Unknown`] nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_type: Option<String>,
    pub position: [f32; 2],
    /// Values of unlinked inputs.
    #[serde(default)]
    pub inputs: IndexMap<SocketKey, ParamValue>,
    /// Constant output values (`value` and `rgb` nodes).
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub outputs: IndexMap<SocketKey, ParamValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bound_texture_name: Option<String>,
}

/// A directed edge from an output socket to an input socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub from_node: String,
    pub from_socket: SocketKey,
    pub to_node: String,
    pub to_socket: SocketKey,
}

/// One archived texture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureRecord {
    /// Host image name.
    pub name: String,
    /// File name inside the texture directory.
    pub archived_filename: String,
    pub color_interpretation: ColorInterpretation,
    pub pixel_dimensions: [u32; 2],
    pub payload_bytes: u64,
    /// Hex MD5 of the archived file.
    pub content_md5: String,
    pub strategy: ArchiveStrategy,
}
