//! In-memory scene model shared by every host.
//!
//! Names and socket identifiers here are host-native (runtime) strings;
//! nothing in this module knows about the canonical vocabulary.

use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::value::ParamValue;

use super::gltf::Backing;

/// A loaded asset.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub meshes: Vec<SceneMesh>,
    pub materials: IndexMap<String, SceneMaterial>,
    pub images: IndexMap<String, SceneImage>,
    /// Host-private data needed to write the asset back out.
    pub(crate) backing: Option<Backing>,
}

impl Scene {
    #[must_use]
    pub fn mesh(&self, name: &str) -> Option<&SceneMesh> {
        self.meshes.iter().find(|m| m.name == name)
    }

    pub fn mesh_mut(&mut self, name: &str) -> Option<&mut SceneMesh> {
        self.meshes.iter_mut().find(|m| m.name == name)
    }

    /// Materials assigned to at least one mesh slot, in first-use order.
    #[must_use]
    pub fn referenced_materials(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for mesh in &self.meshes {
            for slot in mesh.material_slots.iter().flatten() {
                if !names.contains(&slot.as_str()) {
                    names.push(slot);
                }
            }
        }
        names
    }
}

/// A mesh and its material slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneMesh {
    pub name: String,
    /// Ordered slots; `None` is an empty slot.
    pub material_slots: Vec<Option<String>>,
    /// Slot index used by each primitive.
    pub primitive_slots: Vec<usize>,
}

impl SceneMesh {
    /// Replace every slot with `slots`, empty slots included.
    ///
    /// Primitives take their slot from `recorded` when it describes every
    /// primitive of this mesh. Otherwise primitive `i` takes slot `i` when
    /// the counts match, and keeps its slot index (clamped) when they don't.
    pub fn assign_slots(&mut self, slots: &[Option<String>], recorded: Option<&[usize]>) {
        self.material_slots = slots.to_vec();
        let count = self.material_slots.len();
        if count == 0 {
            self.primitive_slots.iter_mut().for_each(|s| *s = 0);
            return;
        }
        match recorded {
            Some(recorded)
                if recorded.len() == self.primitive_slots.len() && recorded.iter().all(|s| *s < count) =>
            {
                self.primitive_slots.copy_from_slice(recorded);
            }
            _ => {
                let positional = self.primitive_slots.len() == count;
                for (i, slot) in self.primitive_slots.iter_mut().enumerate() {
                    *slot = if positional { i } else { (*slot).min(count - 1) };
                }
            }
        }
    }

    /// Material used by primitive `index`, if any.
    #[must_use]
    pub fn primitive_material(&self, index: usize) -> Option<&str> {
        let slot = *self.primitive_slots.get(index)?;
        self.material_slots.get(slot)?.as_deref()
    }
}

/// A material and its node tree.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SceneMaterial {
    pub name: String,
    pub use_nodes: bool,
    pub node_tree: NodeTree,
}

impl SceneMaterial {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            use_nodes: true,
            node_tree: NodeTree::default(),
        }
    }
}

/// Shader node graph of one material.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeTree {
    pub nodes: Vec<SceneNode>,
    pub links: Vec<SceneLink>,
}

impl NodeTree {
    #[must_use]
    pub fn node(&self, name: &str) -> Option<&SceneNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    pub fn node_mut(&mut self, name: &str) -> Option<&mut SceneNode> {
        self.nodes.iter_mut().find(|n| n.name == name)
    }

    /// Add `node`, renaming it `Name.001`, `Name.002`, ... on collision.
    /// Returns the final name.
    pub fn add_node(&mut self, mut node: SceneNode) -> String {
        if self.node(&node.name).is_some() {
            let base = node.name.clone();
            node.name = (1..)
                .map(|i| format!("{base}.{i:03}"))
                .find(|candidate| self.node(candidate).is_none())
                .unwrap_or(base);
        }
        let name = node.name.clone();
        self.nodes.push(node);
        name
    }

    /// Connect an output socket to an input socket.
    ///
    /// An input accepts one link; linking it again replaces the old link.
    ///
    /// # Errors
    /// Returns [`Error::LinkRejected`] if either node or socket does not exist.
    pub fn link(&mut self, from_node: &str, from_socket: &str, to_node: &str, to_socket: &str) -> Result<()> {
        let from_ok = self
            .node(from_node)
            .is_some_and(|n| n.outputs.contains_key(from_socket));
        let to_ok = self
            .node(to_node)
            .is_some_and(|n| n.inputs.contains_key(to_socket));
        if !from_ok || !to_ok || from_node == to_node {
            return Err(Error::LinkRejected {
                from_node: from_node.to_string(),
                from_socket: from_socket.to_string(),
                to_node: to_node.to_string(),
                to_socket: to_socket.to_string(),
            });
        }
        self.links
            .retain(|l| !(l.to_node == to_node && l.to_socket == to_socket));
        self.links.push(SceneLink {
            from_node: from_node.to_string(),
            from_socket: from_socket.to_string(),
            to_node: to_node.to_string(),
            to_socket: to_socket.to_string(),
        });
        Ok(())
    }

    /// The link feeding `node`'s input `socket`, if any.
    #[must_use]
    pub fn link_into(&self, node: &str, socket: &str) -> Option<&SceneLink> {
        self.links
            .iter()
            .find(|l| l.to_node == node && l.to_socket == socket)
    }

    /// Whether `node`'s input `socket` is driven by a link.
    #[must_use]
    pub fn is_linked(&self, node: &str, socket: &str) -> bool {
        self.link_into(node, socket).is_some()
    }
}

/// One shader node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneNode {
    pub name: String,
    /// Runtime type identifier, e.g. `ShaderNodeBsdfPrincipled`.
    pub type_id: String,
    pub location: [f32; 2],
    /// Input sockets by runtime name. Shader and vector-only inputs carry no value.
    #[serde(default)]
    pub inputs: IndexMap<String, Option<ParamValue>>,
    /// Output sockets by runtime name. Only constant nodes carry a value.
    #[serde(default)]
    pub outputs: IndexMap<String, Option<ParamValue>>,
    /// Name of the bound image, for image-sampling nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl SceneNode {
    /// Store `value` in the named input.
    ///
    /// Returns `false` when the socket does not exist or cannot hold a value
    /// of that shape.
    pub fn set_input(&mut self, socket: &str, value: ParamValue) -> bool {
        match self.inputs.get_mut(socket) {
            Some(Some(current)) if current.accepts(&value) => {
                *current = value;
                true
            }
            _ => false,
        }
    }

    /// Same as [`Self::set_input`] for output default values.
    pub fn set_output(&mut self, socket: &str, value: ParamValue) -> bool {
        match self.outputs.get_mut(socket) {
            Some(Some(current)) if current.accepts(&value) => {
                *current = value;
                true
            }
            _ => false,
        }
    }

    /// Value of the first input that exists among `names`.
    #[must_use]
    pub fn input_value(&self, names: &[&str]) -> Option<&ParamValue> {
        names
            .iter()
            .find_map(|name| self.inputs.get(*name).and_then(Option::as_ref))
    }
}

/// A link between two sockets, by runtime names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneLink {
    pub from_node: String,
    pub from_socket: String,
    pub to_node: String,
    pub to_socket: String,
}

/// An image datablock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneImage {
    pub name: String,
    pub source: ImageSource,
    /// Host color-space name, e.g. `sRGB` or `Non-Color`.
    pub color_space: String,
}

/// Where an image's pixels come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Bytes stored inside the asset.
    Packed { bytes: Vec<u8>, mime_type: String },
    /// A file referenced by path.
    External(PathBuf),
}

impl ImageSource {
    #[must_use]
    pub fn is_packed(&self) -> bool {
        matches!(self, Self::Packed { .. })
    }
}
