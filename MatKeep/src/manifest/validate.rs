//! Manifest invariant checks.

use std::collections::HashSet;

use super::types::MaterialManifest;
use crate::normalize::CanonicalNodeType;

impl MaterialManifest {
    /// Check every cross-reference invariant.
    ///
    /// Returns one message per violation; an empty list means the manifest
    /// is consistent.
    #[must_use]
    pub fn violations(&self) -> Vec<String> {
        let mut problems = Vec::new();

        let mut material_names = HashSet::new();
        for material in &self.materials {
            if !material_names.insert(material.name.as_str()) {
                problems.push(format!("duplicate material name '{}'", material.name));
            }
        }

        let mut texture_names = HashSet::new();
        let mut archived_names = HashSet::new();
        for texture in &self.textures {
            if !texture_names.insert(texture.name.as_str()) {
                problems.push(format!("duplicate texture name '{}'", texture.name));
            }
            if !archived_names.insert(texture.archived_filename.to_lowercase()) {
                problems.push(format!(
                    "archived filename '{}' used twice",
                    texture.archived_filename
                ));
            }
        }

        for material in &self.materials {
            let mut node_names = HashSet::new();
            for node in &material.nodes {
                if !node_names.insert(node.name.as_str()) {
                    problems.push(format!(
                        "material '{}': duplicate node name '{}'",
                        material.name, node.name
                    ));
                }
                if let Some(texture) = &node.bound_texture_name {
                    if !texture_names.contains(texture.as_str()) {
                        problems.push(format!(
                            "material '{}': node '{}' binds unknown texture '{texture}'",
                            material.name, node.name
                        ));
                    }
                    if node.canonical_type != CanonicalNodeType::ImageSample {
                        problems.push(format!(
                            "material '{}': node '{}' of type {} cannot bind a texture",
                            material.name, node.name, node.canonical_type
                        ));
                    }
                }
            }
            for link in &material.links {
                for endpoint in [&link.from_node, &link.to_node] {
                    if !node_names.contains(endpoint.as_str()) {
                        problems.push(format!(
                            "material '{}': link references unknown node '{endpoint}'",
                            material.name
                        ));
                    }
                }
            }
        }

        for (mesh, slots) in &self.mesh_materials {
            for slot in slots.iter().flatten() {
                if !material_names.contains(slot.as_str()) {
                    problems.push(format!("mesh '{mesh}' references unknown material '{slot}'"));
                }
            }
        }
        for (mesh, primitives) in &self.mesh_primitive_slots {
            let Some(slots) = self.mesh_materials.get(mesh) else {
                problems.push(format!("primitive slots recorded for unknown mesh '{mesh}'"));
                continue;
            };
            for (index, slot) in primitives.iter().enumerate() {
                if *slot >= slots.len() {
                    problems.push(format!(
                        "mesh '{mesh}': primitive {index} uses slot {slot} of {}",
                        slots.len()
                    ));
                }
            }
        }

        problems
    }

    /// Whether [`Self::violations`] is empty.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.violations().is_empty()
    }
}
