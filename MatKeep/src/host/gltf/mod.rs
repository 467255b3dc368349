//! glTF 2.0 authoring host.
//!
//! Scenes are glTF/GLB assets. Each material carries its host node tree in
//! `extras.node_tree`; materials without one get a tree synthesized from
//! their PBR metallic-roughness fields, the way a host importer would.
//! Saving always writes a self-contained GLB with every image embedded.

mod bake;
mod export;
pub mod glb;
mod load;
mod materials;
mod synthesize;

use std::collections::HashSet;
use std::path::Path;

use crate::error::{Error, Result};
use crate::normalize::HostVersion;

use super::registry;
use super::scene::{ImageSource, Scene, SceneImage, SceneNode};
use super::{AuthoringHost, SaveOptions};

/// Host-private state kept on a loaded [`Scene`].
#[derive(Debug, Clone)]
pub(crate) struct Backing {
    /// The asset's JSON document as loaded.
    pub document: serde_json::Value,
    /// Resolved buffer contents, by buffer index.
    pub buffers: Vec<Vec<u8>>,
}

/// An [`AuthoringHost`] backed by glTF files.
#[derive(Debug, Clone, Copy, Default)]
pub struct GltfHost {
    version: HostVersion,
}

impl GltfHost {
    #[must_use]
    pub fn new(version: HostVersion) -> Self {
        Self { version }
    }
}

impl AuthoringHost for GltfHost {
    fn version(&self) -> HostVersion {
        self.version
    }

    fn load_scene(&self, path: &Path) -> Result<Scene> {
        load::load_scene(path, self.version)
    }

    fn save_scene(&self, scene: &Scene, path: &Path, options: &SaveOptions) -> Result<u64> {
        export::save_scene(scene, path, options)
    }

    fn create_node(&self, type_id: &str, name: &str) -> Result<SceneNode> {
        instantiate(self.version, type_id, name)
    }

    fn load_image(&self, name: &str, path: &Path, color_space: &str) -> Result<SceneImage> {
        let bytes = std::fs::read(path)?;
        let format = image::guess_format(&bytes)?;
        Ok(SceneImage {
            name: name.to_string(),
            source: ImageSource::Packed {
                bytes,
                mime_type: format.to_mime_type().to_string(),
            },
            color_space: color_space.to_string(),
        })
    }
}

fn instantiate(version: HostVersion, type_id: &str, name: &str) -> Result<SceneNode> {
    registry::node_spec(type_id, version)
        .map(|spec| spec.instantiate(name))
        .ok_or_else(|| Error::UnsupportedNodeType {
            type_id: type_id.to_string(),
            version: version.to_string(),
        })
}

/// `base`, or `base.001`, `base.002`, ... if already taken.
fn unique_name(base: &str, taken: &mut HashSet<String>) -> String {
    let name = if taken.contains(base) {
        (1..)
            .map(|i| format!("{base}.{i:03}"))
            .find(|candidate| !taken.contains(candidate))
            .unwrap_or_else(|| base.to_string())
    } else {
        base.to_string()
    };
    taken.insert(name.clone());
    name
}
