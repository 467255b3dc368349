//! The authoring-host boundary.
//!
//! Everything that touches a live asset goes through [`AuthoringHost`]:
//! loading a scene, instantiating nodes, loading images and saving the
//! result. Extraction and reconstruction only ever see this trait, which is
//! also what the stage worker drives inside its own process.

pub mod gltf;
pub mod registry;
pub mod scene;

use std::path::Path;

pub use self::gltf::GltfHost;
pub use scene::{
    ImageSource, NodeTree, Scene, SceneImage, SceneLink, SceneMaterial, SceneMesh, SceneNode,
};

use crate::error::Result;
use crate::normalize::HostVersion;

/// Options for [`AuthoringHost::save_scene`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SaveOptions {
    /// Downscale embedded textures whose larger side exceeds this.
    pub max_texture_size: Option<u32>,
}

impl SaveOptions {
    #[must_use]
    pub fn with_max_texture_size(mut self, size: u32) -> Self {
        self.max_texture_size = Some(size);
        self
    }
}

/// A 3D authoring runtime.
pub trait AuthoringHost {
    /// Version whose node vocabulary this host speaks.
    fn version(&self) -> HostVersion;

    /// Load an asset from disk.
    fn load_scene(&self, path: &Path) -> Result<Scene>;

    /// Write `scene` to `path` with every texture embedded.
    ///
    /// Returns the number of bytes written.
    fn save_scene(&self, scene: &Scene, path: &Path, options: &SaveOptions) -> Result<u64>;

    /// Instantiate a node of runtime type `type_id` with default values.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnsupportedNodeType`] if this host version
    /// does not have the type.
    fn create_node(&self, type_id: &str, name: &str) -> Result<SceneNode>;

    /// Load an image file as a packed image datablock.
    fn load_image(&self, name: &str, path: &Path, color_space: &str) -> Result<SceneImage>;
}
