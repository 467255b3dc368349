//! The material manifest: the portable, versioned record of an asset's
//! materials, textures and mesh slot assignments.
//!
//! A manifest is written once by [`crate::extract`] and read back unchanged
//! by [`crate::reconstruct`]. On disk it lives next to its texture archive:
//!
//! ```text
//! <dir>/material_manifest.json
//! <dir>/textures/<name>.png
//! ```

mod io;
mod types;
mod validate;

pub use io::{load_manifest, parse_manifest, save_manifest};
pub use types::{
    LinkRecord, MANIFEST_VERSION, MaterialManifest, MaterialRecord, NodeRecord, TextureRecord,
};

/// File name of the manifest inside an extraction directory.
pub const MANIFEST_FILE_NAME: &str = "material_manifest.json";

/// Name of the texture archive directory inside an extraction directory.
pub const TEXTURE_DIR_NAME: &str = "textures";
