//! # MatKeep
//!
//! Keeps the materials of a 3D asset alive across a retargeting pipeline
//! (mesh extraction, skeleton generation, skin weights) that throws them
//! away.
//!
//! ## Pipeline
//!
//! 1. **Extract** - before retargeting, walk every material of the source
//!    asset into a portable [`manifest::MaterialManifest`] and archive the
//!    textures it samples as PNG files.
//! 2. **Restore** - after retargeting, rebuild the materials onto the new
//!    asset, score the result and export it with textures embedded. Host
//!    work runs in isolated worker processes; any failure falls back to an
//!    untextured copy instead of aborting.
//!
//! Node and socket names are stored in a stable canonical vocabulary
//! ([`normalize`]) so a manifest written against one host version can be
//! rebuilt on another.
//!
//! ## Quick Start
//!
//! ```no_run
//! use matkeep::prelude::*;
//! use std::path::Path;
//!
//! let host = GltfHost::default();
//! extract_to_dir(&host, Path::new("hero.glb"), Path::new("hero.matkeep"))?;
//!
//! // ... external retargeting produces hero_rigged.glb ...
//!
//! let request = RestoreRequest::from_extraction("hero_rigged.glb", Path::new("hero.matkeep"), "hero_final.glb");
//! let result = restore(RestoreConfig::default(), &request)?;
//! println!("{}", result.outcome.state());
//! # Ok::<(), matkeep::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` - Enables the `matkeep` command-line binary (and its stage worker)

pub mod archive;
pub mod diagnostics;
pub mod error;
pub mod extract;
pub mod host;
pub mod manifest;
pub mod normalize;
pub mod quality;
pub mod reconstruct;
pub mod restore;
pub mod value;

#[cfg(test)]
mod test_support;

// Re-exports for convenience
pub use error::{Error, Result};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::error::{Error, Result};

    pub use crate::diagnostics::{Diagnostic, DiagnosticKind};
    pub use crate::extract::{extract, extract_to_dir};
    pub use crate::host::{AuthoringHost, GltfHost, SaveOptions, Scene};
    pub use crate::manifest::{
        MaterialManifest, MaterialRecord, NodeRecord, TextureRecord, load_manifest, save_manifest,
    };
    pub use crate::normalize::{CanonicalNodeType, CanonicalSocketName, ColorInterpretation, HostVersion};
    pub use crate::quality::{QualityAssessment, QualityScore};
    pub use crate::reconstruct::{ReconstructionReport, reconstruct};
    pub use crate::restore::{
        CancelFlag, Orchestrator, RestoreConfig, RestoreRequest, RunOutcome, RunResult, RunState,
        extract_in_worker, extract_isolated, restore,
    };
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// CLI module (feature-gated)
#[cfg(feature = "cli")]
pub mod cli;
