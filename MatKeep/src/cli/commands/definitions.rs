//! Subcommand enum definitions for CLI

use clap::Subcommand;
use std::path::PathBuf;

use crate::normalize::HostVersion;

/// Inspection commands
#[derive(Subcommand)]
pub enum InspectCommands {
    /// Validate a material manifest and summarize it
    Manifest {
        /// Manifest file, or the directory written by `matkeep extract`
        path: PathBuf,

        /// Print the manifest as JSON after validation
        #[arg(long)]
        json: bool,
    },

    /// Summarize the meshes, materials and images of an asset
    Asset {
        /// Asset file (.glb or .gltf)
        path: PathBuf,

        /// Host version to read node types against
        #[arg(long)]
        host_version: Option<HostVersion>,
    },
}
