//! Reconstruction report.

use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostic;

use super::substitute::AppliedSubstitution;

/// What [`super::reconstruct`] did.
///
/// `materials_created` counts every material built, including the
/// `materials_replaced` subset that overwrote an existing one.
/// `nodes_created` counts nodes built as recorded; substituted nodes are
/// counted separately.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconstructionReport {
    pub materials_created: usize,
    pub materials_replaced: usize,
    pub nodes_created: usize,
    pub nodes_substituted: usize,
    pub nodes_skipped: usize,
    pub links_created: usize,
    pub links_skipped: usize,
    pub textures_bound: usize,
    pub textures_missing: usize,
    pub meshes_assigned: usize,
    pub meshes_missing: usize,
    pub slots_assigned: usize,
    #[serde(default)]
    pub substitutions: Vec<AppliedSubstitution>,
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
}

impl ReconstructionReport {
    /// Nodes the manifest asked for.
    #[must_use]
    pub fn nodes_total(&self) -> usize {
        self.nodes_created + self.nodes_substituted + self.nodes_skipped
    }

    /// Links the manifest asked for.
    #[must_use]
    pub fn links_total(&self) -> usize {
        self.links_created + self.links_skipped
    }

    /// Texture bindings the manifest asked for.
    #[must_use]
    pub fn textures_total(&self) -> usize {
        self.textures_bound + self.textures_missing
    }

    /// Whether everything was rebuilt exactly as recorded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.nodes_substituted == 0
            && self.nodes_skipped == 0
            && self.links_skipped == 0
            && self.textures_missing == 0
            && self.meshes_missing == 0
    }

    /// One-line summary for logs.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} materials, {}/{} nodes ({} substituted, {} skipped), {}/{} links, {}/{} textures, {} meshes",
            self.materials_created,
            self.nodes_created,
            self.nodes_total(),
            self.nodes_substituted,
            self.nodes_skipped,
            self.links_created,
            self.links_total(),
            self.textures_bound,
            self.textures_total(),
            self.meshes_assigned,
        )
    }
}
