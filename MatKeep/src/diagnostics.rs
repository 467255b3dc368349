//! Recorded, non-fatal problems.
//!
//! Narrow failures (one texture, one node, one link) never abort a stage.
//! They are collected as [`Diagnostic`]s on the manifest or the
//! reconstruction report instead.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Category of a [`Diagnostic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    ArchiveFailure,
    UnknownNodeType,
    UnknownSocketName,
    ImageMissing,
    NodeSubstituted,
    NodeSkipped,
    InputSkipped,
    LinkSkipped,
    TextureMissing,
    MeshMissing,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ArchiveFailure => "archive_failure",
            Self::UnknownNodeType => "unknown_node_type",
            Self::UnknownSocketName => "unknown_socket_name",
            Self::ImageMissing => "image_missing",
            Self::NodeSubstituted => "node_substituted",
            Self::NodeSkipped => "node_skipped",
            Self::InputSkipped => "input_skipped",
            Self::LinkSkipped => "link_skipped",
            Self::TextureMissing => "texture_missing",
            Self::MeshMissing => "mesh_missing",
        };
        f.write_str(s)
    }
}

/// One recorded problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// What the problem is about, e.g. `Skin/Image Texture` or a texture name.
    pub subject: String,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            subject: subject.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.subject, self.message)
    }
}
