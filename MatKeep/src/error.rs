//! Error types for `MatKeep`

use std::path::PathBuf;

use thiserror::Error;

use crate::archive::ArchiveFailure;

/// The error type for `MatKeep` operations.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    // ==================== IO Errors ====================
    /// IO error from file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ==================== Asset / Host Errors ====================
    /// The source asset handed to extraction does not exist.
    #[error("source asset not found: {path}")]
    SourceAssetMissing {
        /// The expected path of the asset.
        path: PathBuf,
    },

    /// The host could not parse or load an asset.
    #[error("failed to load asset {path}: {message}")]
    AssetLoadFailed {
        /// The asset path.
        path: PathBuf,
        /// The loader error message.
        message: String,
    },

    /// The host refused to instantiate a node type (version mismatch).
    #[error("host {version} cannot instantiate node type '{type_id}'")]
    UnsupportedNodeType {
        /// The runtime node identifier.
        type_id: String,
        /// The host version that rejected it.
        version: String,
    },

    /// The host rejected a link between two sockets.
    #[error("cannot link {from_node}.{from_socket} -> {to_node}.{to_socket}")]
    LinkRejected {
        /// Source node name.
        from_node: String,
        /// Source output socket.
        from_socket: String,
        /// Destination node name.
        to_node: String,
        /// Destination input socket.
        to_socket: String,
    },

    /// Failed to save a scene.
    #[error("export failed: {message}")]
    ExportFailed {
        /// The error message.
        message: String,
    },

    /// Failed to decode or encode image data.
    #[error("image error: {message}")]
    ImageFailed {
        /// The error message.
        message: String,
    },

    // ==================== Manifest Errors ====================
    /// No manifest exists at the expected location.
    #[error("material manifest not found: {path}")]
    ManifestMissing {
        /// The expected manifest path.
        path: PathBuf,
    },

    /// The manifest could not be parsed or violates its invariants.
    #[error("material manifest is corrupt ({path}): {message}")]
    ManifestCorrupt {
        /// The manifest path.
        path: PathBuf,
        /// The parse or validation message.
        message: String,
    },

    /// The manifest was written by a newer, incompatible schema.
    #[error("manifest metadata_version {found} is newer than supported version {supported}")]
    ManifestVersionUnsupported {
        /// The version found in the file.
        found: u32,
        /// The newest version this build reads.
        supported: u32,
    },

    /// An in-memory manifest violates an invariant.
    #[error("invalid manifest: {message}")]
    ManifestInvalid {
        /// Description of the violated invariant.
        message: String,
    },

    // ==================== Normalization Errors ====================
    /// A runtime node identifier has no canonical counterpart.
    #[error("unknown node type '{type_id}'")]
    UnknownNodeType {
        /// The runtime node identifier.
        type_id: String,
    },

    /// A socket name has no canonical counterpart for its node and direction.
    #[error("unknown {direction} socket '{socket}' on node type '{node_type}'")]
    UnknownSocketName {
        /// The runtime node identifier.
        node_type: String,
        /// The socket name.
        socket: String,
        /// `input` or `output`.
        direction: String,
    },

    /// A host version string could not be parsed.
    #[error("invalid host version '{0}' (expected MAJOR.MINOR)")]
    InvalidHostVersion(String),

    // ==================== Archive Errors ====================
    /// Every archive strategy failed for one texture.
    #[error(transparent)]
    Archive(#[from] ArchiveFailure),

    /// Another archiver already owns the destination directory.
    #[error("archive directory already in use: {path}")]
    ArchiveDirectoryInUse {
        /// The claimed directory.
        path: PathBuf,
    },

    // ==================== Worker / Stage Errors ====================
    /// The worker subprocess could not be started.
    #[error("failed to spawn stage worker '{program}': {message}")]
    WorkerSpawnFailed {
        /// The worker program.
        program: PathBuf,
        /// The spawn error.
        message: String,
    },

    /// The worker process exited abnormally.
    #[error("host process crashed during {stage} ({status}): {detail}")]
    HostCrash {
        /// The stage being executed.
        stage: String,
        /// Exit status description.
        status: String,
        /// Tail of the worker's stderr.
        detail: String,
    },

    /// The worker process exceeded its wall-clock budget and was killed.
    #[error("host process timed out during {stage} after {timeout_secs}s")]
    HostTimeout {
        /// The stage being executed.
        stage: String,
        /// The configured timeout.
        timeout_secs: u64,
    },

    /// The worker reported a failure through its sentinel line.
    #[error("stage {stage} failed: {message}")]
    StageFailed {
        /// The stage being executed.
        stage: String,
        /// The reported failure message.
        message: String,
    },

    /// The worker exited cleanly but broke the result protocol.
    #[error("stage {stage} protocol error: {message}")]
    StageProtocol {
        /// The stage being executed.
        stage: String,
        /// Description of the violation.
        message: String,
    },

    /// The run was cancelled between stages.
    #[error("restoration cancelled")]
    Cancelled,

    /// The orchestrator attempted an illegal state transition.
    #[error("illegal state transition {from} -> {to}")]
    IllegalTransition {
        /// Current state.
        from: String,
        /// Requested state.
        to: String,
    },

    // ==================== Configuration Errors ====================
    /// Configuration file could not be read or parsed.
    #[error("invalid configuration {path}: {message}")]
    ConfigInvalid {
        /// The configuration file.
        path: PathBuf,
        /// The parse error.
        message: String,
    },

    // ==================== Parsing Errors ====================
    /// JSON parsing or serialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::ImageFailed {
            message: err.to_string(),
        }
    }
}

/// A specialized Result type for `MatKeep` operations.
pub type Result<T> = std::result::Result<T, Error>;
