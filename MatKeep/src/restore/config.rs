//! Restore configuration (`config.toml`).
//!
//! ```toml
//! [host]
//! version = "4.1"
//!
//! [worker]
//! program = "~/bin/matkeep"
//! timeout_secs = 600
//!
//! [quality]
//! minimum = "acceptable"
//!
//! [export]
//! preview = true
//! preview_max_texture_size = 512
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::normalize::HostVersion;
use crate::quality::{GEOMETRY_OVERHEAD_BYTES, QualityScore};

/// Longest stage budget accepted: one week.
pub const MAX_STAGE_TIMEOUT_SECS: u64 = 7 * 24 * 60 * 60;

// Default value functions for serde
fn default_timeout_secs() -> u64 {
    600
}
fn default_minimum() -> QualityScore {
    QualityScore::Acceptable
}
fn default_overhead() -> u64 {
    GEOMETRY_OVERHEAD_BYTES
}
fn default_preview_size() -> u32 {
    512
}

/// Everything a restoration run can be tuned with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestoreConfig {
    pub host: HostSection,
    pub worker: WorkerSection,
    pub quality: QualitySection,
    pub export: ExportSection,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostSection {
    /// Node vocabulary the host speaks.
    pub version: HostVersion,
}

/// Stage worker process settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerSection {
    /// Worker executable; the running `matkeep` binary when unset.
    #[serde(default)]
    pub program: Option<PathBuf>,
    /// Arguments placed before `worker --task <file>`.
    #[serde(default)]
    pub args: Vec<String>,
    /// Wall-clock budget of one stage.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for WorkerSection {
    fn default() -> Self {
        Self {
            program: None,
            args: Vec::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualitySection {
    /// Scores below this add a warning to the run.
    #[serde(default = "default_minimum")]
    pub minimum: QualityScore,
    #[serde(default = "default_overhead")]
    pub geometry_overhead_bytes: u64,
}

impl Default for QualitySection {
    fn default() -> Self {
        Self {
            minimum: default_minimum(),
            geometry_overhead_bytes: default_overhead(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSection {
    /// Also write `<output stem>.preview.glb` with downscaled textures.
    #[serde(default)]
    pub preview: bool,
    #[serde(default = "default_preview_size")]
    pub preview_max_texture_size: u32,
}

impl Default for ExportSection {
    fn default() -> Self {
        Self {
            preview: false,
            preview_max_texture_size: default_preview_size(),
        }
    }
}

impl RestoreConfig {
    /// `<config dir>/matkeep/config.toml`.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("matkeep").join("config.toml"))
    }

    /// Load from `path`, or from [`Self::default_path`] if it exists, or
    /// fall back to defaults.
    ///
    /// An explicit path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(explicit) => expand_path(explicit),
            None => match Self::default_path().filter(|p| p.is_file()) {
                Some(found) => found,
                None => return Ok(Self::default()),
            },
        };
        let text = fs::read_to_string(&path).map_err(|e| Error::ConfigInvalid {
            path: path.clone(),
            message: e.to_string(),
        })?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Self::parse(&text, &path)
    }

    /// Parse TOML text; `origin` is only used in errors.
    pub fn parse(text: &str, origin: &Path) -> Result<Self> {
        let mut config: Self = toml::from_str(text).map_err(|e| Error::ConfigInvalid {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })?;
        config.worker.program = config.worker.program.as_deref().map(expand_path);
        config.validate(origin)?;
        Ok(config)
    }

    /// Reject values that cannot drive a run.
    pub fn validate(&self, origin: &Path) -> Result<()> {
        let secs = self.worker.timeout_secs;
        if secs == 0 || secs > MAX_STAGE_TIMEOUT_SECS {
            return Err(Error::ConfigInvalid {
                path: origin.to_path_buf(),
                message: format!("worker.timeout_secs must be between 1 and {MAX_STAGE_TIMEOUT_SECS}, got {secs}"),
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn stage_timeout(&self) -> Duration {
        Duration::from_secs(self.worker.timeout_secs)
    }
}

/// Expand a leading `~` in `path`.
#[must_use]
pub fn expand_path(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned())
}
