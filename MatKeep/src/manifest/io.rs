//! Reading and writing manifest files.

use std::io::Write;
use std::path::Path;

use super::types::{MANIFEST_VERSION, MaterialManifest};
use crate::error::{Error, Result};

/// Load and validate a manifest file.
///
/// # Errors
/// - [`Error::ManifestMissing`] if the file does not exist.
/// - [`Error::ManifestVersionUnsupported`] if it was written by a newer schema.
/// - [`Error::ManifestCorrupt`] if it cannot be parsed or violates an invariant.
pub fn load_manifest(path: &Path) -> Result<MaterialManifest> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::ManifestMissing {
                path: path.to_path_buf(),
            });
        }
        Err(e) => return Err(e.into()),
    };
    parse_manifest(&text, path)
}

/// Parse manifest JSON. `origin` is only used in error messages.
///
/// # Errors
/// Same as [`load_manifest`], minus the missing-file case.
pub fn parse_manifest(text: &str, origin: &Path) -> Result<MaterialManifest> {
    let corrupt = |message: String| Error::ManifestCorrupt {
        path: origin.to_path_buf(),
        message,
    };

    // Check the version before the full parse so a newer schema is reported
    // as unsupported rather than as a field mismatch.
    let value: serde_json::Value = serde_json::from_str(text).map_err(|e| corrupt(e.to_string()))?;
    let found = value
        .get("metadata_version")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| corrupt("missing or non-integer metadata_version".to_string()))?;
    let found = u32::try_from(found).map_err(|_| corrupt(format!("metadata_version {found} out of range")))?;
    if found > MANIFEST_VERSION {
        return Err(Error::ManifestVersionUnsupported {
            found,
            supported: MANIFEST_VERSION,
        });
    }

    let manifest: MaterialManifest =
        serde_json::from_value(value).map_err(|e| corrupt(e.to_string()))?;

    let problems = manifest.violations();
    if !problems.is_empty() {
        return Err(corrupt(problems.join("; ")));
    }
    Ok(manifest)
}

/// Write a manifest as pretty-printed JSON.
///
/// The file is staged next to `path` and renamed into place, so readers
/// never observe a half-written manifest.
///
/// # Errors
/// Returns [`Error::ManifestInvalid`] if the manifest violates an invariant,
/// or an I/O error if writing fails.
pub fn save_manifest(manifest: &MaterialManifest, path: &Path) -> Result<()> {
    let problems = manifest.violations();
    if !problems.is_empty() {
        return Err(Error::ManifestInvalid {
            message: problems.join("; "),
        });
    }

    let json = serde_json::to_string_pretty(manifest)?;
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut staged = tempfile::NamedTempFile::new_in(dir)?;
    staged.write_all(json.as_bytes())?;
    staged.write_all(b"\n")?;
    staged.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}
