//! Texture asset archiver.
//!
//! Copies every image a manifest references into a directory of PNG files
//! so reconstruction never depends on the source asset again. Each image
//! goes through a fixed chain of [`ArchiveStrategy`]s; the first one that
//! succeeds wins. Every attempt writes into its own temporary file inside
//! the archive directory, and only a successful attempt is renamed into
//! place, so failures leave nothing behind.

mod naming;

use std::fmt;
use std::fs::OpenOptions;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use image::codecs::png::PngEncoder;
use image::{DynamicImage, ImageFormat, ImageReader};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use naming::{NameAllocator, safe_stem};

use crate::error::{Error, Result};
use crate::host::{ImageSource, SceneImage};
use crate::manifest::TextureRecord;
use crate::normalize::ColorInterpretation;

/// Marker file claiming an archive directory for one archiver.
pub const OWNER_MARKER: &str = ".matkeep-archive-owner";

/// How an archived file was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveStrategy {
    /// Decode the embedded payload with its declared format, write PNG.
    ReencodeEmbedded,
    /// Write the embedded PNG payload byte for byte.
    RawEmbedded,
    /// Copy the referenced PNG file (only when nothing is embedded).
    CopyExternal,
    /// Decode whatever source exists, sniffing the format, write PNG.
    GenericReencode,
}

impl ArchiveStrategy {
    /// Strategies in the order they are tried.
    pub const ORDER: [ArchiveStrategy; 4] = [
        Self::ReencodeEmbedded,
        Self::RawEmbedded,
        Self::CopyExternal,
        Self::GenericReencode,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReencodeEmbedded => "reencode_embedded",
            Self::RawEmbedded => "raw_embedded",
            Self::CopyExternal => "copy_external",
            Self::GenericReencode => "generic_reencode",
        }
    }
}

impl fmt::Display for ArchiveStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One failed strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveAttempt {
    pub strategy: ArchiveStrategy,
    pub message: String,
}

/// Every strategy failed for one texture.
#[derive(Debug, Clone, Error)]
#[error("failed to archive texture '{texture}' ({})", summarize(.attempts))]
pub struct ArchiveFailure {
    pub texture: String,
    pub attempts: Vec<ArchiveAttempt>,
}

fn summarize(attempts: &[ArchiveAttempt]) -> String {
    attempts
        .iter()
        .map(|a| format!("{}: {}", a.strategy, a.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Encoded file contents produced by a strategy.
struct Payload {
    bytes: Vec<u8>,
    dimensions: [u32; 2],
}

/// Exclusive writer for one archive directory.
#[derive(Debug)]
pub struct TextureArchiver {
    dir: PathBuf,
    marker: PathBuf,
    names: NameAllocator,
}

impl TextureArchiver {
    /// Create `dir` if needed and claim it.
    ///
    /// # Errors
    /// Returns [`Error::ArchiveDirectoryInUse`] if another archiver holds it.
    pub fn claim(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let marker = dir.join(OWNER_MARKER);
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&marker) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(Error::ArchiveDirectoryInUse {
                    path: dir.to_path_buf(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        writeln!(file, "{}", std::process::id())?;
        tracing::debug!("Claimed archive directory {}", dir.display());
        Ok(Self {
            dir: dir.to_path_buf(),
            marker,
            names: NameAllocator::default(),
        })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Archive one image.
    ///
    /// # Errors
    /// Returns an [`ArchiveFailure`] listing every strategy's error.
    pub fn archive(
        &mut self,
        image: &SceneImage,
        interpretation: ColorInterpretation,
    ) -> std::result::Result<TextureRecord, ArchiveFailure> {
        let file_name = self.names.allocate(&image.name);
        let target = self.dir.join(&file_name);
        let mut attempts = Vec::new();

        for strategy in ArchiveStrategy::ORDER {
            match self.attempt(strategy, image, &target) {
                Ok(payload) => {
                    tracing::debug!("Archived '{}' as {file_name} ({strategy})", image.name);
                    return Ok(TextureRecord {
                        name: image.name.clone(),
                        archived_filename: file_name,
                        color_interpretation: interpretation,
                        pixel_dimensions: payload.dimensions,
                        payload_bytes: payload.bytes.len() as u64,
                        content_md5: format!("{:x}", md5::compute(&payload.bytes)),
                        strategy,
                    });
                }
                Err(message) => {
                    tracing::debug!("'{}': {strategy} failed: {message}", image.name);
                    attempts.push(ArchiveAttempt { strategy, message });
                }
            }
        }

        self.names.release(&file_name);
        Err(ArchiveFailure {
            texture: image.name.clone(),
            attempts,
        })
    }

    /// Run one strategy through a staging file and move it to `target`.
    fn attempt(
        &self,
        strategy: ArchiveStrategy,
        image: &SceneImage,
        target: &Path,
    ) -> std::result::Result<Payload, String> {
        let mut staged = tempfile::NamedTempFile::new_in(&self.dir).map_err(|e| e.to_string())?;
        let payload = match strategy {
            ArchiveStrategy::ReencodeEmbedded => reencode_embedded(&image.source),
            ArchiveStrategy::RawEmbedded => raw_embedded(&image.source),
            ArchiveStrategy::CopyExternal => copy_external(&image.source),
            ArchiveStrategy::GenericReencode => generic_reencode(&image.source),
        }?;
        staged.write_all(&payload.bytes).map_err(|e| e.to_string())?;
        staged.flush().map_err(|e| e.to_string())?;
        staged.persist(target).map_err(|e| e.error.to_string())?;
        Ok(payload)
    }
}

impl Drop for TextureArchiver {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.marker) {
            tracing::warn!("Failed to release {}: {e}", self.marker.display());
        }
    }
}

fn reencode_embedded(source: &ImageSource) -> std::result::Result<Payload, String> {
    let ImageSource::Packed { bytes, mime_type } = source else {
        return Err("no embedded payload".to_string());
    };
    let format = ImageFormat::from_mime_type(mime_type)
        .ok_or_else(|| format!("unrecognized MIME type '{mime_type}'"))?;
    let decoded = image::load_from_memory_with_format(bytes, format).map_err(|e| e.to_string())?;
    encode_png(&decoded)
}

fn raw_embedded(source: &ImageSource) -> std::result::Result<Payload, String> {
    let ImageSource::Packed { bytes, .. } = source else {
        return Err("no embedded payload".to_string());
    };
    png_as_is(bytes.clone())
}

fn copy_external(source: &ImageSource) -> std::result::Result<Payload, String> {
    let ImageSource::External(path) = source else {
        return Err("image has an embedded payload".to_string());
    };
    let bytes = std::fs::read(path).map_err(|e| format!("{}: {e}", path.display()))?;
    png_as_is(bytes)
}

fn generic_reencode(source: &ImageSource) -> std::result::Result<Payload, String> {
    let bytes = match source {
        ImageSource::Packed { bytes, .. } => bytes.clone(),
        ImageSource::External(path) => {
            std::fs::read(path).map_err(|e| format!("{}: {e}", path.display()))?
        }
    };
    let decoded = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| e.to_string())?
        .decode()
        .map_err(|e| e.to_string())?;
    encode_png(&decoded)
}

/// Accept `bytes` unchanged if they are a PNG whose header parses.
fn png_as_is(bytes: Vec<u8>) -> std::result::Result<Payload, String> {
    let format = image::guess_format(&bytes).map_err(|e| e.to_string())?;
    if format != ImageFormat::Png {
        return Err(format!("payload is {format:?}, not PNG"));
    }
    let (w, h) = ImageReader::with_format(Cursor::new(&bytes), ImageFormat::Png)
        .into_dimensions()
        .map_err(|e| e.to_string())?;
    Ok(Payload {
        bytes,
        dimensions: [w, h],
    })
}

fn encode_png(decoded: &DynamicImage) -> std::result::Result<Payload, String> {
    let mut bytes = Vec::new();
    let result = decoded.write_with_encoder(PngEncoder::new(&mut bytes));
    if result.is_err() {
        // Float images have no PNG layout; fall back to 16-bit.
        bytes.clear();
        DynamicImage::ImageRgba16(decoded.to_rgba16())
            .write_with_encoder(PngEncoder::new(&mut bytes))
            .map_err(|e| e.to_string())?;
    }
    Ok(Payload {
        bytes,
        dimensions: [decoded.width(), decoded.height()],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::png_bytes;
    use tempfile::TempDir;

    fn packed(name: &str, bytes: Vec<u8>, mime_type: &str) -> SceneImage {
        SceneImage {
            name: name.to_string(),
            source: ImageSource::Packed {
                bytes,
                mime_type: mime_type.to_string(),
            },
            color_space: "sRGB".to_string(),
        }
    }

    fn external(name: &str, path: PathBuf) -> SceneImage {
        SceneImage {
            name: name.to_string(),
            source: ImageSource::External(path),
            color_space: "sRGB".to_string(),
        }
    }

    /// Directory entries other than the owner marker.
    fn contents(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n != OWNER_MARKER)
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_embedded_png_is_reencoded() {
        let temp = TempDir::new().unwrap();
        let mut archiver = TextureArchiver::claim(temp.path()).unwrap();
        let record = archiver
            .archive(&packed("skin_albedo", png_bytes(64, [255, 0, 0, 255]), "image/png"), ColorInterpretation::Color)
            .unwrap();

        assert_eq!(record.strategy, ArchiveStrategy::ReencodeEmbedded);
        assert_eq!(record.archived_filename, "skin_albedo.png");
        assert_eq!(record.pixel_dimensions, [64, 64]);
        let written = std::fs::read(temp.path().join("skin_albedo.png")).unwrap();
        assert_eq!(record.payload_bytes, written.len() as u64);
        assert_eq!(record.content_md5, format!("{:x}", md5::compute(&written)));
        assert_eq!(contents(temp.path()), vec!["skin_albedo.png"]);
    }

    #[test]
    fn test_mislabeled_png_is_written_raw() {
        let temp = TempDir::new().unwrap();
        let mut archiver = TextureArchiver::claim(temp.path()).unwrap();
        let bytes = png_bytes(8, [0, 0, 255, 255]);
        let record = archiver
            .archive(&packed("mask", bytes.clone(), "image/jpeg"), ColorInterpretation::NonColor)
            .unwrap();

        assert_eq!(record.strategy, ArchiveStrategy::RawEmbedded);
        assert_eq!(record.color_interpretation, ColorInterpretation::NonColor);
        assert_eq!(std::fs::read(temp.path().join("mask.png")).unwrap(), bytes);
    }

    #[test]
    fn test_external_png_is_copied() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("source.png");
        let bytes = png_bytes(16, [0, 255, 0, 255]);
        std::fs::write(&source, &bytes).unwrap();

        let dest = temp.path().join("textures");
        let mut archiver = TextureArchiver::claim(&dest).unwrap();
        let record = archiver.archive(&external("grass", source), ColorInterpretation::Color).unwrap();

        assert_eq!(record.strategy, ArchiveStrategy::CopyExternal);
        assert_eq!(std::fs::read(dest.join("grass.png")).unwrap(), bytes);
    }

    #[test]
    fn test_external_jpeg_is_reencoded() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("photo.jpg");
        image::RgbImage::from_pixel(12, 10, image::Rgb([10, 20, 30]))
            .save_with_format(&source, ImageFormat::Jpeg)
            .unwrap();

        let dest = temp.path().join("textures");
        let mut archiver = TextureArchiver::claim(&dest).unwrap();
        let record = archiver.archive(&external("photo.jpg", source), ColorInterpretation::Color).unwrap();

        assert_eq!(record.strategy, ArchiveStrategy::GenericReencode);
        assert_eq!(record.archived_filename, "photo.png");
        assert_eq!(record.pixel_dimensions, [12, 10]);
        let written = std::fs::read(dest.join("photo.png")).unwrap();
        assert_eq!(image::guess_format(&written).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn test_total_failure_leaves_no_residue() {
        let temp = TempDir::new().unwrap();
        let mut archiver = TextureArchiver::claim(temp.path()).unwrap();
        let failure = archiver
            .archive(&packed("broken", b"not an image".to_vec(), "image/png"), ColorInterpretation::Color)
            .unwrap_err();

        assert_eq!(failure.texture, "broken");
        let tried: Vec<ArchiveStrategy> = failure.attempts.iter().map(|a| a.strategy).collect();
        assert_eq!(tried, ArchiveStrategy::ORDER.to_vec());
        assert!(failure.to_string().contains("copy_external: image has an embedded payload"));
        assert!(contents(temp.path()).is_empty());

        // The name is free again for the next texture
        let record = archiver
            .archive(&packed("broken", png_bytes(4, [0; 4]), "image/png"), ColorInterpretation::Color)
            .unwrap();
        assert_eq!(record.archived_filename, "broken.png");
    }

    #[test]
    fn test_missing_external_file_fails() {
        let temp = TempDir::new().unwrap();
        let mut archiver = TextureArchiver::claim(temp.path()).unwrap();
        let failure = archiver
            .archive(&external("gone", temp.path().join("gone.png")), ColorInterpretation::Color)
            .unwrap_err();
        assert_eq!(failure.attempts.len(), 4);
        assert!(contents(temp.path()).is_empty());
    }

    #[test]
    fn test_collisions_are_deduplicated() {
        let temp = TempDir::new().unwrap();
        let mut archiver = TextureArchiver::claim(temp.path()).unwrap();
        let a = archiver.archive(&packed("Skin", png_bytes(4, [1; 4]), "image/png"), ColorInterpretation::Color).unwrap();
        let b = archiver.archive(&packed("skin", png_bytes(4, [2; 4]), "image/png"), ColorInterpretation::Color).unwrap();
        assert_eq!(a.archived_filename, "Skin.png");
        assert_eq!(b.archived_filename, "skin_2.png");
        assert_eq!(contents(temp.path()).len(), 2);
    }

    #[test]
    fn test_directory_is_claimed_exclusively() {
        let temp = TempDir::new().unwrap();
        let first = TextureArchiver::claim(temp.path()).unwrap();
        assert!(matches!(
            TextureArchiver::claim(temp.path()),
            Err(Error::ArchiveDirectoryInUse { .. })
        ));
        drop(first);
        assert!(!temp.path().join(OWNER_MARKER).exists());
        TextureArchiver::claim(temp.path()).unwrap();
    }
}
