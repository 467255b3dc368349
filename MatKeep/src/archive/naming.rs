//! Filesystem-safe archive file names.

use std::collections::HashSet;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tga", "bmp", "tif", "tiff", "exr", "hdr", "webp", "dds"];

/// Reduce an image name to a safe file stem.
///
/// Strips a trailing image extension, replaces anything outside
/// `[A-Za-z0-9_.-]` with `_` and never returns an empty or dot-only stem.
#[must_use]
pub fn safe_stem(name: &str) -> String {
    let trimmed = name.trim();
    let stem = match trimmed.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) => stem,
        _ => trimmed,
    };
    let safe: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') { c } else { '_' })
        .collect();
    let safe = safe.trim_start_matches('.').to_string();
    if safe.is_empty() { "texture".to_string() } else { safe }
}

/// Hands out archive file names, unique case-insensitively.
#[derive(Debug, Default)]
pub struct NameAllocator {
    used: HashSet<String>,
}

impl NameAllocator {
    /// Reserve `<safe stem>.png`, or `<safe stem>_2.png`, `_3`, ... on collision.
    pub fn allocate(&mut self, name: &str) -> String {
        let stem = safe_stem(name);
        let mut candidate = format!("{stem}.png");
        let mut n = 2;
        while self.used.contains(&candidate.to_lowercase()) {
            candidate = format!("{stem}_{n}.png");
            n += 1;
        }
        self.used.insert(candidate.to_lowercase());
        candidate
    }

    /// Give a name back after the texture it was reserved for failed.
    pub fn release(&mut self, file_name: &str) {
        self.used.remove(&file_name.to_lowercase());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_stem() {
        assert_eq!(safe_stem("skin_albedo.png"), "skin_albedo");
        assert_eq!(safe_stem("Body Diffuse (1).JPG"), "Body_Diffuse__1_");
        assert_eq!(safe_stem("../../etc/passwd"), "_.._etc_passwd");
        assert_eq!(safe_stem("v1.2_mask"), "v1.2_mask");
        assert_eq!(safe_stem(""), "texture");
        assert_eq!(safe_stem("..."), "texture");
    }

    #[test]
    fn test_allocation_is_case_insensitive() {
        let mut names = NameAllocator::default();
        assert_eq!(names.allocate("Skin"), "Skin.png");
        assert_eq!(names.allocate("skin"), "skin_2.png");
        assert_eq!(names.allocate("SKIN.png"), "SKIN_3.png");
        names.release("skin_2.png");
        assert_eq!(names.allocate("skin"), "skin_2.png");
    }
}
