//! Material graph extractor.
//!
//! Reads a source asset through an [`AuthoringHost`], walks every material
//! a mesh uses into canonical records and archives the images those
//! materials sample. Loading the asset is the only fatal step; everything
//! narrower is recorded as a [`Diagnostic`] on the manifest.

mod graph;

use std::collections::HashMap;
use std::path::Path;

use chrono::{SecondsFormat, Utc};

use crate::archive::TextureArchiver;
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::error::{Error, Result};
use crate::host::{AuthoringHost, Scene, SceneMaterial};
use crate::manifest::{
    MANIFEST_FILE_NAME, MaterialManifest, MaterialRecord, TEXTURE_DIR_NAME, save_manifest,
};
use crate::normalize::{self, CanonicalNodeType};

/// Stable identifier of a source asset: `<file stem>-<12 hex digits of MD5>`.
///
/// # Errors
/// Returns an error if the file cannot be read.
pub fn source_asset_id(source: &Path) -> Result<String> {
    let bytes = std::fs::read(source)?;
    let digest = format!("{:x}", md5::compute(&bytes));
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("asset");
    Ok(format!("{stem}-{}", &digest[..12]))
}

/// Extract a manifest from `source`, archiving textures into `texture_dir`.
///
/// # Errors
/// Returns [`Error::SourceAssetMissing`] if `source` does not exist, the
/// host's load error if it cannot be loaded, and
/// [`Error::ArchiveDirectoryInUse`] if `texture_dir` is claimed elsewhere.
pub fn extract(host: &dyn AuthoringHost, source: &Path, texture_dir: &Path) -> Result<MaterialManifest> {
    if !source.is_file() {
        return Err(Error::SourceAssetMissing {
            path: source.to_path_buf(),
        });
    }
    tracing::info!("Extracting materials from {}", source.display());

    let asset_id = source_asset_id(source)?;
    let scene = host.load_scene(source)?;
    let mut archiver = TextureArchiver::claim(texture_dir)?;

    let mut manifest = MaterialManifest::new(asset_id);
    manifest.host_version = Some(host.version());
    manifest.extracted_at = Some(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true));

    let mut archived: HashMap<String, Option<String>> = HashMap::new();
    for name in scene.referenced_materials() {
        let Some(material) = scene.materials.get(name) else {
            continue;
        };
        let record = extract_material(&scene, material, &mut archiver, &mut archived, &mut manifest);
        manifest.materials.push(record);
    }

    for mesh in &scene.meshes {
        manifest
            .mesh_materials
            .insert(mesh.name.clone(), mesh.material_slots.clone());
        manifest
            .mesh_primitive_slots
            .insert(mesh.name.clone(), mesh.primitive_slots.clone());
    }

    tracing::info!(
        "Extracted {} materials, {} textures, {} meshes ({} diagnostics)",
        manifest.materials.len(),
        manifest.textures.len(),
        manifest.mesh_materials.len(),
        manifest.diagnostics.len()
    );
    Ok(manifest)
}

/// Extract into the standard layout under `out_dir` and write the manifest.
///
/// ```text
/// <out_dir>/material_manifest.json
/// <out_dir>/textures/*.png
/// ```
///
/// # Errors
/// Same as [`extract`], plus manifest write errors.
pub fn extract_to_dir(host: &dyn AuthoringHost, source: &Path, out_dir: &Path) -> Result<MaterialManifest> {
    let manifest = extract(host, source, &out_dir.join(TEXTURE_DIR_NAME))?;
    save_manifest(&manifest, &out_dir.join(MANIFEST_FILE_NAME))?;
    Ok(manifest)
}

fn extract_material(
    scene: &Scene,
    material: &SceneMaterial,
    archiver: &mut TextureArchiver,
    archived: &mut HashMap<String, Option<String>>,
    manifest: &mut MaterialManifest,
) -> MaterialRecord {
    let tree = &material.node_tree;
    let mut nodes = Vec::with_capacity(tree.nodes.len());

    for node in &tree.nodes {
        let mut record = graph::node_record(&material.name, tree, node, &mut manifest.diagnostics);
        if record.canonical_type == CanonicalNodeType::ImageSample {
            if let Some(image_name) = &node.image {
                record.bound_texture_name =
                    archive_once(scene, image_name, &material.name, &node.name, archiver, archived, manifest);
            }
        }
        tracing::debug!("{}: node '{}' -> {}", material.name, node.name, record.canonical_type);
        nodes.push(record);
    }

    let links = graph::link_records(&material.name, tree, &mut manifest.diagnostics);

    MaterialRecord {
        name: material.name.clone(),
        uses_graph: material.use_nodes,
        nodes,
        links,
    }
}

/// Archive `image_name` the first time it is seen. Returns the texture name
/// on success.
fn archive_once(
    scene: &Scene,
    image_name: &str,
    material: &str,
    node: &str,
    archiver: &mut TextureArchiver,
    archived: &mut HashMap<String, Option<String>>,
    manifest: &mut MaterialManifest,
) -> Option<String> {
    if let Some(result) = archived.get(image_name) {
        return result.clone();
    }

    let result = match scene.images.get(image_name) {
        None => {
            manifest.diagnostics.push(Diagnostic::new(
                DiagnosticKind::ImageMissing,
                format!("{material}/{node}"),
                format!("image '{image_name}' is not part of the asset"),
            ));
            None
        }
        Some(image) => {
            let interpretation = normalize::color_space_to_canonical(&image.color_space);
            match archiver.archive(image, interpretation) {
                Ok(record) => {
                    let name = record.name.clone();
                    manifest.textures.push(record);
                    Some(name)
                }
                Err(failure) => {
                    tracing::warn!("{failure}");
                    manifest.diagnostics.push(Diagnostic::new(
                        DiagnosticKind::ArchiveFailure,
                        image_name,
                        failure.to_string(),
                    ));
                    None
                }
            }
        }
    };
    archived.insert(image_name.to_string(), result.clone());
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{GltfHost, ImageSource, SceneImage};
    use crate::manifest::load_manifest;
    use crate::normalize::{CanonicalSocketName, ColorInterpretation, SocketKey};
    use crate::test_support::{self, FixtureMaterial, FixtureMesh};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_single_textured_material() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("hero.glb");
        test_support::write_fixture_glb(
            &source,
            &[FixtureMaterial::textured("Skin", "skin_albedo", 64)],
            &[FixtureMesh::new("Body", &[Some(0)])],
        );

        let manifest = extract(&GltfHost::default(), &source, &temp.path().join("textures")).unwrap();

        assert!(manifest.source_asset_id.starts_with("hero-"));
        assert_eq!(manifest.source_asset_id.len(), "hero-".len() + 12);
        assert_eq!(manifest.materials.len(), 1);
        assert_eq!(manifest.textures.len(), 1);
        assert!(manifest.diagnostics.is_empty(), "{:#?}", manifest.diagnostics);

        let skin = &manifest.materials[0];
        assert_eq!(skin.nodes.len(), 3);
        assert_eq!(skin.links.len(), 2);
        let image = skin
            .nodes
            .iter()
            .find(|n| n.canonical_type == CanonicalNodeType::ImageSample)
            .unwrap();
        assert_eq!(image.bound_texture_name.as_deref(), Some("skin_albedo"));

        // Base Color is linked, so it is not stored as a value
        let bsdf = skin
            .nodes
            .iter()
            .find(|n| n.canonical_type == CanonicalNodeType::PrincipledSurface)
            .unwrap();
        assert!(!bsdf.inputs.contains_key(&SocketKey::from(CanonicalSocketName::BaseColor)));
        assert!(bsdf.inputs.contains_key(&SocketKey::from(CanonicalSocketName::Roughness)));

        let texture = &manifest.textures[0];
        assert_eq!(texture.pixel_dimensions, [64, 64]);
        assert_eq!(texture.color_interpretation, ColorInterpretation::Color);
        assert!(temp.path().join("textures").join(&texture.archived_filename).is_file());

        assert_eq!(manifest.mesh_materials["Body"], vec![Some("Skin".to_string())]);
        assert!(manifest.is_valid());
    }

    #[test]
    fn test_unreferenced_materials_are_skipped() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("a.glb");
        test_support::write_fixture_glb(
            &source,
            &[
                FixtureMaterial::plain("Used", [1.0; 4]),
                FixtureMaterial::plain("Orphan", [0.0, 0.0, 0.0, 1.0]),
            ],
            &[FixtureMesh::new("Body", &[Some(0)])],
        );
        let manifest = extract(&GltfHost::default(), &source, &temp.path().join("t")).unwrap();
        let names: Vec<&str> = manifest.materials.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Used"]);
    }

    #[test]
    fn test_missing_source() {
        let temp = TempDir::new().unwrap();
        let err = extract(&GltfHost::default(), &temp.path().join("nope.glb"), temp.path()).unwrap_err();
        assert!(matches!(err, Error::SourceAssetMissing { .. }));
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("hero.glb");
        test_support::write_fixture_glb(
            &source,
            &[FixtureMaterial::textured("Skin", "skin_albedo", 32)],
            &[FixtureMesh::new("Body", &[Some(0)])],
        );
        let out = temp.path().join("out");
        let host = GltfHost::default();

        let mut first = extract_to_dir(&host, &source, &out).unwrap();
        let first_bytes = std::fs::read(out.join("textures/skin_albedo.png")).unwrap();
        let mut second = extract_to_dir(&host, &source, &out).unwrap();
        let second_bytes = std::fs::read(out.join("textures/skin_albedo.png")).unwrap();

        first.extracted_at = None;
        second.extracted_at = None;
        assert_eq!(first, second);
        assert_eq!(first_bytes, second_bytes);

        let mut on_disk = load_manifest(&out.join(MANIFEST_FILE_NAME)).unwrap();
        on_disk.extracted_at = None;
        assert_eq!(on_disk, second);
    }

    #[test]
    fn test_narrow_failures_become_diagnostics() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("hero.glb");
        test_support::write_fixture_glb(
            &source,
            &[FixtureMaterial::textured("Skin", "skin_albedo", 8)],
            &[FixtureMesh::new("Body", &[Some(0)])],
        );
        let host = GltfHost::default();
        let mut scene = host.load_scene(&source).unwrap();

        // Break the image payload and add a node type the vocabulary lacks
        scene.images["skin_albedo"].source = ImageSource::Packed {
            bytes: b"garbage".to_vec(),
            mime_type: "image/png".to_string(),
        };
        let tree = &mut scene.materials["Skin"].node_tree;
        let mut noise = tree.nodes[0].clone();
        noise.name = "Noise Texture".to_string();
        noise.type_id = "ShaderNodeTexNoise".to_string();
        tree.nodes.push(noise);

        let mut archiver = TextureArchiver::claim(&temp.path().join("t")).unwrap();
        let mut manifest = MaterialManifest::new("x");
        let mut archived = HashMap::new();
        let record = extract_material(&scene, &scene.materials["Skin"], &mut archiver, &mut archived, &mut manifest);

        assert_eq!(record.nodes.len(), 4);
        let noise = record.node("Noise Texture").unwrap();
        assert_eq!(noise.canonical_type, CanonicalNodeType::Unknown);
        assert_eq!(noise.raw_type.as_deref(), Some("ShaderNodeTexNoise"));

        let kinds: Vec<DiagnosticKind> = manifest.diagnostics.iter().map(|d| d.kind).collect();
        assert!(kinds.contains(&DiagnosticKind::UnknownNodeType));
        assert!(kinds.contains(&DiagnosticKind::ArchiveFailure));
        let image = record
            .nodes
            .iter()
            .find(|n| n.canonical_type == CanonicalNodeType::ImageSample)
            .unwrap();
        assert_eq!(image.bound_texture_name, None);
        assert!(manifest.textures.is_empty());
    }

    #[test]
    fn test_images_are_archived_once() {
        let temp = TempDir::new().unwrap();
        let mut scene = Scene::default();
        scene.images.insert(
            "shared".to_string(),
            SceneImage {
                name: "shared".to_string(),
                source: ImageSource::Packed {
                    bytes: test_support::png_bytes(4, [9; 4]),
                    mime_type: "image/png".to_string(),
                },
                color_space: "Non-Color".to_string(),
            },
        );
        let mut archiver = TextureArchiver::claim(temp.path()).unwrap();
        let mut manifest = MaterialManifest::new("x");
        let mut archived = HashMap::new();
        for node in ["A", "B"] {
            let bound = archive_once(&scene, "shared", "M", node, &mut archiver, &mut archived, &mut manifest);
            assert_eq!(bound.as_deref(), Some("shared"));
        }
        assert_eq!(manifest.textures.len(), 1);
        assert_eq!(manifest.textures[0].color_interpretation, ColorInterpretation::NonColor);
    }
}
