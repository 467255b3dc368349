//! CLI commands for inspecting manifests and assets

use std::path::{Path, PathBuf};

use console::style;
use indicatif::HumanBytes;

use crate::cli::progress::{CUBE, LOOKING_GLASS, print_warning};
use crate::host::{AuthoringHost, GltfHost, ImageSource};
use crate::manifest::{MANIFEST_FILE_NAME, load_manifest};
use crate::normalize::{CanonicalNodeType, HostVersion};
use crate::restore::RestoreConfig;

/// Accept either the manifest file or the extraction directory holding it.
fn manifest_path(path: &Path) -> PathBuf {
    if path.is_dir() {
        path.join(MANIFEST_FILE_NAME)
    } else {
        path.to_path_buf()
    }
}

/// `Skin, -, Cloth` with `-` for an empty slot.
fn slot_list(slots: &[Option<String>]) -> String {
    slots
        .iter()
        .map(|s| s.as_deref().unwrap_or("-"))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn manifest(path: &Path, json: bool) -> anyhow::Result<()> {
    let path = manifest_path(path);
    let manifest = load_manifest(&path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&manifest)?);
        return Ok(());
    }

    println!("{}{}", LOOKING_GLASS, style(path.display()).bold());
    println!("  Source:    {}", manifest.source_asset_id);
    println!("  Version:   {}", manifest.metadata_version);
    if let Some(host) = manifest.host_version {
        println!("  Host:      {host}");
    }
    if let Some(at) = &manifest.extracted_at {
        println!("  Extracted: {at}");
    }

    println!("\n{} materials:", style(manifest.materials.len()).bold());
    for material in &manifest.materials {
        let unknown = material
            .nodes
            .iter()
            .filter(|n| n.canonical_type == CanonicalNodeType::Unknown)
            .count();
        let textured = material.nodes.iter().filter(|n| n.bound_texture_name.is_some()).count();
        print!(
            "  {:<24} {:>3} nodes {:>3} links {:>2} textures",
            material.name,
            material.nodes.len(),
            material.links.len(),
            textured
        );
        if unknown > 0 {
            print!("  {}", style(format!("({unknown} unknown)")).yellow());
        }
        if !material.uses_graph {
            print!("  {}", style("(graph disabled)").dim());
        }
        println!();
    }

    println!(
        "\n{} textures ({}):",
        style(manifest.textures.len()).bold(),
        HumanBytes(manifest.payload_bytes())
    );
    for texture in &manifest.textures {
        println!(
            "  {:<24} {}x{} {:<9} {:>10} via {}",
            texture.archived_filename,
            texture.pixel_dimensions[0],
            texture.pixel_dimensions[1],
            texture.color_interpretation.to_string(),
            HumanBytes(texture.payload_bytes).to_string(),
            texture.strategy
        );
    }

    println!("\n{} meshes:", style(manifest.mesh_materials.len()).bold());
    for (mesh, slots) in &manifest.mesh_materials {
        println!("  {:<24} [{}]", mesh, slot_list(slots));
    }

    if !manifest.diagnostics.is_empty() {
        println!();
        for diagnostic in &manifest.diagnostics {
            print_warning(&diagnostic.to_string());
        }
    }
    Ok(())
}

pub fn asset(path: &Path, host_version: Option<HostVersion>) -> anyhow::Result<()> {
    let version = match host_version {
        Some(version) => version,
        None => RestoreConfig::load(None)?.host.version,
    };
    let scene = GltfHost::new(version).load_scene(path)?;

    println!("{}{}", CUBE, style(path.display()).bold());

    println!("\n{} meshes:", style(scene.meshes.len()).bold());
    for mesh in &scene.meshes {
        println!(
            "  {:<24} {:>3} primitives [{}]",
            mesh.name,
            mesh.primitive_slots.len(),
            slot_list(&mesh.material_slots)
        );
    }

    println!("\n{} materials:", style(scene.materials.len()).bold());
    for material in scene.materials.values() {
        println!(
            "  {:<24} {:>3} nodes {:>3} links{}",
            material.name,
            material.node_tree.nodes.len(),
            material.node_tree.links.len(),
            if material.use_nodes { "" } else { "  (graph disabled)" }
        );
    }

    println!("\n{} images:", style(scene.images.len()).bold());
    for image in scene.images.values() {
        let source = match &image.source {
            ImageSource::Packed { bytes, mime_type } => {
                format!("packed {mime_type} {}", HumanBytes(bytes.len() as u64))
            }
            ImageSource::External(file) => format!("external {}", file.display()),
        };
        println!("  {:<24} {:<10} {}", image.name, image.color_space, source);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_manifest_path_accepts_extraction_dir() {
        let dir = TempDir::new().unwrap();
        assert_eq!(manifest_path(dir.path()), dir.path().join(MANIFEST_FILE_NAME));

        let file = dir.path().join("custom.json");
        assert_eq!(manifest_path(&file), file);
    }

    #[test]
    fn test_slot_list_marks_empty_slots() {
        assert_eq!(slot_list(&[Some("Skin".to_string()), None]), "Skin, -");
        assert_eq!(slot_list(&[]), "");
    }
}
