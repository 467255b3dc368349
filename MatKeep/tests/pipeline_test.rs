//! Extract, retarget, restore: the whole pipeline against real files.

mod common;

use std::fs;

use matkeep::prelude::*;
use matkeep::restore::InProcessRunner;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

use common::{IMAGE, MATERIAL, MESH, write_retargeted_asset, write_source_asset};

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Source extracted into `hero.matkeep`, retargeted asset written.
    fn prepared() -> Self {
        let dir = TempDir::new().unwrap();
        write_source_asset(&dir.path().join("hero.glb"));
        write_retargeted_asset(&dir.path().join("hero_rigged.glb"));
        let host = GltfHost::default();
        extract_to_dir(&host, &dir.path().join("hero.glb"), &dir.path().join("hero.matkeep")).unwrap();
        Self { dir }
    }

    fn request(&self) -> RestoreRequest {
        RestoreRequest::from_extraction(
            self.dir.path().join("hero_rigged.glb"),
            &self.dir.path().join("hero.matkeep"),
            self.dir.path().join("hero_final.glb"),
        )
    }
}

#[test]
fn test_extraction_layout() {
    let ws = Workspace::prepared();
    let out = ws.dir.path().join("hero.matkeep");

    let manifest = load_manifest(&out.join("material_manifest.json")).unwrap();
    assert_eq!(manifest.materials.len(), 1);
    assert_eq!(manifest.materials[0].name, MATERIAL);
    assert_eq!(manifest.mesh_materials[MESH], vec![Some(MATERIAL.to_string())]);
    assert_eq!(manifest.mesh_primitive_slots[MESH], vec![0]);
    assert_eq!(manifest.textures.len(), 1);
    assert_eq!(manifest.textures[0].name, IMAGE);
    assert!(out.join("textures").join(&manifest.textures[0].archived_filename).is_file());
}

#[test]
fn test_restore_in_process_rebuilds_materials() {
    let ws = Workspace::prepared();
    let request = ws.request();
    let orchestrator = Orchestrator::new(RestoreConfig::default(), InProcessRunner::new(GltfHost::default()));

    let result = orchestrator.run(&request);

    let RunOutcome::Succeeded { quality, report, .. } = &result.outcome else {
        panic!("expected success, got {:?}", result.outcome);
    };
    assert_eq!(report.materials_created, 1);
    assert_eq!(report.textures_bound, 1);
    assert_eq!(report.meshes_assigned, 1);
    assert!(quality.score >= QualityScore::Good, "{quality:?}");
    assert!(result.warnings.is_empty(), "{:?}", result.warnings);

    let scene = GltfHost::default().load_scene(&request.output).unwrap();
    let body = scene.mesh(MESH).unwrap();
    assert_eq!(body.primitive_material(0), Some(MATERIAL));
    assert_eq!(scene.images.len(), 1);
    assert!(scene.images.values().all(|i| i.source.is_packed()));
}

#[test]
fn test_restored_asset_extracts_to_same_graph() {
    let ws = Workspace::prepared();
    let request = ws.request();
    Orchestrator::new(RestoreConfig::default(), InProcessRunner::new(GltfHost::default())).run(&request);

    let original = load_manifest(&request.manifest).unwrap();
    let again = extract(
        &GltfHost::default(),
        &request.output,
        &ws.dir.path().join("again_textures"),
    )
    .unwrap();

    assert_eq!(again.materials.len(), original.materials.len());
    assert_eq!(again.node_count(), original.node_count());
    assert_eq!(again.link_count(), original.link_count());
    assert_eq!(again.texture_binding_count(), original.texture_binding_count());
    assert_eq!(again.mesh_materials, original.mesh_materials);
}

#[test]
fn test_corrupt_manifest_degrades_to_copy() {
    let ws = Workspace::prepared();
    let request = ws.request();
    fs::write(&request.manifest, b"{ not json").unwrap();

    let result =
        Orchestrator::new(RestoreConfig::default(), InProcessRunner::new(GltfHost::default())).run(&request);

    assert_eq!(result.outcome.state(), RunState::Degraded);
    assert_eq!(fs::read(&request.output).unwrap(), fs::read(&request.target).unwrap());
}

#[test]
fn test_missing_target_fails() {
    let ws = Workspace::prepared();
    let mut request = ws.request();
    request.target = ws.dir.path().join("nowhere.glb");

    let result =
        Orchestrator::new(RestoreConfig::default(), InProcessRunner::new(GltfHost::default())).run(&request);

    assert_eq!(result.outcome.state(), RunState::Failed);
    assert!(result.outcome.output().is_none());
    assert!(!request.output.exists());
}

#[cfg(all(unix, feature = "cli"))]
mod subprocess {
    use super::*;
    use matkeep::restore::SubprocessRunner;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn worker() -> SubprocessRunner {
        SubprocessRunner::new(env!("CARGO_BIN_EXE_matkeep")).with_timeout(Duration::from_secs(60))
    }

    #[test]
    fn test_restore_through_worker_processes() {
        let ws = Workspace::prepared();
        let request = ws.request();

        let result = Orchestrator::new(RestoreConfig::default(), worker()).run(&request);

        assert_eq!(result.outcome.state(), RunState::Succeeded, "{:?}", result.outcome);
        assert_eq!(
            result.history,
            vec![
                RunState::Idle,
                RunState::Importing,
                RunState::ManifestLoaded,
                RunState::Reconstructing,
                RunState::Validating,
                RunState::Exporting,
                RunState::Succeeded,
            ]
        );
        let scene = GltfHost::default().load_scene(&request.output).unwrap();
        assert_eq!(scene.mesh(MESH).unwrap().primitive_material(0), Some(MATERIAL));
    }

    #[test]
    fn test_extract_through_worker_process() {
        let ws = Workspace::prepared();
        let source = ws.dir.path().join("hero.glb");
        let out_dir = ws.dir.path().join("isolated.matkeep");

        let manifest = extract_isolated(&worker(), HostVersion::DEFAULT, &source, &out_dir).unwrap();

        let direct = load_manifest(&ws.dir.path().join("hero.matkeep/material_manifest.json")).unwrap();
        assert_eq!(manifest.materials, direct.materials);
        assert_eq!(manifest.mesh_materials, direct.mesh_materials);
        assert!(out_dir.join("textures").join(&manifest.textures[0].archived_filename).is_file());
    }

    #[test]
    fn test_extract_with_dead_worker_fails() {
        let ws = Workspace::prepared();
        let err = extract_isolated(
            &SubprocessRunner::new("false"),
            HostVersion::DEFAULT,
            &ws.dir.path().join("hero.glb"),
            &ws.dir.path().join("dead.matkeep"),
        )
        .unwrap_err();
        assert!(matches!(err, Error::HostCrash { .. }), "{err}");
    }

    #[test]
    fn test_worker_that_dies_degrades() {
        let ws = Workspace::prepared();
        let request = ws.request();

        let result = Orchestrator::new(RestoreConfig::default(), SubprocessRunner::new("false")).run(&request);

        assert_eq!(result.outcome.state(), RunState::Degraded);
        assert_eq!(fs::read(&request.output).unwrap(), fs::read(&request.target).unwrap());
    }
}
