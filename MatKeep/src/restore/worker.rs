//! Stage worker protocol.
//!
//! Neither extraction nor the orchestrator touches a host scene in the
//! calling process. For every host-touching stage the caller writes a
//! [`StageTask`] as JSON, starts
//! `matkeep worker --task <file>` and reads back three things:
//!
//! - the exit code,
//! - one sentinel line on stdout (`MATKEEP_STAGE_OK <stage>` or
//!   `MATKEEP_STAGE_FAILED <stage>: <message>`),
//! - the [`StageResult`] JSON file named by the task.
//!
//! Logs go to stderr so stdout only carries the sentinel.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::extract::extract_to_dir;
use crate::host::{AuthoringHost, GltfHost, SaveOptions};
use crate::manifest::load_manifest;
use crate::normalize::HostVersion;
use crate::reconstruct::{ReconstructionReport, reconstruct};

/// Stdout prefix of a successful stage.
pub const STAGE_OK: &str = "MATKEEP_STAGE_OK";
/// Stdout prefix of a stage that failed in an orderly way.
pub const STAGE_FAILED: &str = "MATKEEP_STAGE_FAILED";

/// Host-touching stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Extract,
    Inspect,
    Reconstruct,
    Export,
}

impl Stage {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Extract => "extract",
            Self::Inspect => "inspect",
            Self::Reconstruct => "reconstruct",
            Self::Export => "export",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What one worker invocation should do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum StageRequest {
    /// Record the source asset's materials into `out_dir`.
    Extract { source: PathBuf, out_dir: PathBuf },
    /// Load the retargeted asset and summarize it.
    Inspect { target: PathBuf },
    /// Rebuild materials onto the target and save the staged asset.
    Reconstruct {
        target: PathBuf,
        manifest: PathBuf,
        texture_dir: PathBuf,
        staged_output: PathBuf,
    },
    /// Write the final asset, and optionally a preview.
    Export {
        staged: PathBuf,
        output: PathBuf,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        preview: Option<PreviewRequest>,
    },
}

impl StageRequest {
    #[must_use]
    pub fn stage(&self) -> Stage {
        match self {
            Self::Extract { .. } => Stage::Extract,
            Self::Inspect { .. } => Stage::Inspect,
            Self::Reconstruct { .. } => Stage::Reconstruct,
            Self::Export { .. } => Stage::Export,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewRequest {
    pub path: PathBuf,
    pub max_texture_size: u32,
}

/// Task descriptor handed to the worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageTask {
    pub host_version: HostVersion,
    /// Where the worker writes its [`StageResult`].
    pub result_path: PathBuf,
    pub request: StageRequest,
}

impl StageTask {
    #[must_use]
    pub fn stage(&self) -> Stage {
        self.request.stage()
    }
}

/// Mesh as seen by the inspect stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshSummary {
    pub name: String,
    pub slots: usize,
}

/// What a stage produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum StageResult {
    /// The manifest itself is read back from the extraction directory.
    Extract {
        materials: usize,
        textures: usize,
        diagnostics: usize,
    },
    Inspect {
        meshes: Vec<MeshSummary>,
        materials: usize,
        images: usize,
    },
    Reconstruct {
        report: ReconstructionReport,
        staged_bytes: u64,
    },
    Export {
        output_bytes: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        preview_bytes: Option<u64>,
    },
}

impl StageResult {
    #[must_use]
    pub fn stage(&self) -> Stage {
        match self {
            Self::Extract { .. } => Stage::Extract,
            Self::Inspect { .. } => Stage::Inspect,
            Self::Reconstruct { .. } => Stage::Reconstruct,
            Self::Export { .. } => Stage::Export,
        }
    }
}

/// Execute `task` against `host`.
pub fn run_task(host: &dyn AuthoringHost, task: &StageTask) -> Result<StageResult> {
    tracing::info!("Running stage {} on host {}", task.stage(), host.version());
    match &task.request {
        StageRequest::Extract { source, out_dir } => {
            let manifest = extract_to_dir(host, source, out_dir)?;
            Ok(StageResult::Extract {
                materials: manifest.materials.len(),
                textures: manifest.textures.len(),
                diagnostics: manifest.diagnostics.len(),
            })
        }
        StageRequest::Inspect { target } => {
            let scene = host.load_scene(target)?;
            Ok(StageResult::Inspect {
                meshes: scene
                    .meshes
                    .iter()
                    .map(|m| MeshSummary {
                        name: m.name.clone(),
                        slots: m.material_slots.len(),
                    })
                    .collect(),
                materials: scene.materials.len(),
                images: scene.images.len(),
            })
        }
        StageRequest::Reconstruct {
            target,
            manifest,
            texture_dir,
            staged_output,
        } => {
            let manifest = load_manifest(manifest)?;
            let mut scene = host.load_scene(target)?;
            let report = reconstruct(host, &mut scene, &manifest, texture_dir);
            let staged_bytes = host.save_scene(&scene, staged_output, &SaveOptions::default())?;
            Ok(StageResult::Reconstruct { report, staged_bytes })
        }
        StageRequest::Export {
            staged,
            output,
            preview,
        } => {
            let scene = host.load_scene(staged)?;
            if let Some(parent) = output.parent() {
                fs::create_dir_all(parent)?;
            }
            let output_bytes = host.save_scene(&scene, output, &SaveOptions::default())?;
            let preview_bytes = match preview {
                Some(preview) => {
                    let options = SaveOptions::default().with_max_texture_size(preview.max_texture_size);
                    Some(host.save_scene(&scene, &preview.path, &options)?)
                }
                None => None,
            };
            Ok(StageResult::Export {
                output_bytes,
                preview_bytes,
            })
        }
    }
}

pub fn write_task(task: &StageTask, path: &Path) -> Result<()> {
    fs::write(path, serde_json::to_vec_pretty(task)?)?;
    Ok(())
}

pub fn read_task(path: &Path) -> Result<StageTask> {
    Ok(serde_json::from_slice(&fs::read(path)?)?)
}

pub fn write_result(result: &StageResult, path: &Path) -> Result<()> {
    fs::write(path, serde_json::to_vec_pretty(result)?)?;
    Ok(())
}

pub fn read_result(path: &Path) -> Result<StageResult> {
    Ok(serde_json::from_slice(&fs::read(path)?)?)
}

/// Worker entry point: run the task file and write its result.
///
/// Returns the stage that ran so the caller can print the sentinel. When
/// the task file itself cannot be read the stage is unknown and `None` is
/// returned with the error.
pub fn serve(task_path: &Path) -> std::result::Result<Stage, (Option<Stage>, Error)> {
    let task = read_task(task_path).map_err(|e| (None, e))?;
    let stage = task.stage();
    let host = GltfHost::new(task.host_version);
    let result = run_task(&host, &task).map_err(|e| (Some(stage), e))?;
    write_result(&result, &task.result_path).map_err(|e| (Some(stage), e))?;
    Ok(stage)
}

/// The sentinel line for a successful stage.
#[must_use]
pub fn ok_sentinel(stage: Stage) -> String {
    format!("{STAGE_OK} {stage}")
}

/// The sentinel line for a failed stage. Newlines in `message` are folded.
#[must_use]
pub fn failed_sentinel(stage: Option<Stage>, message: &str) -> String {
    let stage = stage.map_or("unknown", Stage::as_str);
    format!("{STAGE_FAILED} {stage}: {}", message.replace(['\r', '\n'], " "))
}

/// Sentinel found in a worker's stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sentinel {
    Ok(String),
    Failed { stage: String, message: String },
}

/// Find the last sentinel line in `stdout`.
#[must_use]
pub fn parse_sentinel(stdout: &str) -> Option<Sentinel> {
    stdout.lines().rev().find_map(|line| {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix(STAGE_OK) {
            return Some(Sentinel::Ok(rest.trim().to_string()));
        }
        let rest = line.strip_prefix(STAGE_FAILED)?;
        let (stage, message) = rest.split_once(':').unwrap_or((rest, ""));
        Some(Sentinel::Failed {
            stage: stage.trim().to_string(),
            message: message.trim().to_string(),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{MANIFEST_FILE_NAME, TEXTURE_DIR_NAME};
    use crate::test_support::{self, FixtureMaterial, FixtureMesh};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_sentinels() {
        assert_eq!(parse_sentinel(&ok_sentinel(Stage::Export)), Some(Sentinel::Ok("export".to_string())));
        let noisy = format!("some output\n{}\n", failed_sentinel(Some(Stage::Inspect), "bad\nthing"));
        assert_eq!(
            parse_sentinel(&noisy),
            Some(Sentinel::Failed {
                stage: "inspect".to_string(),
                message: "bad thing".to_string(),
            })
        );
        assert_eq!(parse_sentinel("nothing here"), None);
    }

    #[test]
    fn test_task_json_is_tagged_by_stage() {
        let task = StageTask {
            host_version: HostVersion::new(4, 1),
            result_path: PathBuf::from("/tmp/r.json"),
            request: StageRequest::Inspect {
                target: PathBuf::from("/tmp/a.glb"),
            },
        };
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["request"]["stage"], "inspect");
        assert_eq!(value["host_version"], "4.1");
    }

    #[test]
    fn test_serve_runs_all_stages() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("source.glb");
        test_support::write_fixture_glb(
            &source,
            &[FixtureMaterial::textured("Skin", "skin_albedo", 32)],
            &[FixtureMesh::new("Body", &[Some(0)])],
        );
        let extraction = temp.path().join("extraction");
        let target = temp.path().join("target.glb");
        test_support::write_fixture_glb(&target, &[], &[FixtureMesh::new("Body", &[None])]);

        let staged = temp.path().join("staged.glb");
        let output = temp.path().join("final").join("out.glb");
        let requests = [
            StageRequest::Extract {
                source,
                out_dir: extraction.clone(),
            },
            StageRequest::Inspect { target: target.clone() },
            StageRequest::Reconstruct {
                target,
                manifest: extraction.join(MANIFEST_FILE_NAME),
                texture_dir: extraction.join(TEXTURE_DIR_NAME),
                staged_output: staged.clone(),
            },
            StageRequest::Export {
                staged,
                output: output.clone(),
                preview: Some(PreviewRequest {
                    path: temp.path().join("preview.glb"),
                    max_texture_size: 8,
                }),
            },
        ];

        for request in requests {
            let stage = request.stage();
            let task = StageTask {
                host_version: HostVersion::DEFAULT,
                result_path: temp.path().join(format!("{stage}-result.json")),
                request,
            };
            let task_path = temp.path().join(format!("{stage}-task.json"));
            write_task(&task, &task_path).unwrap();
            assert_eq!(serve(&task_path).unwrap(), stage);

            let result = read_result(&task.result_path).unwrap();
            assert_eq!(result.stage(), stage);
            match result {
                StageResult::Extract { materials, textures, .. } => {
                    assert_eq!((materials, textures), (1, 1));
                    assert!(extraction.join(MANIFEST_FILE_NAME).is_file());
                }
                StageResult::Inspect { meshes, .. } => assert_eq!(meshes[0].name, "Body"),
                StageResult::Reconstruct { report, staged_bytes } => {
                    assert_eq!(report.textures_bound, 1);
                    assert!(staged_bytes > 0);
                }
                StageResult::Export { preview_bytes, .. } => assert!(preview_bytes.is_some()),
            }
        }
        assert!(output.is_file());
    }

    #[test]
    fn test_serve_reports_stage_of_failure() {
        let temp = TempDir::new().unwrap();
        let task = StageTask {
            host_version: HostVersion::DEFAULT,
            result_path: temp.path().join("r.json"),
            request: StageRequest::Inspect {
                target: temp.path().join("missing.glb"),
            },
        };
        let task_path = temp.path().join("task.json");
        write_task(&task, &task_path).unwrap();
        let (stage, _) = serve(&task_path).unwrap_err();
        assert_eq!(stage, Some(Stage::Inspect));

        let (stage, _) = serve(&temp.path().join("no-task.json")).unwrap_err();
        assert_eq!(stage, None);
    }
}
