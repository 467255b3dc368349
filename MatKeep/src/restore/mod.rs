//! Restoration orchestrator.
//!
//! Drives one retargeted asset through
//! `Idle -> Importing -> ManifestLoaded -> Reconstructing -> Validating ->
//! Exporting -> Succeeded`. Host-touching stages run through a
//! [`StageRunner`], normally one worker process per stage. Any stage
//! failure drops the run to `Degraded`, which copies the retargeted asset
//! through unchanged. Only a missing target, an output that would replace
//! the target, an unwritable fallback or a cancellation end in `Failed`.
//!
//! [`extract_isolated`] runs extraction through the same stage protocol.

mod config;
mod state;
mod supervisor;
pub mod worker;

pub use config::{
    ExportSection, HostSection, MAX_STAGE_TIMEOUT_SECS, QualitySection, RestoreConfig, WorkerSection, expand_path,
};
pub use state::RunState;
pub use supervisor::{InProcessRunner, StageRunner, SubprocessRunner};

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tempfile::TempDir;

use crate::error::{Error, Result};
use crate::manifest::{MANIFEST_FILE_NAME, MaterialManifest, TEXTURE_DIR_NAME, load_manifest};
use crate::normalize::HostVersion;
use crate::quality::{self, QualityAssessment};
use crate::reconstruct::ReconstructionReport;

use worker::{PreviewRequest, StageRequest, StageResult, StageTask};

/// Inputs of one restoration run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreRequest {
    /// Retargeted asset produced by the external mesh pipeline.
    pub target: PathBuf,
    pub manifest: PathBuf,
    pub texture_dir: PathBuf,
    /// Final asset path.
    pub output: PathBuf,
}

impl RestoreRequest {
    /// Request reading the layout written by [`crate::extract::extract_to_dir`].
    pub fn from_extraction(target: impl Into<PathBuf>, extraction_dir: &Path, output: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            manifest: extraction_dir.join(MANIFEST_FILE_NAME),
            texture_dir: extraction_dir.join(TEXTURE_DIR_NAME),
            output: output.into(),
        }
    }

    /// `<output stem>.preview.glb` next to the output.
    #[must_use]
    pub fn preview_path(&self) -> PathBuf {
        let stem = self
            .output
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("output");
        self.output.with_file_name(format!("{stem}.preview.glb"))
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Materials restored.
    Succeeded {
        output: PathBuf,
        preview: Option<PathBuf>,
        quality: QualityAssessment,
        report: ReconstructionReport,
    },
    /// The advanced path failed; the output is an untextured copy of the target.
    Degraded { output: PathBuf, reason: String },
    /// No usable asset was produced.
    Failed { reason: String },
}

impl RunOutcome {
    #[must_use]
    pub fn state(&self) -> RunState {
        match self {
            Self::Succeeded { .. } => RunState::Succeeded,
            Self::Degraded { .. } => RunState::Degraded,
            Self::Failed { .. } => RunState::Failed,
        }
    }

    /// Path of a usable asset, if one was produced.
    #[must_use]
    pub fn output(&self) -> Option<&Path> {
        match self {
            Self::Succeeded { output, .. } | Self::Degraded { output, .. } => Some(output),
            Self::Failed { .. } => None,
        }
    }
}

/// Everything a finished run reports back.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunResult {
    pub run_id: String,
    pub outcome: RunOutcome,
    /// Every state the run passed through, starting with `Idle`.
    pub history: Vec<RunState>,
    pub warnings: Vec<String>,
}

/// Cooperative cancellation, checked between stages.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

type ProgressCallback = Box<dyn Fn(RunState)>;

/// Runs restorations with one configuration and one stage runner.
pub struct Orchestrator {
    config: RestoreConfig,
    runner: Box<dyn StageRunner>,
    cancel: CancelFlag,
    progress: Option<ProgressCallback>,
}

impl Orchestrator {
    pub fn new(config: RestoreConfig, runner: impl StageRunner + 'static) -> Self {
        Self {
            config,
            runner: Box::new(runner),
            cancel: CancelFlag::new(),
            progress: None,
        }
    }

    /// Orchestrator spawning the configured worker, or this executable.
    pub fn with_subprocess_worker(config: RestoreConfig) -> Result<Self> {
        let runner = SubprocessRunner::from_config(&config)?;
        Ok(Self::new(config, runner))
    }

    #[must_use]
    pub fn with_cancel_flag(mut self, flag: CancelFlag) -> Self {
        self.cancel = flag;
        self
    }

    /// Call `callback` on every state change.
    #[must_use]
    pub fn on_state_change(mut self, callback: impl Fn(RunState) + 'static) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    #[must_use]
    pub fn config(&self) -> &RestoreConfig {
        &self.config
    }

    /// Run one restoration. Never panics and never returns an error; every
    /// failure is folded into the [`RunOutcome`].
    pub fn run(&self, request: &RestoreRequest) -> RunResult {
        let run_id = uuid::Uuid::new_v4().to_string();
        tracing::info!("Restoration {run_id}: {}", request.target.display());

        let mut run = RestorationRun {
            id: run_id,
            state: RunState::Idle,
            history: vec![RunState::Idle],
            manifest: None,
            report: None,
            warnings: Vec::new(),
        };

        let outcome = if !request.target.is_file() {
            self.fail(
                &mut run,
                format!("retargeted asset not found: {}", request.target.display()),
            )
        } else if let Some(clobbered) = self.overwrites_target(request) {
            self.fail(
                &mut run,
                format!("{} would overwrite the retargeted asset", clobbered.display()),
            )
        } else {
            match self.advanced(&mut run, request) {
                Ok(outcome) => outcome,
                Err(Error::Cancelled) => self.fail(&mut run, Error::Cancelled.to_string()),
                Err(e) => self.degrade(&mut run, request, &e),
            }
        };

        RunResult {
            run_id: run.id,
            outcome,
            history: run.history,
            warnings: run.warnings,
        }
    }

    /// First output path of `request` that resolves to its target.
    fn overwrites_target(&self, request: &RestoreRequest) -> Option<PathBuf> {
        let preview = self.config.export.preview.then(|| request.preview_path());
        std::iter::once(request.output.clone())
            .chain(preview)
            .find(|path| same_file(&request.target, path))
    }

    fn advanced(&self, run: &mut RestorationRun, request: &RestoreRequest) -> Result<RunOutcome> {
        let work_dir = tempfile::Builder::new().prefix("matkeep-run-").tempdir()?;

        self.check_cancelled()?;
        self.transition(run, RunState::Importing)?;
        let StageResult::Inspect { meshes, .. } = self.stage(
            &work_dir,
            StageRequest::Inspect {
                target: request.target.clone(),
            },
        )?
        else {
            return Err(unexpected_result("inspect"));
        };

        self.check_cancelled()?;
        let manifest = load_manifest(&request.manifest)?;
        for mesh in manifest.mesh_materials.keys() {
            if !meshes.iter().any(|m| &m.name == mesh) {
                run.warn(format!("mesh '{mesh}' from the manifest is not in the retargeted asset"));
            }
        }
        let expected_payload = manifest.payload_bytes();
        run.manifest = Some(manifest);
        self.transition(run, RunState::ManifestLoaded)?;

        self.check_cancelled()?;
        self.transition(run, RunState::Reconstructing)?;
        let staged = work_dir.path().join("staged.glb");
        let StageResult::Reconstruct { report, staged_bytes } = self.stage(
            &work_dir,
            StageRequest::Reconstruct {
                target: request.target.clone(),
                manifest: request.manifest.clone(),
                texture_dir: request.texture_dir.clone(),
                staged_output: staged.clone(),
            },
        )?
        else {
            return Err(unexpected_result("reconstruct"));
        };
        tracing::info!("Reconstructed: {}", report.summary());
        run.report = Some(report.clone());

        self.transition(run, RunState::Validating)?;
        let quality = quality::assess(
            &report,
            expected_payload,
            staged_bytes,
            self.config.quality.geometry_overhead_bytes,
        );
        if quality.score < self.config.quality.minimum {
            run.warn(format!(
                "quality {} is below the configured minimum {}",
                quality.score, self.config.quality.minimum
            ));
        }

        self.check_cancelled()?;
        self.transition(run, RunState::Exporting)?;
        let preview = self.config.export.preview.then(|| PreviewRequest {
            path: request.preview_path(),
            max_texture_size: self.config.export.preview_max_texture_size,
        });
        let preview_path = preview.as_ref().map(|p| p.path.clone());
        let StageResult::Export { .. } = self.stage(
            &work_dir,
            StageRequest::Export {
                staged,
                output: request.output.clone(),
                preview,
            },
        )?
        else {
            return Err(unexpected_result("export"));
        };

        self.transition(run, RunState::Succeeded)?;
        Ok(RunOutcome::Succeeded {
            output: request.output.clone(),
            preview: preview_path,
            quality,
            report,
        })
    }

    fn stage(&self, work_dir: &TempDir, request: StageRequest) -> Result<StageResult> {
        let stage = request.stage();
        let task = StageTask {
            host_version: self.config.host.version,
            result_path: work_dir.path().join(format!("{stage}-result.json")),
            request,
        };
        self.runner.run(&task)
    }

    fn degrade(&self, run: &mut RestorationRun, request: &RestoreRequest, cause: &Error) -> RunOutcome {
        let reason = cause.to_string();
        tracing::warn!("Restoration {} degraded in {}: {reason}", run.id, run.state);
        if let Some(manifest) = run.manifest.take() {
            run.warn(format!("materials of {} were not restored", manifest.source_asset_id));
        }
        if let Some(report) = run.report.take() {
            run.warn(format!("discarded partial reconstruction: {}", report.summary()));
        }
        if let Err(e) = self.transition(run, RunState::Degraded) {
            return self.fail(run, e.to_string());
        }
        match copy_through(&request.target, &request.output) {
            Ok(()) => RunOutcome::Degraded {
                output: request.output.clone(),
                reason,
            },
            Err(e) => self.fail(run, format!("{reason}; fallback copy failed: {e}")),
        }
    }

    fn fail(&self, run: &mut RestorationRun, reason: String) -> RunOutcome {
        tracing::error!("Restoration {} failed: {reason}", run.id);
        if let Err(e) = self.transition(run, RunState::Failed) {
            // Failed is the end of every run, whatever state it was left in.
            tracing::error!("Restoration {}: {e}; forcing {}", run.id, RunState::Failed);
            run.state = RunState::Failed;
            run.history.push(RunState::Failed);
            if let Some(callback) = &self.progress {
                callback(RunState::Failed);
            }
        }
        RunOutcome::Failed { reason }
    }

    fn transition(&self, run: &mut RestorationRun, next: RunState) -> Result<()> {
        if !run.state.can_transition_to(next) {
            return Err(Error::IllegalTransition {
                from: run.state.to_string(),
                to: next.to_string(),
            });
        }
        tracing::info!("Restoration {}: {} -> {next}", run.id, run.state);
        run.state = next;
        run.history.push(next);
        if let Some(callback) = &self.progress {
            callback(next);
        }
        Ok(())
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Per-run state; dropped when the run ends.
struct RestorationRun {
    id: String,
    state: RunState,
    history: Vec<RunState>,
    manifest: Option<MaterialManifest>,
    report: Option<ReconstructionReport>,
    warnings: Vec<String>,
}

impl RestorationRun {
    fn warn(&mut self, warning: String) {
        tracing::warn!("{warning}");
        self.warnings.push(warning);
    }
}

fn unexpected_result(stage: &str) -> Error {
    Error::StageProtocol {
        stage: stage.to_string(),
        message: "runner returned a result for another stage".to_string(),
    }
}

/// Whether `a` and `b` name the same existing file.
fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Copy the retargeted asset to `output` unchanged.
///
/// The copy is staged next to `output` and renamed into place, so the
/// target is read in full before anything at `output` is replaced.
fn copy_through(target: &Path, output: &Path) -> Result<()> {
    let parent = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;
    let mut staged = tempfile::NamedTempFile::new_in(parent)?;
    io::copy(&mut fs::File::open(target)?, staged.as_file_mut())?;
    staged.as_file().sync_all()?;
    staged.persist(output).map_err(|e| e.error)?;
    Ok(())
}

/// Restore with the configured subprocess worker.
pub fn restore(config: RestoreConfig, request: &RestoreRequest) -> Result<RunResult> {
    Ok(Orchestrator::with_subprocess_worker(config)?.run(request))
}

/// Extract `source` into the standard layout under `out_dir` through
/// `runner`, then read the written manifest back.
///
/// # Errors
/// Returns [`Error::SourceAssetMissing`] without starting the runner when
/// `source` is absent. Worker crashes, timeouts and stage failures are
/// returned as they are; extraction has no fallback.
pub fn extract_isolated(
    runner: &dyn StageRunner,
    host_version: HostVersion,
    source: &Path,
    out_dir: &Path,
) -> Result<MaterialManifest> {
    if !source.is_file() {
        return Err(Error::SourceAssetMissing {
            path: source.to_path_buf(),
        });
    }
    let work_dir = tempfile::Builder::new().prefix("matkeep-extract-").tempdir()?;
    let task = StageTask {
        host_version,
        result_path: work_dir.path().join("extract-result.json"),
        request: StageRequest::Extract {
            source: source.to_path_buf(),
            out_dir: out_dir.to_path_buf(),
        },
    };
    let StageResult::Extract { materials, textures, .. } = runner.run(&task)? else {
        return Err(unexpected_result("extract"));
    };
    tracing::debug!("Worker extracted {materials} materials, {textures} textures");
    load_manifest(&out_dir.join(MANIFEST_FILE_NAME))
}

/// Extract with the configured subprocess worker.
pub fn extract_in_worker(config: &RestoreConfig, source: &Path, out_dir: &Path) -> Result<MaterialManifest> {
    let runner = SubprocessRunner::from_config(config)?;
    extract_isolated(&runner, config.host.version, source, out_dir)
}
