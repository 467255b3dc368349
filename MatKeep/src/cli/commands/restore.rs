//! CLI command for material restoration

use std::path::Path;
use std::time::Instant;

use console::style;

use crate::cli::progress::{GEAR, optional_spinner, print_done, print_step, print_warning};
use crate::normalize::HostVersion;
use crate::quality::QualityScore;
use crate::restore::{Orchestrator, RestoreConfig, RestoreRequest, RunOutcome, RunState};

/// Parsed `restore` arguments.
pub struct RestoreArgs<'a> {
    pub target: &'a Path,
    pub extraction: &'a Path,
    pub output: &'a Path,
    pub config: Option<&'a Path>,
    pub host_version: Option<HostVersion>,
    pub timeout_secs: Option<u64>,
    pub min_quality: Option<QualityScore>,
    pub preview: bool,
    pub strict: bool,
    pub json: bool,
    pub quiet: bool,
}

impl RestoreArgs<'_> {
    /// Flags override the configuration file.
    fn apply(&self, config: &mut RestoreConfig) {
        if let Some(version) = self.host_version {
            config.host.version = version;
        }
        if let Some(secs) = self.timeout_secs {
            config.worker.timeout_secs = secs;
        }
        if let Some(minimum) = self.min_quality {
            config.quality.minimum = minimum;
        }
        if self.preview {
            config.export.preview = true;
        }
    }
}

fn state_message(state: RunState) -> &'static str {
    match state {
        RunState::Importing => "Loading retargeted asset...",
        RunState::ManifestLoaded => "Manifest loaded...",
        RunState::Reconstructing => "Rebuilding materials...",
        RunState::Validating => "Scoring result...",
        RunState::Exporting => "Exporting with embedded textures...",
        RunState::Degraded => "Falling back to untextured copy...",
        RunState::Idle | RunState::Succeeded | RunState::Failed => "",
    }
}

pub fn execute(args: &RestoreArgs<'_>) -> anyhow::Result<()> {
    let started = Instant::now();
    let mut config = RestoreConfig::load(args.config)?;
    args.apply(&mut config);

    let show_progress = !args.quiet && !args.json;
    if show_progress {
        print_step(
            1,
            1,
            GEAR,
            &format!(
                "Restoring materials onto {} (host {})...",
                args.target.display(),
                config.host.version
            ),
        );
    }

    let spinner = optional_spinner(show_progress, "Starting...");
    let callback_spinner = spinner.clone();
    let orchestrator = Orchestrator::with_subprocess_worker(config)?
        .on_state_change(move |state| callback_spinner.set_message(state_message(state)));

    let request = RestoreRequest::from_extraction(args.target, args.extraction, args.output);
    let result = orchestrator.run(&request);
    spinner.finish_and_clear();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if !args.quiet {
        for warning in &result.warnings {
            print_warning(warning);
        }
    }

    match &result.outcome {
        RunOutcome::Succeeded {
            output,
            preview,
            quality,
            report,
        } => {
            if show_progress {
                println!("  {}", report.summary());
                println!(
                    "  Quality: {} (structural {:.2}, textures {:.2}, graph {:.2})",
                    style(quality.score).bold().green(),
                    quality.structural,
                    quality.texture_completeness,
                    quality.graph_completeness
                );
                println!("  Output: {}", style(output.display()).cyan());
                if let Some(preview) = preview {
                    println!("  Preview: {}", style(preview.display()).cyan());
                }
                print_done(started.elapsed());
            }
            Ok(())
        }
        RunOutcome::Degraded { output, reason } => {
            if args.strict {
                anyhow::bail!("Restoration degraded: {reason}");
            }
            if show_progress {
                print_warning(&format!("Degraded: {reason}"));
                println!("  Untextured output: {}", style(output.display()).cyan());
                print_done(started.elapsed());
            }
            Ok(())
        }
        RunOutcome::Failed { reason } => anyhow::bail!("Restoration failed: {reason}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    #[test]
    fn test_flags_override_config() {
        let target = PathBuf::from("rigged.glb");
        let args = RestoreArgs {
            target: &target,
            extraction: &target,
            output: &target,
            config: None,
            host_version: Some(HostVersion::new(3, 6)),
            timeout_secs: Some(5),
            min_quality: None,
            preview: true,
            strict: false,
            json: false,
            quiet: true,
        };
        let mut config = RestoreConfig::default();
        args.apply(&mut config);

        assert_eq!(config.host.version, HostVersion::new(3, 6));
        assert_eq!(config.worker.timeout_secs, 5);
        assert_eq!(config.quality.minimum, RestoreConfig::default().quality.minimum);
        assert!(config.export.preview);
    }
}
