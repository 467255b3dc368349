use clap::Subcommand;
use std::path::PathBuf;

use crate::normalize::HostVersion;
use crate::quality::QualityScore;
use crate::restore::MAX_STAGE_TIMEOUT_SECS;

mod definitions;
pub use definitions::InspectCommands;

pub mod extract;
pub mod inspect;
pub mod restore;
pub mod vocab;
pub mod worker;

#[derive(Subcommand)]
pub enum Commands {
    /// Record every material of an asset and archive its textures
    Extract {
        /// Source asset (.glb or .gltf)
        source: PathBuf,

        /// Output directory (default: `<source stem>.matkeep` next to the source)
        destination: Option<PathBuf>,

        /// Host version whose node vocabulary the source uses
        #[arg(long)]
        host_version: Option<HostVersion>,

        /// Configuration file (default: `<config dir>/matkeep/config.toml`)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Suppress progress output
        #[arg(short, long)]
        quiet: bool,
    },

    /// Rebuild recorded materials onto a retargeted asset
    Restore {
        /// Retargeted asset produced by the mesh pipeline
        target: PathBuf,

        /// Directory written by `matkeep extract`
        #[arg(short, long)]
        extraction: PathBuf,

        /// Final asset path
        #[arg(short, long)]
        output: PathBuf,

        /// Configuration file (default: `<config dir>/matkeep/config.toml`)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Host version to rebuild against
        #[arg(long)]
        host_version: Option<HostVersion>,

        /// Wall-clock budget of each worker stage in seconds
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..=MAX_STAGE_TIMEOUT_SECS))]
        timeout_secs: Option<u64>,

        /// Warn when the quality score is below this
        #[arg(long)]
        min_quality: Option<QualityScore>,

        /// Also write a preview asset with downscaled textures
        #[arg(long)]
        preview: bool,

        /// Treat a degraded run as an error
        #[arg(long)]
        strict: bool,

        /// Print the run result as JSON instead of a summary
        #[arg(long)]
        json: bool,

        /// Suppress progress output
        #[arg(short, long)]
        quiet: bool,
    },

    /// Inspect a manifest or an asset
    Inspect {
        #[command(subcommand)]
        command: InspectCommands,
    },

    /// Print the node and socket vocabulary of a host version
    Vocab {
        /// Host version (default: the configured one)
        #[arg(long)]
        host_version: Option<HostVersion>,

        /// Also list socket names
        #[arg(long)]
        sockets: bool,
    },

    /// Run one restoration stage (spawned by `restore`)
    #[command(hide = true)]
    Worker {
        /// Stage task descriptor
        #[arg(long)]
        task: PathBuf,
    },
}

impl Commands {
    pub fn execute(&self) -> anyhow::Result<()> {
        match self {
            Commands::Extract {
                source,
                destination,
                host_version,
                config,
                quiet,
            } => extract::execute(
                source,
                destination.as_deref(),
                *host_version,
                config.as_deref(),
                *quiet,
            ),

            Commands::Restore {
                target,
                extraction,
                output,
                config,
                host_version,
                timeout_secs,
                min_quality,
                preview,
                strict,
                json,
                quiet,
            } => restore::execute(&restore::RestoreArgs {
                target,
                extraction,
                output,
                config: config.as_deref(),
                host_version: *host_version,
                timeout_secs: *timeout_secs,
                min_quality: *min_quality,
                preview: *preview,
                strict: *strict,
                json: *json,
                quiet: *quiet,
            }),

            Commands::Inspect { command } => match command {
                InspectCommands::Manifest { path, json } => inspect::manifest(path, *json),
                InspectCommands::Asset { path, host_version } => inspect::asset(path, *host_version),
            },

            Commands::Vocab {
                host_version,
                sockets,
            } => vocab::execute(*host_version, *sockets),

            Commands::Worker { task } => worker::execute(task),
        }
    }
}
