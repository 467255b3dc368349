//! CLI command for material extraction

use std::path::{Path, PathBuf};
use std::time::Instant;

use console::style;
use indicatif::HumanBytes;

use crate::cli::progress::{PACKAGE, optional_spinner, print_done, print_step, print_warning};
use crate::manifest::MANIFEST_FILE_NAME;
use crate::normalize::HostVersion;
use crate::restore::{RestoreConfig, extract_in_worker};

/// `<source stem>.matkeep` next to the source.
fn default_destination(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map_or_else(|| "asset".into(), |s| s.to_string_lossy());
    source.with_file_name(format!("{stem}.matkeep"))
}

pub fn execute(
    source: &Path,
    destination: Option<&Path>,
    host_version: Option<HostVersion>,
    config: Option<&Path>,
    quiet: bool,
) -> anyhow::Result<()> {
    let started = Instant::now();
    let mut config = RestoreConfig::load(config)?;
    if let Some(version) = host_version {
        config.host.version = version;
    }
    let version = config.host.version;
    let destination = destination.map_or_else(|| default_destination(source), Path::to_path_buf);

    if !quiet {
        print_step(
            1,
            1,
            PACKAGE,
            &format!("Extracting materials from {} (host {version})...", source.display()),
        );
    }
    let spinner = optional_spinner(!quiet, "Walking material graphs...");
    let result = extract_in_worker(&config, source, &destination);
    spinner.finish_and_clear();
    let manifest = result?;

    if quiet {
        return Ok(());
    }

    println!(
        "  {} materials, {} nodes, {} links",
        style(manifest.materials.len()).bold(),
        manifest.node_count(),
        manifest.link_count()
    );
    println!(
        "  {} textures archived ({})",
        style(manifest.textures.len()).bold(),
        HumanBytes(manifest.payload_bytes())
    );
    for diagnostic in &manifest.diagnostics {
        print_warning(&diagnostic.to_string());
    }
    println!(
        "  Manifest: {}",
        style(destination.join(MANIFEST_FILE_NAME).display()).cyan()
    );
    print_done(started.elapsed());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_destination_sits_next_to_source() {
        assert_eq!(
            default_destination(Path::new("/work/hero.glb")),
            PathBuf::from("/work/hero.matkeep")
        );
    }
}
