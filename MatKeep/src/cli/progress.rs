//! CLI progress display utilities
//!
//! Step indicators, emojis and spinners for the long-running commands.

use std::time::Duration;

use console::{Emoji, style};
use indicatif::{HumanDuration, ProgressBar, ProgressStyle};

// =============================================================================
// Emoji Constants (with ASCII fallbacks for terminals without emoji support)
// =============================================================================

/// Magnifying glass - for reading/scanning operations
pub static LOOKING_GLASS: Emoji<'_, '_> = Emoji("🔍 ", "");
/// Package - for archiving operations
pub static PACKAGE: Emoji<'_, '_> = Emoji("📦 ", "");
/// Gear - for reconstruction
pub static GEAR: Emoji<'_, '_> = Emoji("⚙️  ", "");
/// Sparkles - for completion
pub static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "");
/// Warning sign - for degraded results and diagnostics
pub static WARNING: Emoji<'_, '_> = Emoji("⚠️  ", "! ");
/// Cube - for 3D model operations
pub static CUBE: Emoji<'_, '_> = Emoji("🧊 ", "");

/// Print a step indicator: `[1/3] 📦 Message...`
pub fn print_step(current: usize, total: usize, emoji: Emoji, msg: &str) {
    println!(
        "{} {}{}",
        style(format!("[{current}/{total}]")).bold().dim(),
        emoji,
        msg
    );
}

/// Print completion message: `✨ Done in 2s`
pub fn print_done(elapsed: Duration) {
    println!("{} Done in {}", SPARKLE, HumanDuration(elapsed));
}

/// Print a highlighted warning line.
pub fn print_warning(msg: &str) {
    println!("{}{}", WARNING, style(msg).yellow());
}

/// Create a simple spinner
///
/// # Panics
/// Panics if the template string is invalid (this is a compile-time constant).
#[must_use]
pub fn simple_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .expect("valid template"),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// A spinner that is hidden when `show` is false.
#[must_use]
pub fn optional_spinner(show: bool, msg: &str) -> ProgressBar {
    if show {
        simple_spinner(msg)
    } else {
        ProgressBar::hidden()
    }
}
