//! CLI command implementations.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::core::stats::Summary;
use crate::io::config::{ExperimentConfig, load_config, write_config};
use crate::io::results::{read_meta, read_outcomes};
use crate::io::screen::WindowScreen;
use crate::io::stimuli::collect_stimuli;
use crate::report::render_summary;
use crate::session::run_experiment;

fn load(root: &Path, config_path: &Path) -> Result<ExperimentConfig> {
    let path = root.join(config_path);
    let cfg = load_config(&path).context("load config")?;
    debug!(path = %path.display(), exists = path.exists(), "config loaded");
    Ok(cfg)
}

/// Run a full session in a window and print the summary.
pub fn run_session(root: &Path, config_path: &Path, seed: Option<u64>) -> Result<()> {
    let cfg = load(root, config_path)?;
    let report = run_experiment(root, &cfg, seed, || {
        WindowScreen::open(&cfg.display, &cfg.response)
    })?;
    print!("{}", render_summary(&report.results_path, &report.summary));
    Ok(())
}

/// Print the presentation order without opening a window.
pub fn list_stimuli(root: &Path, config_path: &Path, seed: Option<u64>) -> Result<()> {
    let cfg = load(root, config_path)?;
    let stimuli = collect_stimuli(&cfg.stimuli, root, seed).context("collect stimuli")?;
    for stimulus in &stimuli {
        let path = stimulus.path.strip_prefix(root).unwrap_or(stimulus.path.as_path());
        println!("{} {}", stimulus.label.code(), path.display());
    }
    Ok(())
}

/// Re-read a results file and print its summary.
///
/// `input` defaults to the configured results path.
pub fn report_results(root: &Path, config_path: &Path, input: Option<&Path>) -> Result<()> {
    let cfg = load(root, config_path)?;
    let display_path = input.unwrap_or(cfg.output.results_path.as_path());
    let outcomes = read_outcomes(&root.join(display_path)).context("read results")?;
    let summary = Summary::tally(outcomes);
    print!("{}", render_summary(display_path, &summary));

    let meta_path = root.join(display_path.with_extension("meta.json"));
    if meta_path.exists() {
        let meta = read_meta(&meta_path)?;
        let ended = if meta.closed_early {
            ", closed early"
        } else {
            ""
        };
        println!();
        println!(
            "Session: {}/{} stimuli presented{} ({:.1}s)",
            meta.trials_presented, meta.stimuli_available, ended, meta.duration_secs
        );
    }
    Ok(())
}

/// Write the default config, keeping an existing file unless `force` is set.
pub fn init_config(root: &Path, config_path: &Path, force: bool) -> Result<()> {
    let path = root.join(config_path);
    if !force && path.exists() {
        println!("init: kept existing {}", config_path.display());
        return Ok(());
    }
    write_config(&path, &ExperimentConfig::default())
        .with_context(|| format!("write {}", path.display()))?;
    info!(path = %path.display(), "config written");
    println!("init: wrote {}", config_path.display());
    Ok(())
}
