//! Session orchestration.
//!
//! Collects stimuli, runs the trial loop on a [`Screen`], then writes the
//! results file and metadata.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use crate::core::stats::Summary;
use crate::core::types::{Stimulus, Trial};
use crate::io::config::ExperimentConfig;
use crate::io::results::{SessionMeta, write_meta, write_trials};
use crate::io::screen::{Screen, WaitOutcome};
use crate::io::stimuli::collect_stimuli;

/// Trials recorded by one pass over the stimuli.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionOutcome {
    pub trials: Vec<Trial>,
    /// The participant closed the window before the last stimulus.
    pub closed_early: bool,
}

/// Show every stimulus in order and record a response or timeout for each.
///
/// A close request ends the whole session at once. The trial that was on
/// screen is dropped and everything recorded before it is returned.
#[instrument(skip_all, fields(stimuli = stimuli.len(), timeout_ms = timeout.as_millis() as u64))]
pub fn present<S: Screen + ?Sized>(
    screen: &mut S,
    stimuli: &[Stimulus],
    timeout: Duration,
) -> Result<SessionOutcome> {
    let mut trials = Vec::with_capacity(stimuli.len());
    for (index, stimulus) in stimuli.iter().enumerate() {
        screen
            .show(&stimulus.path)
            .with_context(|| format!("show {}", stimulus.path.display()))?;
        let response = match screen.wait_for_response(timeout).context("wait for response")? {
            WaitOutcome::Key(category) => Some(category),
            WaitOutcome::Timeout => None,
            WaitOutcome::Closed => {
                info!(trial = index + 1, recorded = trials.len(), "session closed early");
                return Ok(SessionOutcome {
                    trials,
                    closed_early: true,
                });
            }
        };
        let trial = Trial {
            image: stimulus.path.clone(),
            label: stimulus.label,
            response,
        };
        debug!(
            trial = index + 1,
            label = %trial.label,
            response = ?trial.response,
            timed_out = trial.is_timeout(),
            "trial recorded"
        );
        trials.push(trial);
    }
    Ok(SessionOutcome {
        trials,
        closed_early: false,
    })
}

/// Everything a finished session produced.
#[derive(Debug)]
pub struct SessionReport {
    pub outcome: SessionOutcome,
    pub summary: Summary,
    /// Results file as configured (relative paths stay relative).
    pub results_path: PathBuf,
}

/// Run a full session under `root`: collect, present, write.
///
/// `open_screen` is only called once the stimuli have been collected, and the
/// screen is dropped before anything is written. Failing to write the
/// metadata sidecar is logged and does not fail the session.
#[instrument(skip_all, fields(root = %root.display(), seed = ?seed))]
pub fn run_experiment<S, F>(
    root: &Path,
    cfg: &ExperimentConfig,
    seed: Option<u64>,
    open_screen: F,
) -> Result<SessionReport>
where
    S: Screen,
    F: FnOnce() -> Result<S>,
{
    let stimuli = collect_stimuli(&cfg.stimuli, root, seed).context("collect stimuli")?;
    info!(stimuli = stimuli.len(), "session started");

    let started_at = Utc::now();
    let outcome = {
        let mut screen = open_screen().context("open screen")?;
        present(&mut screen, &stimuli, cfg.response.timeout())?
    };
    let finished_at = Utc::now();

    write_trials(&root.join(&cfg.output.results_path), &outcome.trials)
        .context("write results")?;

    let summary = Summary::from_trials(&outcome.trials);
    let duration = finished_at - started_at;
    let meta = SessionMeta {
        started_at: started_at.to_rfc3339(),
        finished_at: finished_at.to_rfc3339(),
        duration_secs: duration.num_milliseconds() as f64 / 1000.0,
        seed,
        stimuli_available: stimuli.len(),
        trials_presented: summary.trials(),
        closed_early: outcome.closed_early,
        results_path: cfg.output.results_path.display().to_string(),
    };
    // Sidecar failures are non-fatal once the results file exists.
    let meta_path = root.join(cfg.output.meta_path());
    if let Err(err) = write_meta(&meta_path, &meta) {
        warn!(
            path = %meta_path.display(),
            err = %format!("{err:#}"),
            "session meta not written"
        );
    }

    info!(
        trials = summary.trials(),
        timeouts = summary.timeouts,
        closed_early = outcome.closed_early,
        "session complete"
    );
    Ok(SessionReport {
        outcome,
        summary,
        results_path: cfg.output.results_path.clone(),
    })
}
