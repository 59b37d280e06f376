//! Test-only helpers: a scripted screen and stimulus fixtures.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use tempfile::TempDir;

use crate::core::types::{Category, Stimulus, Trial};
use crate::io::screen::{Screen, WaitOutcome};

/// Screen that replays a fixed list of wait outcomes.
///
/// Once the script runs out every further wait times out.
#[derive(Debug, Default)]
pub struct ScriptedScreen {
    outcomes: VecDeque<WaitOutcome>,
    /// Every image passed to `show`, in order.
    pub shown: Vec<PathBuf>,
    /// Every timeout passed to `wait_for_response`, in order.
    pub waits: Vec<Duration>,
}

impl ScriptedScreen {
    pub fn new(outcomes: impl IntoIterator<Item = WaitOutcome>) -> Self {
        Self {
            outcomes: outcomes.into_iter().collect(),
            ..Self::default()
        }
    }
}

impl Screen for ScriptedScreen {
    fn show(&mut self, image: &Path) -> Result<()> {
        self.shown.push(image.to_path_buf());
        Ok(())
    }

    fn wait_for_response(&mut self, timeout: Duration) -> Result<WaitOutcome> {
        self.waits.push(timeout);
        Ok(self.outcomes.pop_front().unwrap_or(WaitOutcome::Timeout))
    }
}

/// Temporary working directory laid out like an experiment folder.
pub struct TestWorkspace {
    dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("create temp workspace")?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Create `jpeg/same` and `jpeg/different` with empty placeholder files.
    pub fn write_stimuli(&self, same: &[&str], different: &[&str]) -> Result<()> {
        for (folder, names) in [("same", same), ("different", different)] {
            let dir = self.path().join("jpeg").join(folder);
            fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
            for name in names {
                let path = dir.join(name);
                fs::write(&path, b"").with_context(|| format!("write {}", path.display()))?;
            }
        }
        Ok(())
    }
}

pub fn stimulus(path: &str, label: Category) -> Stimulus {
    Stimulus {
        path: PathBuf::from(path),
        label,
    }
}

pub fn trial(path: &str, label: Category, response: Option<Category>) -> Trial {
    Trial {
        image: PathBuf::from(path),
        label,
        response,
    }
}
