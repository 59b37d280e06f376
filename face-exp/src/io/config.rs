//! Experiment configuration stored in `face-exp.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};

use crate::io::screen::parse_key;

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_PATH: &str = "face-exp.toml";

/// Experiment configuration (TOML).
///
/// Every section is optional; missing fields fall back to the layout the
/// experiment was built around (`jpeg/{same,different}`, an 800x600 window,
/// an 8 second deadline, `data/test.csv`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExperimentConfig {
    pub stimuli: StimuliConfig,
    pub display: DisplayConfig,
    pub response: ResponseConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StimuliConfig {
    /// Images labelled 1 ("same"), relative to the working directory.
    pub same_dir: PathBuf,
    /// Images labelled 0 ("different"), relative to the working directory.
    pub different_dir: PathBuf,
    /// File extension to pick up, without the dot. Matched case-sensitively.
    pub extension: String,
}

impl Default for StimuliConfig {
    fn default() -> Self {
        Self {
            same_dir: PathBuf::from("jpeg/same"),
            different_dir: PathBuf::from("jpeg/different"),
            extension: "jpg".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DisplayConfig {
    pub title: String,
    pub window_width: usize,
    pub window_height: usize,
    /// Every image is scaled to exactly this size before being centered.
    pub image_width: usize,
    pub image_height: usize,
    /// Background colour as `0xRRGGBB`.
    pub background: u32,
    /// Upper bound on how often the window polls for input.
    pub target_fps: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            title: "Face Display".to_string(),
            window_width: 800,
            window_height: 600,
            image_width: 600,
            image_height: 400,
            background: 0xFF_FF_FF,
            target_fps: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ResponseConfig {
    /// Deadline per trial, measured from the moment the image is shown.
    pub timeout_ms: u64,
    /// Key recorded as response 1 ("same").
    pub same_key: String,
    /// Key recorded as response 0 ("different").
    pub different_key: String,
    /// Key that ends the session early, like closing the window.
    pub quit_key: String,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 8_000,
            same_key: "/".to_string(),
            different_key: "z".to_string(),
            quit_key: "escape".to_string(),
        }
    }
}

impl ResponseConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OutputConfig {
    pub results_path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            results_path: PathBuf::from("data/test.csv"),
        }
    }
}

impl OutputConfig {
    /// Session metadata sits next to the results file (`test.csv` -> `test.meta.json`).
    pub fn meta_path(&self) -> PathBuf {
        self.results_path.with_extension("meta.json")
    }
}

impl ExperimentConfig {
    pub fn validate(&self) -> Result<()> {
        if self.stimuli.same_dir.as_os_str().is_empty() {
            bail!("stimuli.same_dir must be non-empty");
        }
        if self.stimuli.different_dir.as_os_str().is_empty() {
            bail!("stimuli.different_dir must be non-empty");
        }
        let extension = self.stimuli.extension.trim();
        if extension.is_empty() || extension.starts_with('.') {
            bail!("stimuli.extension must be non-empty and given without the leading dot");
        }

        let display = &self.display;
        if display.window_width == 0 || display.window_height == 0 {
            bail!("display window size must be > 0");
        }
        if display.image_width == 0 || display.image_height == 0 {
            bail!("display image size must be > 0");
        }
        if display.image_width > display.window_width
            || display.image_height > display.window_height
        {
            bail!(
                "display image size {}x{} must fit in the {}x{} window",
                display.image_width,
                display.image_height,
                display.window_width,
                display.window_height
            );
        }
        if display.background > 0xFF_FF_FF {
            bail!("display.background must be a 0xRRGGBB colour");
        }
        if display.target_fps == 0 {
            bail!("display.target_fps must be > 0");
        }

        let response = &self.response;
        if response.timeout_ms == 0 {
            bail!("response.timeout_ms must be > 0");
        }
        let keys = [
            ("response.same_key", &response.same_key),
            ("response.different_key", &response.different_key),
            ("response.quit_key", &response.quit_key),
        ];
        let mut parsed = Vec::with_capacity(keys.len());
        for (field, name) in keys {
            let key =
                parse_key(name).ok_or_else(|| anyhow!("{field} {name:?} is not a known key"))?;
            if parsed.contains(&key) {
                bail!("{field} {name:?} is already bound to another action");
            }
            parsed.push(key);
        }

        if self.output.results_path.as_os_str().is_empty() {
            bail!("output.results_path must be non-empty");
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `ExperimentConfig::default()`.
pub fn load_config(path: &Path) -> Result<ExperimentConfig> {
    if !path.exists() {
        let cfg = ExperimentConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: ExperimentConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &ExperimentConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
