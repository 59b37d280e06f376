//! Results persistence: the per-trial CSV and the session metadata sidecar.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::core::types::{Category, Trial};

const HEADER: [&str; 3] = ["Image", "Folder", "Response"];

/// One row of the results file.
///
/// `folder` is the ground-truth code; `response` is empty for a timeout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialRow {
    #[serde(rename = "Image")]
    pub image: String,
    #[serde(rename = "Folder")]
    pub folder: u8,
    #[serde(rename = "Response")]
    pub response: Option<u8>,
}

impl From<&Trial> for TrialRow {
    fn from(trial: &Trial) -> Self {
        Self {
            image: trial.image_name(),
            folder: trial.label.code(),
            response: trial.response.map(Category::code),
        }
    }
}

impl TrialRow {
    /// The `(label, response)` pair this row records.
    pub fn outcome(&self) -> Result<(Category, Option<Category>)> {
        let label = Category::from_code(self.folder).context("Folder")?;
        let response = self
            .response
            .map(Category::from_code)
            .transpose()
            .context("Response")?;
        Ok((label, response))
    }
}

/// Session metadata, persisted next to the results file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMeta {
    pub started_at: String,
    pub finished_at: String,
    pub duration_secs: f64,
    /// Shuffle seed, when the order was made reproducible.
    pub seed: Option<u64>,
    pub stimuli_available: usize,
    pub trials_presented: usize,
    /// The participant ended the session before every stimulus was shown.
    pub closed_early: bool,
    pub results_path: String,
}

/// Write the header and one row per trial, in presentation order.
///
/// Creates the parent directory when needed and replaces any existing file.
#[instrument(skip_all, fields(path = %path.display(), trials = trials.len()))]
pub fn write_trials(path: &Path, trials: &[Trial]) -> Result<()> {
    create_parent(path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("create {}", path.display()))?;
    writer.write_record(HEADER).context("write header")?;
    for trial in trials {
        writer
            .serialize(TrialRow::from(trial))
            .with_context(|| format!("write row {}", trial.image.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("flush {}", path.display()))?;
    debug!("results written");
    Ok(())
}

/// Read a results file back into rows.
pub fn read_rows(path: &Path) -> Result<Vec<TrialRow>> {
    let mut reader =
        csv::Reader::from_path(path).with_context(|| format!("open {}", path.display()))?;
    let mut rows = Vec::new();
    for (index, record) in reader.deserialize().enumerate() {
        let row: TrialRow =
            record.with_context(|| format!("parse {} row {}", path.display(), index + 1))?;
        rows.push(row);
    }
    Ok(rows)
}

/// Read a results file and validate every row into a `(label, response)` pair.
pub fn read_outcomes(path: &Path) -> Result<Vec<(Category, Option<Category>)>> {
    read_rows(path)?
        .iter()
        .enumerate()
        .map(|(index, row)| {
            row.outcome()
                .with_context(|| format!("invalid {} row {}", path.display(), index + 1))
        })
        .collect()
}

pub fn write_meta(path: &Path, meta: &SessionMeta) -> Result<()> {
    create_parent(path)?;
    let contents = serde_json::to_string_pretty(meta).context("serialize meta")?;
    fs::write(path, format!("{contents}\n"))
        .with_context(|| format!("write meta {}", path.display()))?;
    Ok(())
}

pub fn read_meta(path: &Path) -> Result<SessionMeta> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parse meta {}", path.display()))
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::trial;
    use tempfile::tempdir;

    #[test]
    fn writes_header_and_blank_timeouts() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("data/test.csv");
        let trials = vec![
            trial("jpeg/same/a.jpg", Category::Same, Some(Category::Same)),
            trial("jpeg/different/b.jpg", Category::Different, Some(Category::Same)),
            trial("jpeg/same/c.jpg", Category::Same, None),
        ];
        write_trials(&path, &trials).expect("write");

        let contents = fs::read_to_string(&path).expect("read");
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(
            lines,
            vec!["Image,Folder,Response", "a.jpg,1,1", "b.jpg,0,1", "c.jpg,1,"]
        );
    }

    #[test]
    fn empty_session_writes_header_only() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("data/test.csv");
        write_trials(&path, &[]).expect("write");
        let contents = fs::read_to_string(&path).expect("read");
        assert_eq!(contents.lines().collect::<Vec<_>>(), vec!["Image,Folder,Response"]);
        assert!(read_rows(&path).expect("rows").is_empty());
    }

    #[test]
    fn overwrites_existing_file() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("test.csv");
        fs::write(&path, "stale\nrows\nfrom\nbefore\n").expect("seed");
        write_trials(&path, &[trial("a.jpg", Category::Same, None)]).expect("write");
        assert_eq!(read_rows(&path).expect("rows").len(), 1);
    }

    #[test]
    fn outcomes_survive_a_write_and_read() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("test.csv");
        let trials = vec![
            trial("a.jpg", Category::Same, Some(Category::Different)),
            trial("b.jpg", Category::Different, None),
            trial("c.jpg", Category::Different, Some(Category::Different)),
        ];
        write_trials(&path, &trials).expect("write");

        let outcomes = read_outcomes(&path).expect("outcomes");
        let expected: Vec<_> = trials.iter().map(|t| (t.label, t.response)).collect();
        assert_eq!(outcomes, expected);
    }

    #[test]
    fn rejects_out_of_range_codes() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("test.csv");
        fs::write(&path, "Image,Folder,Response\na.jpg,1,1\nb.jpg,0,2\n").expect("write");
        let err = read_outcomes(&path).expect_err("bad response");
        let message = format!("{err:#}");
        assert!(message.contains("row 2"), "{message}");
        assert!(message.contains("Response"), "{message}");
    }

    #[test]
    fn meta_round_trips() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("data/test.meta.json");
        let meta = SessionMeta {
            started_at: "2026-01-01T00:00:00+00:00".to_string(),
            finished_at: "2026-01-01T00:01:00+00:00".to_string(),
            duration_secs: 60.0,
            seed: Some(7),
            stimuli_available: 10,
            trials_presented: 4,
            closed_early: true,
            results_path: "data/test.csv".to_string(),
        };
        write_meta(&path, &meta).expect("write");
        assert_eq!(read_meta(&path).expect("read"), meta);
    }
}
