//! Stimulus discovery: list the labelled image folders and shuffle them into
//! a presentation order.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rand::seq::SliceRandom;
use rand::{SeedableRng, rngs::StdRng};
use tracing::{debug, instrument};

use crate::core::types::{Category, Stimulus};
use crate::io::config::StimuliConfig;

/// List regular files in `dir` with the given extension, tagged with `label`.
///
/// Results are sorted by path so a seeded shuffle does not depend on the
/// order the filesystem happens to return entries in. A missing directory is
/// an error.
pub fn list_images(dir: &Path, extension: &str, label: Category) -> Result<Vec<Stimulus>> {
    let mut stimuli = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("read image dir {}", dir.display()))? {
        let entry = entry.context("read image entry")?;
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some(extension) {
            continue;
        }
        if !path.is_file() {
            continue;
        }
        stimuli.push(Stimulus { path, label });
    }
    stimuli.sort_by(|left, right| left.path.cmp(&right.path));
    Ok(stimuli)
}

/// Collect both folders under `root` and shuffle them together.
///
/// With `seed` set the order is reproducible; without it every call draws a
/// fresh order from the thread RNG.
#[instrument(skip_all, fields(root = %root.display(), seed = ?seed))]
pub fn collect_stimuli(
    cfg: &StimuliConfig,
    root: &Path,
    seed: Option<u64>,
) -> Result<Vec<Stimulus>> {
    let mut stimuli = list_images(
        &root.join(&cfg.different_dir),
        &cfg.extension,
        Category::Different,
    )?;
    let different = stimuli.len();
    stimuli.extend(list_images(
        &root.join(&cfg.same_dir),
        &cfg.extension,
        Category::Same,
    )?);
    debug!(different, same = stimuli.len() - different, "images listed");

    match seed {
        Some(seed) => stimuli.shuffle(&mut StdRng::seed_from_u64(seed)),
        None => stimuli.shuffle(&mut rand::thread_rng()),
    }
    Ok(stimuli)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestWorkspace;

    fn names(stimuli: &[Stimulus]) -> Vec<String> {
        stimuli
            .iter()
            .map(|stimulus| {
                stimulus
                    .path
                    .file_name()
                    .expect("file name")
                    .to_string_lossy()
                    .into_owned()
            })
            .collect()
    }

    #[test]
    fn lists_matching_files_sorted() {
        let workspace = TestWorkspace::new().expect("workspace");
        workspace
            .write_stimuli(&["b.jpg", "a.jpg", "notes.txt", "c.JPG"], &[])
            .expect("stimuli");
        fs::create_dir_all(workspace.path().join("jpeg/same/nested.jpg")).expect("nested dir");

        let stimuli =
            list_images(&workspace.path().join("jpeg/same"), "jpg", Category::Same).expect("list");
        assert_eq!(names(&stimuli), vec!["a.jpg", "b.jpg"]);
        assert!(stimuli.iter().all(|stimulus| stimulus.label == Category::Same));
    }

    #[test]
    fn missing_directory_is_an_error() {
        let workspace = TestWorkspace::new().expect("workspace");
        let err = list_images(&workspace.path().join("jpeg/same"), "jpg", Category::Same)
            .expect_err("missing dir");
        assert!(format!("{err:#}").contains("read image dir"));
    }

    #[test]
    fn labels_each_folder() {
        let workspace = TestWorkspace::new().expect("workspace");
        workspace
            .write_stimuli(&["s1.jpg", "s2.jpg"], &["d1.jpg", "d2.jpg", "d3.jpg"])
            .expect("stimuli");

        let stimuli = collect_stimuli(&StimuliConfig::default(), workspace.path(), Some(1))
            .expect("collect");
        assert_eq!(stimuli.len(), 5);
        for stimulus in &stimuli {
            let parent = stimulus.path.parent().expect("parent");
            let expected = if parent.ends_with("same") {
                Category::Same
            } else {
                Category::Different
            };
            assert_eq!(stimulus.label, expected);
        }
    }

    #[test]
    fn same_seed_same_order() {
        let workspace = TestWorkspace::new().expect("workspace");
        let same: Vec<String> = (0..10).map(|i| format!("s{i:02}.jpg")).collect();
        let different: Vec<String> = (0..10).map(|i| format!("d{i:02}.jpg")).collect();
        let same: Vec<&str> = same.iter().map(String::as_str).collect();
        let different: Vec<&str> = different.iter().map(String::as_str).collect();
        workspace.write_stimuli(&same, &different).expect("stimuli");

        let cfg = StimuliConfig::default();
        let first = collect_stimuli(&cfg, workspace.path(), Some(42)).expect("first");
        let second = collect_stimuli(&cfg, workspace.path(), Some(42)).expect("second");
        assert_eq!(first, second);

        let mut sorted = names(&first);
        sorted.sort();
        let mut expected: Vec<String> = same
            .iter()
            .chain(&different)
            .map(|s| s.to_string())
            .collect();
        expected.sort();
        assert_eq!(sorted, expected);
    }

    #[test]
    fn empty_folders_yield_no_stimuli() {
        let workspace = TestWorkspace::new().expect("workspace");
        workspace.write_stimuli(&[], &[]).expect("stimuli");
        let stimuli =
            collect_stimuli(&StimuliConfig::default(), workspace.path(), None).expect("collect");
        assert!(stimuli.is_empty());
    }
}
