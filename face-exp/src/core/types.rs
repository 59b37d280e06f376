//! Trial data shared by the collector, the presenter and the reporter.

use std::fmt;
use std::path::PathBuf;

use anyhow::{Result, bail};

/// Ground-truth label of a stimulus, or the category a participant keyed.
///
/// Numeric codes match the results file: `0` = different, `1` = same.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Different,
    Same,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Different, Category::Same];

    pub fn code(self) -> u8 {
        match self {
            Category::Different => 0,
            Category::Same => 1,
        }
    }

    /// Parse a results-file code. Anything other than `0` or `1` is rejected.
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(Category::Different),
            1 => Ok(Category::Same),
            other => bail!("category code must be 0 or 1, got {other}"),
        }
    }

    /// Row/column index into a contingency table.
    pub fn index(self) -> usize {
        usize::from(self.code())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Different => f.write_str("different"),
            Category::Same => f.write_str("same"),
        }
    }
}

/// An image queued for presentation, tagged with its ground-truth label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stimulus {
    pub path: PathBuf,
    pub label: Category,
}

/// One presented image with its label and the recorded response.
///
/// `response` is `None` when the deadline passed without a response key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trial {
    pub image: PathBuf,
    pub label: Category,
    pub response: Option<Category>,
}

impl Trial {
    pub fn is_timeout(&self) -> bool {
        self.response.is_none()
    }

    /// File name of the image, as written to the results file.
    pub fn image_name(&self) -> String {
        self.image
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.image.display().to_string())
    }
}
