//! Session statistics: accuracy over answered trials and a label × response
//! contingency table.

use crate::core::types::{Category, Trial};

/// Counts derived from a list of trials.
///
/// Timed-out trials only contribute to `timeouts`; every other field covers
/// answered trials alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub timeouts: usize,
    /// Answered (non-timeout) trials.
    pub total: usize,
    pub correct: usize,
    /// `contingency[label][response]`, indexed by [`Category::index`].
    pub contingency: [[usize; 2]; 2],
}

impl Summary {
    /// Tally `(label, response)` pairs in presentation order.
    pub fn tally<I>(outcomes: I) -> Self
    where
        I: IntoIterator<Item = (Category, Option<Category>)>,
    {
        let mut summary = Summary::default();
        for (label, response) in outcomes {
            let Some(response) = response else {
                summary.timeouts += 1;
                continue;
            };
            summary.total += 1;
            if response == label {
                summary.correct += 1;
            }
            summary.contingency[label.index()][response.index()] += 1;
        }
        summary
    }

    pub fn from_trials(trials: &[Trial]) -> Self {
        Self::tally(trials.iter().map(|trial| (trial.label, trial.response)))
    }

    /// Percentage of answered trials that were correct; `None` when nothing
    /// was answered.
    pub fn percent_correct(&self) -> Option<f64> {
        if self.total == 0 {
            return None;
        }
        Some(100.0 * self.correct as f64 / self.total as f64)
    }

    pub fn count(&self, label: Category, response: Category) -> usize {
        self.contingency[label.index()][response.index()]
    }

    /// All trials, answered or not.
    pub fn trials(&self) -> usize {
        self.total + self.timeouts
    }
}
