//! Console rendering of a session summary.

use std::fmt;
use std::path::Path;

use crate::core::stats::Summary;
use crate::core::types::Category;

/// Console summary printed after a session or by `face-exp report`.
pub struct SummaryReport<'a> {
    pub results_path: &'a Path,
    pub summary: &'a Summary,
}

impl fmt::Display for SummaryReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary = self.summary;
        writeln!(f, "Results written to: {}", self.results_path.display())?;
        writeln!(
            f,
            "Trials counted (excluding {} timeouts): {}",
            summary.timeouts, summary.total
        )?;
        match summary.percent_correct() {
            Some(percent) => writeln!(
                f,
                "Percent correct: {percent:.2}% ({}/{})",
                summary.correct, summary.total
            )?,
            None => writeln!(f, "Percent correct: N/A (no non-timeout trials)")?,
        }

        writeln!(f)?;
        writeln!(
            f,
            "Contingency table (rows=true status: 0=different,1=same; columns=response: 0=z/different,1=/=same)"
        )?;
        writeln!(f, "       Response=0    Response=1")?;
        for label in Category::ALL {
            writeln!(
                f,
                "True={}   {:>10} {:>12}",
                label.code(),
                summary.count(label, Category::Different),
                summary.count(label, Category::Same)
            )?;
        }
        Ok(())
    }
}

pub fn render_summary(results_path: &Path, summary: &Summary) -> String {
    SummaryReport {
        results_path,
        summary,
    }
    .to_string()
}
