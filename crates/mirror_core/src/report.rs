use std::fmt;

use crate::{FailureKey, RunState};

/// Totals of a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub success: usize,
    pub not_found: usize,
    /// Per-key failure counts, ordered by key.
    pub other: Vec<(FailureKey, usize)>,
}

impl Report {
    pub fn from_state(state: &RunState) -> Self {
        Self {
            success: state.success().len(),
            not_found: state.not_found().len(),
            other: state
                .other()
                .iter()
                .map(|(key, urls)| (key.clone(), urls.len()))
                .collect(),
        }
    }

    pub fn failed(&self) -> usize {
        self.other.iter().map(|(_, count)| count).sum()
    }

    pub fn total(&self) -> usize {
        self.success + self.not_found + self.failed()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Download summary:")?;
        writeln!(f, "  downloaded: {} file(s)", self.success)?;
        writeln!(f, "  not found:  {} file(s)", self.not_found)?;
        for (key, count) in &self.other {
            writeln!(f, "  error {key}: {count} file(s)")?;
        }
        write!(f, "  total:      {}", self.total())
    }
}
