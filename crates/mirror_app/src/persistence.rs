use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Local};
use mirror_core::RunState;
use mirror_engine::write_atomic;
use mirror_logging::{mirror_error, mirror_info, mirror_warn};
use serde::{Deserialize, Serialize};

pub(crate) const REPORT_FILENAME: &str = ".sitemirror_report.ron";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct PersistedFailure {
    pub key: String,
    pub urls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub(crate) struct PersistedReport {
    pub started_at: String,
    pub finished_at: String,
    pub success: Vec<String>,
    pub not_found: Vec<String>,
    pub other: Vec<PersistedFailure>,
}

impl PersistedReport {
    pub(crate) fn from_state(
        state: &RunState,
        started_at: DateTime<Local>,
        finished_at: DateTime<Local>,
    ) -> Self {
        Self {
            started_at: started_at.to_rfc3339(),
            finished_at: finished_at.to_rfc3339(),
            success: state.success().iter().cloned().collect(),
            not_found: state.not_found().iter().cloned().collect(),
            other: state
                .other()
                .iter()
                .map(|(key, urls)| PersistedFailure {
                    key: key.to_string(),
                    urls: urls.iter().cloned().collect(),
                })
                .collect(),
        }
    }
}

/// Downloads that changed since a previous run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct RunDelta {
    /// Downloaded now, not last time.
    pub gained: Vec<String>,
    /// Downloaded last time, not now.
    pub lost: Vec<String>,
}

impl RunDelta {
    pub(crate) fn between(previous: &PersistedReport, current: &PersistedReport) -> Self {
        let before: BTreeSet<&str> = previous.success.iter().map(String::as_str).collect();
        let after: BTreeSet<&str> = current.success.iter().map(String::as_str).collect();
        Self {
            gained: after.difference(&before).map(|url| url.to_string()).collect(),
            lost: before.difference(&after).map(|url| url.to_string()).collect(),
        }
    }

    pub(crate) fn log(&self, previous: &PersistedReport) {
        mirror_info!(
            "Since the run finished {}: {} newly downloaded, {} no longer downloaded",
            previous.finished_at,
            self.gained.len(),
            self.lost.len()
        );
        for url in &self.lost {
            mirror_warn!("No longer downloaded: {}", url);
        }
    }
}

pub(crate) fn load_report(output_dir: &Path) -> Option<PersistedReport> {
    let path = output_dir.join(REPORT_FILENAME);
    let content = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
        Err(err) => {
            mirror_warn!("Failed to read previous report from {:?}: {}", path, err);
            return None;
        }
    };

    match ron::from_str(&content) {
        Ok(report) => Some(report),
        Err(err) => {
            mirror_warn!("Failed to parse previous report from {:?}: {}", path, err);
            None
        }
    }
}

pub(crate) fn save_report(output_dir: &Path, report: &PersistedReport) {
    let pretty = ron::ser::PrettyConfig::new();
    let content = match ron::ser::to_string_pretty(report, pretty) {
        Ok(text) => text,
        Err(err) => {
            mirror_error!("Failed to serialize run report: {}", err);
            return;
        }
    };

    let path = output_dir.join(REPORT_FILENAME);
    match write_atomic(&path, content.as_bytes()) {
        Ok(()) => mirror_info!("Run report written to {:?}", path),
        Err(err) => mirror_error!("Failed to write run report to {:?}: {}", path, err),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use mirror_core::{FailureKey, Outcome};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    fn sample_state() -> RunState {
        let mut state = RunState::new();
        state.record("https://e.test/a", &Outcome::Success);
        state.record("https://e.test/b", &Outcome::NotFound);
        state.record("https://e.test/c", &Outcome::Failed(FailureKey::Status(503)));
        state.record("https://e.test/d", &Outcome::Failed(FailureKey::AccessDenied));
        state
    }

    #[test]
    fn report_survives_a_save_and_load() {
        let temp = TempDir::new().unwrap();
        let start = Local.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let end = Local.with_ymd_and_hms(2026, 3, 1, 12, 5, 0).unwrap();
        let report = PersistedReport::from_state(&sample_state(), start, end);

        save_report(temp.path(), &report);
        let loaded = load_report(temp.path()).unwrap();

        assert_eq!(loaded, report);
        assert_eq!(loaded.other.len(), 2);
        assert_eq!(loaded.other[0].key, "503");
        assert_eq!(loaded.other[1].key, "ACCESS_DENIED");
    }

    #[test]
    fn delta_lists_gained_and_lost_downloads() {
        let previous = PersistedReport {
            success: vec!["https://e.test/a".into(), "https://e.test/c".into()],
            ..PersistedReport::default()
        };
        let current = PersistedReport {
            success: vec!["https://e.test/a".into(), "https://e.test/b".into()],
            ..PersistedReport::default()
        };

        let delta = RunDelta::between(&previous, &current);
        assert_eq!(delta.gained, vec!["https://e.test/b".to_string()]);
        assert_eq!(delta.lost, vec!["https://e.test/c".to_string()]);
        assert_eq!(RunDelta::between(&current, &current), RunDelta::default());
    }

    #[test]
    fn missing_or_garbled_report_loads_as_none() {
        let temp = TempDir::new().unwrap();
        assert_eq!(load_report(temp.path()), None);

        fs::write(temp.path().join(REPORT_FILENAME), "not ron at all {").unwrap();
        assert_eq!(load_report(temp.path()), None);
    }
}
