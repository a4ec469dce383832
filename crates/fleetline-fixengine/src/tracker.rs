use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use fleetline_types::IssueGroup;

/// The single tracker file: `{issues: [...], reviewedRuns: [...]}`.
/// Forward-compatible — absent fields default to empty, so an older tracker
/// file written before a field existed still loads.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Tracker {
    #[serde(default)]
    pub issues: Vec<IssueGroup>,
    #[serde(default, rename = "reviewedRuns")]
    pub reviewed_runs: Vec<String>,
}

impl Tracker {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(self)?;
        std::fs::write(path, raw)?;
        Ok(())
    }

    pub fn find(&self, key: &str) -> Option<&IssueGroup> {
        self.issues.iter().find(|g| g.key == key)
    }

    pub fn find_mut(&mut self, key: &str) -> Option<&mut IssueGroup> {
        self.issues.iter_mut().find(|g| g.key == key)
    }

    pub fn actionable<'a>(
        &'a self,
        actionable_statuses: &'a [fleetline_types::IssueStatus],
    ) -> impl Iterator<Item = &'a IssueGroup> {
        self.issues
            .iter()
            .filter(move |g| g.status.is_actionable(actionable_statuses))
    }

    pub fn upsert(&mut self, group: IssueGroup) {
        match self.find_mut(&group.key) {
            Some(existing) => *existing = group,
            None => self.issues.push(group),
        }
    }
}

pub fn default_tracker_path(workspace_path: &Path) -> PathBuf {
    workspace_path.join("tracker.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let mut tracker = Tracker::default();
        tracker.issues.push(IssueGroup {
            key: "ts:TS7006:src/".to_string(),
            category: "ts".to_string(),
            issue_ids: vec!["i1".to_string()],
            status: fleetline_types::IssueStatus::New,
            attempts: vec![],
        });
        let json = serde_json::to_string(&tracker).unwrap();
        let parsed: Tracker = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, tracker);
    }

    #[test]
    fn absent_fields_default_to_empty() {
        let tracker: Tracker = serde_json::from_str("{}").unwrap();
        assert!(tracker.issues.is_empty());
        assert!(tracker.reviewed_runs.is_empty());
    }

    #[test]
    fn missing_file_loads_as_default() {
        let tracker = Tracker::load(Path::new("/nonexistent/tracker.json")).unwrap();
        assert_eq!(tracker, Tracker::default());
    }
}
