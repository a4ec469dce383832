use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    New,
    InProgress,
    FixPending,
    FixApproved,
    FixMerged,
    Verified,
    Recurred,
    WontFix,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidTransition {
    pub from: IssueStatus,
    pub to: IssueStatus,
}

impl fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot transition issue from {:?} to {:?}", self.from, self.to)
    }
}

impl std::error::Error for InvalidTransition {}

impl IssueStatus {
    /// Enforces the monotonic lifecycle named in the data model: advancing
    /// through the main chain, `wont_fix` reachable from any open state, and
    /// `reopen`/`recurred` the only ways back to an earlier state.
    pub fn transition(self, to: IssueStatus) -> Result<IssueStatus, InvalidTransition> {
        use IssueStatus::*;
        let allowed = match (self, to) {
            (New, InProgress) => true,
            (InProgress, FixPending) => true,
            (InProgress, New) => true, // failed attempt, left actionable
            (FixPending, FixApproved) => true,
            (FixPending, New) => true, // analysis-only outcome, left actionable
            (FixApproved, FixMerged) => true,
            (FixMerged, Verified) => true,
            (Verified, Recurred) => true,
            (Recurred, InProgress) => true,
            (_, WontFix) if self != WontFix => true,
            (WontFix, WontFix) => true, // re-dismissing is a no-op, not an error
            (WontFix, New) => true, // reopen
            _ => false,
        };
        if allowed {
            Ok(to)
        } else {
            Err(InvalidTransition { from: self, to })
        }
    }

    pub fn is_actionable(&self, actionable: &[IssueStatus]) -> bool {
        actionable.contains(self)
    }
}

/// One CI-reported issue the Fix-Agent Engine can work on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueGroup {
    pub key: String,
    pub category: String,
    pub issue_ids: Vec<String>,
    pub status: IssueStatus,
    pub attempts: Vec<FixAttempt>,
}

impl IssueGroup {
    /// Deterministic grouping key, e.g. `ts:TS7006:src/` or `dependabot:<pkg>`.
    pub fn key_for(category: &str, discriminator: &str) -> String {
        format!("{category}:{discriminator}")
    }

    pub fn next_attempt_number(&self) -> u32 {
        self.attempts.len() as u32 + 1
    }

    /// `fix/<category>/<issue-id>-v<attempt>`. The grouping key can contain
    /// `:` (its own separator, e.g. `ts:TS7006:src/`), which git refs
    /// forbid, so it's sanitised to `-` here rather than carried verbatim.
    pub fn branch_name(&self) -> String {
        let sanitized_key = self.key.replace(':', "-").trim_end_matches('/').replace('/', "-");
        format!(
            "fix/{}/{}-v{}",
            self.category,
            sanitized_key,
            self.next_attempt_number()
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixAttempt {
    pub attempt_number: u32,
    pub branch: String,
    pub fix_applied: bool,
    pub pr_url: Option<String>,
    pub cost_usd: f64,
    pub summary: Option<String>,
}

/// One or more [`IssueGroup`]s wrapped together for a single Session run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunUnit {
    pub key: String,
    pub groups: Vec<IssueGroup>,
}

impl RunUnit {
    /// Per-issue cost, split evenly across every issue in every group in the unit.
    pub fn cost_per_issue(&self, total_cost_usd: f64) -> f64 {
        let issue_count: usize = self.groups.iter().map(|g| g.issue_ids.len()).sum();
        if issue_count == 0 {
            0.0
        } else {
            total_cost_usd / issue_count as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn main_chain_advances() {
        let mut s = IssueStatus::New;
        for next in [
            IssueStatus::InProgress,
            IssueStatus::FixPending,
            IssueStatus::FixApproved,
            IssueStatus::FixMerged,
            IssueStatus::Verified,
        ] {
            s = s.transition(next).unwrap();
        }
        assert_eq!(s, IssueStatus::Verified);
    }

    #[test]
    fn rejects_skipping_ahead() {
        assert!(IssueStatus::New.transition(IssueStatus::FixMerged).is_err());
    }

    #[test]
    fn wont_fix_then_reopen() {
        let s = IssueStatus::InProgress.transition(IssueStatus::WontFix).unwrap();
        let s = s.transition(IssueStatus::New).unwrap();
        assert_eq!(s, IssueStatus::New);
    }

    #[test]
    fn redismissing_an_already_dismissed_issue_is_a_no_op() {
        let s = IssueStatus::InProgress.transition(IssueStatus::WontFix).unwrap();
        let s = s.transition(IssueStatus::WontFix).unwrap();
        assert_eq!(s, IssueStatus::WontFix);
    }
}
