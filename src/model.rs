use crate::error::{KuperError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const SCHEMA_VERSION: u32 = 1;

/// Largest look-back accepted for `--days`.
pub const MAX_DAYS: u32 = 45;

/// Branch recorded when no containing branch can be resolved for a commit.
pub const UNKNOWN_BRANCH: &str = "(unknown)";

/// Branches visited before any other branch of the same repository, in this order.
pub const PRIMARY_BRANCHES: [&str; 6] = ["master", "main", "prod", "nonprod", "develop", "development"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub days: u32,
}

impl TimeWindow {
    /// Window covering the last `days` days up to `now`.
    pub fn last_days(days: u32, now: DateTime<Utc>) -> Result<Self> {
        if !(1..=MAX_DAYS).contains(&days) {
            return Err(KuperError::InvalidArgument(format!(
                "--days must be between 1 and {MAX_DAYS}, got {days}"
            )));
        }
        Ok(Self {
            start: now - Duration::days(i64::from(days)),
            days,
        })
    }

    /// The start bound is inclusive.
    pub fn contains(&self, timestamp: &DateTime<Utc>) -> bool {
        timestamp >= &self.start
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    pub id: u64,
    pub path: String,
    pub branches: BTreeSet<String>,
}

impl Repository {
    pub fn new(id: u64, path: impl Into<String>) -> Self {
        Self {
            id,
            path: path.into(),
            branches: BTreeSet::new(),
        }
    }

    /// Candidates for this repository in branch priority order. A repository
    /// without known branches yields a single candidate spanning all branches.
    pub fn candidates(&self) -> Vec<BranchCandidate> {
        if self.branches.is_empty() {
            return vec![BranchCandidate {
                repository_id: self.id,
                repository_path: self.path.clone(),
                branch: BranchRef::Any,
            }];
        }

        let mut names: Vec<&String> = self.branches.iter().collect();
        names.sort_by(|a, b| branch_rank(a).cmp(&branch_rank(b)));
        names
            .into_iter()
            .map(|name| BranchCandidate {
                repository_id: self.id,
                repository_path: self.path.clone(),
                branch: BranchRef::Named(name.clone()),
            })
            .collect()
    }
}

/// Sort key placing primary branches first in their listed order, then the
/// rest lexically.
pub fn branch_rank(name: &str) -> (usize, &str) {
    let rank = PRIMARY_BRANCHES
        .iter()
        .position(|primary| *primary == name)
        .unwrap_or(PRIMARY_BRANCHES.len());
    (rank, name)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchRef {
    Named(String),
    /// Every branch of the repository; the branch is resolved per commit.
    Any,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchCandidate {
    pub repository_id: u64,
    pub repository_path: String,
    pub branch: BranchRef,
}

impl BranchCandidate {
    pub fn branch_label(&self) -> &str {
        match &self.branch {
            BranchRef::Named(name) => name,
            BranchRef::Any => "*",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileChange {
    Added,
    Deleted,
    Renamed,
    Modified,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffFragment {
    pub change: FileChange,
    pub old_path: String,
    pub new_path: String,
    pub diff: String,
}

impl DiffFragment {
    fn header(&self) -> String {
        let old = match self.change {
            FileChange::Added => "/dev/null".to_string(),
            _ => format!("a/{}", self.old_path),
        };
        let new = match self.change {
            FileChange::Deleted => "/dev/null".to_string(),
            _ => format!("b/{}", self.new_path),
        };
        format!("--- {old}\n+++ {new}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "content", rename_all = "lowercase")]
pub enum CommitDiff {
    Fragments(Vec<DiffFragment>),
    /// Placeholder kept in place of a diff that could not be fetched.
    Unavailable(String),
}

impl CommitDiff {
    pub fn to_text(&self) -> String {
        match self {
            CommitDiff::Fragments(fragments) => fragments
                .iter()
                .map(|f| format!("{}\n{}", f.header(), f.diff.trim_end_matches('\n')))
                .collect::<Vec<_>>()
                .join("\n\n"),
            CommitDiff::Unavailable(reason) => reason.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub repository_id: u64,
    pub repository_path: String,
    pub branch: String,
    pub short_id: String,
    pub id: String,
    pub web_url: String,
    pub author_email: String,
    pub created_at: DateTime<Utc>,
    pub title: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<CommitDiff>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SortOrder {
    /// Oldest first, so a repository reads as progress over time
    #[default]
    #[value(name = "asc")]
    Ascending,
    /// Newest first
    #[value(name = "desc")]
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryGroup {
    pub repository_id: u64,
    pub repository_path: String,
    pub commits: Vec<Commit>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommitReport {
    pub groups: Vec<RepositoryGroup>,
}

impl CommitReport {
    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(|g| g.commits.is_empty())
    }

    pub fn commit_count(&self) -> usize {
        self.groups.iter().map(|g| g.commits.len()).sum()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportOutput<'a> {
    pub version: u32,
    pub generated_at: DateTime<Utc>,
    pub instance: &'a str,
    pub user: &'a str,
    pub since: DateTime<Utc>,
    pub days: u32,
    pub repositories: &'a [RepositoryGroup],
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn window_rejects_out_of_range_days() {
        let now = Utc::now();
        assert!(TimeWindow::last_days(0, now).is_err());
        assert!(TimeWindow::last_days(46, now).is_err());
        assert!(TimeWindow::last_days(1, now).is_ok());
        assert!(TimeWindow::last_days(45, now).is_ok());
    }

    #[test]
    fn window_start_is_inclusive() {
        let now = Utc.with_ymd_and_hms(2024, 5, 8, 12, 0, 0).unwrap();
        let window = TimeWindow::last_days(7, now).unwrap();
        assert_eq!(window.start, Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());
        assert!(window.contains(&window.start));
        assert!(!window.contains(&(window.start - Duration::seconds(1))));
    }

    #[test]
    fn primary_branches_come_first_in_listed_order() {
        let mut repo = Repository::new(7, "group/app");
        for name in ["feature/x", "develop", "main", "alpha", "master", "prod"] {
            repo.branches.insert(name.to_string());
        }
        let order: Vec<String> = repo
            .candidates()
            .into_iter()
            .map(|c| c.branch_label().to_string())
            .collect();
        assert_eq!(order, ["master", "main", "prod", "develop", "alpha", "feature/x"]);
    }

    #[test]
    fn repository_without_branches_spans_all() {
        let repo = Repository::new(3, "group/lib");
        let candidates = repo.candidates();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].branch, BranchRef::Any);
    }

    #[test]
    fn diff_text_keeps_file_boundaries() {
        let diff = CommitDiff::Fragments(vec![
            DiffFragment {
                change: FileChange::Added,
                old_path: "new.rs".into(),
                new_path: "new.rs".into(),
                diff: "@@ -0,0 +1 @@\n+fn new() {}\n".into(),
            },
            DiffFragment {
                change: FileChange::Modified,
                old_path: "lib.rs".into(),
                new_path: "lib.rs".into(),
                diff: "@@ -1 +1 @@\n-old\n+new\n".into(),
            },
        ]);
        let text = diff.to_text();
        assert!(text.starts_with("--- /dev/null\n+++ b/new.rs\n@@"));
        assert!(text.contains("+fn new() {}\n\n--- a/lib.rs\n+++ b/lib.rs"));
    }

    #[test]
    fn deleted_file_header_points_to_dev_null() {
        let fragment = DiffFragment {
            change: FileChange::Deleted,
            old_path: "gone.txt".into(),
            new_path: "gone.txt".into(),
            diff: "@@ -1 +0,0 @@\n-bye\n".into(),
        };
        assert_eq!(fragment.header(), "--- a/gone.txt\n+++ /dev/null");
    }
}
