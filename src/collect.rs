//! Retrieving the user's commits for each candidate.

use crate::error::Result;
use crate::model::{
    BranchCandidate, BranchRef, Commit, CommitDiff, DiffFragment, FileChange, TimeWindow, UNKNOWN_BRANCH,
};
use crate::remote::types::{CommitRecord, FileDiff};
use crate::remote::GitLab;
use indicatif::ProgressBar;
use std::collections::HashMap;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct CollectOptions {
    pub author_email: String,
    pub window: TimeWindow,
    pub fetch_diffs: bool,
}

/// Where a retained commit was first seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub repository_path: String,
    pub branch: String,
}

/// Short ids retained so far in a run. Owned by the caller and threaded
/// through every collection so that the first sighting wins.
#[derive(Debug, Default)]
pub struct SeenCommits {
    origins: HashMap<String, Origin>,
}

impl SeenCommits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn origin_of(&self, short_id: &str) -> Option<&Origin> {
        self.origins.get(short_id)
    }

    /// Records the first sighting. Returns false if `short_id` was already held.
    pub fn record(&mut self, short_id: &str, origin: Origin) -> bool {
        if self.origins.contains_key(short_id) {
            return false;
        }
        self.origins.insert(short_id.to_string(), origin);
        true
    }

    /// Number of distinct commits retained.
    pub fn retained(&self) -> usize {
        self.origins.len()
    }
}

pub struct Collector<'a> {
    api: &'a GitLab,
    options: &'a CollectOptions,
    progress: ProgressBar,
}

impl<'a> Collector<'a> {
    pub fn new(api: &'a GitLab, options: &'a CollectOptions) -> Self {
        Self {
            api,
            options,
            progress: ProgressBar::hidden(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Collect every candidate in order. A candidate whose listing fails is
    /// logged and skipped; only cancellation and non-remote errors propagate.
    pub fn collect(&self, candidates: &[BranchCandidate], seen: &mut SeenCommits) -> Result<Vec<Commit>> {
        let mut commits = Vec::new();

        for candidate in candidates {
            self.progress.set_message(format!(
                "Scanning {} ({})",
                candidate.repository_path,
                candidate.branch_label()
            ));
            match self.collect_candidate(candidate, seen) {
                Ok(mut found) => commits.append(&mut found),
                Err(e) if e.is_recoverable() => {
                    warn!(
                        repository = %candidate.repository_path,
                        branch = %candidate.branch_label(),
                        "Could not fetch commits, skipping: {e}"
                    );
                }
                Err(e) => return Err(e),
            }
            self.progress.inc(1);
        }

        self.progress.finish_and_clear();
        Ok(commits)
    }

    fn collect_candidate(&self, candidate: &BranchCandidate, seen: &mut SeenCommits) -> Result<Vec<Commit>> {
        let records = self.api.commits(
            candidate.repository_id,
            &candidate.branch,
            self.options.window.start,
            &self.options.author_email,
        )?;
        debug!(
            "{} ({}): {} commits listed",
            candidate.repository_path,
            candidate.branch_label(),
            records.len()
        );

        let mut commits = Vec::new();
        for record in records {
            if !record.author_email.eq_ignore_ascii_case(&self.options.author_email) {
                continue;
            }
            if !self.options.window.contains(&record.created_at) {
                continue;
            }
            if let Some(origin) = seen.origin_of(&record.short_id) {
                warn!(
                    "Skipping duplicate commit {} in branch {} of {} (already reported from branch {} of {})",
                    record.short_id,
                    candidate.branch_label(),
                    candidate.repository_path,
                    origin.branch,
                    origin.repository_path
                );
                continue;
            }

            let branch = match &candidate.branch {
                BranchRef::Named(name) => name.clone(),
                BranchRef::Any => self.resolve_branch(candidate, &record)?,
            };
            seen.record(
                &record.short_id,
                Origin {
                    repository_path: candidate.repository_path.clone(),
                    branch: branch.clone(),
                },
            );

            let diff = if self.options.fetch_diffs {
                Some(self.fetch_diff(candidate, &record)?)
            } else {
                None
            };

            commits.push(into_commit(candidate, branch, record, diff));
        }
        Ok(commits)
    }

    /// First branch the server reports as containing the commit. Degrades to
    /// the unknown-branch marker; only cancellation is returned as an error.
    fn resolve_branch(&self, candidate: &BranchCandidate, record: &CommitRecord) -> Result<String> {
        match self.api.commit_branches(candidate.repository_id, &record.id) {
            Ok(branches) => Ok(branches.into_iter().next().unwrap_or_else(|| {
                debug!("No branch contains {} in {}", record.short_id, candidate.repository_path);
                UNKNOWN_BRANCH.to_string()
            })),
            Err(e) if e.is_recoverable() => {
                warn!(
                    "Could not resolve branch of commit {} in {}: {e}",
                    record.short_id, candidate.repository_path
                );
                Ok(UNKNOWN_BRANCH.to_string())
            }
            Err(e) => Err(e),
        }
    }

    fn fetch_diff(&self, candidate: &BranchCandidate, record: &CommitRecord) -> Result<CommitDiff> {
        match self.api.commit_diff(candidate.repository_id, &record.id) {
            Ok(files) => Ok(CommitDiff::Fragments(files.into_iter().map(into_fragment).collect())),
            Err(e) if e.is_recoverable() => {
                warn!(
                    repository = %candidate.repository_path,
                    commit = %record.short_id,
                    "Could not retrieve diff: {e}"
                );
                Ok(CommitDiff::Unavailable(format!("Could not retrieve diff: {e}")))
            }
            Err(e) => Err(e),
        }
    }
}

fn into_fragment(file: FileDiff) -> DiffFragment {
    let change = if file.new_file {
        FileChange::Added
    } else if file.deleted_file {
        FileChange::Deleted
    } else if file.renamed_file {
        FileChange::Renamed
    } else {
        FileChange::Modified
    };
    DiffFragment {
        change,
        old_path: file.old_path,
        new_path: file.new_path,
        diff: file.diff,
    }
}

fn into_commit(candidate: &BranchCandidate, branch: String, record: CommitRecord, diff: Option<CommitDiff>) -> Commit {
    let message = record.message.trim().to_string();
    let title = if record.title.trim().is_empty() {
        message.lines().next().unwrap_or("").to_string()
    } else {
        record.title.trim().to_string()
    };

    Commit {
        repository_id: candidate.repository_id,
        repository_path: candidate.repository_path.clone(),
        branch,
        short_id: record.short_id,
        id: record.id,
        web_url: record.web_url,
        author_email: record.author_email,
        created_at: record.created_at,
        title,
        message,
        diff,
    }
}
