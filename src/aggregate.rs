use crate::model::{Commit, CommitReport, RepositoryGroup, SortOrder};
use std::collections::HashMap;

/// Group commits by repository and put both levels in a deterministic order:
/// repositories by case-insensitive path, commits by creation time.
pub fn aggregate(commits: Vec<Commit>, order: SortOrder) -> CommitReport {
    let mut groups: HashMap<u64, RepositoryGroup> = HashMap::new();

    for commit in commits {
        groups
            .entry(commit.repository_id)
            .or_insert_with(|| RepositoryGroup {
                repository_id: commit.repository_id,
                repository_path: commit.repository_path.clone(),
                commits: Vec::new(),
            })
            .commits
            .push(commit);
    }

    let mut groups: Vec<RepositoryGroup> = groups.into_values().collect();
    groups.sort_by(|a, b| {
        a.repository_path
            .to_lowercase()
            .cmp(&b.repository_path.to_lowercase())
            .then_with(|| a.repository_path.cmp(&b.repository_path))
            .then_with(|| a.repository_id.cmp(&b.repository_id))
    });

    for group in &mut groups {
        group.commits.sort_by(|a, b| {
            let by_time = a.created_at.cmp(&b.created_at).then_with(|| a.short_id.cmp(&b.short_id));
            match order {
                SortOrder::Ascending => by_time,
                SortOrder::Descending => by_time.reverse(),
            }
        });
    }

    CommitReport { groups }
}
