//! Finding the repositories and branches worth scanning.

use crate::error::Result;
use crate::model::{BranchCandidate, Repository, TimeWindow};
use crate::remote::GitLab;
use chrono::Duration;
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info, warn};

/// Ordered repository path prefixes to skip.
#[derive(Debug, Clone, Default)]
pub struct ExcludeRules {
    rules: Vec<String>,
}

impl ExcludeRules {
    pub fn new<I, S>(rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            rules: rules
                .into_iter()
                .map(|r| r.into().trim_end_matches('/').to_string())
                .filter(|r| !r.is_empty())
                .collect(),
        }
    }

    /// First rule equal to `path` or prefixing it at a `/` boundary.
    pub fn matching_rule(&self, path: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|rule| {
                path.strip_prefix(rule.as_str())
                    .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
            })
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rules(&self) -> &[String] {
        &self.rules
    }
}

/// A way of turning the user's activity into repositories to scan.
pub trait Discoverer {
    fn name(&self) -> &'static str;

    /// Failures here are fatal to the run.
    fn discover(&self, api: &GitLab, window: &TimeWindow, excludes: &ExcludeRules) -> Result<Vec<Repository>>;
}

/// Scans the user's push events and keeps the branches pushed to in the window.
#[derive(Debug, Default, Clone, Copy)]
pub struct EventScan;

impl Discoverer for EventScan {
    fn name(&self) -> &'static str {
        "events"
    }

    fn discover(&self, api: &GitLab, window: &TimeWindow, excludes: &ExcludeRules) -> Result<Vec<Repository>> {
        // `after` is exclusive and day-granular.
        let after = (window.start - Duration::days(1)).date_naive();
        let events = api.push_events(after)?;
        debug!("Scanning {} push events", events.len());

        let mut paths: HashMap<u64, Option<String>> = HashMap::new();
        let mut repositories: BTreeMap<u64, Repository> = BTreeMap::new();
        let mut skipped: HashSet<u64> = HashSet::new();

        for event in events {
            if !event.action_name.contains("pushed") || !window.contains(&event.created_at) {
                continue;
            }
            let Some(project_id) = event.project_id else {
                continue;
            };
            let Some(branch) = event.push_data.as_ref().and_then(|p| p.branch()) else {
                continue;
            };

            let path = match paths.entry(project_id) {
                Entry::Occupied(entry) => entry.get().clone(),
                Entry::Vacant(entry) => {
                    let resolved = match api.project(project_id) {
                        Ok(project) => Some(project.path_with_namespace),
                        Err(e) if e.is_recoverable() => {
                            warn!("Skipping project {project_id}: could not resolve its path: {e}");
                            None
                        }
                        Err(e) => return Err(e),
                    };
                    entry.insert(resolved).clone()
                }
            };
            let Some(path) = path else {
                continue;
            };

            if let Some(rule) = excludes.matching_rule(&path) {
                if skipped.insert(project_id) {
                    info!("Skipping repository '{path}' because it matches exclude rule '{rule}'");
                }
                continue;
            }

            repositories
                .entry(project_id)
                .or_insert_with(|| Repository::new(project_id, path))
                .branches
                .insert(branch);
        }

        Ok(repositories.into_values().collect())
    }
}

/// Lists every project the user belongs to with recent activity; branches are
/// resolved per commit later.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProjectListing;

impl Discoverer for ProjectListing {
    fn name(&self) -> &'static str {
        "projects"
    }

    fn discover(&self, api: &GitLab, window: &TimeWindow, excludes: &ExcludeRules) -> Result<Vec<Repository>> {
        let projects = api.projects(window.start)?;
        debug!("Listed {} projects", projects.len());

        Ok(projects
            .into_iter()
            .filter(|project| match excludes.matching_rule(&project.path_with_namespace) {
                Some(rule) => {
                    info!(
                        "Skipping repository '{}' because it matches exclude rule '{rule}'",
                        project.path_with_namespace
                    );
                    false
                }
                None => true,
            })
            .map(|project| Repository::new(project.id, project.path_with_namespace))
            .collect())
    }
}

/// Flatten repositories into candidates: repositories by case-insensitive path,
/// then each repository's branches in priority order.
pub fn order_candidates(mut repositories: Vec<Repository>) -> Vec<BranchCandidate> {
    repositories.sort_by(|a, b| {
        a.path
            .to_lowercase()
            .cmp(&b.path.to_lowercase())
            .then_with(|| a.path.cmp(&b.path))
            .then_with(|| a.id.cmp(&b.id))
    });
    repositories.iter().flat_map(Repository::candidates).collect()
}
