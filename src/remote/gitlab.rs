use super::client::{query, RemoteClient};
use super::types::{CommitRecord, CommitRef, Event, FileDiff, Project, User};
use crate::error::{KuperError, Result};
use crate::model::BranchRef;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

/// Typed view over the GitLab v4 endpoints the pipeline consumes.
pub struct GitLab {
    client: RemoteClient,
}

impl GitLab {
    pub fn new(client: RemoteClient) -> Self {
        Self { client }
    }

    /// Identity behind the token. Any failure other than cancellation is an
    /// authentication failure.
    pub fn current_user(&self) -> Result<User> {
        self.client.get_json("user", &[]).map_err(|e| match e {
            KuperError::Cancelled => e,
            other => KuperError::Auth(format!("could not determine the current user: {other}")),
        })
    }

    pub fn project(&self, project_id: u64) -> Result<Project> {
        self.client.get_json(&format!("projects/{project_id}"), &[])
    }

    /// Projects the user is a member of with activity since `since`.
    pub fn projects(&self, since: DateTime<Utc>) -> Result<Vec<Project>> {
        self.client.get_all(
            "projects",
            &query([
                ("membership", "true".to_string()),
                ("simple", "true".to_string()),
                ("last_activity_after", iso(since)),
                ("order_by", "id".to_string()),
                ("sort", "asc".to_string()),
            ]),
        )
    }

    /// Push events of the current user strictly after `after` (a calendar day).
    pub fn push_events(&self, after: NaiveDate) -> Result<Vec<Event>> {
        self.client.get_all(
            "events",
            &query([
                ("action", "pushed".to_string()),
                ("after", after.format("%Y-%m-%d").to_string()),
            ]),
        )
    }

    pub fn commits(
        &self,
        project_id: u64,
        branch: &BranchRef,
        since: DateTime<Utc>,
        author: &str,
    ) -> Result<Vec<CommitRecord>> {
        let mut params = query([("since", iso(since)), ("author", author.to_string())]);
        match branch {
            BranchRef::Named(name) => params.push(("ref_name".to_string(), name.clone())),
            BranchRef::Any => params.push(("all".to_string(), "true".to_string())),
        }
        self.client
            .get_all(&format!("projects/{project_id}/repository/commits"), &params)
    }

    pub fn commit_diff(&self, project_id: u64, sha: &str) -> Result<Vec<FileDiff>> {
        self.client
            .get_all(&format!("projects/{project_id}/repository/commits/{sha}/diff"), &[])
    }

    /// Names of the branches containing `sha`, in the order the server lists them.
    pub fn commit_branches(&self, project_id: u64, sha: &str) -> Result<Vec<String>> {
        let refs: Vec<CommitRef> = self.client.get_all(
            &format!("projects/{project_id}/repository/commits/{sha}/refs"),
            &query([("type", "branch".to_string())]),
        )?;
        Ok(refs
            .into_iter()
            .filter(|r| r.kind == "branch")
            .map(|r| r.name)
            .collect())
    }
}

fn iso(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}
