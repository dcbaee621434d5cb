//! Wire types for the GitLab v4 REST API. Only the fields the pipeline reads
//! are declared.

use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub email: Option<String>,
    #[serde(default)]
    pub commit_email: Option<String>,
}

impl User {
    /// Address commits are attributed to.
    pub fn author_email(&self) -> Option<&str> {
        self.email
            .as_deref()
            .or(self.commit_email.as_deref())
            .filter(|e| !e.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Project {
    pub id: u64,
    pub path_with_namespace: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    pub project_id: Option<u64>,
    #[serde(default)]
    pub action_name: String,
    pub created_at: DateTime<Utc>,
    pub push_data: Option<PushData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushData {
    #[serde(rename = "ref")]
    pub ref_name: Option<String>,
    pub ref_type: Option<String>,
    pub action: Option<String>,
}

impl PushData {
    /// Branch the push landed on; `None` for tag pushes and branch deletions.
    pub fn branch(&self) -> Option<String> {
        if self.ref_type.as_deref().is_some_and(|t| t != "branch") {
            return None;
        }
        if self.action.as_deref() == Some("removed") {
            return None;
        }
        let name = self.ref_name.as_deref()?;
        let name = name.strip_prefix("refs/heads/").unwrap_or(name);
        (!name.is_empty()).then(|| name.to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitRecord {
    pub id: String,
    pub short_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
    pub author_email: String,
    pub created_at: DateTime<Utc>,
    pub web_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileDiff {
    pub old_path: String,
    pub new_path: String,
    #[serde(default)]
    pub diff: String,
    #[serde(default)]
    pub new_file: bool,
    #[serde(default)]
    pub renamed_file: bool,
    #[serde(default)]
    pub deleted_file: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitRef {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
}
