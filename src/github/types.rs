//! Wire types for the subset of the GitHub REST API the crawler reads.
//!
//! Only the fields the crawler consumes are declared; everything else in a
//! response is ignored. GitHub sends `null` for many absent strings, so those
//! fields go through [`nullable`] and land as empty values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use std::collections::{BTreeMap, HashMap};

/// Deserializes `null` as the type's default value
pub fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Account {
    #[serde(default, deserialize_with = "nullable")]
    pub login: String,
}

impl Account {
    /// Case-insensitive login comparison
    pub fn is(&self, login: &str) -> bool {
        self.login.eq_ignore_ascii_case(login)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct User {
    #[serde(default, deserialize_with = "nullable")]
    pub login: String,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub bio: String,
    #[serde(default, deserialize_with = "nullable")]
    pub company: String,
    #[serde(default, deserialize_with = "nullable")]
    pub location: String,
    #[serde(default, deserialize_with = "nullable")]
    pub blog: String,
    #[serde(default, deserialize_with = "nullable")]
    pub email: String,
    #[serde(default, deserialize_with = "nullable")]
    pub twitter_username: String,
    #[serde(default, deserialize_with = "nullable")]
    pub hireable: bool,
    #[serde(default)]
    pub followers: u64,
    #[serde(default)]
    pub following: u64,
    #[serde(default)]
    pub public_repos: u64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A file or README fetched through the contents API
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Content {
    #[serde(default, deserialize_with = "nullable")]
    pub content: String,
    #[serde(default, deserialize_with = "nullable")]
    pub encoding: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct License {
    #[serde(default, deserialize_with = "nullable")]
    pub spdx_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Repository {
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub full_name: String,
    #[serde(default)]
    pub owner: Account,
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
    #[serde(default, deserialize_with = "nullable")]
    pub language: String,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    #[serde(default, deserialize_with = "nullable")]
    pub topics: Vec<String>,
    #[serde(default)]
    pub fork: bool,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub license: Option<License>,
    #[serde(default, deserialize_with = "nullable")]
    pub default_branch: String,
    #[serde(default)]
    pub open_issues_count: u64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pushed_at: Option<DateTime<Utc>>,
}

/// Language name to byte count
pub type Languages = HashMap<String, u64>;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommitAuthor {
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommitInfo {
    #[serde(default, deserialize_with = "nullable")]
    pub message: String,
    #[serde(default)]
    pub author: Option<CommitAuthor>,
}

/// Entry in a commit listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommitSummary {
    pub sha: String,
    #[serde(default)]
    pub commit: CommitInfo,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommitStats {
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommitFile {
    #[serde(default, deserialize_with = "nullable")]
    pub filename: String,
    #[serde(default, deserialize_with = "nullable")]
    pub patch: String,
}

/// Single commit with stats and per-file patches
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommitDetail {
    #[serde(default)]
    pub stats: Option<CommitStats>,
    #[serde(default, deserialize_with = "nullable")]
    pub files: Vec<CommitFile>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Label {
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    #[serde(default, deserialize_with = "nullable")]
    pub title: String,
    #[serde(default, deserialize_with = "nullable")]
    pub body: String,
    #[serde(default, deserialize_with = "nullable")]
    pub state: String,
    #[serde(default, deserialize_with = "nullable")]
    pub user: Account,
    #[serde(default, deserialize_with = "nullable")]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub merged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
    #[serde(default)]
    pub changed_files: u64,
}

/// Line-level pull request review comment
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewComment {
    #[serde(default, deserialize_with = "nullable")]
    pub user: Account,
    #[serde(default, deserialize_with = "nullable")]
    pub body: String,
    #[serde(default, deserialize_with = "nullable")]
    pub path: String,
    #[serde(default, deserialize_with = "nullable")]
    pub diff_hunk: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Issue or pull request conversation comment
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IssueComment {
    #[serde(default, deserialize_with = "nullable")]
    pub user: Account,
    #[serde(default, deserialize_with = "nullable")]
    pub body: String,
    #[serde(default, deserialize_with = "nullable")]
    pub html_url: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TreeEntry {
    #[serde(default, deserialize_with = "nullable")]
    pub path: String,
    #[serde(rename = "type", default, deserialize_with = "nullable")]
    pub kind: String,
    #[serde(default)]
    pub size: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Tree {
    #[serde(default, deserialize_with = "nullable")]
    pub tree: Vec<TreeEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Release {
    #[serde(default, deserialize_with = "nullable")]
    pub author: Account,
    #[serde(default, deserialize_with = "nullable")]
    pub tag_name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub body: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Result item of the issue search endpoint (issues and pull requests)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Issue {
    pub number: u64,
    #[serde(default, deserialize_with = "nullable")]
    pub title: String,
    #[serde(default, deserialize_with = "nullable")]
    pub body: String,
    #[serde(default, deserialize_with = "nullable")]
    pub state: String,
    #[serde(default, deserialize_with = "nullable")]
    pub labels: Vec<Label>,
    #[serde(default, deserialize_with = "nullable")]
    pub repository_url: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pull_request: Option<serde_json::Value>,
}

/// Envelope returned by search endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResults<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GistFile {
    #[serde(default, deserialize_with = "nullable")]
    pub language: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Gist {
    #[serde(default, deserialize_with = "nullable")]
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
    #[serde(default)]
    pub public: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub files: BTreeMap<String, GistFile>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventRepo {
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Event {
    #[serde(rename = "type", default, deserialize_with = "nullable")]
    pub kind: String,
    #[serde(default)]
    pub repo: EventRepo,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}
