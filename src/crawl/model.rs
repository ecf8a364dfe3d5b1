use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Everything collected about one developer's public activity
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ActivityAggregate {
    pub user: UserProfile,
    #[serde(default)]
    pub repos: Vec<RepositoryRecord>,
    #[serde(default)]
    pub issue_comments: Vec<CommentRecord>,
    #[serde(default)]
    pub starred_repos: Vec<StarredRepository>,
    #[serde(default)]
    pub gists: Vec<GistRecord>,
    #[serde(default)]
    pub orgs: Vec<String>,
    #[serde(default)]
    pub authored_issues: Vec<IssueRecord>,
    #[serde(default)]
    pub external_prs: Vec<PullRequestRecord>,
    #[serde(default)]
    pub events: Vec<EventRecord>,
}

impl ActivityAggregate {
    pub fn total_commits(&self) -> usize {
        self.repos.iter().map(|r| r.commits.len()).sum()
    }

    /// Line-level review comments per repository, falling back to PR
    /// conversation comments for repositories that have none
    pub fn total_reviews(&self) -> usize {
        self.repos
            .iter()
            .map(|r| {
                if r.review_comments.is_empty() {
                    r.pr_comments.len()
                } else {
                    r.review_comments.len()
                }
            })
            .sum()
    }

    pub fn total_issues(&self) -> usize {
        self.authored_issues.len()
    }

    pub fn total_starred(&self) -> usize {
        self.starred_repos.len()
    }

    pub fn total_gists(&self) -> usize {
        self.gists.len()
    }

    pub fn total_releases(&self) -> usize {
        self.repos.iter().map(|r| r.releases.len()).sum()
    }

    pub fn total_external_prs(&self) -> usize {
        self.external_prs.len()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub login: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub blog: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub twitter_username: String,
    #[serde(default)]
    pub hireable: bool,
    #[serde(default)]
    pub followers: u64,
    #[serde(default)]
    pub following: u64,
    #[serde(default)]
    pub public_repos: u64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Profile README, empty when the user has none
    #[serde(default)]
    pub profile_readme: String,
}

/// How much of a repository was crawled
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CrawlDepth {
    /// Commits, pull requests, reviews, samples and releases were fetched
    Deep,
    /// Metadata only
    #[default]
    Shallow,
    /// Someone else's repository where the user left review activity
    External,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RepositoryRecord {
    pub name: String,
    pub full_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub languages: HashMap<String, u64>,
    #[serde(default)]
    pub stars: u64,
    #[serde(default)]
    pub forks: u64,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub is_owner: bool,
    #[serde(default)]
    pub is_fork: bool,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub license: String,
    #[serde(default)]
    pub default_branch: String,
    #[serde(default)]
    pub open_issues: u64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub depth: CrawlDepth,
    #[serde(default)]
    pub commits: Vec<CommitRecord>,
    #[serde(default)]
    pub prs: Vec<PullRequestRecord>,
    #[serde(default)]
    pub review_comments: Vec<ReviewCommentRecord>,
    #[serde(default)]
    pub pr_comments: Vec<CommentRecord>,
    #[serde(default)]
    pub code_samples: Vec<CodeSample>,
    #[serde(default)]
    pub releases: Vec<ReleaseRecord>,
}

/// A commit; patch and stats are present only for the sampled subset
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CommitRecord {
    pub sha: String,
    pub message: String,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additions: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletions: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files_changed: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PullRequestRecord {
    pub repo: String,
    pub number: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
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

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReviewCommentRecord {
    pub repo: String,
    pub body: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub diff_hunk: String,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

/// Issue or pull request conversation comment
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CommentRecord {
    pub repo: String,
    pub body: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CodeSample {
    pub path: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StarredRepository {
    pub name: String,
    pub full_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub stars: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GistRecord {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub files: Vec<GistFileRecord>,
    #[serde(default)]
    pub public: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GistFileRecord {
    pub name: String,
    #[serde(default)]
    pub language: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IssueRecord {
    pub repo: String,
    pub number: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Entry of the public activity timeline
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EventRecord {
    #[serde(rename = "type")]
    pub kind: String,
    pub repo: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    pub summary: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReleaseRecord {
    pub repo: String,
    pub tag_name: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo_with(reviews: usize, pr_comments: usize, commits: usize) -> RepositoryRecord {
        RepositoryRecord {
            full_name: "octocat/repo".into(),
            review_comments: vec![ReviewCommentRecord::default(); reviews],
            pr_comments: vec![CommentRecord::default(); pr_comments],
            commits: vec![CommitRecord::default(); commits],
            ..Default::default()
        }
    }

    #[test]
    fn test_totals_fall_back_to_pr_comments() {
        let aggregate = ActivityAggregate {
            repos: vec![repo_with(3, 10, 4), repo_with(0, 2, 1), repo_with(0, 0, 0)],
            ..Default::default()
        };

        assert_eq!(aggregate.total_reviews(), 5);
        assert_eq!(aggregate.total_commits(), 5);
    }

    #[test]
    fn test_total_releases_sums_repositories() {
        let mut first = repo_with(0, 0, 0);
        first.releases = vec![ReleaseRecord::default(); 2];
        let mut second = repo_with(0, 0, 0);
        second.releases = vec![ReleaseRecord::default()];

        let aggregate = ActivityAggregate {
            repos: vec![first, second],
            ..Default::default()
        };
        assert_eq!(aggregate.total_releases(), 3);
    }

    #[test]
    fn test_sampled_commit_fields_omitted_when_absent() {
        let commit = CommitRecord {
            sha: "abc".into(),
            message: "fix".into(),
            ..Default::default()
        };
        let json = serde_json::to_value(&commit).unwrap();
        assert!(json.get("patch").is_none());
        assert!(json.get("additions").is_none());

        let depth = serde_json::to_value(CrawlDepth::Deep).unwrap();
        assert_eq!(depth, serde_json::json!("deep"));
    }
}
