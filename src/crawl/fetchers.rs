//! One function per GitHub data source.
//!
//! Every fetcher returns a `Result`; the orchestrator decides which failures
//! are fatal. Failures on individual items inside a fetcher (one commit, one
//! file, one issue thread) are skipped with a debug log, except cancellation,
//! which always propagates.

use crate::crawl::model::{
    CodeSample, CommentRecord, CommitRecord, CrawlDepth, EventRecord, GistFileRecord, GistRecord,
    IssueRecord, PullRequestRecord, ReleaseRecord, RepositoryRecord, ReviewCommentRecord,
    StarredRepository, UserProfile,
};
use crate::crawl::patch::{assemble_patch, spread_indices};
use crate::error::{DevlicaError, Result};
use crate::github::types::{
    CommitDetail, CommitSummary, Content, Event, Gist, Issue, IssueComment, Languages,
    PullRequest, Release, Repository, ReviewComment, Tree, User,
};
use crate::github::{owner_repo_from_url, GitHubClient};
use crate::utils::text::truncate_field;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

pub const MAX_COMMITS_PER_REPO: usize = 50;
pub const MAX_PATCHES_PER_REPO: usize = 20;
pub const MAX_PRS_PER_REPO: usize = 30;
pub const MAX_REVIEWS_PER_REPO: usize = 50;
pub const MAX_CODE_SAMPLES: usize = 8;
pub const MAX_FILE_SIZE_BYTES: u64 = 32 * 1024;
pub const MAX_RELEASES_PER_REPO: usize = 30;
pub const MAX_EXTERNAL_REVIEW_PRS: usize = 30;
pub const MAX_ISSUE_COMMENTS: usize = 500;
pub const MAX_SEARCH_RESULTS: usize = 200;
pub const MAX_STARRED_REPOS: usize = 500;
pub const MAX_GISTS: usize = 100;
pub const MAX_EVENTS: usize = 300;

const README_LIMIT: usize = 4000;
const BODY_LIMIT: usize = 2000;
const DIFF_HUNK_LIMIT: usize = 2000;
const COMMENT_LIMIT: usize = 1000;
const DESCRIPTION_LIMIT: usize = 500;
const PAGE_SIZE: &str = "100";
const CONVERSATION_PAGE_SIZE: &str = "30";

const INTERESTING_FILES: &[&str] = &[
    "main.go",
    "main.py",
    "main.rs",
    "main.ts",
    "main.js",
    "app.go",
    "app.py",
    "app.ts",
    "app.js",
    "makefile",
    "dockerfile",
    "justfile",
];

const SOURCE_EXTENSIONS: &[&str] = &["go", "py", "rs", "ts", "js", "java", "rb", "c", "cpp", "h"];

fn q(pairs: &[(&'static str, &str)]) -> Vec<(&'static str, String)> {
    pairs.iter().map(|(k, v)| (*k, v.to_string())).collect()
}

/// Turns a per-item failure into `None` unless it is a cancellation
fn skip_failed<T>(result: Result<T>, what: &str) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_cancelled() => Err(e),
        Err(e) => {
            debug!(error = %e, "skipping {what}");
            Ok(None)
        }
    }
}

fn decode_content(content: &Content) -> Result<String> {
    if !content.encoding.is_empty() && content.encoding != "base64" {
        return Err(DevlicaError::Validation(format!(
            "unsupported content encoding: {}",
            content.encoding
        )));
    }
    let packed: String = content
        .content
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let bytes = STANDARD
        .decode(packed)
        .map_err(|e| DevlicaError::Parse(format!("invalid base64 content: {e}")))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub async fn fetch_profile(client: &GitHubClient, username: &str) -> Result<UserProfile> {
    let user: User = client.get_json(&format!("users/{username}"), &[]).await?;
    Ok(UserProfile {
        login: user.login,
        name: user.name,
        bio: user.bio,
        company: user.company,
        location: user.location,
        blog: user.blog,
        email: user.email,
        twitter_username: user.twitter_username,
        hireable: user.hireable,
        followers: user.followers,
        following: user.following,
        public_repos: user.public_repos,
        created_at: user.created_at,
        profile_readme: String::new(),
    })
}

/// Fetches the `{user}/{user}` profile README, truncated
pub async fn fetch_profile_readme(client: &GitHubClient, username: &str) -> Result<String> {
    let readme: Content = client
        .get_json(&format!("repos/{username}/{username}/readme"), &[])
        .await?;
    Ok(truncate_field(&decode_content(&readme)?, README_LIMIT))
}

/// Lists every repository the user owns or collaborates on, most recently
/// pushed first
pub async fn fetch_repositories(client: &GitHubClient, username: &str) -> Result<Vec<Repository>> {
    let mut repos: Vec<Repository> = client
        .collect(
            &format!("users/{username}/repos"),
            &q(&[
                ("type", "all"),
                ("sort", "pushed"),
                ("direction", "desc"),
                ("per_page", PAGE_SIZE),
            ]),
            usize::MAX,
        )
        .await?;
    repos.sort_by(|a, b| b.pushed_at.cmp(&a.pushed_at));
    Ok(repos)
}

/// Builds a metadata-only record from a listing entry
pub fn repository_record(repo: &Repository, username: &str, depth: CrawlDepth) -> RepositoryRecord {
    RepositoryRecord {
        name: repo.name.clone(),
        full_name: repo.full_name.clone(),
        description: repo.description.clone(),
        language: repo.language.clone(),
        stars: repo.stargazers_count,
        forks: repo.forks_count,
        topics: repo.topics.clone(),
        is_owner: repo.owner.is(username),
        is_fork: repo.fork,
        archived: repo.archived,
        license: repo
            .license
            .as_ref()
            .map(|l| l.spdx_id.clone())
            .unwrap_or_default(),
        default_branch: repo.default_branch.clone(),
        open_issues: repo.open_issues_count,
        created_at: repo.created_at,
        updated_at: repo.updated_at,
        depth,
        ..Default::default()
    }
}

pub async fn fetch_languages(client: &GitHubClient, owner: &str, repo: &str) -> Result<Languages> {
    client
        .get_json(&format!("repos/{owner}/{repo}/languages"), &[])
        .await
}

/// Lists the author's latest commits and attaches patches to an evenly spread
/// subset so the sample spans the whole history
pub async fn fetch_commits(
    client: &GitHubClient,
    owner: &str,
    repo: &str,
    author: &str,
) -> Result<Vec<CommitRecord>> {
    let per_page = MAX_COMMITS_PER_REPO.to_string();
    let mut commits: Vec<CommitSummary> = client
        .get_json(
            &format!("repos/{owner}/{repo}/commits"),
            &q(&[("author", author), ("per_page", per_page.as_str())]),
        )
        .await?;
    commits.truncate(MAX_COMMITS_PER_REPO);

    let sampled: HashSet<usize> = spread_indices(commits.len(), MAX_PATCHES_PER_REPO)
        .into_iter()
        .collect();

    let mut records = Vec::with_capacity(commits.len());
    for (i, commit) in commits.into_iter().enumerate() {
        let mut record = CommitRecord {
            date: commit.commit.author.as_ref().and_then(|a| a.date),
            sha: commit.sha,
            message: commit.commit.message,
            ..Default::default()
        };

        if sampled.contains(&i) {
            let detail = client
                .get_json::<CommitDetail>(&format!("repos/{owner}/{repo}/commits/{}", record.sha), &[])
                .await;
            if let Some(detail) = skip_failed(detail, "commit detail")? {
                let stats = detail.stats.unwrap_or_default();
                record.patch = Some(assemble_patch(&detail.files));
                record.additions = Some(stats.additions);
                record.deletions = Some(stats.deletions);
                record.files_changed = Some(detail.files.len() as u64);
            }
        }
        records.push(record);
    }
    Ok(records)
}

async fn list_pull_requests(client: &GitHubClient, owner: &str, repo: &str) -> Result<Vec<PullRequest>> {
    let per_page = MAX_PRS_PER_REPO.to_string();
    client
        .get_json(
            &format!("repos/{owner}/{repo}/pulls"),
            &q(&[
                ("state", "all"),
                ("sort", "updated"),
                ("direction", "desc"),
                ("per_page", per_page.as_str()),
            ]),
        )
        .await
}

/// Pull requests the user opened in this repository
pub async fn fetch_pull_requests(
    client: &GitHubClient,
    owner: &str,
    repo: &str,
    username: &str,
) -> Result<Vec<PullRequestRecord>> {
    let full_name = format!("{owner}/{repo}");
    Ok(list_pull_requests(client, owner, repo)
        .await?
        .into_iter()
        .filter(|pr| pr.user.is(username))
        .map(|pr| PullRequestRecord {
            repo: full_name.clone(),
            number: pr.number,
            title: pr.title,
            body: truncate_field(&pr.body, BODY_LIMIT),
            state: pr.state,
            labels: pr.labels.into_iter().map(|l| l.name).collect(),
            date: pr.created_at,
            merged_at: pr.merged_at,
            closed_at: pr.closed_at,
            additions: pr.additions,
            deletions: pr.deletions,
            changed_files: pr.changed_files,
        })
        .collect())
}

fn review_comment_record(full_name: &str, comment: ReviewComment) -> ReviewCommentRecord {
    ReviewCommentRecord {
        repo: full_name.to_string(),
        body: truncate_field(&comment.body, COMMENT_LIMIT),
        path: comment.path,
        diff_hunk: truncate_field(&comment.diff_hunk, DIFF_HUNK_LIMIT),
        date: comment.created_at,
    }
}

fn comment_record(full_name: &str, comment: IssueComment) -> CommentRecord {
    CommentRecord {
        repo: full_name.to_string(),
        body: truncate_field(&comment.body, COMMENT_LIMIT),
        url: comment.html_url,
        date: comment.created_at,
    }
}

/// Line-level review comments the user left anywhere in this repository
pub async fn fetch_review_comments(
    client: &GitHubClient,
    owner: &str,
    repo: &str,
    username: &str,
) -> Result<Vec<ReviewCommentRecord>> {
    let comments: Vec<ReviewComment> = client
        .get_json(
            &format!("repos/{owner}/{repo}/pulls/comments"),
            &q(&[("sort", "created"), ("direction", "desc"), ("per_page", PAGE_SIZE)]),
        )
        .await?;

    let full_name = format!("{owner}/{repo}");
    Ok(comments
        .into_iter()
        .filter(|c| c.user.is(username))
        .take(MAX_REVIEWS_PER_REPO)
        .map(|c| review_comment_record(&full_name, c))
        .collect())
}

async fn list_issue_comments(
    client: &GitHubClient,
    owner: &str,
    repo: &str,
    number: u64,
    per_page: &str,
) -> Result<Vec<IssueComment>> {
    client
        .get_json(
            &format!("repos/{owner}/{repo}/issues/{number}/comments"),
            &q(&[("sort", "created"), ("direction", "desc"), ("per_page", per_page)]),
        )
        .await
}

/// Conversation comments the user left on other people's pull requests
///
/// Used when a repository has no line-level review comments from the user.
pub async fn fetch_pr_conversation_comments(
    client: &GitHubClient,
    owner: &str,
    repo: &str,
    username: &str,
) -> Result<Vec<CommentRecord>> {
    let full_name = format!("{owner}/{repo}");
    let mut records = Vec::new();

    for pr in list_pull_requests(client, owner, repo).await? {
        if pr.user.is(username) {
            continue;
        }
        if records.len() >= MAX_REVIEWS_PER_REPO {
            break;
        }
        let listed = list_issue_comments(client, owner, repo, pr.number, CONVERSATION_PAGE_SIZE).await;
        let Some(comments) = skip_failed(listed, "pull request conversation")? else {
            continue;
        };
        for comment in comments.into_iter().filter(|c| c.user.is(username)) {
            records.push(comment_record(&full_name, comment));
            if records.len() >= MAX_REVIEWS_PER_REPO {
                break;
            }
        }
    }
    Ok(records)
}

pub fn is_interesting_file(name: &str) -> bool {
    let lower = name.to_lowercase();
    INTERESTING_FILES.contains(&lower.as_str())
}

pub fn is_source_file(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| SOURCE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

pub fn is_workflow_file(path: &str) -> bool {
    path.starts_with(".github/workflows/") && (path.ends_with(".yml") || path.ends_with(".yaml"))
}

/// Samples CI workflows first, then entrypoints and source files
pub async fn fetch_code_samples(client: &GitHubClient, owner: &str, repo: &str) -> Result<Vec<CodeSample>> {
    let tree: Tree = client
        .get_json(
            &format!("repos/{owner}/{repo}/git/trees/HEAD"),
            &q(&[("recursive", "1")]),
        )
        .await?;

    let mut workflows = Vec::new();
    let mut candidates = Vec::new();
    for entry in tree.tree {
        if entry.kind != "blob" || entry.size > MAX_FILE_SIZE_BYTES {
            continue;
        }
        let name = entry.path.rsplit('/').next().unwrap_or(&entry.path);
        if is_workflow_file(&entry.path) {
            workflows.push(entry.path);
        } else if is_interesting_file(name) || is_source_file(name) {
            candidates.push(entry.path);
        }
    }

    let mut samples = Vec::new();
    for path in workflows.into_iter().chain(candidates) {
        if samples.len() >= MAX_CODE_SAMPLES {
            break;
        }
        let fetched = client
            .get_json::<Content>(&format!("repos/{owner}/{repo}/contents/{path}"), &[])
            .await
            .and_then(|c| decode_content(&c));
        if let Some(content) = skip_failed(fetched, "file content")? {
            samples.push(CodeSample { path, content });
        }
    }
    Ok(samples)
}

/// Releases the user published in this repository
pub async fn fetch_releases(
    client: &GitHubClient,
    owner: &str,
    repo: &str,
    username: &str,
) -> Result<Vec<ReleaseRecord>> {
    let per_page = MAX_RELEASES_PER_REPO.to_string();
    let releases: Vec<Release> = client
        .get_json(
            &format!("repos/{owner}/{repo}/releases"),
            &q(&[("per_page", per_page.as_str())]),
        )
        .await?;

    let full_name = format!("{owner}/{repo}");
    Ok(releases
        .into_iter()
        .filter(|r| r.author.is(username))
        .map(|r| ReleaseRecord {
            repo: full_name.clone(),
            tag_name: r.tag_name,
            name: r.name,
            body: truncate_field(&r.body, BODY_LIMIT),
            created_at: r.created_at,
        })
        .collect())
}

struct PrRef {
    owner: String,
    repo: String,
    number: u64,
}

/// Finds review activity in repositories outside `crawled`
///
/// Each repository where the user commented on someone else's pull request
/// becomes an [`CrawlDepth::External`] record holding those comments.
pub async fn fetch_external_reviews(
    client: &GitHubClient,
    username: &str,
    crawled: &HashSet<String>,
) -> Result<Vec<RepositoryRecord>> {
    let per_page = MAX_EXTERNAL_REVIEW_PRS.to_string();
    let url = client.endpoint(
        "search/issues",
        &q(&[
            ("q", format!("commenter:{username} is:pr -user:{username}").as_str()),
            ("sort", "updated"),
            ("order", "desc"),
            ("per_page", per_page.as_str()),
        ]),
    )?;
    let page = client.get_search_page::<Issue>(url).await?;

    let mut grouped: Vec<(String, Vec<PrRef>)> = Vec::new();
    for issue in page.items {
        let Ok((owner, repo)) = owner_repo_from_url(&issue.repository_url) else {
            continue;
        };
        let full_name = format!("{owner}/{repo}");
        if crawled.contains(&full_name) {
            continue;
        }
        let pr = PrRef {
            owner,
            repo,
            number: issue.number,
        };
        match grouped.iter_mut().find(|(name, _)| *name == full_name) {
            Some((_, refs)) => refs.push(pr),
            None => grouped.push((full_name, vec![pr])),
        }
    }

    let mut records = Vec::new();
    for (full_name, refs) in grouped {
        let mut record = RepositoryRecord {
            name: refs[0].repo.clone(),
            full_name: full_name.clone(),
            depth: CrawlDepth::External,
            ..Default::default()
        };

        for pr in &refs {
            let listed = client
                .get_json::<Vec<ReviewComment>>(
                    &format!("repos/{}/{}/pulls/{}/comments", pr.owner, pr.repo, pr.number),
                    &q(&[("sort", "created"), ("direction", "desc"), ("per_page", "50")]),
                )
                .await;
            if let Some(comments) = skip_failed(listed, "external review comments")? {
                for comment in comments.into_iter().filter(|c| c.user.is(username)) {
                    record.review_comments.push(review_comment_record(&full_name, comment));
                    if record.review_comments.len() >= MAX_REVIEWS_PER_REPO {
                        break;
                    }
                }
            }
            if record.review_comments.len() >= MAX_REVIEWS_PER_REPO {
                break;
            }

            let listed =
                list_issue_comments(client, &pr.owner, &pr.repo, pr.number, CONVERSATION_PAGE_SIZE).await;
            if let Some(comments) = skip_failed(listed, "external conversation comments")? {
                for comment in comments.into_iter().filter(|c| c.user.is(username)) {
                    record.pr_comments.push(comment_record(&full_name, comment));
                    if record.pr_comments.len() >= MAX_REVIEWS_PER_REPO {
                        break;
                    }
                }
            }
            if record.pr_comments.len() >= MAX_REVIEWS_PER_REPO {
                break;
            }
        }

        if !record.review_comments.is_empty() || !record.pr_comments.is_empty() {
            info!(
                repo = %record.full_name,
                line_comments = record.review_comments.len(),
                pr_comments = record.pr_comments.len(),
                "found external review activity"
            );
            records.push(record);
        }
    }
    Ok(records)
}

/// Issue and pull request comments the user wrote anywhere
pub async fn fetch_issue_comments(client: &GitHubClient, username: &str) -> Result<Vec<CommentRecord>> {
    let mut all = Vec::new();
    let mut next = Some(client.endpoint(
        "search/issues",
        &q(&[
            ("q", format!("commenter:{username}").as_str()),
            ("sort", "updated"),
            ("order", "desc"),
            ("per_page", PAGE_SIZE),
        ]),
    )?);

    while let Some(url) = next.take() {
        let page = client.get_search_page::<Issue>(url).await?;
        for issue in page.items {
            if all.len() >= MAX_ISSUE_COMMENTS {
                return Ok(all);
            }
            let Ok((owner, repo)) = owner_repo_from_url(&issue.repository_url) else {
                continue;
            };
            let listed = list_issue_comments(client, &owner, &repo, issue.number, PAGE_SIZE).await;
            let Some(comments) = skip_failed(listed, "issue thread")? else {
                continue;
            };
            let full_name = format!("{owner}/{repo}");
            all.extend(
                comments
                    .into_iter()
                    .filter(|c| c.user.is(username))
                    .map(|c| comment_record(&full_name, c)),
            );
        }
        if all.len() >= MAX_ISSUE_COMMENTS {
            break;
        }
        next = page.next;
    }
    all.truncate(MAX_ISSUE_COMMENTS);
    Ok(all)
}

pub async fn fetch_starred(client: &GitHubClient, username: &str) -> Result<Vec<StarredRepository>> {
    let starred: Vec<Repository> = client
        .collect(
            &format!("users/{username}/starred"),
            &q(&[("sort", "created"), ("direction", "desc"), ("per_page", PAGE_SIZE)]),
            MAX_STARRED_REPOS,
        )
        .await?;
    Ok(starred
        .into_iter()
        .map(|r| StarredRepository {
            name: r.name,
            full_name: r.full_name,
            description: truncate_field(&r.description, DESCRIPTION_LIMIT),
            language: r.language,
            topics: r.topics,
            stars: r.stargazers_count,
        })
        .collect())
}

pub async fn fetch_gists(client: &GitHubClient, username: &str) -> Result<Vec<GistRecord>> {
    let gists: Vec<Gist> = client
        .collect(
            &format!("users/{username}/gists"),
            &q(&[("per_page", PAGE_SIZE)]),
            MAX_GISTS,
        )
        .await?;
    Ok(gists
        .into_iter()
        .map(|g| GistRecord {
            id: g.id,
            description: truncate_field(&g.description, DESCRIPTION_LIMIT),
            files: g
                .files
                .into_iter()
                .map(|(name, file)| GistFileRecord {
                    name,
                    language: file.language,
                })
                .collect(),
            public: g.public,
            created_at: g.created_at,
            updated_at: g.updated_at,
        })
        .collect())
}

#[derive(serde::Deserialize)]
struct Org {
    login: String,
}

pub async fn fetch_orgs(client: &GitHubClient, username: &str) -> Result<Vec<String>> {
    let orgs: Vec<Org> = client
        .get_json(&format!("users/{username}/orgs"), &q(&[("per_page", PAGE_SIZE)]))
        .await?;
    Ok(orgs.into_iter().map(|o| o.login).collect())
}

/// One-line description of a timeline event
pub fn event_summary(kind: &str, repo: &str) -> String {
    match kind {
        "PushEvent" => format!("pushed to {repo}"),
        "CreateEvent" => format!("created in {repo}"),
        "DeleteEvent" => format!("deleted in {repo}"),
        "ForkEvent" => format!("forked {repo}"),
        "IssuesEvent" => format!("issue activity in {repo}"),
        "IssueCommentEvent" => format!("commented on issue in {repo}"),
        "PullRequestEvent" => format!("PR activity in {repo}"),
        "PullRequestReviewEvent" => format!("reviewed PR in {repo}"),
        "PullRequestReviewCommentEvent" => format!("review comment in {repo}"),
        "WatchEvent" => format!("starred {repo}"),
        "ReleaseEvent" => format!("release in {repo}"),
        other => other.to_string(),
    }
}

/// Public timeline in API order
pub async fn fetch_events(client: &GitHubClient, username: &str) -> Result<Vec<EventRecord>> {
    let events: Vec<Event> = client
        .collect(
            &format!("users/{username}/events/public"),
            &q(&[("per_page", PAGE_SIZE)]),
            MAX_EVENTS,
        )
        .await?;
    Ok(events
        .into_iter()
        .map(|e| EventRecord {
            summary: event_summary(&e.kind, &e.repo.name),
            kind: e.kind,
            repo: e.repo.name,
            created_at: e.created_at,
        })
        .collect())
}

async fn search_issues(client: &GitHubClient, query: &str, limit: usize) -> Result<Vec<Issue>> {
    let mut all = Vec::new();
    let mut next = Some(client.endpoint(
        "search/issues",
        &q(&[
            ("q", query),
            ("sort", "created"),
            ("order", "desc"),
            ("per_page", PAGE_SIZE),
        ]),
    )?);
    while let Some(url) = next.take() {
        let page = client.get_search_page::<Issue>(url).await?;
        all.extend(page.items);
        if all.len() >= limit {
            all.truncate(limit);
            break;
        }
        next = page.next;
    }
    Ok(all)
}

/// Issues the user opened anywhere
pub async fn fetch_authored_issues(client: &GitHubClient, username: &str) -> Result<Vec<IssueRecord>> {
    let issues = search_issues(client, &format!("author:{username} is:issue"), MAX_SEARCH_RESULTS).await?;
    Ok(issues
        .into_iter()
        .filter_map(|issue| {
            let (owner, repo) = owner_repo_from_url(&issue.repository_url).ok()?;
            Some(IssueRecord {
                repo: format!("{owner}/{repo}"),
                number: issue.number,
                title: issue.title,
                body: truncate_field(&issue.body, BODY_LIMIT),
                state: issue.state,
                labels: issue.labels.into_iter().map(|l| l.name).collect(),
                created_at: issue.created_at,
            })
        })
        .collect())
}

/// Pull requests the user opened against other people's repositories
pub async fn fetch_external_prs(client: &GitHubClient, username: &str) -> Result<Vec<PullRequestRecord>> {
    let issues = search_issues(
        client,
        &format!("author:{username} is:pr -user:{username}"),
        MAX_SEARCH_RESULTS,
    )
    .await?;

    let mut records = Vec::with_capacity(issues.len());
    for issue in issues {
        let Ok((owner, repo)) = owner_repo_from_url(&issue.repository_url) else {
            continue;
        };
        let mut record = PullRequestRecord {
            repo: format!("{owner}/{repo}"),
            number: issue.number,
            title: issue.title,
            body: truncate_field(&issue.body, BODY_LIMIT),
            state: issue.state,
            labels: issue.labels.into_iter().map(|l| l.name).collect(),
            date: issue.created_at,
            closed_at: issue.closed_at,
            ..Default::default()
        };
        if issue.pull_request.is_some() {
            let detail = client
                .get_json::<PullRequest>(&format!("repos/{owner}/{repo}/pulls/{}", issue.number), &[])
                .await;
            if let Some(pr) = skip_failed(detail, "pull request detail")? {
                record.additions = pr.additions;
                record.deletions = pr.deletions;
                record.changed_files = pr.changed_files;
                record.merged_at = pr.merged_at;
            }
        }
        records.push(record);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("PushEvent", "pushed to a/b")]
    #[test_case("ForkEvent", "forked a/b")]
    #[test_case("WatchEvent", "starred a/b")]
    #[test_case("PullRequestReviewEvent", "reviewed PR in a/b")]
    #[test_case("GollumEvent", "GollumEvent" ; "unknown kind")]
    fn test_event_summary(kind: &str, want: &str) {
        assert_eq!(event_summary(kind, "a/b"), want);
    }

    #[test_case("Makefile", true)]
    #[test_case("main.rs", true)]
    #[test_case("APP.PY", true)]
    #[test_case("README.md", false)]
    fn test_is_interesting_file(name: &str, want: bool) {
        assert_eq!(is_interesting_file(name), want);
    }

    #[test_case("lib.rs", true)]
    #[test_case("Widget.JAVA", true)]
    #[test_case("style.css", false)]
    #[test_case("Makefile", false ; "no extension")]
    fn test_is_source_file(name: &str, want: bool) {
        assert_eq!(is_source_file(name), want);
    }

    #[test_case(".github/workflows/ci.yml", true)]
    #[test_case(".github/workflows/release.yaml", true)]
    #[test_case(".github/dependabot.yml", false)]
    #[test_case("ci/.github/workflows/x.yml", false)]
    fn test_is_workflow_file(path: &str, want: bool) {
        assert_eq!(is_workflow_file(path), want);
    }

    #[test]
    fn test_decode_content_ignores_line_breaks() {
        let content = Content {
            content: "aGVsbG8g\nd29ybGQ=\n".to_string(),
            encoding: "base64".to_string(),
        };
        assert_eq!(decode_content(&content).unwrap(), "hello world");
    }

    #[test]
    fn test_skip_failed_propagates_cancellation() {
        let skipped = skip_failed::<()>(Err(DevlicaError::Network("reset".into())), "x").unwrap();
        assert!(skipped.is_none());

        let cancelled = skip_failed::<()>(Err(DevlicaError::Cancelled), "x");
        assert!(cancelled.unwrap_err().is_cancelled());
    }
}
