use crate::crawl::fetchers::{
    fetch_authored_issues, fetch_code_samples, fetch_commits, fetch_events, fetch_external_prs,
    fetch_external_reviews, fetch_gists, fetch_issue_comments, fetch_languages, fetch_orgs,
    fetch_pr_conversation_comments, fetch_profile, fetch_profile_readme, fetch_pull_requests,
    fetch_releases, fetch_repositories, fetch_review_comments, fetch_starred, repository_record,
};
use crate::crawl::model::{ActivityAggregate, CrawlDepth, RepositoryRecord};
use crate::crawl::select::select_indices;
use crate::error::{DevlicaError, Result};
use crate::github::types::Repository;
use crate::github::GitHubClient;
use crate::parallel::ParallelProcessor;
use futures::future::{BoxFuture, FutureExt};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Repositories deep-crawled at the same time
pub const CRAWL_CONCURRENCY: usize = 5;

type SharedAggregate = Arc<Mutex<ActivityAggregate>>;

/// Collects a developer's public GitHub activity
///
/// Cheap to clone; clones share the underlying HTTP client.
#[derive(Clone)]
pub struct Crawler {
    inner: Arc<CrawlerInner>,
}

struct CrawlerInner {
    client: GitHubClient,
    max_repos: usize,
}

impl Crawler {
    /// Creates a crawler that deep-crawls at most `max_repos` repositories
    pub fn new(client: GitHubClient, max_repos: usize) -> Self {
        Self {
            inner: Arc::new(CrawlerInner {
                client,
                max_repos: max_repos.max(1),
            }),
        }
    }

    /// Crawls `username`, returning everything collected
    ///
    /// Only the profile and repository listing are required; every other
    /// source degrades to an empty field with a warning. Cancelling `cancel`
    /// aborts the crawl with [`DevlicaError::Cancelled`].
    pub async fn crawl(&self, cancel: &CancellationToken, username: &str) -> Result<ActivityAggregate> {
        let client = self.inner.client.with_cancel(cancel.clone());
        let result = self.run(&client, username).await;
        if cancel.is_cancelled() {
            return Err(DevlicaError::Cancelled);
        }
        result
    }

    async fn run(&self, client: &GitHubClient, username: &str) -> Result<ActivityAggregate> {
        let mut user = fetch_profile(client, username)
            .await
            .map_err(|e| e.context("fetching profile"))?;

        match fetch_profile_readme(client, username).await {
            Ok(readme) => user.profile_readme = readme,
            Err(e) if e.is_cancelled() => return Err(e),
            Err(e) => debug!(error = %e, "no profile README"),
        }

        let repos = fetch_repositories(client, username)
            .await
            .map_err(|e| e.context("listing repos"))?;

        let selected = select_indices(&repos, self.inner.max_repos, username);
        info!(
            total = repos.len(),
            deep = selected.len(),
            "selected repositories for deep crawl"
        );

        let aggregate: SharedAggregate = Arc::new(Mutex::new(ActivityAggregate {
            user,
            ..Default::default()
        }));

        self.crawl_selected(client, username, &repos, &selected, &aggregate)
            .await?;

        {
            let chosen: HashSet<usize> = selected.iter().copied().collect();
            let mut state = aggregate.lock().await;
            for (i, repo) in repos.iter().enumerate() {
                if !chosen.contains(&i) {
                    state
                        .repos
                        .push(repository_record(repo, username, CrawlDepth::Shallow));
                }
            }
        }

        let crawled: HashSet<String> = aggregate
            .lock()
            .await
            .repos
            .iter()
            .map(|r| r.full_name.clone())
            .collect();
        match fetch_external_reviews(client, username, &crawled).await {
            Ok(external) => aggregate.lock().await.repos.extend(external),
            Err(e) if e.is_cancelled() => return Err(e),
            Err(e) => warn!(error = %e, "could not fetch external reviews"),
        }

        self.crawl_sources(client, username, &aggregate).await?;

        let aggregate = match Arc::try_unwrap(aggregate) {
            Ok(mutex) => mutex.into_inner(),
            Err(shared) => shared.lock().await.clone(),
        };
        info!(
            repos = aggregate.repos.len(),
            commits = aggregate.total_commits(),
            reviews = aggregate.total_reviews(),
            issues = aggregate.total_issues(),
            external_prs = aggregate.total_external_prs(),
            "crawl finished"
        );
        Ok(aggregate)
    }

    /// Deep-crawls the selected repositories with bounded concurrency, then
    /// restores listing order
    async fn crawl_selected(
        &self,
        client: &GitHubClient,
        username: &str,
        repos: &[Repository],
        selected: &[usize],
        aggregate: &SharedAggregate,
    ) -> Result<()> {
        let tasks: Vec<BoxFuture<'static, Result<()>>> = selected
            .iter()
            .map(|&i| {
                let client = client.clone();
                let username = username.to_string();
                let repo = repos[i].clone();
                let aggregate = aggregate.clone();
                async move {
                    let record = crawl_repository(&client, &username, &repo).await?;
                    aggregate.lock().await.repos.push(record);
                    Ok(())
                }
                .boxed()
            })
            .collect();

        let results = ParallelProcessor::new(CRAWL_CONCURRENCY).process(tasks).await;
        for (result, &i) in results.into_iter().zip(selected) {
            match result {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => warn!(repo = %repos[i].full_name, error = %e, "skipping repo"),
            }
        }

        let position: HashMap<&str, usize> = repos
            .iter()
            .enumerate()
            .map(|(i, r)| (r.full_name.as_str(), i))
            .collect();
        aggregate
            .lock()
            .await
            .repos
            .sort_by_key(|r| position.get(r.full_name.as_str()).copied());
        Ok(())
    }

    /// Fetches the user-level sources, one unbounded task each
    async fn crawl_sources(
        &self,
        client: &GitHubClient,
        username: &str,
        aggregate: &SharedAggregate,
    ) -> Result<()> {
        macro_rules! source {
            ($label:literal, $fetch:path, $field:ident) => {{
                let client = client.clone();
                let username = username.to_string();
                source_task(
                    $label,
                    async move { $fetch(&client, &username).await },
                    aggregate.clone(),
                    |state, value| state.$field = value,
                )
            }};
        }

        let tasks = vec![
            source!("issue comments", fetch_issue_comments, issue_comments),
            source!("starred repos", fetch_starred, starred_repos),
            source!("gists", fetch_gists, gists),
            source!("orgs", fetch_orgs, orgs),
            source!("events", fetch_events, events),
            source!("authored issues", fetch_authored_issues, authored_issues),
            source!("external PRs", fetch_external_prs, external_prs),
        ];

        for result in ParallelProcessor::unbounded().process(tasks).await {
            match result {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => warn!(error = %e, "user-level source task failed"),
            }
        }
        Ok(())
    }
}

/// Wraps one user-level fetch: success is stored, failure is logged and
/// leaves the field empty, cancellation is returned
fn source_task<T, Fut, Store>(
    label: &'static str,
    fetch: Fut,
    aggregate: SharedAggregate,
    store: Store,
) -> BoxFuture<'static, Result<()>>
where
    T: Send + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
    Store: FnOnce(&mut ActivityAggregate, T) + Send + 'static,
{
    async move {
        match fetch.await {
            Ok(value) => {
                store(&mut *aggregate.lock().await, value);
                Ok(())
            }
            Err(e) if e.is_cancelled() => Err(e),
            Err(e) => {
                warn!(error = %e, "could not fetch {label}");
                Ok(())
            }
        }
    }
    .boxed()
}

fn or_empty<T: Default>(result: Result<T>, source: &str, repo: &str) -> Result<T> {
    match result {
        Ok(value) => Ok(value),
        Err(e) if e.is_cancelled() => Err(e),
        Err(e) => {
            debug!(repo, error = %e, "could not fetch {source}");
            Ok(T::default())
        }
    }
}

async fn crawl_repository(
    client: &GitHubClient,
    username: &str,
    repo: &Repository,
) -> Result<RepositoryRecord> {
    let owner = repo.owner.login.as_str();
    let name = repo.name.as_str();
    let full = repo.full_name.as_str();
    debug!(repo = full, "crawling repo");

    let mut record = repository_record(repo, username, CrawlDepth::Deep);
    record.languages = or_empty(fetch_languages(client, owner, name).await, "languages", full)?;
    record.commits = or_empty(fetch_commits(client, owner, name, username).await, "commits", full)?;
    record.prs = or_empty(
        fetch_pull_requests(client, owner, name, username).await,
        "pull requests",
        full,
    )?;
    record.review_comments = or_empty(
        fetch_review_comments(client, owner, name, username).await,
        "review comments",
        full,
    )?;
    if record.review_comments.is_empty() {
        debug!(repo = full, "no line-level review comments, trying PR conversation comments");
        record.pr_comments = or_empty(
            fetch_pr_conversation_comments(client, owner, name, username).await,
            "PR conversation comments",
            full,
        )?;
    }
    record.code_samples = or_empty(fetch_code_samples(client, owner, name).await, "code samples", full)?;
    record.releases = or_empty(
        fetch_releases(client, owner, name, username).await,
        "releases",
        full,
    )?;
    Ok(record)
}
