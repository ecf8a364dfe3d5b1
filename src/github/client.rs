use crate::error::{DevlicaError, Result};
use crate::github::types::SearchResults;
use crate::rate_limiter::RateLimiter;
use crate::utils::text::truncate_field;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

/// Public GitHub API root
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

const API_VERSION: &str = "2022-11-28";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const ERROR_BODY_LIMIT: usize = 500;

/// Query string pairs appended to an endpoint
pub type Query<'a> = &'a [(&'a str, String)];

/// One page of a listing plus the URL of the next page, if any
#[derive(Debug)]
pub struct Page<T> {
    /// Decoded items
    pub items: Vec<T>,
    /// `rel="next"` target from the `Link` header
    pub next: Option<Url>,
}

/// Authenticated GitHub REST client
///
/// Every request goes through the shared [`RateLimiter`], so a cancelled
/// token stops in-flight backoff as well as new requests.
#[derive(Clone)]
pub struct GitHubClient {
    transport: RateLimiter,
    http: Client,
    base: String,
    headers: HeaderMap,
}

impl GitHubClient {
    /// Creates a client for `api_base` using bearer `token`
    pub fn new(token: &str, api_base: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| DevlicaError::Network(e.to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("devlica/", env!("CARGO_PKG_VERSION"))),
        );
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static(API_VERSION));
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| DevlicaError::Config("GitHub token contains invalid characters".into()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        Ok(Self {
            transport: RateLimiter::new(http.clone(), CancellationToken::new()),
            http,
            base: api_base.trim_end_matches('/').to_string(),
            headers,
        })
    }

    /// Returns a copy of this client whose requests and backoff observe `cancel`
    pub fn with_cancel(&self, cancel: CancellationToken) -> Self {
        Self {
            transport: RateLimiter::new(self.http.clone(), cancel),
            ..self.clone()
        }
    }

    /// Returns the cancellation token shared with the transport
    pub fn cancel_token(&self) -> &CancellationToken {
        self.transport.cancel_token()
    }

    /// Builds an absolute endpoint URL from a path and query pairs
    pub fn endpoint(&self, path: &str, query: Query<'_>) -> Result<Url> {
        let raw = format!("{}/{}", self.base, path.trim_start_matches('/'));
        if query.is_empty() {
            return Ok(Url::parse(&raw)?);
        }
        Ok(Url::parse_with_params(&raw, query.iter().map(|(k, v)| (*k, v.as_str())))?)
    }

    async fn send(&self, url: Url) -> Result<Response> {
        debug!(url = %url, "GET");
        let request = self.http.get(url).headers(self.headers.clone()).build()?;
        let response = self.transport.execute(request).await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DevlicaError::GitHubApi {
                status: status.as_u16(),
                message: truncate_field(body.trim(), ERROR_BODY_LIMIT),
            });
        }
        Ok(response)
    }

    /// GETs `path` and decodes the JSON body
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str, query: Query<'_>) -> Result<T> {
        let url = self.endpoint(path, query)?;
        let response = self.send(url).await?;
        Ok(response.json::<T>().await?)
    }

    /// GETs one page of a JSON array listing
    pub async fn get_page<T: DeserializeOwned>(&self, url: Url) -> Result<Page<T>> {
        let response = self.send(url).await?;
        let next = parse_next_link(response.headers());
        let items = response.json::<Vec<T>>().await?;
        Ok(Page { items, next })
    }

    /// GETs one page of a search endpoint, unwrapping the `items` envelope
    pub async fn get_search_page<T: DeserializeOwned>(&self, url: Url) -> Result<Page<T>> {
        let response = self.send(url).await?;
        let next = parse_next_link(response.headers());
        let results = response.json::<SearchResults<T>>().await?;
        Ok(Page {
            items: results.items,
            next,
        })
    }

    /// Collects up to `limit` items by following `Link` pagination from `path`
    pub async fn collect<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Query<'_>,
        limit: usize,
    ) -> Result<Vec<T>> {
        let mut all = Vec::new();
        let mut next = Some(self.endpoint(path, query)?);

        while let Some(url) = next.take() {
            let page = self.get_page::<T>(url).await?;
            all.extend(page.items);
            if all.len() >= limit {
                all.truncate(limit);
                break;
            }
            next = page.next;
        }
        Ok(all)
    }
}

/// Extracts the `rel="next"` URL from a `Link` header
pub fn parse_next_link(headers: &HeaderMap) -> Option<Url> {
    let link = headers.get("link")?.to_str().ok()?;
    link.split(',')
        .map(str::trim)
        .find(|part| part.contains(r#"rel="next""#))
        .and_then(|part| {
            let start = part.find('<')? + 1;
            let end = part.find('>')?;
            Url::parse(part.get(start..end)?).ok()
        })
}

/// Splits an API repository URL into `(owner, repo)` using its last two path
/// segments
pub fn owner_repo_from_url(raw: &str) -> Result<(String, String)> {
    let url = Url::parse(raw)?;
    let parts: Vec<&str> = url
        .path()
        .trim_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();
    match parts.as_slice() {
        [.., owner, repo] => Ok((owner.to_string(), repo.to_string())),
        _ => Err(DevlicaError::Validation(format!(
            "unexpected repository URL path: {}",
            url.path()
        ))),
    }
}
