#![allow(dead_code)]

use devlica::github::GitHubClient;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const USER: &str = "octocat";

/// Starts a mock GitHub and a client pointed at it
pub async fn github() -> (MockServer, GitHubClient) {
    let server = MockServer::start().await;
    let client = GitHubClient::new("test-token", &server.uri()).expect("client builds");
    (server, client)
}

/// Serves `body` as JSON for every GET of `route`
pub async fn mount_json(server: &MockServer, route: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

pub fn user_json(login: &str) -> Value {
    json!({
        "login": login,
        "name": "The Octocat",
        "bio": null,
        "company": "@github",
        "followers": 42,
        "public_repos": 2,
        "created_at": "2011-01-25T18:44:36Z"
    })
}

pub fn repo_json(owner: &str, name: &str, language: &str, stars: u64, pushed_at: &str) -> Value {
    json!({
        "name": name,
        "full_name": format!("{owner}/{name}"),
        "owner": {"login": owner},
        "description": null,
        "language": language,
        "stargazers_count": stars,
        "forks_count": 0,
        "topics": [],
        "fork": false,
        "archived": false,
        "license": {"spdx_id": "MIT"},
        "default_branch": "main",
        "open_issues_count": 1,
        "created_at": "2020-01-01T00:00:00Z",
        "updated_at": pushed_at,
        "pushed_at": pushed_at
    })
}

pub fn review_comment_json(login: &str, body: &str, file: &str, hunk: &str) -> Value {
    json!({
        "user": {"login": login},
        "body": body,
        "path": file,
        "diff_hunk": hunk,
        "created_at": "2024-03-01T10:00:00Z"
    })
}

pub fn empty_search() -> Value {
    json!({"total_count": 0, "incomplete_results": false, "items": []})
}
