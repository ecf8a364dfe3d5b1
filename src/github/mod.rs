//! GitHub REST access: authenticated client, pagination and wire types.

pub mod client;
pub mod types;

pub use client::{owner_repo_from_url, GitHubClient, Page, DEFAULT_API_BASE};
