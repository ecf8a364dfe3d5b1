#![doc = include_str!("../README.md")]
#![warn(clippy::all)]

//! devlica - GitHub developer activity crawler and profile benchmark
//!
//! The crate has two halves. [`crawl`] walks a user's public GitHub footprint
//! into an [`crawl::ActivityAggregate`], holding back a few review comments as
//! ground truth. [`benchmark`] asks a language model to imitate the developer
//! on those held-out diffs, grades the imitation and refines the profile until
//! it scores well enough.
//!
//! ## Usage
//! ```rust,ignore
//! use devlica::{benchmark::split_reviews, crawl::Crawler, github::GitHubClient};
//! use tokio_util::sync::CancellationToken;
//!
//! async fn example() -> devlica::Result<()> {
//!     let client = GitHubClient::new("ghp_token", devlica::github::DEFAULT_API_BASE)?;
//!     let crawler = Crawler::new(client, 10);
//!     let mut activity = crawler.crawl(&CancellationToken::new(), "octocat").await?;
//!     let held_out = split_reviews(&mut activity, 3);
//!     println!("{} commits, {} held-out reviews", activity.total_commits(), held_out.len());
//!     Ok(())
//! }
//! ```

/// Held-out split, imitation scoring and profile refinement
pub mod benchmark;
/// Layered runtime configuration
pub mod config;
/// Activity crawl over the GitHub API
pub mod crawl;
/// Error handling types and utilities
pub mod error;
/// GitHub REST client and wire types
pub mod github;
/// Generative backends
pub mod llm;
/// Logging configuration and utilities
pub mod logging;
/// Parallel processing utilities
pub mod parallel;
/// Rate limiting functionality to respect API limits
pub mod rate_limiter;
/// Text helpers shared across modules
pub mod utils;

pub use config::Config;
pub use error::{DevlicaError, Result};
