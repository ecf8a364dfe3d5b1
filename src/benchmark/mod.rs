//! Profile benchmark: held-out review split, imitation scoring and the
//! refinement loop.

pub mod parse;
pub mod profile;
pub mod prompts;
pub mod runner;
pub mod split;

pub use profile::{Profile, Synthesis};
pub use runner::{BenchmarkResult, BenchmarkSettings, Benchmarker, LoopOutcome};
pub use split::{split_reviews, HeldOutSample};
