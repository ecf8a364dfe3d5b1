use crate::benchmark::parse::parse_comparison;
use crate::benchmark::profile::{parse_synthesis, Profile};
use crate::benchmark::prompts;
use crate::benchmark::split::HeldOutSample;
use crate::error::{DevlicaError, Result};
use crate::llm::CompletionProvider;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub const DEFAULT_MAX_HELD_OUT: usize = 3;
pub const DEFAULT_MAX_ITERATIONS: usize = 5;
pub const DEFAULT_TARGET_SCORE: f64 = 80.0;

const FEEDBACK_SEPARATOR: &str = "\n---\n";

/// Limits for the refinement loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkSettings {
    pub max_held_out: usize,
    pub max_iterations: usize,
    pub target_score: f64,
}

impl Default for BenchmarkSettings {
    fn default() -> Self {
        Self {
            max_held_out: DEFAULT_MAX_HELD_OUT,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            target_score: DEFAULT_TARGET_SCORE,
        }
    }
}

/// Where the loop stands between iterations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Iterating { iteration: usize },
    Converged,
    Exhausted,
}

impl LoopState {
    /// Transition after an iteration scored `score`
    pub fn after_iteration(self, score: f64, settings: &BenchmarkSettings) -> LoopState {
        let iteration = match self {
            LoopState::Iterating { iteration } => iteration,
            LoopState::Idle => 1,
            terminal => return terminal,
        };
        if score >= settings.target_score {
            LoopState::Converged
        } else if iteration >= settings.max_iterations {
            LoopState::Exhausted
        } else {
            LoopState::Iterating {
                iteration: iteration + 1,
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopOutcome {
    /// An iteration reached the target score
    Converged,
    /// The iteration budget ran out below target
    Exhausted,
    /// There was nothing to benchmark against
    Skipped,
}

/// One original comment next to its imitation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewPair {
    pub original: String,
    pub generated: String,
    pub path: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    pub iteration: usize,
    pub score: f64,
    pub feedback: String,
    pub pairs: Vec<ReviewPair>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    pub final_score: f64,
    pub iterations: usize,
    pub outcome: LoopOutcome,
    pub history: Vec<IterationRecord>,
}

impl BenchmarkResult {
    fn skipped() -> Self {
        Self {
            final_score: -1.0,
            iterations: 0,
            outcome: LoopOutcome::Skipped,
            history: Vec::new(),
        }
    }
}

/// Scores a profile against held-out reviews and refines it until it
/// converges or runs out of iterations
pub struct Benchmarker {
    provider: Box<dyn CompletionProvider>,
    settings: BenchmarkSettings,
}

impl Benchmarker {
    pub fn new(provider: Box<dyn CompletionProvider>, settings: BenchmarkSettings) -> Self {
        Self { provider, settings }
    }

    pub async fn run(
        &self,
        cancel: &CancellationToken,
        profile: &Profile,
        held_out: &[HeldOutSample],
    ) -> Result<(BenchmarkResult, Profile)> {
        if held_out.is_empty() {
            warn!("no held-out reviews available, skipping benchmark");
            return Ok((BenchmarkResult::skipped(), profile.clone()));
        }

        let mut current = profile.clone();
        let mut history = Vec::new();
        let mut state = if self.settings.max_iterations == 0 {
            warn!("iteration budget is zero, nothing to run");
            LoopState::Exhausted
        } else {
            LoopState::Idle
        };

        loop {
            let iteration = match state {
                LoopState::Idle => 1,
                LoopState::Iterating { iteration } => iteration,
                LoopState::Converged | LoopState::Exhausted => break,
            };
            info!(iteration, max = self.settings.max_iterations, "benchmark iteration");

            let record = self
                .run_iteration(cancel, &current, held_out, iteration)
                .await
                .map_err(|e| e.context(format!("benchmark iteration {iteration}")))?;
            info!(iteration, score = record.score, "benchmark score");

            state = LoopState::Iterating { iteration }.after_iteration(record.score, &self.settings);
            if let LoopState::Iterating { .. } = state {
                info!(iteration, "refining profile");
                current = self
                    .refine(cancel, &current, &record)
                    .await
                    .map_err(|e| e.context(format!("refining profile (iteration {iteration})")))?;
            }
            history.push(record);
        }

        let outcome = match state {
            LoopState::Converged => {
                info!("benchmark target reached");
                LoopOutcome::Converged
            }
            _ => LoopOutcome::Exhausted,
        };
        let final_score = history.last().map(|r| r.score).unwrap_or(-1.0);
        let result = BenchmarkResult {
            final_score,
            iterations: history.len(),
            outcome,
            history,
        };
        Ok((result, current))
    }

    async fn run_iteration(
        &self,
        cancel: &CancellationToken,
        profile: &Profile,
        held_out: &[HeldOutSample],
        iteration: usize,
    ) -> Result<IterationRecord> {
        let context = profile.synthesis.to_context();
        let mut pairs = Vec::with_capacity(held_out.len());
        let mut feedback = Vec::with_capacity(held_out.len());

        for sample in held_out {
            let prompt = prompts::dry_run_prompt(&profile.username, &context, &sample.path, &sample.diff_hunk);
            let generated = self
                .complete(cancel, prompts::DRY_RUN_SYSTEM, &prompt)
                .await
                .map_err(|e| e.context(format!("generating review for {}", sample.path)))?;
            let generated = generated.trim().to_string();

            let prompt = prompts::compare_prompt(&sample.path, &sample.diff_hunk, &sample.body, &generated);
            let raw = self
                .complete(cancel, prompts::COMPARE_SYSTEM, &prompt)
                .await
                .map_err(|e| e.context(format!("comparing review for {}", sample.path)))?;
            let comparison = parse_comparison(&raw)?;

            feedback.push(comparison.feedback);
            pairs.push(ReviewPair {
                original: sample.body.clone(),
                generated,
                path: sample.path.clone(),
                score: comparison.score,
            });
        }

        let score = pairs.iter().map(|p| p.score).sum::<f64>() / pairs.len() as f64;
        Ok(IterationRecord {
            iteration,
            score,
            feedback: feedback.join(FEEDBACK_SEPARATOR),
            pairs,
        })
    }

    async fn refine(
        &self,
        cancel: &CancellationToken,
        profile: &Profile,
        record: &IterationRecord,
    ) -> Result<Profile> {
        let prompt = prompts::refine_prompt(
            &profile.username,
            record.score,
            &profile.synthesis,
            &record.feedback,
            &record.pairs,
        );
        let raw = self.complete(cancel, prompts::REFINE_SYSTEM, &prompt).await?;
        let synthesis = parse_synthesis(&raw)?;
        Ok(profile.with_synthesis(synthesis))
    }

    async fn complete(&self, cancel: &CancellationToken, system: &str, prompt: &str) -> Result<String> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(DevlicaError::Cancelled),
            result = self.provider.complete(system, prompt, None) => result,
        }
    }
}
