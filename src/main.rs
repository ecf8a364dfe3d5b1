use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::*;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use devlica::benchmark::{split_reviews, BenchmarkResult, Benchmarker, HeldOutSample, LoopOutcome, Profile};
use devlica::crawl::{ActivityAggregate, Crawler};
use devlica::github::GitHubClient;
use devlica::llm::{create_provider, ProviderKind};
use devlica::{logging, Config};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(short, long, global = true, env = "DEVLICA_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Crawl a user's public GitHub activity and hold back review samples
    Crawl(CrawlArgs),
    /// Score a profile against held-out reviews and refine it
    Benchmark(BenchmarkArgs),
}

#[derive(Args)]
struct CrawlArgs {
    /// GitHub username
    username: String,

    /// Maximum repositories to deep-crawl (commits, PRs, code samples)
    #[arg(long)]
    max_repos: Option<usize>,

    /// Review comments to hold out for benchmarking
    #[arg(long)]
    held_out: Option<usize>,

    /// Output directory
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct BenchmarkArgs {
    /// Profile JSON to benchmark
    #[arg(long)]
    profile: PathBuf,

    /// Held-out samples written by `crawl`
    #[arg(long)]
    held_out: PathBuf,

    /// LLM provider
    #[arg(long, value_enum)]
    provider: Option<ProviderKind>,

    /// LLM model (default: per-provider)
    #[arg(long)]
    model: Option<String>,

    #[arg(long)]
    max_iterations: Option<usize>,

    #[arg(long)]
    target_score: Option<f64>,

    /// Output directory
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{} {:#}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("loading configuration")?;
    if cli.verbose {
        config.verbose = true;
        config.log_level = "debug".to_string();
    }
    logging::init(&config.log_level)?;

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, cancelling");
                cancel.cancel();
            }
        }
    });

    match cli.command {
        Command::Crawl(args) => crawl(config, args, &cancel).await,
        Command::Benchmark(args) => benchmark(config, args, &cancel).await,
    }
}

async fn crawl(mut config: Config, args: CrawlArgs, cancel: &CancellationToken) -> Result<()> {
    if let Some(max_repos) = args.max_repos {
        config.max_repos = max_repos;
    }
    if let Some(held_out) = args.held_out {
        config.benchmark.max_held_out = held_out;
    }
    if let Some(output) = args.output {
        config.output_dir = output;
    }
    config.validate_crawl(&args.username)?;

    let client = GitHubClient::new(config.github_token()?, &config.github_api_base)?;
    let crawler = Crawler::new(client, config.max_repos);

    info!(user = %args.username, max_repos = config.max_repos, "crawling GitHub activity");
    let mut activity = crawler
        .crawl(cancel, &args.username)
        .await
        .with_context(|| format!("crawling {}", args.username))?;

    let held_out = split_reviews(&mut activity, config.benchmark.max_held_out);
    info!(
        count = held_out.len(),
        remaining_reviews = activity.total_reviews(),
        "held out reviews for benchmark"
    );

    tokio::fs::create_dir_all(&config.output_dir)
        .await
        .with_context(|| format!("creating {}", config.output_dir.display()))?;
    let activity_path = config.output_dir.join(format!("{}_activity.json", args.username));
    let held_out_path = config.output_dir.join(format!("{}_held_out.json", args.username));
    write_json(&activity_path, &activity).await?;
    write_json(&held_out_path, &held_out).await?;

    print_crawl_summary(&args.username, &activity, held_out.len());
    eprintln!("  {} {}", "activity:".bright_white().bold(), activity_path.display());
    eprintln!("  {} {}", "held out:".bright_white().bold(), held_out_path.display());
    Ok(())
}

async fn benchmark(mut config: Config, args: BenchmarkArgs, cancel: &CancellationToken) -> Result<()> {
    if let Some(kind) = args.provider {
        config.provider.kind = kind;
    }
    if let Some(model) = args.model {
        config.provider.model = model;
    }
    if let Some(max_iterations) = args.max_iterations {
        config.benchmark.max_iterations = max_iterations;
    }
    if let Some(target_score) = args.target_score {
        config.benchmark.target_score = target_score;
    }
    if let Some(output) = args.output {
        config.output_dir = output;
    }
    config.validate_benchmark()?;

    let profile: Profile = read_json(&args.profile).await?;
    let held_out: Vec<HeldOutSample> = read_json(&args.held_out).await?;

    let settings = config.provider_settings();
    info!(provider = %settings.kind, model = settings.model(), "starting benchmark");
    let provider = create_provider(&settings)?;
    let bench = Benchmarker::new(provider, config.benchmark.clone());

    let (result, refined) = bench
        .run(cancel, &profile, &held_out)
        .await
        .context("benchmarking profile")?;

    tokio::fs::create_dir_all(&config.output_dir)
        .await
        .with_context(|| format!("creating {}", config.output_dir.display()))?;
    let stem = if refined.username.is_empty() { "profile" } else { refined.username.as_str() };
    let profile_path = config.output_dir.join(format!("{stem}_profile_refined.json"));
    let result_path = config.output_dir.join(format!("{stem}_benchmark.json"));
    write_json(&profile_path, &refined).await?;
    write_json(&result_path, &result).await?;

    print_benchmark_summary(&result, config.benchmark.target_score);
    eprintln!("  {} {}", "profile:".bright_white().bold(), profile_path.display());
    eprintln!("  {} {}", "result:".bright_white().bold(), result_path.display());
    Ok(())
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    tokio::fs::write(path, content)
        .await
        .with_context(|| format!("writing {}", path.display()))
}

fn print_crawl_summary(username: &str, activity: &ActivityAggregate, held_out: usize) {
    eprintln!("\n{} {}", "Crawled".bright_green().bold(), username.bright_white().bold());
    let rows = [
        ("repositories", activity.repos.len()),
        ("commits", activity.total_commits()),
        ("reviews", activity.total_reviews()),
        ("authored issues", activity.total_issues()),
        ("external PRs", activity.total_external_prs()),
        ("releases", activity.total_releases()),
        ("starred", activity.total_starred()),
        ("gists", activity.total_gists()),
        ("events", activity.events.len()),
        ("held-out reviews", held_out),
    ];
    for (label, count) in rows {
        eprintln!("  {:<18} {}", label.bright_blue(), count);
    }
}

fn print_benchmark_summary(result: &BenchmarkResult, target: f64) {
    let verdict = match result.outcome {
        LoopOutcome::Converged => "converged".bright_green().bold(),
        LoopOutcome::Exhausted => "below target".bright_yellow().bold(),
        LoopOutcome::Skipped => "skipped (no held-out reviews)".bright_yellow().bold(),
    };
    eprintln!("\n{} {}", "Benchmark".bright_green().bold(), verdict);
    if result.outcome == LoopOutcome::Skipped {
        return;
    }
    for record in &result.history {
        eprintln!("  iteration {:<2} {:>5.1}", record.iteration, record.score);
    }
    eprintln!(
        "  {} {:.1} / {:.1} after {} iteration(s)",
        "final:".bright_white().bold(),
        result.final_score,
        target,
        result.iterations
    );
}
